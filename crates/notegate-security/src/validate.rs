//! Input validation for tool arguments.

use notegate_core::{NotegateError, NotegateResult};

/// Characters rejected anywhere in a path.
///
/// This is a deny-list, not a hard security boundary: `&` and other
/// characters that are legal in vault filenames stay allowed. Extend it
/// when a new unsafe character shows up. No canonicalization or symlink
/// resolution happens here, only rejection of syntactic traversal markers.
const DENIED_CHARS: [char; 5] = ['~', '$', '`', '|', ';'];

/// Validate a `path` or `folder` argument before it reaches the vault.
///
/// Rejects traversal (`..`), absolute paths, NUL bytes, the deny-listed
/// characters, and any extension other than `.md`. Extensionless paths
/// and `/`-terminated folder references pass.
pub fn validate_path(path: &str) -> NotegateResult<()> {
    if path.contains("..") {
        return Err(NotegateError::InvalidPath(
            "directory traversal not allowed".into(),
        ));
    }

    if path.starts_with('/') {
        return Err(NotegateError::InvalidPath(
            "absolute paths not allowed".into(),
        ));
    }

    if path.contains('\0') {
        return Err(NotegateError::InvalidPath("contains null byte".into()));
    }

    if let Some(c) = path.chars().find(|c| DENIED_CHARS.contains(c)) {
        return Err(NotegateError::InvalidPath(format!(
            "contains dangerous character '{c}'"
        )));
    }

    // Only .md notes and folder references are addressable. A path with no
    // dot at all is treated as an extensionless folder reference.
    if !path.ends_with(".md") && !path.ends_with('/') && path.contains('.') {
        return Err(NotegateError::InvalidPath(
            "only .md files are supported".into(),
        ));
    }

    Ok(())
}

/// Strip NUL bytes from a `content` argument. The payload is Markdown
/// text, not rendered HTML, so escaping stays out of scope here.
pub fn sanitize_content(content: &str) -> String {
    content.replace('\0', "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_traversal() {
        assert!(validate_path("../etc/passwd").is_err());
        assert!(validate_path("notes/../../secret.md").is_err());
        assert!(validate_path("x/../y.md").is_err());
    }

    #[test]
    fn test_rejects_absolute() {
        assert!(validate_path("/etc/hosts").is_err());
        assert!(validate_path("/notes/a.md").is_err());
    }

    #[test]
    fn test_rejects_null_byte() {
        assert!(validate_path("note\0.md").is_err());
    }

    #[test]
    fn test_rejects_denied_characters() {
        for p in ["~home.md", "a$b.md", "a`b.md", "a|b.md", "a;b.md"] {
            assert!(validate_path(p).is_err(), "should reject {p}");
        }
    }

    #[test]
    fn test_rejects_foreign_extensions() {
        assert!(validate_path("script.sh").is_err());
        assert!(validate_path("archive.tar.gz").is_err());
    }

    #[test]
    fn test_accepts_md_and_folders() {
        assert!(validate_path("daily/2024-01-15.md").is_ok());
        assert!(validate_path("projects/").is_ok());
        // Extensionless paths are folder references.
        assert!(validate_path("projects/notegate").is_ok());
    }

    #[test]
    fn test_allows_vault_friendly_characters() {
        // & and spaces are valid in vault filenames; the deny-list leaves
        // them alone on purpose.
        assert!(validate_path("ideas/cats & dogs.md").is_ok());
    }

    #[test]
    fn test_sanitize_strips_nul_only() {
        assert_eq!(sanitize_content("a\0b\0c"), "abc");
        let markdown = "# Title\n\n**bold** <em>kept as-is</em>";
        assert_eq!(sanitize_content(markdown), markdown);
    }
}
