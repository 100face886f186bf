//! REST client for the vault server.
//!
//! Endpoint layout follows the vault's local REST plugin: note bodies live
//! under `/vault/<path>`, folder listings under `/vault/<folder>/`, and
//! full-text search behind `POST /search/simple/`.

use async_trait::async_trait;
use notegate_core::{NotegateError, NotegateResult};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::StatusCode;
use serde_json::Value;
use tracing::debug;

/// Characters escaped inside a `/vault/` path component. The set includes
/// `/` so a nested note path travels as a single opaque segment.
const VAULT_PATH: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'%')
    .add(b'/');

const SEARCH_CONTEXT_LENGTH: &str = "100";

/// Operations the gateway needs from a vault backend.
///
/// Behind a trait so gateway tests can run against an in-memory fake
/// instead of a live REST server.
#[async_trait]
pub trait VaultApi: Send + Sync {
    async fn get_note(&self, path: &str) -> NotegateResult<String>;
    async fn create_note(&self, path: &str, content: &str) -> NotegateResult<String>;
    async fn update_note(&self, path: &str, content: &str) -> NotegateResult<String>;
    async fn delete_note(&self, path: &str) -> NotegateResult<String>;
    async fn list_notes(&self, folder: &str) -> NotegateResult<String>;
    async fn search_notes(&self, query: &str) -> NotegateResult<String>;
    async fn vault_info(&self) -> NotegateResult<String>;
}

/// HTTP client for a vault REST server.
pub struct VaultClient {
    base_url: String,
    token: String,
    http: reqwest::Client,
}

impl VaultClient {
    /// Build a client for the given base URL. A trailing slash on the URL
    /// is stripped; an empty token disables the Authorization header.
    ///
    /// No request timeout is set: the vault is local and a slow listing
    /// or search is allowed to take as long as it takes.
    pub fn new(base_url: &str, token: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            http: reqwest::Client::new(),
        }
    }

    fn request(&self, method: reqwest::Method, endpoint: &str) -> reqwest::RequestBuilder {
        let mut builder = self.http.request(method, format!("{}{endpoint}", self.base_url));
        if !self.token.is_empty() {
            builder = builder.bearer_auth(&self.token);
        }
        builder
    }

    async fn put_markdown(&self, path: &str, content: &str) -> NotegateResult<StatusCode> {
        let endpoint = format!("/vault/{}", utf8_percent_encode(path, VAULT_PATH));
        let resp = self
            .request(reqwest::Method::PUT, &endpoint)
            .header(reqwest::header::CONTENT_TYPE, "text/markdown")
            .body(content.to_string())
            .send()
            .await
            .map_err(|e| NotegateError::Vault(format!("request failed: {e}")))?;
        Ok(resp.status())
    }
}

/// Add a `.md` extension to extensionless note paths. Paths that already
/// carry any extension (or are empty) pass through unchanged.
fn normalize_note_path(path: &str) -> String {
    if path.is_empty() || path.contains('.') {
        path.to_string()
    } else {
        format!("{path}.md")
    }
}

/// Collect `.md` entries from a `/vault/` listing. Entries arrive either
/// as bare strings or as objects with a `path` field.
fn markdown_files(listing: &Value) -> Vec<String> {
    let mut notes = Vec::new();
    if let Some(files) = listing.get("files").and_then(Value::as_array) {
        for file in files {
            let path = match file {
                Value::String(s) => Some(s.as_str()),
                Value::Object(obj) => obj.get("path").and_then(Value::as_str),
                _ => None,
            };
            if let Some(path) = path {
                if path.ends_with(".md") {
                    notes.push(path.to_string());
                }
            }
        }
    }
    notes
}

#[async_trait]
impl VaultApi for VaultClient {
    async fn get_note(&self, path: &str) -> NotegateResult<String> {
        let path = normalize_note_path(path);
        let endpoint = format!("/vault/{}", utf8_percent_encode(&path, VAULT_PATH));
        debug!(%path, "fetching note");

        let resp = self
            .request(reqwest::Method::GET, &endpoint)
            .send()
            .await
            .map_err(|e| NotegateError::Vault(format!("request failed: {e}")))?;
        if resp.status() != StatusCode::OK {
            return Err(NotegateError::Vault(format!(
                "failed to get note: {}",
                resp.status()
            )));
        }
        let content = resp
            .text()
            .await
            .map_err(|e| NotegateError::Vault(format!("failed to read response: {e}")))?;
        Ok(format!("# Note: {path}\n\n{content}"))
    }

    async fn create_note(&self, path: &str, content: &str) -> NotegateResult<String> {
        let status = self.put_markdown(path, content).await?;
        match status {
            StatusCode::OK | StatusCode::CREATED | StatusCode::NO_CONTENT => {
                Ok(format!("Successfully created note: {path}"))
            }
            other => Err(NotegateError::Vault(format!("failed to create note: {other}"))),
        }
    }

    async fn update_note(&self, path: &str, content: &str) -> NotegateResult<String> {
        let status = self.put_markdown(path, content).await?;
        match status {
            StatusCode::OK | StatusCode::NO_CONTENT => {
                Ok(format!("Successfully updated note: {path}"))
            }
            other => Err(NotegateError::Vault(format!("failed to update note: {other}"))),
        }
    }

    async fn delete_note(&self, path: &str) -> NotegateResult<String> {
        let endpoint = format!("/vault/{}", utf8_percent_encode(path, VAULT_PATH));
        let resp = self
            .request(reqwest::Method::DELETE, &endpoint)
            .send()
            .await
            .map_err(|e| NotegateError::Vault(format!("request failed: {e}")))?;
        match resp.status() {
            StatusCode::OK | StatusCode::NO_CONTENT => {
                Ok(format!("Successfully deleted note: {path}"))
            }
            other => Err(NotegateError::Vault(format!("failed to delete note: {other}"))),
        }
    }

    async fn list_notes(&self, folder: &str) -> NotegateResult<String> {
        let endpoint = if folder.is_empty() {
            "/vault/".to_string()
        } else {
            format!("/vault/{}/", utf8_percent_encode(folder, VAULT_PATH))
        };

        let resp = self
            .request(reqwest::Method::GET, &endpoint)
            .send()
            .await
            .map_err(|e| NotegateError::Vault(format!("request failed: {e}")))?;

        // A missing folder is an empty listing, not an error.
        if resp.status() == StatusCode::NOT_FOUND {
            if folder.is_empty() {
                return Ok("No notes found in vault.".to_string());
            }
            return Ok(format!(
                "Folder '{folder}' is empty or does not exist yet. No notes found."
            ));
        }
        if resp.status() != StatusCode::OK {
            return Err(NotegateError::Vault(format!(
                "failed to list notes: {}",
                resp.status()
            )));
        }

        let listing: Value = resp
            .json()
            .await
            .map_err(|e| NotegateError::Vault(format!("failed to decode response: {e}")))?;
        let notes = markdown_files(&listing);
        if notes.is_empty() {
            return Ok("No notes found.".to_string());
        }

        let mut result = format!("Found {} notes:\n", notes.len());
        for note in &notes {
            result.push_str(&format!("- {note}\n"));
        }
        Ok(result)
    }

    async fn search_notes(&self, query: &str) -> NotegateResult<String> {
        let resp = self
            .request(reqwest::Method::POST, "/search/simple/")
            .query(&[("query", query), ("contextLength", SEARCH_CONTEXT_LENGTH)])
            .send()
            .await
            .map_err(|e| NotegateError::Vault(format!("search request failed: {e}")))?;

        if resp.status() != StatusCode::OK {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(NotegateError::Vault(format!(
                "failed to search notes: {status} - {body}"
            )));
        }

        let results: Vec<Value> = resp
            .json()
            .await
            .map_err(|e| NotegateError::Vault(format!("failed to decode response: {e}")))?;

        if results.is_empty() {
            return Ok(format!("No notes found matching \"{query}\"."));
        }

        let mut result = format!("Found {} notes matching \"{query}\":\n\n", results.len());
        for (i, item) in results.iter().enumerate() {
            let Some(filename) = item.get("filename").and_then(Value::as_str) else {
                continue;
            };
            result.push_str(&format!("{}. **{filename}**\n", i + 1));
            if let Some(matches) = item.get("matches").and_then(Value::as_array) {
                for m in matches {
                    if let Some(context) = m.get("context").and_then(Value::as_str) {
                        result.push_str(&format!("   > {}\n", context.trim()));
                    }
                }
            }
            result.push('\n');
        }
        Ok(result)
    }

    async fn vault_info(&self) -> NotegateResult<String> {
        let resp = self
            .request(reqwest::Method::GET, "/")
            .send()
            .await
            .map_err(|e| NotegateError::Vault(format!("request failed: {e}")))?;
        if resp.status() != StatusCode::OK {
            return Err(NotegateError::Vault(format!(
                "failed to get vault info: {}",
                resp.status()
            )));
        }
        let info: Value = resp
            .json()
            .await
            .map_err(|e| NotegateError::Vault(format!("failed to decode response: {e}")))?;

        let mut result = String::from("# Vault Information\n\n");
        if let Some(authenticated) = info.get("authenticated").and_then(Value::as_bool) {
            result.push_str(&format!("**Authenticated:** {authenticated}\n"));
        }
        if let Some(service) = info.get("service").and_then(Value::as_str) {
            result.push_str(&format!("**Service:** {service}\n"));
        }
        if let Some(versions) = info.get("versions").and_then(Value::as_object) {
            result.push_str("\n## Versions\n");
            for (key, value) in versions {
                match value {
                    Value::String(s) => result.push_str(&format!("- **{key}:** {s}\n")),
                    other => result.push_str(&format!("- **{key}:** {other}\n")),
                }
            }
        }

        // Statistics are best effort: a failed listing just omits the section.
        if let Ok(listing_resp) = self.request(reqwest::Method::GET, "/vault/").send().await {
            if listing_resp.status() == StatusCode::OK {
                if let Ok(listing) = listing_resp.json::<Value>().await {
                    let mut note_count = 0;
                    let mut folder_count = 0;
                    if let Some(files) = listing.get("files").and_then(Value::as_array) {
                        for file in files {
                            let Some(obj) = file.as_object() else { continue };
                            if let Some(path) = obj.get("path").and_then(Value::as_str) {
                                if path.ends_with(".md") {
                                    note_count += 1;
                                }
                            }
                            if obj.get("is_folder").and_then(Value::as_bool) == Some(true) {
                                folder_count += 1;
                            }
                        }
                    }
                    result.push_str("\n## Statistics\n");
                    result.push_str(&format!("- **Notes:** {note_count}\n"));
                    result.push_str(&format!("- **Folders:** {folder_count}\n"));
                }
            }
        }

        Ok(result)
    }
}
