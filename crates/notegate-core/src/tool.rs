//! The closed catalogue of vault tools.
//!
//! The seven tools are a fixed set, so they are modeled as an enum rather
//! than string-keyed branching; the dispatcher match over [`Tool`] is
//! checked for exhaustiveness by the compiler.

use serde::Serialize;

/// One of the seven RPC-callable vault operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    GetNote,
    CreateNote,
    UpdateNote,
    DeleteNote,
    ListNotes,
    SearchNotes,
    GetVaultInfo,
}

impl Tool {
    /// All tools, in catalogue order.
    pub const ALL: [Tool; 7] = [
        Tool::GetNote,
        Tool::CreateNote,
        Tool::UpdateNote,
        Tool::DeleteNote,
        Tool::ListNotes,
        Tool::SearchNotes,
        Tool::GetVaultInfo,
    ];

    /// Look up a tool by its wire name. `None` for anything outside the set.
    pub fn parse(name: &str) -> Option<Tool> {
        Tool::ALL.into_iter().find(|t| t.name() == name)
    }

    /// Wire name of the tool.
    pub fn name(self) -> &'static str {
        match self {
            Tool::GetNote => "get_note",
            Tool::CreateNote => "create_note",
            Tool::UpdateNote => "update_note",
            Tool::DeleteNote => "delete_note",
            Tool::ListNotes => "list_notes",
            Tool::SearchNotes => "search_notes",
            Tool::GetVaultInfo => "get_vault_info",
        }
    }

    /// Human-readable description advertised in the catalogue.
    pub fn description(self) -> &'static str {
        match self {
            Tool::GetNote => "Get the content of a note by its path",
            Tool::CreateNote => "Create a new note with the specified content",
            Tool::UpdateNote => "Update an existing note's content",
            Tool::DeleteNote => "Delete a note",
            Tool::ListNotes => "List all notes in the vault",
            Tool::SearchNotes => "Search for notes containing specific text",
            Tool::GetVaultInfo => "Get information about the vault",
        }
    }

    /// JSON Schema for the tool's arguments, as advertised by `tools/list`.
    fn input_schema(self) -> serde_json::Value {
        let path = |desc: &str| {
            serde_json::json!({"type": "string", "description": desc})
        };
        match self {
            Tool::GetNote => serde_json::json!({
                "type": "object",
                "properties": {
                    "path": path("Path to the note (relative to vault root)"),
                },
                "required": ["path"],
            }),
            Tool::CreateNote => serde_json::json!({
                "type": "object",
                "properties": {
                    "path": path("Path where the note should be created"),
                    "content": path("Content of the note"),
                },
                "required": ["path", "content"],
            }),
            Tool::UpdateNote => serde_json::json!({
                "type": "object",
                "properties": {
                    "path": path("Path to the note to update"),
                    "content": path("New content for the note"),
                },
                "required": ["path", "content"],
            }),
            Tool::DeleteNote => serde_json::json!({
                "type": "object",
                "properties": {
                    "path": path("Path to the note to delete"),
                },
                "required": ["path"],
            }),
            Tool::ListNotes => serde_json::json!({
                "type": "object",
                "properties": {
                    "folder": path("Optional folder to filter by"),
                },
            }),
            Tool::SearchNotes => serde_json::json!({
                "type": "object",
                "properties": {
                    "query": path("Search query"),
                },
                "required": ["query"],
            }),
            Tool::GetVaultInfo => serde_json::json!({
                "type": "object",
                "properties": {},
            }),
        }
    }

    /// The static catalogue served by `tools/list`.
    pub fn catalogue() -> Vec<ToolDef> {
        Tool::ALL
            .into_iter()
            .map(|t| ToolDef {
                name: t.name(),
                description: t.description(),
                input_schema: t.input_schema(),
            })
            .collect()
    }
}

/// Tool definition entry in the `tools/list` response.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDef {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "inputSchema")]
    pub input_schema: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_tools() {
        for tool in Tool::ALL {
            assert_eq!(Tool::parse(tool.name()), Some(tool));
        }
    }

    #[test]
    fn test_parse_unknown_tool() {
        assert_eq!(Tool::parse("drop_vault"), None);
        assert_eq!(Tool::parse(""), None);
    }

    #[test]
    fn test_catalogue_has_seven_entries() {
        let defs = Tool::catalogue();
        assert_eq!(defs.len(), 7);
        assert_eq!(defs[0].name, "get_note");
        assert_eq!(defs[6].name, "get_vault_info");
    }

    #[test]
    fn test_required_arguments_advertised() {
        let defs = Tool::catalogue();
        let create = defs.iter().find(|d| d.name == "create_note").unwrap();
        let required = create.input_schema["required"].as_array().unwrap();
        assert_eq!(required.len(), 2);

        // list_notes has no required arguments at all
        let list = defs.iter().find(|d| d.name == "list_notes").unwrap();
        assert!(list.input_schema.get("required").is_none());
    }
}
