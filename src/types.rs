// Shared MCP payload types for the datetime tools
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Arguments accepted by every tool. `format` may be absent or null.
#[derive(Deserialize, Debug, Default, PartialEq, Eq)]
pub struct ToolArguments {
    #[serde(default)]
    pub format: Option<String>,
}

impl ToolArguments {
    /// Missing and `null` arguments both mean "use the defaults".
    pub fn from_value(arguments: Option<Value>) -> Result<Self, serde_json::Error> {
        match arguments {
            None | Some(Value::Null) => Ok(ToolArguments::default()),
            Some(value) => serde_json::from_value(value),
        }
    }
}

#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct TextContent {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: String,
}

#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct CallToolResult {
    pub content: Vec<TextContent>,
    #[serde(rename = "isError")]
    pub is_error: bool,
}

impl CallToolResult {
    // Tool errors travel as ordinary text, so isError stays false.
    pub fn text(text: String) -> Self {
        CallToolResult {
            content: vec![TextContent { kind: "text", text }],
            is_error: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn absent_and_null_arguments_use_defaults() {
        assert_eq!(ToolArguments::from_value(None).unwrap(), ToolArguments::default());
        assert_eq!(
            ToolArguments::from_value(Some(json!({ "format": null }))).unwrap(),
            ToolArguments::default()
        );
    }

    #[test]
    fn non_string_format_is_rejected() {
        assert!(ToolArguments::from_value(Some(json!({ "format": 42 }))).is_err());
        assert!(ToolArguments::from_value(Some(json!("%Y"))).is_err());
    }

    #[test]
    fn call_result_shape() {
        let value = serde_json::to_value(CallToolResult::text("2024-01-15".to_string())).unwrap();
        assert_eq!(
            value,
            json!({ "content": [{ "type": "text", "text": "2024-01-15" }], "isError": false })
        );
    }
}
