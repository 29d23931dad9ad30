// Tool registration table and core tool logic for time
use serde_json::{Value, json};

use crate::format::{Clock, render};

pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Signature shared by every registered tool: the clock to read and the
/// caller's pattern, if any. The result is always a string.
pub type ToolFn = fn(&dyn Clock, Option<&str>) -> String;

pub struct ToolSpec {
    pub name: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub default_format: &'static str,
    /// (pattern, sample output) pairs shown in the argument description.
    pub examples: &'static [(&'static str, &'static str)],
    pub call: ToolFn,
}

pub static TOOLS: &[ToolSpec] = &[
    ToolSpec {
        name: "get_timestamp",
        title: "Get Timestamp",
        description: "Returns the current local timestamp in the specified strftime format",
        default_format: DEFAULT_TIMESTAMP_FORMAT,
        examples: &[
            ("%Y-%m-%d %H:%M:%S", "2024-01-15 14:30:25"),
            ("%B %d, %Y at %I:%M %p", "January 15, 2024 at 02:30 PM"),
            ("%Y%m%d_%H%M%S", "20240115_143025"),
        ],
        call: get_timestamp,
    },
    ToolSpec {
        name: "get_date",
        title: "Get Date",
        description: "Returns the current local date in the specified strftime format",
        default_format: DEFAULT_DATE_FORMAT,
        examples: &[
            ("%Y-%m-%d", "2024-01-15"),
            ("%B %d, %Y", "January 15, 2024"),
            ("%m/%d/%Y", "01/15/2024"),
            ("%A, %B %d", "Monday, January 15"),
        ],
        call: get_date,
    },
];

pub fn find_tool(name: &str) -> Option<&'static ToolSpec> {
    TOOLS.iter().find(|tool| tool.name == name)
}

pub fn get_timestamp(clock: &dyn Clock, format: Option<&str>) -> String {
    format_now(clock, format.unwrap_or(DEFAULT_TIMESTAMP_FORMAT))
}

// Time placeholders are accepted here too; only the default differs.
pub fn get_date(clock: &dyn Clock, format: Option<&str>) -> String {
    format_now(clock, format.unwrap_or(DEFAULT_DATE_FORMAT))
}

fn format_now(clock: &dyn Clock, pattern: &str) -> String {
    match render(&clock.now(), pattern) {
        Ok(rendered) => rendered,
        Err(e) => {
            tracing::warn!(pattern, error = %e, "rejected format pattern");
            format!("Error: {e}")
        }
    }
}

impl ToolSpec {
    pub fn description_json(&self) -> Value {
        let examples: Vec<String> = self
            .examples
            .iter()
            .map(|(pattern, sample)| format!("\"{pattern}\" -> {sample}"))
            .collect();
        json!({
            "name": self.name,
            "description": self.description,
            "inputSchema": {
                "type": "object",
                "properties": {
                    "format": {
                        "type": "string",
                        "description": format!(
                            "strftime format string (default: \"{}\"). Examples: {}",
                            self.default_format,
                            examples.join("; ")
                        ),
                        "default": self.default_format
                    }
                }
            },
            "annotations": {
                "title": self.title,
                "readOnlyHint": true,
                "destructiveHint": false,
                "idempotentHint": false,
                "openWorldHint": false
            }
        })
    }
}

pub fn get_tools_description_json() -> Value {
    Value::Array(TOOLS.iter().map(ToolSpec::description_json).collect())
}
