//! MCP server exposing `get_timestamp` and `get_date`, two tools that
//! render the current local time through a strftime-style pattern.

pub mod config;
pub mod format;
pub mod handlers;
pub mod logging;
pub mod rpc;
pub mod server;
pub mod tools;
pub mod types;
