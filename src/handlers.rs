// Transport-independent MCP dispatch plus the axum handler wrapping it
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::Response;
use serde::Serialize;
use serde_json::{Value, json};

use crate::format::Clock;
use crate::rpc::{
    INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, InitializeParams, JSONRPC_VERSION,
    JsonRpcErrorResponse, JsonRpcRequest, JsonRpcResponse, METHOD_NOT_FOUND, ToolCallParams,
};
use crate::tools::{find_tool, get_tools_description_json};
use crate::types::{CallToolResult, ToolArguments};

pub const SERVER_NAME: &str = "Time Server";
pub const DEFAULT_PROTOCOL_VERSION: &str = "2024-11-05";
pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2024-11-05", "2025-03-26", "2025-06-18"];

#[derive(Clone)]
pub struct AppState {
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        AppState { clock }
    }
}

/// Handles one decoded JSON-RPC message. Returns `None` for notifications.
pub fn handle_message(message: Value, clock: &dyn Clock) -> Option<Value> {
    let id = message.get("id").cloned().unwrap_or(Value::Null);
    let request: JsonRpcRequest = match serde_json::from_value(message) {
        Ok(request) => request,
        Err(e) => {
            tracing::debug!(error = %e, "rejecting malformed request");
            return Some(to_json(&JsonRpcErrorResponse::new(
                id,
                INVALID_REQUEST,
                "Invalid Request",
            )));
        }
    };

    if request.jsonrpc != JSONRPC_VERSION {
        return Some(to_json(&JsonRpcErrorResponse::new(
            id,
            INVALID_REQUEST,
            format!("Invalid Request: unsupported jsonrpc version '{}'", request.jsonrpc),
        )));
    }

    if request.is_notification() {
        tracing::debug!(method = %request.method, "notification received");
        return None;
    }

    Some(handle_request(request, clock))
}

/// Decodes raw bytes and dispatches them; undecodable input yields a parse error.
pub fn handle_raw(raw: &[u8], clock: &dyn Clock) -> Option<Value> {
    match serde_json::from_slice::<Value>(raw) {
        Ok(message) => handle_message(message, clock),
        Err(e) => {
            tracing::debug!(error = %e, "unparseable message");
            Some(to_json(&JsonRpcErrorResponse::parse_error()))
        }
    }
}

fn handle_request(req: JsonRpcRequest, clock: &dyn Clock) -> Value {
    let id = req.id.clone().unwrap_or(Value::Null);
    match req.method.as_str() {
        "initialize" => process_init(id, req.params),
        "ping" => to_json(&JsonRpcResponse::new(id, json!({}))),
        "tools/list" => to_json(&JsonRpcResponse::new(
            id,
            json!({ "tools": get_tools_description_json() }),
        )),
        "tools/call" => process_tool_call(id, req.params, clock),
        other => {
            tracing::debug!(method = other, "method not found");
            to_json(&JsonRpcErrorResponse::new(id, METHOD_NOT_FOUND, "Method not found"))
        }
    }
}

fn process_init(id: Value, params: Option<Value>) -> Value {
    let params: InitializeParams = match serde_json::from_value(params.unwrap_or(Value::Null)) {
        Ok(params) => params,
        Err(e) => {
            return to_json(&JsonRpcErrorResponse::new(
                id,
                INVALID_PARAMS,
                format!("Invalid params for initialize: {e}"),
            ));
        }
    };

    let protocol_version = negotiate_protocol_version(&params.protocol_version);
    tracing::info!(
        requested = %params.protocol_version,
        negotiated = protocol_version,
        client = %params.client_info,
        "client initialized"
    );
    to_json(&JsonRpcResponse::new(
        id,
        json!({
            "protocolVersion": protocol_version,
            "capabilities": {
                "tools": {
                    "listChanged": false
                }
            },
            "serverInfo": {
                "name": SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION")
            }
        }),
    ))
}

pub fn negotiate_protocol_version(requested: &str) -> &'static str {
    SUPPORTED_PROTOCOL_VERSIONS
        .iter()
        .copied()
        .find(|supported| *supported == requested)
        .unwrap_or(DEFAULT_PROTOCOL_VERSION)
}

fn process_tool_call(id: Value, params: Option<Value>, clock: &dyn Clock) -> Value {
    let params: ToolCallParams = match serde_json::from_value(params.unwrap_or(Value::Null)) {
        Ok(params) => params,
        Err(_) => {
            return to_json(&JsonRpcErrorResponse::new(
                id,
                INVALID_PARAMS,
                "Invalid params for tools/call",
            ));
        }
    };

    let Some(tool) = find_tool(&params.name) else {
        return to_json(&JsonRpcErrorResponse::new(
            id,
            INVALID_PARAMS,
            format!("Unknown tool: {}", params.name),
        ));
    };

    let args = match ToolArguments::from_value(params.arguments) {
        Ok(args) => args,
        Err(e) => {
            return to_json(&JsonRpcErrorResponse::new(
                id,
                INVALID_PARAMS,
                format!("Invalid params for {}: {e}", tool.name),
            ));
        }
    };

    tracing::debug!(tool = tool.name, format = ?args.format, "tool call");
    let text = (tool.call)(clock, args.format.as_deref());
    to_json(&JsonRpcResponse::new(id, CallToolResult::text(text)))
}

fn to_json<T: Serialize>(response: &T) -> Value {
    serde_json::to_value(response).unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to serialize response");
        json!({
            "jsonrpc": JSONRPC_VERSION,
            "id": Value::Null,
            "error": { "code": INTERNAL_ERROR, "message": "Internal error" }
        })
    })
}

pub async fn mcp_handler(State(state): State<AppState>, body: Bytes) -> Response {
    match handle_raw(&body, state.clock.as_ref()) {
        Some(response) => create_jsonrpc_response(&response),
        None => Response::builder()
            .status(StatusCode::ACCEPTED)
            .body(Body::empty())
            .unwrap_or_else(|_| Response::new(Body::empty())),
    }
}

pub fn create_jsonrpc_response(json_response: &Value) -> Response {
    match serde_json::to_string(json_response) {
        Ok(json_string) => Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json_string))
            .unwrap_or_else(|_| internal_error_response("failed to build response")),
        Err(_) => internal_error_response("failed to serialize response"),
    }
}

fn internal_error_response(message: &'static str) -> Response {
    let mut response = Response::new(Body::from(format!(r#"{{"error":"{message}"}}"#)));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::FixedClock;
    use chrono::{FixedOffset, TimeZone};

    fn clock() -> FixedClock {
        FixedClock(
            FixedOffset::east_opt(0)
                .unwrap()
                .with_ymd_and_hms(2024, 1, 15, 14, 30, 25)
                .unwrap(),
        )
    }

    fn call(message: Value) -> Option<Value> {
        handle_message(message, &clock())
    }

    #[test]
    fn initialize_echoes_supported_version() {
        let resp = call(json!({
            "jsonrpc": "2.0", "id": 1, "method": "initialize",
            "params": {
                "protocolVersion": "2025-03-26",
                "capabilities": {},
                "clientInfo": { "name": "t" }
            }
        }))
        .unwrap();
        assert_eq!(resp["result"]["protocolVersion"], "2025-03-26");
        assert_eq!(resp["result"]["serverInfo"]["name"], SERVER_NAME);
        assert_eq!(resp["result"]["capabilities"]["tools"]["listChanged"], false);
    }

    #[test]
    fn initialize_falls_back_for_unknown_version() {
        assert_eq!(negotiate_protocol_version("1999-01-01"), DEFAULT_PROTOCOL_VERSION);
    }

    #[test]
    fn initialize_without_params_is_invalid() {
        let resp = call(json!({ "jsonrpc": "2.0", "id": 1, "method": "initialize" })).unwrap();
        assert_eq!(resp["error"]["code"], INVALID_PARAMS);
    }

    #[test]
    fn tool_call_uses_clock() {
        let resp = call(json!({
            "jsonrpc": "2.0", "id": "a", "method": "tools/call",
            "params": { "name": "get_timestamp", "arguments": { "format": "%Y%m%d_%H%M%S" } }
        }))
        .unwrap();
        assert_eq!(resp["id"], "a");
        assert_eq!(resp["result"]["content"][0]["text"], "20240115_143025");
        assert_eq!(resp["result"]["isError"], false);
    }

    #[test]
    fn tool_call_without_arguments_uses_default() {
        let resp = call(json!({
            "jsonrpc": "2.0", "id": 2, "method": "tools/call", "params": { "name": "get_date" }
        }))
        .unwrap();
        assert_eq!(resp["result"]["content"][0]["text"], "2024-01-15");
    }

    #[test]
    fn non_string_format_is_invalid_params() {
        let resp = call(json!({
            "jsonrpc": "2.0", "id": 3, "method": "tools/call",
            "params": { "name": "get_date", "arguments": { "format": 7 } }
        }))
        .unwrap();
        assert_eq!(resp["error"]["code"], INVALID_PARAMS);
    }

    #[test]
    fn notifications_get_no_response() {
        assert!(call(json!({ "jsonrpc": "2.0", "method": "notifications/initialized" })).is_none());
    }

    #[test]
    fn null_id_is_a_request() {
        let resp = call(json!({ "jsonrpc": "2.0", "id": null, "method": "ping" })).unwrap();
        assert_eq!(resp, json!({ "jsonrpc": "2.0", "id": null, "result": {} }));
    }

    #[test]
    fn wrong_version_and_shape_are_invalid_requests() {
        let resp = call(json!({ "jsonrpc": "1.0", "id": 1, "method": "ping" })).unwrap();
        assert_eq!(resp["error"]["code"], INVALID_REQUEST);
        let resp = call(json!([1, 2, 3])).unwrap();
        assert_eq!(resp["error"]["code"], INVALID_REQUEST);
        assert_eq!(resp["id"], Value::Null);
    }

    #[test]
    fn garbage_is_parse_error() {
        let resp = handle_raw(b"{not json", &clock()).unwrap();
        assert_eq!(resp["error"]["code"], crate::rpc::PARSE_ERROR);
    }
}
