use crate::error::AvailabilityError;
use crate::model::ToolOutput;
use crate::service::AvailabilityService;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::io::{BufRead, Read, Write};
use tracing::{debug, info, warn};

pub const TOOL_NAME: &str = "get_court_availability";
const DEFAULT_PROTOCOL_VERSION: &str = "2024-11-05";
const MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct JsonRpcResponse {
    pub jsonrpc: &'static str,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    fn failure(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Deserialize)]
struct ToolCallParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Default, Deserialize)]
struct AvailabilityArgs {
    #[serde(default)]
    target_date: Option<String>,
    #[serde(default)]
    time_after: Option<String>,
    #[serde(default)]
    time_before: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Framing {
    ContentLength,
    Line,
}

pub fn serve_stdio(service: &AvailabilityService) -> Result<()> {
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    serve(service, stdin.lock(), stdout.lock())
}

/// Answers requests until the reader is exhausted. Each reply uses the
/// framing of the request it answers.
pub fn serve<R: BufRead, W: Write>(
    service: &AvailabilityService,
    mut reader: R,
    mut writer: W,
) -> Result<()> {
    info!(tool = TOOL_NAME, "serving json-rpc over stdio");
    while let Some((framing, body)) = read_message(&mut reader)? {
        let response = match serde_json::from_slice::<JsonRpcRequest>(&body) {
            Ok(request) => handle_request(service, request),
            Err(err) => {
                warn!(error = %err, "invalid json-rpc payload");
                Some(JsonRpcResponse::failure(
                    Value::Null,
                    -32700,
                    "invalid json-rpc request",
                ))
            }
        };

        if let Some(response) = response {
            let payload = serde_json::to_vec(&response).context("json-rpc serialization failed")?;
            write_message(&mut writer, framing, &payload)?;
        }
    }
    info!("stdin closed; stopping server");
    Ok(())
}

/// `None` for notifications, which get no reply.
pub fn handle_request(
    service: &AvailabilityService,
    request: JsonRpcRequest,
) -> Option<JsonRpcResponse> {
    let Some(id) = request.id else {
        debug!(method = %request.method, "notification received");
        return None;
    };

    if request.jsonrpc != "2.0" {
        return Some(JsonRpcResponse::failure(
            id,
            -32600,
            "invalid json-rpc version",
        ));
    }

    let response = match request.method.as_str() {
        "initialize" => JsonRpcResponse::success(id, initialize_result(request.params.as_ref())),
        "ping" => JsonRpcResponse::success(id, json!({})),
        "tools/list" => JsonRpcResponse::success(id, json!({ "tools": [tool_definition()] })),
        "tools/call" => {
            let params = request.params.unwrap_or(Value::Null);
            match serde_json::from_value::<ToolCallParams>(params) {
                Ok(call) => JsonRpcResponse::success(id, call_tool(service, call)),
                Err(_) => JsonRpcResponse::failure(id, -32602, "invalid tool params"),
            }
        }
        other => JsonRpcResponse::failure(id, -32601, format!("method not found: {other}")),
    };
    Some(response)
}

pub fn tool_definition() -> Value {
    json!({
        "name": TOOL_NAME,
        "description": "Get court availability for a date and optional time range, \
                        with the price of every open slot.",
        "inputSchema": {
            "type": "object",
            "properties": {
                "target_date": {
                    "type": "string",
                    "format": "date",
                    "description": "Date to check (YYYY-MM-DD)"
                },
                "time_after": {
                    "type": "string",
                    "format": "time",
                    "description": "Only slots ending after this time (HH:MM)"
                },
                "time_before": {
                    "type": "string",
                    "format": "time",
                    "description": "Only slots starting before this time (HH:MM)"
                }
            },
            "required": ["target_date"]
        }
    })
}

fn initialize_result(params: Option<&Value>) -> Value {
    let protocol_version = params
        .and_then(|p| p.get("protocolVersion"))
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_PROTOCOL_VERSION);
    json!({
        "protocolVersion": protocol_version,
        "capabilities": { "tools": {} },
        "serverInfo": {
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION")
        }
    })
}

fn call_tool(service: &AvailabilityService, call: ToolCallParams) -> Value {
    if call.name != TOOL_NAME {
        return text_content(format!("Unknown tool: {}", call.name));
    }

    let args = if call.arguments.is_null() {
        Ok(AvailabilityArgs::default())
    } else {
        serde_json::from_value::<AvailabilityArgs>(call.arguments)
    };

    let output = match args {
        Ok(AvailabilityArgs {
            target_date: Some(target_date),
            time_after,
            time_before,
        }) => service.get_court_availability(
            &target_date,
            time_after.as_deref(),
            time_before.as_deref(),
        ),
        Ok(_) => ToolOutput::Error(
            AvailabilityError::InvalidInput("target_date is required".to_string()).to_document(),
        ),
        Err(err) => {
            ToolOutput::Error(AvailabilityError::InvalidInput(err.to_string()).to_document())
        }
    };

    let text = serde_json::to_string_pretty(&output)
        .unwrap_or_else(|_| r#"{"error": "serialization failed"}"#.to_string());
    text_content(text)
}

fn text_content(text: String) -> Value {
    json!({ "content": [{ "type": "text", "text": text }] })
}

fn read_message<R: BufRead>(reader: &mut R) -> Result<Option<(Framing, Vec<u8>)>> {
    let mut line = String::new();
    loop {
        line.clear();
        if read_bounded_line(reader, &mut line)? == 0 {
            return Ok(None);
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed
            .get(..15)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("content-length:"))
        {
            break;
        }
        return Ok(Some((Framing::Line, trimmed.as_bytes().to_vec())));
    }

    let mut content_length = parse_content_length(&line)?;
    loop {
        line.clear();
        if read_bounded_line(reader, &mut line)? == 0 {
            bail!("stdio closed inside message headers");
        }
        if line.trim().is_empty() {
            break;
        }
        if line.to_ascii_lowercase().starts_with("content-length:") {
            content_length = parse_content_length(&line)?;
        }
    }

    if content_length > MAX_BODY_BYTES {
        bail!("payload too large: {content_length} bytes");
    }
    let mut body = vec![0u8; content_length];
    reader
        .read_exact(&mut body)
        .context("stdio read failed")?;
    Ok(Some((Framing::ContentLength, body)))
}

/// `read_line` capped at `MAX_BODY_BYTES`, so an unterminated line cannot
/// grow without bound.
fn read_bounded_line<R: BufRead>(reader: &mut R, line: &mut String) -> Result<usize> {
    let limit = MAX_BODY_BYTES as u64 + 1;
    let read = Read::take(&mut *reader, limit)
        .read_line(line)
        .context("stdio read failed")?;
    if read > MAX_BODY_BYTES {
        bail!("payload too large: line exceeds {MAX_BODY_BYTES} bytes");
    }
    Ok(read)
}

fn parse_content_length(line: &str) -> Result<usize> {
    let (_, value) = line
        .split_once(':')
        .context("malformed content-length header")?;
    value
        .trim()
        .parse::<usize>()
        .with_context(|| format!("invalid content length {}", value.trim()))
}

fn write_message<W: Write>(writer: &mut W, framing: Framing, payload: &[u8]) -> Result<()> {
    match framing {
        Framing::ContentLength => {
            write!(writer, "Content-Length: {}\r\n\r\n", payload.len())
                .context("stdio write failed")?;
            writer.write_all(payload).context("stdio write failed")?;
        }
        Framing::Line => {
            writer.write_all(payload).context("stdio write failed")?;
            writer.write_all(b"\n").context("stdio write failed")?;
        }
    }
    writer.flush().context("stdio write failed")
}
