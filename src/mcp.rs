use crate::model::{LintRequest, LintResult};
use crate::orchestrator::Orchestrator;
use anyhow::Result;
use serde_json::{Value, json};
use std::io::{self, BufRead, Write};

const TOOL_NAME: &str = "code_lint";

const TOOL_DESCRIPTION: &str = "Run golangci-lint on a Go project. By default only changed files are linted; the change range is detected automatically (unpushed commits, branch divergence point or working tree changes). Set checkOnlyChanges=false to lint the packages of the given files.";

pub fn serve(orchestrator: &Orchestrator) -> Result<()> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    serve_io(orchestrator, stdin.lock(), stdout.lock())
}

/// Newline-delimited JSON-RPC loop over arbitrary streams.
pub fn serve_io<R: BufRead, W: Write>(orchestrator: &Orchestrator, input: R, mut output: W) -> Result<()> {
    for line in input.lines() {
        let line = match line {
            Ok(value) => value,
            Err(err) => {
                tracing::error!("stdin error: {err}");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Value>(&line) {
            Ok(value) => handle_message(value, orchestrator),
            Err(err) => Some(jsonrpc_error(
                Value::Null,
                -32700,
                &format!("parse error: {err}"),
            )),
        };

        if let Some(payload) = response {
            writeln!(output, "{}", serde_json::to_string(&payload)?)?;
            output.flush()?;
        }
    }

    Ok(())
}

fn handle_message(message: Value, orchestrator: &Orchestrator) -> Option<Value> {
    let id = message.get("id").cloned();
    let method = message.get("method").and_then(|value| value.as_str());

    let Some(method) = method else {
        return id.map(|id| jsonrpc_error(id, -32600, "invalid request"));
    };
    tracing::debug!(method, "mcp message");

    match method {
        "initialize" => {
            let id = id?;
            Some(jsonrpc_result(id, initialize_result(&message)))
        }
        "notifications/initialized" => None,
        "ping" => id.map(|id| jsonrpc_result(id, json!({}))),
        "tools/list" => {
            let id = id?;
            Some(jsonrpc_result(id, json!({ "tools": [tool_spec()] })))
        }
        "tools/call" => {
            let id = id?;
            Some(handle_tool_call(id, &message, orchestrator))
        }
        "resources/list" => id.map(|id| jsonrpc_result(id, json!({ "resources": [] }))),
        "prompts/list" => id.map(|id| jsonrpc_result(id, json!({ "prompts": [] }))),
        _ => id.map(|id| jsonrpc_error(id, -32601, "method not found")),
    }
}

fn initialize_result(message: &Value) -> Value {
    let protocol = message
        .get("params")
        .and_then(|params| params.get("protocolVersion"))
        .cloned()
        .unwrap_or_else(|| Value::String("2024-11-05".to_string()));
    json!({
        "protocolVersion": protocol,
        "capabilities": { "tools": {} },
        "serverInfo": {
            "name": "lint-mcp",
            "version": env!("CARGO_PKG_VERSION"),
        },
        "instructions": format!(
            "Use the {TOOL_NAME} tool to lint Go code with golangci-lint. \
Always pass projectPath (absolute path of the project root, preferred) or files (absolute paths of files inside the project). \
checkOnlyChanges defaults to true and lints only changed files; set it to false to lint the packages containing files, \
optionally limited to issues introduced after newFromRev. \
Configuration and environment problems are reported as an issue with FromLinter \"lint-mcp\" and Pos.Filename \"system\"."
        ),
    })
}

fn tool_spec() -> Value {
    json!({
        "name": TOOL_NAME,
        "description": TOOL_DESCRIPTION,
        "inputSchema": input_schema(),
    })
}

fn input_schema() -> Value {
    let schema = schemars::schema_for!(LintRequest);
    let mut raw = serde_json::to_value(schema).unwrap_or_else(|_| json!({ "type": "object" }));
    if let Some(object) = raw.as_object_mut() {
        object.remove("$schema");
    }
    raw
}

fn handle_tool_call(id: Value, message: &Value, orchestrator: &Orchestrator) -> Value {
    let params = match message.get("params") {
        Some(value) => value,
        None => return jsonrpc_error(id, -32602, "missing params"),
    };
    let tool_name = params
        .get("name")
        .and_then(|value| value.as_str())
        .unwrap_or("");
    if tool_name != TOOL_NAME {
        return jsonrpc_error(id, -32601, "unknown tool");
    }

    let result = orchestrator.handle_value(params.get("arguments"));
    jsonrpc_result(id, call_result(&result))
}

fn call_result(result: &LintResult) -> Value {
    let structured = match serde_json::to_value(result) {
        Ok(value) => value,
        Err(err) => {
            tracing::error!("cannot serialize lint result: {err}");
            json!({ "Issues": [] })
        }
    };
    json!({
        "content": [{ "type": "text", "text": structured.to_string() }],
        "structuredContent": structured,
        "isError": false
    })
}

fn jsonrpc_result(id: Value, result: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result
    })
}

fn jsonrpc_error(id: Value, code: i64, message: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {
            "code": code,
            "message": message
        }
    })
}
