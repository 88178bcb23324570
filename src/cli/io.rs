//! JSON I/O handling for CLI
//!
//! - Input: one JSON document, from a file or stdin
//! - Output: one JSON object per command on stdout

use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use serde_json::{json, Value};

use super::errors::{CliError, CliResult};

/// Read the input document from `path`, or stdin when no path is given
pub fn read_document(path: Option<&Path>) -> CliResult<Value> {
    let content = match path {
        Some(path) => fs::read_to_string(path).map_err(|e| {
            CliError::io_error(format!("Failed to read '{}': {}", path.display(), e))
        })?,
        None => {
            let mut buf = String::new();
            io::stdin().lock().read_to_string(&mut buf)?;
            buf
        }
    };
    parse_document(&content)
}

/// Parse a document, rejecting empty input
pub fn parse_document(content: &str) -> CliResult<Value> {
    if content.trim().is_empty() {
        return Err(CliError::input_error("Empty input"));
    }
    Ok(serde_json::from_str(content)?)
}

/// Write a success response
pub fn write_response<W: Write>(out: &mut W, data: Value) -> CliResult<()> {
    let response = json!({
        "status": "ok",
        "data": data
    });
    write_line(out, &response)
}

/// Write an error response, with violations when the error carries any
pub fn write_error<W: Write>(out: &mut W, err: &CliError) -> CliResult<()> {
    let mut response = json!({
        "status": "error",
        "code": err.code_str(),
        "message": err.message()
    });
    if !err.violations().is_empty() {
        let violations: Vec<Value> = err
            .violations()
            .iter()
            .map(|v| {
                json!({
                    "path": v.path,
                    "kind": v.kind.code(),
                    "message": v.message
                })
            })
            .collect();
        response["violations"] = Value::Array(violations);
    }
    write_line(out, &response)
}

fn write_line<W: Write>(out: &mut W, value: &Value) -> CliResult<()> {
    serde_json::to_writer(&mut *out, value)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}
