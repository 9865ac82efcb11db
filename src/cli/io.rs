//! JSON I/O for the CLI
//!
//! - Input: one JSON request per stdin line, blank lines ignored
//! - Output: one JSON response per stdout line
//! - UTF-8 only

use std::io::{self, BufRead, Write};

use serde_json::{json, Value};

use super::errors::CliResult;

/// Non-blank request lines from `input`.
pub fn read_lines<R: BufRead>(input: R) -> impl Iterator<Item = io::Result<String>> {
    input.lines().filter(|line| match line {
        Ok(l) => !l.trim().is_empty(),
        Err(_) => true,
    })
}

/// Writes `{"status":"ok","data":...}`.
pub fn write_response<W: Write>(out: &mut W, data: Value) -> CliResult<()> {
    write_line(out, &json!({ "status": "ok", "data": data }))
}

/// Writes `{"status":"error","code":...,"message":...}`.
pub fn write_error<W: Write>(out: &mut W, code: &str, message: &str) -> CliResult<()> {
    write_line(
        out,
        &json!({ "status": "error", "code": code, "message": message }),
    )
}

fn write_line<W: Write>(out: &mut W, value: &Value) -> CliResult<()> {
    serde_json::to_writer(&mut *out, value)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}
