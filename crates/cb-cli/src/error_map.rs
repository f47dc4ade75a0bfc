use std::fmt::Display;
use std::io::Write;

use cb_core::{ChatBrainError, ErrorKind};

fn map_error(code: &'static str, error: impl Display) -> ChatBrainError {
    ChatBrainError::new(ErrorKind::Io, code, error.to_string())
}

pub(crate) fn emit_error(error: ChatBrainError, out: &mut dyn Write) -> i32 {
    let _ = writeln!(out, "RESULT:ERROR");
    let _ = writeln!(out, "ERROR_CODE:{}", error.code);
    let _ = writeln!(
        out,
        "ERROR_MSG_JSON:{}",
        serde_json::to_string(&error.message).expect("string json")
    );
    if let Some(file) = &error.source_file {
        let _ = writeln!(
            out,
            "ERROR_FILE_JSON:{}",
            serde_json::to_string(file).expect("string json")
        );
    }
    1
}

pub(crate) fn map_cli_io(error: std::io::Error) -> ChatBrainError {
    map_error("CLI_IO", error)
}

pub(crate) fn map_cli_json(error: serde_json::Error) -> ChatBrainError {
    map_error("CLI_JSON", error)
}
