mod case;
mod runner;
mod source;

pub use case::{CaseOptions, TestCase, TestTurn, TurnExpect, NONE_MARKER, TESTCASE_SCHEMA_V1};
pub use runner::{assert_case, run_case, RunReport};
pub use source::{discover_cases, read_test_case, TESTCASE_FILE_NAME};

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CbToolError {
    #[error("Failed to read file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse testcase {path}: {source}")]
    ParseCase {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Invalid testcase schema version \"{found}\", expected \"{expected}\".")]
    InvalidSchemaVersion { expected: String, found: String },
    #[error("No {file_name} found under {path}.")]
    NoCases { path: PathBuf, file_name: String },
    #[error("Engine error: {0}")]
    Engine(#[from] cb_core::ChatBrainError),
    #[error("Turn {turn_index}: expected {field} {expected}, actual {actual}")]
    ExpectationMismatch {
        turn_index: usize,
        field: String,
        expected: String,
        actual: String,
    },
    #[error("Turn {turn_index}: reload expected {expected}, got {actual}")]
    ReloadOutcome {
        turn_index: usize,
        expected: String,
        actual: String,
    },
}
