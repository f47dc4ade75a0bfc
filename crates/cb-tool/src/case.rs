use cb_api::{ChatBrainOptions, OverflowPolicy};
use serde::{Deserialize, Serialize};

pub const TESTCASE_SCHEMA_V1: &str = "cb-tool-case.v1";
/// Expectation value meaning "no chosen intent" or "no pending resume".
pub const NONE_MARKER: &str = "NONE";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    pub schema_version: String,
    #[serde(default = "default_session_id")]
    pub session_id: String,
    #[serde(default = "default_scripts_dir")]
    pub scripts_dir: String,
    #[serde(default)]
    pub options: CaseOptions,
    #[serde(default)]
    pub turns: Vec<TestTurn>,
}

fn default_session_id() -> String {
    "cb-tool".to_string()
}

fn default_scripts_dir() -> String {
    ".".to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseOptions {
    #[serde(default)]
    pub max_depth: Option<usize>,
    #[serde(default)]
    pub conf_threshold: Option<f64>,
    #[serde(default)]
    pub use_embedding: Option<bool>,
    #[serde(default)]
    pub reject_when_full: bool,
}

impl CaseOptions {
    pub fn engine_options(&self) -> ChatBrainOptions {
        ChatBrainOptions {
            max_depth: self.max_depth,
            confidence_threshold: self.conf_threshold,
            use_embedding: self.use_embedding,
            overflow_policy: self
                .reject_when_full
                .then_some(OverflowPolicy::RejectNewest),
            ..ChatBrainOptions::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TestTurn {
    Message {
        text: String,
        #[serde(default)]
        expect: TurnExpect,
    },
    Reload {
        #[serde(rename = "scriptsDir")]
        scripts_dir: String,
        #[serde(default, rename = "expectError")]
        expect_error: Option<String>,
    },
    Clear,
}

impl TestTurn {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Message { .. } => "message",
            Self::Reload { .. } => "reload",
            Self::Clear => "clear",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnExpect {
    #[serde(default)]
    pub reply: Option<String>,
    #[serde(default)]
    pub reply_contains: Option<String>,
    #[serde(default)]
    pub buttons: Option<Vec<String>>,
    #[serde(default)]
    pub stack_depth: Option<usize>,
    #[serde(default)]
    pub chosen: Option<String>,
    #[serde(default)]
    pub pending_resume: Option<String>,
}
