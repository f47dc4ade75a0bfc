use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Folder, document or procedure rejected while loading a script set.
    Load,
    /// Ranking asked for before any script set was loaded.
    RankingNotBuilt,
    /// A stack frame points at a procedure that is gone after a reload.
    MissingProcedure,
    Hook,
    /// Sentence model failed to load or to embed a text.
    Embedding,
    Io,
}

#[derive(Debug, Error, Clone)]
#[error("{code}: {message}")]
pub struct ChatBrainError {
    pub kind: ErrorKind,
    pub code: String,
    pub message: String,
    pub source_file: Option<String>,
}

impl ChatBrainError {
    pub fn new(kind: ErrorKind, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: code.into(),
            message: message.into(),
            source_file: None,
        }
    }

    pub fn load(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Load, code, message)
    }

    pub fn load_in(
        code: impl Into<String>,
        message: impl Into<String>,
        source_file: impl Into<String>,
    ) -> Self {
        Self::load(code, message).with_source_file(source_file)
    }

    pub fn ranking_not_built() -> Self {
        Self::new(
            ErrorKind::RankingNotBuilt,
            "NLU_NOT_BUILT",
            "Ranking index has not been built; load a script folder first.",
        )
    }

    pub fn missing_procedure(intent_id: &str) -> Self {
        Self::new(
            ErrorKind::MissingProcedure,
            "ENGINE_INTENT_MISSING",
            format!("Intent \"{}\" is not in the loaded script set.", intent_id),
        )
    }

    pub fn embedding(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Embedding, "NLU_EMBEDDING", message)
    }

    pub fn with_source_file(mut self, source_file: impl Into<String>) -> Self {
        self.source_file = Some(source_file.into());
        self
    }

    pub fn is_load(&self) -> bool {
        self.kind == ErrorKind::Load
    }
}
