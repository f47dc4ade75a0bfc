use cb_core::ChatBrainError;
use serde_yaml::{Mapping, Value};

/// Accepted shapes of one script document.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptDocument {
    /// `intents: [...]`
    Bundle(Vec<Mapping>),
    /// A single intent mapping with top-level `id` and `steps`.
    Single(Mapping),
    /// Blank file.
    Empty,
}

impl ScriptDocument {
    pub fn parse(file_name: &str, text: &str) -> Result<Self, ChatBrainError> {
        let value: Value = serde_yaml::from_str(text).map_err(|error| {
            ChatBrainError::load_in(
                "LOAD_YAML",
                format!("YAML syntax error in {}: {}", file_name, error),
                file_name,
            )
        })?;
        Self::from_value(file_name, value)
    }

    pub fn from_value(file_name: &str, value: Value) -> Result<Self, ChatBrainError> {
        let root = match value {
            Value::Null => return Ok(Self::Empty),
            Value::Mapping(root) => root,
            _ => return Err(invalid_intents(file_name)),
        };

        if let Some(entries) = root.get("intents") {
            let Value::Sequence(entries) = entries else {
                return Err(invalid_intents(file_name));
            };
            let mut mappings = Vec::with_capacity(entries.len());
            for entry in entries {
                match entry {
                    Value::Mapping(mapping) => mappings.push(mapping.clone()),
                    _ => {
                        return Err(ChatBrainError::load_in(
                            "LOAD_INTENT_INVALID",
                            format!("Intent entries in {} must be mappings.", file_name),
                            file_name,
                        ))
                    }
                }
            }
            return Ok(Self::Bundle(mappings));
        }

        if root.contains_key("id") && root.contains_key("steps") {
            return Ok(Self::Single(root));
        }

        Err(invalid_intents(file_name))
    }

    pub fn into_entries(self) -> Vec<Mapping> {
        match self {
            Self::Bundle(entries) => entries,
            Self::Single(entry) => vec![entry],
            Self::Empty => Vec::new(),
        }
    }
}

fn invalid_intents(file_name: &str) -> ChatBrainError {
    ChatBrainError::load_in(
        "LOAD_INTENTS_INVALID",
        format!("{} must declare an `intents` list.", file_name),
        file_name,
    )
}
