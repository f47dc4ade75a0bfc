mod document;
mod normalize;
mod source;

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use cb_core::{ChatBrainError, Intent, ScriptPack};
use tracing::{debug, info, instrument};

pub use document::ScriptDocument;
pub use source::{is_script_document, read_documents_from_dir, resolve_scripts_dir};

/// Loads every script document directly inside `folder`.
///
/// The whole load fails on the first bad document; nothing is partially
/// applied.
#[instrument(skip_all, fields(folder = %folder.as_ref().display()))]
pub fn load_from_folder(folder: impl AsRef<Path>) -> Result<ScriptPack, ChatBrainError> {
    let root = resolve_scripts_dir(folder.as_ref())?;
    let documents = read_documents_from_dir(&root)?;
    let pack = load_from_documents(&documents)?;
    info!(intents = pack.len(), documents = documents.len(), "script folder loaded");
    Ok(pack)
}

/// Builds a pack from in-memory documents keyed by file name; keys are
/// processed in sorted order.
pub fn load_from_documents(
    documents: &BTreeMap<String, String>,
) -> Result<ScriptPack, ChatBrainError> {
    let mut intents: Vec<Intent> = Vec::new();
    let mut owners: HashMap<String, String> = HashMap::new();

    for (file_name, text) in documents {
        let document = ScriptDocument::parse(file_name, text)?;
        let entries = document.into_entries();
        debug!(file = %file_name, entries = entries.len(), "parsed script document");

        for entry in &entries {
            let intent = normalize::normalize_intent(entry, file_name)?;
            if let Some(first) = owners.get(&intent.id) {
                return Err(ChatBrainError::load_in(
                    "LOAD_DUPLICATE_INTENT",
                    format!(
                        "Duplicate intent id \"{}\" (first declared in {}).",
                        intent.id, first
                    ),
                    file_name.clone(),
                ));
            }
            owners.insert(intent.id.clone(), file_name.clone());
            intents.push(intent);
        }
    }

    if intents.is_empty() {
        return Err(ChatBrainError::load(
            "LOAD_NO_INTENTS",
            "No intent was loaded from the script documents.",
        ));
    }

    ScriptPack::new(intents)
}
