use cb_core::{ChatBrainError, Intent, MediaItem, Step, StepUi};
use serde_yaml::{Mapping, Value};

pub(crate) fn normalize_intent(entry: &Mapping, file_name: &str) -> Result<Intent, ChatBrainError> {
    let id = required_scalar(entry, "id", file_name, "intent")?;
    let context = format!("intent \"{}\"", id);
    let domain = required_scalar(entry, "domain", file_name, &context)?;
    let version = match entry.get("version") {
        Some(Value::Number(number)) => number.as_i64(),
        _ => None,
    }
    .ok_or_else(|| {
        invalid_intent(
            file_name,
            format!("{} needs an integer `version`.", context),
        )
    })?;
    let can_interrupt = match entry.get("can_interrupt") {
        None | Some(Value::Null) => false,
        Some(Value::Bool(flag)) => *flag,
        Some(_) => {
            return Err(invalid_intent(
                file_name,
                format!("{} has a non-boolean `can_interrupt`.", context),
            ))
        }
    };

    let intent = Intent {
        synonyms: string_list(entry, "synonyms", file_name, &context)?,
        examples: string_list(entry, "examples", file_name, &context)?,
        required_slots: string_list(entry, "required_slots", file_name, &context)?,
        steps: normalize_steps(entry.get("steps"), file_name, &id)?,
        source_file: Some(file_name.to_string()),
        id,
        domain,
        version,
        can_interrupt,
    };
    intent
        .validate()
        .map_err(|error| error.with_source_file(file_name))?;
    Ok(intent)
}

fn normalize_steps(
    raw_steps: Option<&Value>,
    file_name: &str,
    intent_id: &str,
) -> Result<Vec<Step>, ChatBrainError> {
    let Some(Value::Sequence(raw_steps)) = raw_steps else {
        return Err(ChatBrainError::load_in(
            "LOAD_STEPS_INVALID",
            format!("Intent \"{}\" in {} lacks a steps list.", intent_id, file_name),
            file_name,
        ));
    };

    let mut steps = Vec::with_capacity(raw_steps.len());
    for (index, item) in raw_steps.iter().enumerate() {
        let Value::Mapping(item) = item else {
            return Err(invalid_step(
                file_name,
                format!(
                    "Step #{} of intent \"{}\" must be a mapping.",
                    index + 1,
                    intent_id
                ),
            ));
        };
        let context = format!("step #{} of intent \"{}\"", index + 1, intent_id);
        let id = scalar_text(item.get("id"))
            .map_err(|_| invalid_step(file_name, format!("{} has a non-scalar id.", context)))?
            .ok_or_else(|| invalid_step(file_name, format!("{} is missing an id.", context)))?;
        let say = scalar_text(item.get("say"))
            .map_err(|_| invalid_step(file_name, format!("{} has a non-scalar say.", context)))?
            .ok_or_else(|| {
                invalid_step(
                    file_name,
                    format!(
                        "Step \"{}\" of intent \"{}\" in {} has no `say` text.",
                        id, intent_id, file_name
                    ),
                )
            })?;

        steps.push(Step {
            ui: normalize_ui(item.get("ui"), file_name, &id)?,
            before_hook: hook_name(item, "before_hook", file_name, &context)?,
            action: hook_name(item, "action", file_name, &context)?,
            after_hook: hook_name(item, "after_hook", file_name, &context)?,
            id,
            say,
        });
    }
    Ok(steps)
}

fn normalize_ui(raw_ui: Option<&Value>, file_name: &str, step_id: &str) -> Result<StepUi, ChatBrainError> {
    let raw_ui = match raw_ui {
        None | Some(Value::Null) => return Ok(StepUi::default()),
        Some(Value::Mapping(raw_ui)) => raw_ui,
        Some(_) => {
            return Err(ChatBrainError::load_in(
                "LOAD_UI_INVALID",
                format!("UI of step \"{}\" in {} must be a mapping.", step_id, file_name),
                file_name,
            ))
        }
    };

    let buttons = match raw_ui.get("buttons") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Sequence(items)) => items.iter().map(display_text).collect(),
        Some(other) => vec![display_text(other)],
    };

    Ok(StepUi {
        buttons,
        media: normalize_media(raw_ui.get("media"), file_name, step_id)?,
    })
}

fn normalize_media(
    raw_media: Option<&Value>,
    file_name: &str,
    step_id: &str,
) -> Result<Vec<MediaItem>, ChatBrainError> {
    let items = match raw_media {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Sequence(items)) => items,
        Some(_) => {
            return Err(invalid_media(
                file_name,
                format!("UI.media of step \"{}\" must be a list.", step_id),
            ))
        }
    };

    let mut media = Vec::with_capacity(items.len());
    for (index, entry) in items.iter().enumerate() {
        let Value::Mapping(entry) = entry else {
            return Err(invalid_media(
                file_name,
                format!("Media item #{} of step \"{}\" must be a mapping.", index + 1, step_id),
            ));
        };
        let url = match entry.get("url") {
            Some(Value::String(url)) if !url.trim().is_empty() => url.trim().to_string(),
            _ => {
                return Err(invalid_media(
                    file_name,
                    format!("Media item #{} of step \"{}\" lacks a url.", index + 1, step_id),
                ))
            }
        };
        let kind = match entry.get("type") {
            None | Some(Value::Null) => "image".to_string(),
            Some(value) => {
                let kind = display_text(value);
                if kind.is_empty() {
                    "image".to_string()
                } else {
                    kind
                }
            }
        };
        let alt = match entry.get("alt") {
            None | Some(Value::Null) => None,
            Some(value) => Some(display_text(value)),
        };
        media.push(MediaItem { kind, url, alt });
    }
    Ok(media)
}

fn hook_name(
    item: &Mapping,
    key: &str,
    file_name: &str,
    context: &str,
) -> Result<Option<String>, ChatBrainError> {
    match item.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(name)) => {
            let name = name.trim();
            Ok((!name.is_empty()).then(|| name.to_string()))
        }
        Some(_) => Err(invalid_step(
            file_name,
            format!("{} has a non-string `{}`.", context, key),
        )),
    }
}

fn required_scalar(
    entry: &Mapping,
    key: &str,
    file_name: &str,
    context: &str,
) -> Result<String, ChatBrainError> {
    match scalar_text(entry.get(key)) {
        Ok(Some(text)) if !text.trim().is_empty() => Ok(text),
        _ => Err(invalid_intent(
            file_name,
            format!("{} needs a non-empty `{}`.", context, key),
        )),
    }
}

fn string_list(
    entry: &Mapping,
    key: &str,
    file_name: &str,
    context: &str,
) -> Result<Vec<String>, ChatBrainError> {
    match entry.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Sequence(items)) => Ok(items.iter().map(display_text).collect()),
        Some(_) => Err(invalid_intent(
            file_name,
            format!("{} has a non-list `{}`.", context, key),
        )),
    }
}

/// Scalar as text; `Err(())` for sequences and mappings.
fn scalar_text(value: Option<&Value>) -> Result<Option<String>, ()> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(text.clone())),
        Some(Value::Number(number)) => Ok(Some(number.to_string())),
        Some(Value::Bool(flag)) => Ok(Some(flag.to_string())),
        Some(Value::Tagged(tagged)) => scalar_text(Some(&tagged.value)),
        Some(Value::Sequence(_) | Value::Mapping(_)) => Err(()),
    }
}

fn display_text(value: &Value) -> String {
    match scalar_text(Some(value)) {
        Ok(Some(text)) => text,
        Ok(None) => String::new(),
        Err(()) => serde_yaml::to_string(value)
            .map(|text| text.trim().to_string())
            .unwrap_or_default(),
    }
}

fn invalid_intent(file_name: &str, message: String) -> ChatBrainError {
    ChatBrainError::load_in("LOAD_INTENT_INVALID", message, file_name)
}

fn invalid_step(file_name: &str, message: String) -> ChatBrainError {
    ChatBrainError::load_in("LOAD_STEP_INVALID", message, file_name)
}

fn invalid_media(file_name: &str, message: String) -> ChatBrainError {
    ChatBrainError::load_in("LOAD_MEDIA_INVALID", message, file_name)
}
