use std::io::{self, BufRead, Write};

use cb_api::{ChatBrain, MessageResponse};
use cb_core::buttons::{BUTTON_BACK, BUTTON_CANCEL, BUTTON_DONE};
use cb_core::ChatBrainError;

use crate::{load_engine, map_cli_io, map_cli_json, ChatArgs, ChatCommandAction};

const HELP: &str =
    "commands: :help :state :intents [domain] :reload [dir] :clear :quit | /done /back /cancel /btn LABEL";

pub(crate) struct ChatContext {
    pub(crate) session: String,
    pub(crate) folder: String,
}

pub(crate) fn run_chat(args: ChatArgs, out: &mut dyn Write) -> Result<i32, ChatBrainError> {
    let (mut engine, summary) = load_engine(&args.engine)?;
    let mut context = ChatContext {
        session: args.session,
        folder: summary.folder,
    };
    let stdin = io::stdin();
    let mut reader = stdin.lock();
    run_chat_with_io(&mut engine, &mut context, &mut reader, out)
}

pub(crate) fn run_chat_with_io(
    engine: &mut ChatBrain,
    context: &mut ChatContext,
    reader: &mut dyn BufRead,
    writer: &mut dyn Write,
) -> Result<i32, ChatBrainError> {
    writeln!(
        writer,
        "ChatBrain chat ({} intents, session {})",
        engine.list_intents(None).len(),
        context.session
    )
    .map_err(map_cli_io)?;
    writeln!(writer, "{}", HELP).map_err(map_cli_io)?;

    loop {
        let Some(raw) = prompt_input_from("> ", reader, writer)? else {
            writeln!(writer).map_err(map_cli_io)?;
            return Ok(0);
        };
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }

        let mut lines = Vec::new();
        let action =
            handle_chat_command(raw, context, engine, &mut |line: String| lines.push(line))?;
        for line in lines {
            writeln!(writer, "{}", line).map_err(map_cli_io)?;
        }
        match action {
            ChatCommandAction::Continue => continue,
            ChatCommandAction::Quit => return Ok(0),
            ChatCommandAction::NotHandled => {}
        }

        let response = engine.handle_message(&context.session, &expand_shortcut(raw))?;
        render_response(&response, writer)?;
    }
}

pub(crate) fn handle_chat_command(
    raw: &str,
    context: &mut ChatContext,
    engine: &mut ChatBrain,
    emit: &mut dyn FnMut(String),
) -> Result<ChatCommandAction, ChatBrainError> {
    if !raw.starts_with(':') {
        return Ok(ChatCommandAction::NotHandled);
    }
    let (command, argument) = match raw.split_once(char::is_whitespace) {
        Some((command, argument)) => (command, Some(argument.trim()).filter(|arg| !arg.is_empty())),
        None => (raw, None),
    };

    match command {
        ":help" => emit(HELP.to_string()),
        ":state" => {
            let state = engine.context_state(&context.session);
            emit(serde_json::to_string_pretty(&state).map_err(map_cli_json)?);
        }
        ":intents" => {
            for intent in engine.list_intents(argument) {
                emit(format!(
                    "{} [{}] v{} ({} steps)",
                    intent.id,
                    intent.domain,
                    intent.version,
                    intent.steps.len()
                ));
            }
        }
        ":reload" => {
            let folder = argument.unwrap_or(context.folder.as_str()).to_string();
            match engine.load_scripts(&folder) {
                Ok(summary) => {
                    emit(format!(
                        "reloaded: {} intents from {}",
                        summary.intents_count, summary.folder
                    ));
                    context.folder = summary.folder;
                }
                Err(error) => emit(format!("reload failed, previous scripts kept: {}", error)),
            }
        }
        ":clear" => {
            engine.clear_context(&context.session);
            emit("cleared".to_string());
        }
        ":quit" => {
            emit("bye".to_string());
            return Ok(ChatCommandAction::Quit);
        }
        other => emit(format!("unknown command: {}", other)),
    }
    Ok(ChatCommandAction::Continue)
}

/// Maps slash shortcuts onto button labels; anything else is sent as typed.
pub(crate) fn expand_shortcut(raw: &str) -> String {
    match raw {
        "/done" => BUTTON_DONE.to_string(),
        "/back" => BUTTON_BACK.to_string(),
        "/cancel" => BUTTON_CANCEL.to_string(),
        _ => match raw.strip_prefix("/btn ") {
            Some(label) => label.trim().to_string(),
            None => raw.to_string(),
        },
    }
}

fn render_response(response: &MessageResponse, writer: &mut dyn Write) -> Result<(), ChatBrainError> {
    writeln!(writer, "{}", response.reply).map_err(map_cli_io)?;
    if !response.ui.buttons.is_empty() {
        let buttons = response
            .ui
            .buttons
            .iter()
            .map(|label| format!("[{}]", label))
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(writer, "  {}", buttons).map_err(map_cli_io)?;
    }
    for media in &response.ui.media {
        writeln!(writer, "  ({}) {}", media.kind, media.url).map_err(map_cli_io)?;
    }
    Ok(())
}

/// Reads one line; `None` at end of input.
pub(crate) fn prompt_input_from(
    prefix: &str,
    reader: &mut dyn BufRead,
    writer: &mut dyn Write,
) -> Result<Option<String>, ChatBrainError> {
    write!(writer, "{}", prefix).map_err(map_cli_io)?;
    writer.flush().map_err(map_cli_io)?;
    let mut input = String::new();
    if reader.read_line(&mut input).map_err(map_cli_io)? == 0 {
        return Ok(None);
    }
    Ok(Some(input.trim_end_matches(&['\r', '\n'][..]).to_string()))
}
