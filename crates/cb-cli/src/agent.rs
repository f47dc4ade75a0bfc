use std::io::Write;

use cb_api::{ChatBrain, LoadSummary};
use cb_core::ChatBrainError;
use serde::Serialize;

use crate::{
    map_cli_io, map_cli_json, AgentArgs, AgentCommand, EngineArgs, IntentSummary, IntentsArgs,
    RankArgs, ReplayArgs, ValidateArgs,
};

/// Runs one agent command. Output is buffered so a failure part-way through
/// never leaves a `RESULT:OK` line behind.
pub(crate) fn run_agent(args: AgentArgs, out: &mut dyn Write) -> Result<i32, ChatBrainError> {
    let mut buffer = Vec::new();
    let code = match args.command {
        AgentCommand::Validate(args) => run_validate(args, &mut buffer)?,
        AgentCommand::Intents(args) => run_intents(args, &mut buffer)?,
        AgentCommand::Rank(args) => run_rank(args, &mut buffer)?,
        AgentCommand::Replay(args) => run_replay(args, &mut buffer)?,
    };
    out.write_all(&buffer).map_err(map_cli_io)?;
    out.flush().map_err(map_cli_io)?;
    Ok(code)
}

pub(crate) fn load_engine(args: &EngineArgs) -> Result<(ChatBrain, LoadSummary), ChatBrainError> {
    let mut engine = ChatBrain::new(args.options());
    let summary = engine.load_scripts(&args.scripts_dir)?;
    Ok((engine, summary))
}

fn run_validate(args: ValidateArgs, out: &mut dyn Write) -> Result<i32, ChatBrainError> {
    let (_, summary) = load_engine(&args.engine)?;
    emit_line(out, "RESULT:OK")?;
    emit_line(out, &format!("INTENTS:{}", summary.intents_count))?;
    emit_json(out, "FOLDER_JSON", &summary.folder)?;
    Ok(0)
}

fn run_intents(args: IntentsArgs, out: &mut dyn Write) -> Result<i32, ChatBrainError> {
    let (engine, _) = load_engine(&args.engine)?;
    let intents = engine.list_intents(args.domain.as_deref());
    emit_line(out, "RESULT:OK")?;
    emit_line(out, &format!("INTENTS:{}", intents.len()))?;
    for intent in intents {
        emit_json(out, "INTENT_JSON", &IntentSummary::from(intent))?;
    }
    Ok(0)
}

fn run_rank(args: RankArgs, out: &mut dyn Write) -> Result<i32, ChatBrainError> {
    let (engine, _) = load_engine(&args.engine)?;
    let candidates = engine.rank(&args.text)?;
    emit_line(out, "RESULT:OK")?;
    for candidate in &candidates {
        emit_json(out, "CANDIDATE_JSON", candidate)?;
    }
    Ok(0)
}

fn run_replay(args: ReplayArgs, out: &mut dyn Write) -> Result<i32, ChatBrainError> {
    let (mut engine, _) = load_engine(&args.engine)?;
    emit_line(out, "RESULT:OK")?;
    for (index, message) in args.messages.iter().enumerate() {
        let response = engine.handle_message(&args.session, message)?;
        emit_line(out, &format!("TURN:{}", index + 1))?;
        emit_json(out, "REPLY_JSON", &response.reply)?;
        for button in &response.ui.buttons {
            emit_json(out, "BUTTON_JSON", button)?;
        }
        for media in &response.ui.media {
            emit_json(out, "MEDIA_JSON", media)?;
        }
        let chosen = response
            .debug
            .chosen
            .as_ref()
            .map_or("NONE", |candidate| candidate.intent_id.as_str());
        emit_line(out, &format!("CHOSEN:{}", chosen))?;
        emit_line(out, &format!("STACK_DEPTH:{}", response.debug.stack_depth))?;
    }

    let state = engine.context_state(&args.session);
    emit_line(
        out,
        &format!(
            "PENDING_RESUME:{}",
            state.pending_resume.as_deref().unwrap_or("NONE")
        ),
    )?;
    Ok(0)
}

fn emit_line(out: &mut dyn Write, line: &str) -> Result<(), ChatBrainError> {
    writeln!(out, "{}", line).map_err(map_cli_io)
}

fn emit_json(out: &mut dyn Write, prefix: &str, value: &impl Serialize) -> Result<(), ChatBrainError> {
    let json = serde_json::to_string(value).map_err(map_cli_json)?;
    writeln!(out, "{}:{}", prefix, json).map_err(map_cli_io)
}
