use std::ffi::OsString;
use std::io::{self, Write};

use cb_core::ChatBrainError;
use clap::Parser;

mod agent;
mod cli_args;
mod error_map;
mod line_chat;
mod logging;
mod models;

pub(crate) use agent::load_engine;
pub(crate) use cli_args::{
    AgentArgs, AgentCommand, ChatArgs, Cli, EngineArgs, IntentsArgs, Mode, RankArgs, ReplayArgs,
    ValidateArgs,
};
pub(crate) use error_map::{emit_error, map_cli_io, map_cli_json};
pub(crate) use models::{ChatCommandAction, IntentSummary};
pub use logging::init_tracing;

pub fn run_cli_from_args<I, T>(args: I) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => {
            let _ = error.print();
            return error.exit_code();
        }
    };
    let stdout = io::stdout();
    let mut out = stdout.lock();
    run_cli(cli, &mut out)
}

pub(crate) fn run_cli(cli: Cli, out: &mut dyn Write) -> i32 {
    match run(cli, out) {
        Ok(code) => code,
        Err(error) => emit_error(error, out),
    }
}

fn run(cli: Cli, out: &mut dyn Write) -> Result<i32, ChatBrainError> {
    match cli.command {
        Mode::Chat(args) => line_chat::run_chat(args, out),
        Mode::Agent(args) => agent::run_agent(args, out),
    }
}

#[cfg(test)]
mod tests;
