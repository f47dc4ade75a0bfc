use cb_api::{ChatBrainOptions, OverflowPolicy};
use clap::builder::BoolishValueParser;
use clap::{ArgAction, Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "cb-cli")]
#[command(about = "ChatBrain scripted dialogue CLI")]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Mode,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Mode {
    Chat(ChatArgs),
    Agent(AgentArgs),
}

#[derive(Debug, Clone, Args)]
pub(crate) struct EngineArgs {
    #[arg(long = "scripts-dir", env = "CHATBRAIN_DEFAULT_SCRIPTS")]
    pub(crate) scripts_dir: String,
    #[arg(long = "max-depth", env = "MAX_DEPTH", default_value_t = 2)]
    pub(crate) max_depth: usize,
    #[arg(long = "conf-threshold", env = "CONF_THRESHOLD", default_value_t = 0.55)]
    pub(crate) conf_threshold: f64,
    /// Accepts 1/0, yes/no, true/false, on/off; bare flag means true.
    #[arg(
        long = "use-embedding",
        env = "USE_EMBEDDING",
        action = ArgAction::Set,
        num_args = 0..=1,
        default_value_t = false,
        default_missing_value = "true",
        value_parser = BoolishValueParser::new()
    )]
    pub(crate) use_embedding: bool,
    #[arg(long = "reject-when-full")]
    pub(crate) reject_when_full: bool,
    #[arg(long = "top-k", default_value_t = 3)]
    pub(crate) top_k: usize,
}

impl EngineArgs {
    pub(crate) fn options(&self) -> ChatBrainOptions {
        ChatBrainOptions {
            max_depth: Some(self.max_depth),
            confidence_threshold: Some(self.conf_threshold),
            use_embedding: Some(self.use_embedding),
            overflow_policy: Some(if self.reject_when_full {
                OverflowPolicy::RejectNewest
            } else {
                OverflowPolicy::EvictOldest
            }),
            top_k: Some(self.top_k),
            ..ChatBrainOptions::default()
        }
    }
}

#[derive(Debug, Args)]
pub(crate) struct ChatArgs {
    #[command(flatten)]
    pub(crate) engine: EngineArgs,
    #[arg(long = "session", default_value = "cli")]
    pub(crate) session: String,
}

#[derive(Debug, Args)]
pub(crate) struct AgentArgs {
    #[command(subcommand)]
    pub(crate) command: AgentCommand,
}

#[derive(Debug, Subcommand)]
pub(crate) enum AgentCommand {
    Validate(ValidateArgs),
    Intents(IntentsArgs),
    Rank(RankArgs),
    Replay(ReplayArgs),
}

#[derive(Debug, Args)]
pub(crate) struct ValidateArgs {
    #[command(flatten)]
    pub(crate) engine: EngineArgs,
}

#[derive(Debug, Args)]
pub(crate) struct IntentsArgs {
    #[command(flatten)]
    pub(crate) engine: EngineArgs,
    #[arg(long = "domain")]
    pub(crate) domain: Option<String>,
}

#[derive(Debug, Args)]
pub(crate) struct RankArgs {
    #[command(flatten)]
    pub(crate) engine: EngineArgs,
    #[arg(long = "text")]
    pub(crate) text: String,
}

#[derive(Debug, Args)]
pub(crate) struct ReplayArgs {
    #[command(flatten)]
    pub(crate) engine: EngineArgs,
    #[arg(long = "session", default_value = "agent")]
    pub(crate) session: String,
    #[arg(long = "message", required = true)]
    pub(crate) messages: Vec<String>,
}
