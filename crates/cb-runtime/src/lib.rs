mod context;
mod executor;
mod hooks;

pub use context::{ContextManager, OverflowPolicy, PushOutcome, DEFAULT_MAX_DEPTH};
pub use executor::Executor;
pub use hooks::{Hook, HookBindings, HookContext, HookRegistry, LogStepHook, NoopHook};
