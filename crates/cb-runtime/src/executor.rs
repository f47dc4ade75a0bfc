use std::collections::HashMap;
use std::sync::Arc;

use cb_core::buttons::{BUTTON_BACK, BUTTON_CONTINUE, BUTTON_NO, BUTTON_RESTART};
use cb_core::messages::{
    paused_reminder, resume_prompt, ACKNOWLEDGED, AT_FIRST_STEP, LOST_CONTEXT, MORE_HELP,
    NOTHING_RUNNING, NOTHING_TO_CANCEL, NOTHING_TO_RESUME, NOTHING_TO_REWIND, NO_ACK,
    RESUME_DECLINED, STACK_FULL, TASK_CANCELLED, TASK_COMPLETED, VERSION_CHOOSE_BUTTON,
    VERSION_CONFLICT, VERSION_DATA_MISSING,
};
use cb_core::{Button, ChatBrainError, ContextFrame, Intent, Reply, ScriptPack};
use tracing::{debug, info, instrument, warn};

use crate::{ContextManager, HookBindings, PushOutcome};

/// Drives per-session procedure stacks: entering, advancing, rewinding and
/// cancelling procedures, plus the resume and version-conflict prompts.
#[derive(Debug)]
pub struct Executor {
    context: ContextManager,
    pack: Arc<ScriptPack>,
    hooks: HookBindings,
    version_prompts: HashMap<String, String>,
}

impl Default for Executor {
    fn default() -> Self {
        Self::new(ContextManager::default())
    }
}

impl Executor {
    pub fn new(context: ContextManager) -> Self {
        Self {
            context,
            pack: Arc::new(ScriptPack::default()),
            hooks: HookBindings::default(),
            version_prompts: HashMap::new(),
        }
    }

    /// Swaps in a freshly loaded pack. Session stacks are kept; frames whose
    /// procedure changed are caught by the version and missing-procedure checks.
    pub fn load_script_pack(&mut self, pack: Arc<ScriptPack>, hooks: HookBindings) {
        self.pack = pack;
        self.hooks = hooks;
    }

    pub fn script_pack(&self) -> &ScriptPack {
        &self.pack
    }

    pub fn context(&self) -> &ContextManager {
        &self.context
    }

    /// Procedure id awaiting a continue/restart answer for `session_id`.
    pub fn version_prompt(&self, session_id: &str) -> Option<&str> {
        self.version_prompts.get(session_id).map(String::as_str)
    }

    /// Drops the stack, the pending-resume marker and any version prompt.
    pub fn clear_session(&mut self, session_id: &str) {
        self.context.clear(session_id);
        self.version_prompts.remove(session_id);
    }

    /// Reply shown while a resume question is unanswered.
    pub fn paused_reply(&self, session_id: &str) -> Option<Reply> {
        self.context
            .pending_resume(session_id)
            .map(|intent_id| Reply::with_buttons(paused_reminder(intent_id), &[BUTTON_BACK, BUTTON_NO]))
    }

    pub fn version_conflict_reply() -> Reply {
        Reply::with_buttons(VERSION_CONFLICT, &[BUTTON_CONTINUE, BUTTON_RESTART])
    }

    #[instrument(skip(self))]
    pub fn execute_intent(
        &mut self,
        session_id: &str,
        intent_id: &str,
        interruption: bool,
    ) -> Result<Reply, ChatBrainError> {
        let pack = Arc::clone(&self.pack);
        let intent = pack
            .intent_by_id(intent_id)
            .ok_or_else(|| ChatBrainError::missing_procedure(intent_id))?;

        let reentry = !interruption
            && self
                .context
                .peek(session_id)
                .is_some_and(|frame| frame.intent_id == intent.id);
        if reentry {
            return Ok(self.render(session_id, intent, false));
        }

        match self
            .context
            .push(session_id, ContextFrame::enter(intent, interruption))
        {
            PushOutcome::Pushed => {}
            PushOutcome::Evicted(evicted) => {
                for frame in evicted {
                    warn!(
                        session = session_id,
                        intent = %frame.intent_id,
                        step = %frame.step_id,
                        "stack full, evicted oldest frame"
                    );
                }
            }
            PushOutcome::Rejected(frame) => {
                warn!(
                    session = session_id,
                    intent = %frame.intent_id,
                    "stack full, refused new frame"
                );
                return Ok(Reply::message(STACK_FULL));
            }
        }
        debug!(depth = self.context.depth(session_id), "frame pushed");
        Ok(self.render(session_id, intent, true))
    }

    pub fn advance_step(&mut self, session_id: &str) -> Reply {
        let pack = Arc::clone(&self.pack);
        let Some(frame) = self.context.peek(session_id) else {
            return Reply::message(NOTHING_RUNNING);
        };
        let (intent_id, version, step_index) =
            (frame.intent_id.clone(), frame.version, frame.step_index);
        let Some(intent) = pack.intent_by_id(&intent_id) else {
            return self.drop_stale_frame(session_id, &intent_id);
        };
        if let Some(conflict) = self.check_version(session_id, version, intent) {
            return conflict;
        }

        let next = step_index + 1;
        if next < intent.steps.len() {
            if let Some(frame) = self.context.peek_mut(session_id) {
                frame.move_to(intent, next);
            }
            return self.render(session_id, intent, true);
        }
        info!(session = session_id, intent = %intent.id, "procedure completed");
        self.finish_frame(session_id, TASK_COMPLETED)
    }

    pub fn previous_step(&mut self, session_id: &str) -> Reply {
        let pack = Arc::clone(&self.pack);
        let Some(frame) = self.context.peek(session_id) else {
            return Reply::message(NOTHING_TO_REWIND);
        };
        let (intent_id, version, step_index) =
            (frame.intent_id.clone(), frame.version, frame.step_index);
        let Some(intent) = pack.intent_by_id(&intent_id) else {
            return self.drop_stale_frame(session_id, &intent_id);
        };
        if let Some(conflict) = self.check_version(session_id, version, intent) {
            return conflict;
        }

        if step_index == 0 {
            // First step keeps its buttons but skips the hook pass.
            return Reply {
                reply: AT_FIRST_STEP.to_string(),
                ui: intent.step(0).map(|step| step.ui.clone()).unwrap_or_default(),
            };
        }
        let target = (step_index - 1).min(intent.steps.len().saturating_sub(1));
        if let Some(frame) = self.context.peek_mut(session_id) {
            frame.move_to(intent, target);
        }
        self.render(session_id, intent, true)
    }

    pub fn clear_task(&mut self, session_id: &str) -> Reply {
        if !self.context.is_task_active(session_id) {
            return Reply::message(NOTHING_TO_CANCEL);
        }
        info!(session = session_id, "procedure cancelled");
        self.finish_frame(session_id, TASK_CANCELLED)
    }

    /// Routes a button label. Resume answers win over a pending version
    /// prompt, which in turn only accepts continue or restart.
    pub fn handle_button(&mut self, session_id: &str, label: &str) -> Reply {
        let button = Button::parse(label.trim());

        if self.context.pending_resume(session_id).is_some() {
            match button {
                Some(Button::Back) => {
                    self.context.pop_pending_resume(session_id);
                    return self.resume(session_id);
                }
                Some(Button::No) => {
                    self.context.pop_pending_resume(session_id);
                    return Reply::message(RESUME_DECLINED);
                }
                _ => {}
            }
        }

        if let Some(intent_id) = self.version_prompts.get(session_id).cloned() {
            return self.resolve_version_prompt(session_id, &intent_id, button);
        }

        match button {
            Some(Button::Done) => self.advance_step(session_id),
            Some(Button::Back) => self.previous_step(session_id),
            Some(Button::Cancel) => self.clear_task(session_id),
            Some(Button::MoreHelp) => Reply::message(MORE_HELP),
            Some(Button::No) => Reply::message(NO_ACK),
            Some(Button::Continue) | Some(Button::Restart) | None => {
                Reply::message(ACKNOWLEDGED)
            }
        }
    }

    fn resume(&mut self, session_id: &str) -> Reply {
        let pack = Arc::clone(&self.pack);
        let Some(frame) = self.context.peek(session_id) else {
            return Reply::message(NOTHING_TO_RESUME);
        };
        let intent_id = frame.intent_id.clone();
        let Some(intent) = pack.intent_by_id(&intent_id) else {
            return self.drop_stale_frame(session_id, &intent_id);
        };
        self.render(session_id, intent, false)
    }

    fn resolve_version_prompt(
        &mut self,
        session_id: &str,
        intent_id: &str,
        button: Option<Button>,
    ) -> Reply {
        let pack = Arc::clone(&self.pack);
        let Some(intent) = pack
            .intent_by_id(intent_id)
            .filter(|_| self.context.is_task_active(session_id))
        else {
            self.version_prompts.remove(session_id);
            return Reply::message(VERSION_DATA_MISSING);
        };
        let restart = match button {
            Some(Button::Continue) => false,
            Some(Button::Restart) => true,
            _ => return Reply::message(VERSION_CHOOSE_BUTTON),
        };

        if let Some(frame) = self.context.peek_mut(session_id) {
            frame.version = intent.version;
            if restart {
                frame.move_to(intent, 0);
            }
        }
        self.version_prompts.remove(session_id);
        info!(
            session = session_id,
            intent = %intent.id,
            version = intent.version,
            restart,
            "version prompt resolved"
        );
        self.render(session_id, intent, false)
    }

    /// Pops the top frame and either offers to resume the frame beneath an
    /// interruption or replies with `message`.
    fn finish_frame(&mut self, session_id: &str, message: &str) -> Reply {
        let Some(popped) = self.context.pop(session_id) else {
            return Reply::message(message);
        };
        if self.version_prompt(session_id) == Some(popped.intent_id.as_str()) {
            self.version_prompts.remove(session_id);
        }
        if !popped.interruption {
            return Reply::message(message);
        }
        let Some(previous) = self.context.peek(session_id).map(|frame| frame.intent_id.clone())
        else {
            return Reply::message(message);
        };
        self.context.set_pending_resume(session_id, &previous);
        Reply::with_buttons(resume_prompt(&previous), &[BUTTON_BACK, BUTTON_NO])
    }

    fn drop_stale_frame(&mut self, session_id: &str, intent_id: &str) -> Reply {
        let error = ChatBrainError::missing_procedure(intent_id);
        warn!(session = session_id, %error, "dropping frame for missing procedure");
        self.context.pop(session_id);
        if self.version_prompt(session_id) == Some(intent_id) {
            self.version_prompts.remove(session_id);
        }
        Reply::message(LOST_CONTEXT)
    }

    fn check_version(&mut self, session_id: &str, version: i64, intent: &Intent) -> Option<Reply> {
        if version == intent.version {
            return None;
        }
        info!(
            session = session_id,
            intent = %intent.id,
            frame_version = version,
            live_version = intent.version,
            "procedure changed since frame was created"
        );
        self.version_prompts
            .insert(session_id.to_string(), intent.id.clone());
        Some(Self::version_conflict_reply())
    }

    /// Renders the top frame's step of `intent`, clamping a step index left
    /// out of range by a reload.
    fn render(&mut self, session_id: &str, intent: &Intent, run_hooks: bool) -> Reply {
        let Some((version, step_index)) = self
            .context
            .peek(session_id)
            .map(|frame| (frame.version, frame.step_index))
        else {
            return Reply::message(NOTHING_RUNNING);
        };
        if let Some(conflict) = self.check_version(session_id, version, intent) {
            return conflict;
        }

        let step_index = if step_index < intent.steps.len() {
            step_index
        } else {
            let last = intent.steps.len().saturating_sub(1);
            if let Some(frame) = self.context.peek_mut(session_id) {
                frame.move_to(intent, last);
            }
            last
        };
        let Some(step) = intent.step(step_index) else {
            return Reply::message(LOST_CONTEXT);
        };
        if run_hooks {
            self.hooks.run(session_id, intent, step_index);
        }
        Reply::step(step)
    }
}
