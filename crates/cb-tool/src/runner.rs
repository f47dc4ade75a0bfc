use std::path::Path;

use cb_api::{ChatBrain, MessageResponse};
use cb_core::ContextState;

use crate::source::read_test_case;
use crate::{CbToolError, TestCase, TestTurn, TurnExpect, NONE_MARKER};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub replies: Vec<String>,
    pub messages: usize,
    pub reloads: usize,
}

/// Replays `case` against a fresh engine loaded from `case_dir`, stopping at
/// the first turn that does not match its expectation.
pub fn run_case(case_dir: &Path, case: &TestCase) -> Result<RunReport, CbToolError> {
    let mut engine = ChatBrain::new(case.options.engine_options());
    engine.load_scripts(case_dir.join(&case.scripts_dir))?;

    let mut report = RunReport {
        replies: Vec::new(),
        messages: 0,
        reloads: 0,
    };

    for (turn_index, turn) in case.turns.iter().enumerate() {
        match turn {
            TestTurn::Message { text, expect } => {
                let response = engine.handle_message(&case.session_id, text)?;
                let state = engine.context_state(&case.session_id);
                check_expectation(turn_index, expect, &response, &state)?;
                report.messages += 1;
                report.replies.push(response.reply);
            }
            TestTurn::Reload {
                scripts_dir,
                expect_error,
            } => {
                let outcome = engine.load_scripts(case_dir.join(scripts_dir));
                match (outcome, expect_error) {
                    (Ok(_), None) => {}
                    (Err(error), Some(code)) if error.code == *code => {}
                    (Ok(_), Some(code)) => {
                        return Err(CbToolError::ReloadOutcome {
                            turn_index,
                            expected: code.clone(),
                            actual: "OK".to_string(),
                        })
                    }
                    (Err(error), Some(code)) => {
                        return Err(CbToolError::ReloadOutcome {
                            turn_index,
                            expected: code.clone(),
                            actual: error.code,
                        })
                    }
                    (Err(error), None) => return Err(error.into()),
                }
                report.reloads += 1;
            }
            TestTurn::Clear => engine.clear_context(&case.session_id),
        }
    }

    Ok(report)
}

pub fn assert_case(case_dir: &Path, case_path: &Path) -> Result<RunReport, CbToolError> {
    let case = read_test_case(case_path)?;
    run_case(case_dir, &case)
}

fn check_expectation(
    turn_index: usize,
    expect: &TurnExpect,
    response: &MessageResponse,
    state: &ContextState,
) -> Result<(), CbToolError> {
    let mismatch = |field: &str, expected: String, actual: String| -> Result<(), CbToolError> {
        Err(CbToolError::ExpectationMismatch {
            turn_index,
            field: field.to_string(),
            expected,
            actual,
        })
    };

    if let Some(reply) = &expect.reply {
        if *reply != response.reply {
            return mismatch("reply", quoted(reply), quoted(&response.reply));
        }
    }
    if let Some(fragment) = &expect.reply_contains {
        if !response.reply.contains(fragment.as_str()) {
            return mismatch("reply containing", quoted(fragment), quoted(&response.reply));
        }
    }
    if let Some(buttons) = &expect.buttons {
        if *buttons != response.ui.buttons {
            return mismatch(
                "buttons",
                format!("{:?}", buttons),
                format!("{:?}", response.ui.buttons),
            );
        }
    }
    if let Some(depth) = expect.stack_depth {
        if depth != response.debug.stack_depth {
            return mismatch(
                "stack depth",
                depth.to_string(),
                response.debug.stack_depth.to_string(),
            );
        }
    }
    if let Some(chosen) = &expect.chosen {
        let actual = response
            .debug
            .chosen
            .as_ref()
            .map_or(NONE_MARKER, |candidate| candidate.intent_id.as_str());
        if chosen != actual {
            return mismatch("chosen", chosen.clone(), actual.to_string());
        }
    }
    if let Some(pending) = &expect.pending_resume {
        let actual = state.pending_resume.as_deref().unwrap_or(NONE_MARKER);
        if pending != actual {
            return mismatch("pending resume", pending.clone(), actual.to_string());
        }
    }
    Ok(())
}

fn quoted(text: &str) -> String {
    format!("{:?}", text)
}
