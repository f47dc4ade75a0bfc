use super::*;
use crate::line_chat::{expand_shortcut, handle_chat_command, run_chat_with_io, ChatContext};

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_path(name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time should be monotonic")
        .as_nanos();
    std::env::temp_dir().join(format!("chatbrain-cli-{}-{}", name, nanos))
}

fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("parent should be created");
    }
    fs::write(path, content).expect("file should be written");
}

fn demo_scripts_dir(demo: &str) -> String {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("demos")
        .join("scripts")
        .join(demo)
        .to_string_lossy()
        .to_string()
}

fn engine_args(scripts_dir: String) -> EngineArgs {
    EngineArgs {
        scripts_dir,
        max_depth: 2,
        conf_threshold: 0.55,
        use_embedding: false,
        reject_when_full: false,
        top_k: 3,
    }
}

fn run_agent_command(args: &[&str]) -> (i32, String) {
    let cli = Cli::try_parse_from(args).expect("args should parse");
    let mut out = Vec::new();
    let code = run_cli(cli, &mut out);
    (code, String::from_utf8(out).expect("output should be utf8"))
}

fn chat_fixture() -> (cb_api::ChatBrain, ChatContext) {
    let (engine, summary) =
        load_engine(&engine_args(demo_scripts_dir("01-vneid-interrupt"))).expect("demo loads");
    let context = ChatContext {
        session: "chat-test".to_string(),
        folder: summary.folder,
    };
    (engine, context)
}

#[test]
fn chat_args_parse_with_defaults() {
    let cli = Cli::try_parse_from(["cb-cli", "chat", "--scripts-dir", "/tmp/scripts"])
        .expect("chat args should parse");
    let Mode::Chat(args) = cli.command else {
        panic!("expected chat mode");
    };
    assert_eq!(args.session, "cli");
    assert_eq!(args.engine.scripts_dir, "/tmp/scripts");
    assert_eq!(args.engine.top_k, 3);
    assert!(!args.engine.reject_when_full);

    let options = args.engine.options();
    assert_eq!(options.top_k, Some(3));
    assert_eq!(options.overflow_policy, Some(cb_api::OverflowPolicy::EvictOldest));
}

#[test]
fn use_embedding_flag_accepts_boolish_values() {
    fn parse(extra: &[&str]) -> bool {
        let mut args = vec!["cb-cli", "chat", "--scripts-dir", "x"];
        args.extend_from_slice(extra);
        let cli = Cli::try_parse_from(args).expect("chat args should parse");
        let Mode::Chat(args) = cli.command else {
            panic!("expected chat mode");
        };
        args.engine.use_embedding
    }

    assert!(parse(&["--use-embedding"]));
    assert!(parse(&["--use-embedding=1"]));
    assert!(parse(&["--use-embedding", "yes"]));
    assert!(parse(&["--use-embedding=true"]));
    assert!(!parse(&["--use-embedding=0"]));
    assert!(!parse(&["--use-embedding", "no"]));
    assert!(
        Cli::try_parse_from(["cb-cli", "chat", "--scripts-dir", "x", "--use-embedding=maybe"])
            .is_err()
    );
}

#[test]
fn agent_args_parse_repeated_messages_and_flags() {
    let cli = Cli::try_parse_from([
        "cb-cli",
        "agent",
        "replay",
        "--scripts-dir",
        "x",
        "--reject-when-full",
        "--message",
        "one",
        "--message",
        "two",
    ])
    .expect("replay args should parse");
    let Mode::Agent(AgentArgs {
        command: AgentCommand::Replay(args),
    }) = cli.command
    else {
        panic!("expected agent replay");
    };
    assert_eq!(args.session, "agent");
    assert_eq!(args.messages, vec!["one", "two"]);
    assert_eq!(
        args.engine.options().overflow_policy,
        Some(cb_api::OverflowPolicy::RejectNewest)
    );

    assert!(Cli::try_parse_from(["cb-cli", "agent", "replay", "--scripts-dir", "x"]).is_err());
    assert!(Cli::try_parse_from(["cb-cli", "agent", "rank", "--scripts-dir", "x"]).is_err());
}

#[test]
fn agent_validate_reports_intent_count() {
    let dir = demo_scripts_dir("01-vneid-interrupt");
    let (code, out) = run_agent_command(&["cb-cli", "agent", "validate", "--scripts-dir", &dir]);
    assert_eq!(code, 0);
    let lines = out.lines().collect::<Vec<_>>();
    assert_eq!(lines[0], "RESULT:OK");
    assert_eq!(lines[1], "INTENTS:3");
    assert!(lines[2].starts_with("FOLDER_JSON:"));
}

#[test]
fn agent_intents_filters_by_domain() {
    let dir = demo_scripts_dir("01-vneid-interrupt");
    let (code, out) = run_agent_command(&[
        "cb-cli",
        "agent",
        "intents",
        "--scripts-dir",
        &dir,
        "--domain",
        "vneid",
    ]);
    assert_eq!(code, 0);
    assert!(out.starts_with("RESULT:OK\nINTENTS:2\n"));

    let intents = out
        .lines()
        .filter_map(|line| line.strip_prefix("INTENT_JSON:"))
        .map(|json| serde_json::from_str::<serde_json::Value>(json).expect("intent json"))
        .collect::<Vec<_>>();
    assert_eq!(intents.len(), 2);
    assert_eq!(intents[0]["id"], "cai_va_kich_hoat_vneid");
    assert_eq!(intents[0]["steps"], 3);
    assert_eq!(intents[1]["can_interrupt"], true);
    assert_eq!(intents[1]["source_file"], "10-vneid.yaml");
}

#[test]
fn agent_rank_lists_best_candidate_first() {
    let dir = demo_scripts_dir("01-vneid-interrupt");
    let (code, out) = run_agent_command(&[
        "cb-cli",
        "agent",
        "rank",
        "--scripts-dir",
        &dir,
        "--text",
        "quên passcode",
    ]);
    assert_eq!(code, 0);
    let candidates = out
        .lines()
        .filter_map(|line| line.strip_prefix("CANDIDATE_JSON:"))
        .collect::<Vec<_>>();
    assert_eq!(candidates.len(), 3);
    let best: serde_json::Value = serde_json::from_str(candidates[0]).expect("candidate json");
    assert_eq!(best["intent_id"], "quen_mat_khau_vneid");
}

#[test]
fn agent_replay_prints_turns_and_pending_resume() {
    let dir = demo_scripts_dir("01-vneid-interrupt");
    let (code, out) = run_agent_command(&[
        "cb-cli",
        "agent",
        "replay",
        "--scripts-dir",
        &dir,
        "--message",
        "Làm sao để kích hoạt VNeID?",
        "--message",
        "tôi quên mật khẩu vneid",
        "--message",
        "Đã xong",
        "--message",
        "Đã xong",
    ]);
    assert_eq!(code, 0);
    let lines = out.lines().collect::<Vec<_>>();
    assert_eq!(lines[0], "RESULT:OK");
    assert_eq!(lines[1], "TURN:1");
    assert!(lines.contains(&"CHOSEN:cai_va_kich_hoat_vneid"));
    assert!(lines.contains(&"CHOSEN:quen_mat_khau_vneid"));
    assert!(lines.contains(&"STACK_DEPTH:2"));
    assert_eq!(
        lines
            .iter()
            .filter(|line| line.starts_with("MEDIA_JSON:"))
            .count(),
        1
    );
    assert!(lines.contains(&"BUTTON_JSON:\"Không\""));
    assert_eq!(
        lines.last().copied(),
        Some("PENDING_RESUME:cai_va_kich_hoat_vneid")
    );
}

#[test]
fn agent_errors_use_protocol_lines() {
    let missing = temp_path("missing").to_string_lossy().to_string();
    let (code, out) = run_agent_command(&["cb-cli", "agent", "validate", "--scripts-dir", &missing]);
    assert_eq!(code, 1);
    assert!(out.starts_with("RESULT:ERROR\nERROR_CODE:LOAD_DIR_NOT_FOUND\nERROR_MSG_JSON:"));
    assert!(!out.contains("RESULT:OK"));

    let broken = temp_path("broken");
    write_file(&broken.join("a.yaml"), "intents: 3\n");
    let broken = broken.to_string_lossy().to_string();
    let (code, out) = run_agent_command(&[
        "cb-cli",
        "agent",
        "replay",
        "--scripts-dir",
        &broken,
        "--message",
        "hi",
    ]);
    assert_eq!(code, 1);
    assert!(out.contains("ERROR_CODE:LOAD_INTENTS_INVALID\n"));
    assert!(out.ends_with("ERROR_FILE_JSON:\"a.yaml\"\n"));
}

#[test]
fn shortcuts_expand_to_button_labels() {
    assert_eq!(expand_shortcut("/done"), "Đã xong");
    assert_eq!(expand_shortcut("/back"), "Quay lại");
    assert_eq!(expand_shortcut("/cancel"), "Huỷ");
    assert_eq!(expand_shortcut("/btn  Tiếp tục "), "Tiếp tục");
    assert_eq!(expand_shortcut("lệ phí"), "lệ phí");
}

fn run(
    raw: &str,
    engine: &mut cb_api::ChatBrain,
    context: &mut ChatContext,
) -> (ChatCommandAction, Vec<String>) {
    let mut lines = Vec::new();
    let action = handle_chat_command(raw, context, engine, &mut |line: String| lines.push(line))
        .expect("command should run");
    (action, lines)
}

#[test]
fn chat_commands_are_handled_locally() {
    let (mut engine, mut context) = chat_fixture();

    let (action, lines) = run("lệ phí", &mut engine, &mut context);
    assert_eq!(action, ChatCommandAction::NotHandled);
    assert!(lines.is_empty());

    let (action, lines) = run(":intents le_phi", &mut engine, &mut context);
    assert_eq!(action, ChatCommandAction::Continue);
    assert_eq!(lines, vec!["hoi_le_phi [le_phi] v1 (1 steps)"]);

    let missing = temp_path("reload-missing").to_string_lossy().to_string();
    let (_, lines) = run(&format!(":reload {}", missing), &mut engine, &mut context);
    assert!(lines[0].starts_with("reload failed, previous scripts kept:"));
    assert_eq!(engine.list_intents(None).len(), 3);

    let (_, lines) = run(":reload", &mut engine, &mut context);
    assert_eq!(lines, vec![format!("reloaded: 3 intents from {}", context.folder)]);

    engine
        .handle_message(&context.session, "quên passcode")
        .expect("message should run");
    let (_, lines) = run(":state", &mut engine, &mut context);
    assert!(lines[0].contains("quen_mat_khau_vneid"));
    let (_, lines) = run(":clear", &mut engine, &mut context);
    assert_eq!(lines, vec!["cleared"]);
    assert!(engine.context_state(&context.session).stack.is_empty());

    let (action, lines) = run(":nope", &mut engine, &mut context);
    assert_eq!(action, ChatCommandAction::Continue);
    assert_eq!(lines, vec!["unknown command: :nope"]);

    let (action, lines) = run(":quit", &mut engine, &mut context);
    assert_eq!(action, ChatCommandAction::Quit);
    assert_eq!(lines, vec!["bye"]);
}

#[test]
fn chat_loop_renders_replies_until_quit() {
    let (mut engine, mut context) = chat_fixture();
    let mut input = Cursor::new("Làm sao để kích hoạt VNeID?\n\n/done\n:quit\nlệ phí\n");
    let mut out = Vec::new();

    let code =
        run_chat_with_io(&mut engine, &mut context, &mut input, &mut out).expect("chat runs");
    assert_eq!(code, 0);
    let text = String::from_utf8(out).expect("utf8");
    assert!(text.starts_with("ChatBrain chat (3 intents, session chat-test)\n"));
    assert!(text.contains("Bước 1: Tải ứng dụng VNeID"));
    assert!(text.contains("  [Đã xong] [Quay lại] [Huỷ]\n"));
    assert!(text.contains("  (image) https://example.org/vneid/b1-tai-ung-dung.png\n"));
    assert!(text.contains("Bước 2:"));
    assert!(text.ends_with("> bye\n"));
    assert!(!text.contains("miễn phí"));
}

#[test]
fn chat_loop_ends_cleanly_at_end_of_input() {
    let (mut engine, mut context) = chat_fixture();
    let mut input = Cursor::new("quên passcode");
    let mut out = Vec::new();

    let code =
        run_chat_with_io(&mut engine, &mut context, &mut input, &mut out).expect("chat runs");
    assert_eq!(code, 0);
    let text = String::from_utf8(out).expect("utf8");
    assert!(text.contains("Tại màn hình đăng nhập, chọn Quên mật khẩu."));
    assert!(text.ends_with("> \n"));
    assert_eq!(engine.context_state("chat-test").stack.len(), 1);
}
