//! Unit tests for agent stdout parsing and outbound message shapes.

use std::path::PathBuf;

use checkpoint_relay::driver::process::{answer_message, parse_event_line, start_message};
use checkpoint_relay::driver::{
    ask_human_tool, AgentEvent, AgentRequest, ToolSet, ASK_HUMAN_TOOL,
};
use serde_json::json;

#[test]
fn parses_init() {
    let event = parse_event_line(r#"{"type":"init","session_id":"s-1"}"#).expect("parse");
    assert_eq!(
        event,
        Some(AgentEvent::Init {
            session_id: "s-1".into()
        })
    );
}

#[test]
fn parses_tool_use_and_text() {
    assert_eq!(
        parse_event_line(r#"{"type":"tool_use","name":"Bash"}"#).expect("parse"),
        Some(AgentEvent::ToolUse { name: "Bash".into() })
    );
    assert_eq!(
        parse_event_line(r#"{"type":"text","content":"working"}"#).expect("parse"),
        Some(AgentEvent::Text {
            content: "working".into()
        })
    );
}

#[test]
fn parses_ask_human_with_defaults() {
    let event = parse_event_line(r#"{"type":"ask_human","id":"c1","question":"Which env?"}"#)
        .expect("parse");
    assert_eq!(
        event,
        Some(AgentEvent::AskHuman {
            call_id: "c1".into(),
            question: "Which env?".into(),
            context: String::new(),
            options: vec![],
        })
    );
}

#[test]
fn parses_ask_human_options() {
    let line = r#"{"type":"ask_human","id":"c1","question":"Q","context":"C","options":["a","b"]}"#;
    let Some(AgentEvent::AskHuman { options, context, .. }) = parse_event_line(line).expect("parse")
    else {
        panic!("expected ask_human");
    };
    assert_eq!(context, "C");
    assert_eq!(options, vec!["a".to_owned(), "b".to_owned()]);
}

#[test]
fn parses_result() {
    assert_eq!(
        parse_event_line(r#"{"type":"result","is_error":true,"summary":"rate limited"}"#)
            .expect("parse"),
        Some(AgentEvent::Result {
            is_error: true,
            summary: "rate limited".into()
        })
    );
    assert_eq!(
        parse_event_line(r#"{"type":"result"}"#).expect("parse"),
        Some(AgentEvent::Result {
            is_error: false,
            summary: String::new()
        })
    );
}

#[test]
fn unknown_types_and_blank_lines_are_skipped() {
    assert_eq!(parse_event_line(r#"{"type":"thinking"}"#).expect("parse"), None);
    assert_eq!(parse_event_line("   ").expect("parse"), None);
}

#[test]
fn malformed_line_is_an_agent_error() {
    let err = parse_event_line("{not json").expect_err("must fail");
    assert!(err.to_string().starts_with("agent: malformed agent message"));
}

#[test]
fn missing_required_field_is_an_agent_error() {
    let err = parse_event_line(r#"{"type":"init"}"#).expect_err("must fail");
    assert!(err.to_string().contains("session_id"));
    assert!(parse_event_line(r#"{"session_id":"x"}"#).is_err());
}

#[test]
fn tool_set_always_registers_ask_human() {
    let set = ToolSet::with_ask_human(&["Read".to_owned()]);
    assert_eq!(set.allowed, vec!["Read".to_owned()]);
    assert_eq!(set.custom.len(), 1);
    assert_eq!(set.custom[0].name, ASK_HUMAN_TOOL);
    assert_eq!(ask_human_tool().input_schema["required"], json!(["question", "context"]));
}

#[test]
fn start_message_carries_request() {
    let request = AgentRequest {
        prompt: "do it".into(),
        tool_set: ToolSet::with_ask_human(&["Read".to_owned()]),
        working_directory: PathBuf::from("/tmp/ws"),
        model: "m".into(),
        resume_session_id: Some("s-9".into()),
    };
    let msg = start_message(&request);
    assert_eq!(msg["method"], "session/start");
    assert_eq!(msg["params"]["prompt"], "do it");
    assert_eq!(msg["params"]["cwd"], "/tmp/ws");
    assert_eq!(msg["params"]["resume"], "s-9");
    assert_eq!(msg["params"]["allowed_tools"], json!(["Read"]));
    assert_eq!(msg["params"]["tools"][0]["name"], "AskUser");
}

#[test]
fn answer_message_shape() {
    assert_eq!(
        answer_message("c1", "production"),
        json!({"method":"tool/result","id":"c1","params":{"content":"production"}})
    );
}
