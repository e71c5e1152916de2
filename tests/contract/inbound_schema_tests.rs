//! Wire contract for `POST /conversations` bodies and responses.

use checkpoint_relay::inbound::{InboundRequest, RouteAccepted, RouteAction};
use checkpoint_relay::models::conversation::{ChatRole, ChatTurn};
use serde_json::json;

#[test]
fn start_request_parses() {
    let req: InboundRequest = serde_json::from_value(json!({
        "task_id": "t1",
        "prompt": "refactor the parser",
        "notify_url": "https://ctl.example/hook",
        "chat_context": [
            {"role": "user", "content": "hi"},
            {"role": "assistant", "content": "hello"}
        ]
    }))
    .expect("parse");

    assert_eq!(req.task_id.as_deref(), Some("t1"));
    assert_eq!(req.notify_url.as_deref(), Some("https://ctl.example/hook"));
    assert!(req.resume_session_id.is_none());
    assert_eq!(
        req.chat_context,
        Some(vec![
            ChatTurn {
                role: ChatRole::User,
                content: "hi".into()
            },
            ChatTurn {
                role: ChatRole::Assistant,
                content: "hello".into()
            },
        ])
    );
}

#[test]
fn webhook_url_is_an_alias_for_notify_url() {
    let req: InboundRequest = serde_json::from_value(json!({
        "task_id": "t1",
        "prompt": "p",
        "webhook_url": "https://ctl.example/hook"
    }))
    .expect("parse");
    assert_eq!(req.notify_url.as_deref(), Some("https://ctl.example/hook"));
}

#[test]
fn reply_request_parses() {
    let req: InboundRequest = serde_json::from_value(json!({
        "task_id": "t1",
        "prompt": "production",
        "notify_url": "https://ctl.example/hook",
        "resume_session_id": "s-1"
    }))
    .expect("parse");
    assert_eq!(req.resume_session_id.as_deref(), Some("s-1"));
}

#[test]
fn missing_fields_still_parse() {
    let req: InboundRequest = serde_json::from_value(json!({})).expect("parse");
    assert_eq!(req, InboundRequest::default());
}

#[test]
fn unknown_fields_are_ignored() {
    let req: InboundRequest = serde_json::from_value(json!({
        "task_id": "t1",
        "execution_segment": 2
    }))
    .expect("parse");
    assert_eq!(req.task_id.as_deref(), Some("t1"));
}

#[test]
fn accepted_response_shapes() {
    let spawned = RouteAccepted {
        status: "accepted".into(),
        task_id: "t1".into(),
        action: RouteAction::ContainerSpawned,
    };
    assert_eq!(
        serde_json::to_value(&spawned).expect("serialize"),
        json!({"status":"accepted","task_id":"t1","action":"container_spawned"})
    );

    let queued = RouteAccepted {
        action: RouteAction::ResponseQueued,
        ..spawned
    };
    assert_eq!(
        serde_json::to_value(&queued).expect("serialize"),
        json!({"status":"accepted","task_id":"t1","action":"response_queued"})
    );
}
