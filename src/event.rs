//! Event classification: map one raw JSON line to a [`ClassifiedEvent`].
//!
//! The host emits a heterogeneous stream of JSON objects. Rather than model
//! this as one big optional-everything struct, each recognized kind gets its
//! own tagged variant, and anything that isn't semantically useful collapses
//! into `Skipped{reason}` — unknown `type` values included, so a future host
//! version that introduces a new progress kind degrades gracefully instead of
//! failing the whole sync.

use serde_json::Value;

/// A single classified line from a session file.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassifiedEvent {
    User {
        uuid: String,
        content: String,
        timestamp: Value,
        cwd: Option<String>,
        git_branch: Option<String>,
    },
    Assistant {
        uuid: String,
        content_blocks: Vec<ContentBlock>,
        model: Option<String>,
        usage: Option<Value>,
        timestamp: Value,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
        timestamp: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        is_error: bool,
        timestamp: Value,
    },
    Summary {
        content: String,
        leaf_uuid: Option<String>,
        timestamp: Value,
    },
    System {
        subtype: String,
        data: Value,
        timestamp: Value,
    },
    Skipped {
        reason: String,
    },
}

/// A single block from an assistant `content` array, reduced to what's kept
/// (`thinking` blocks never reach this type — they're discarded at the
/// classification boundary).
#[derive(Debug, Clone, PartialEq)]
pub enum ContentBlock {
    Text(String),
    ToolUse { id: String, name: String, input: Value },
}

/// Kinds that carry no persistable content and are always skipped.
const NON_SEMANTIC_KINDS: &[&str] = &[
    "progress",
    "agent_progress",
    "bash_progress",
    "mcp_progress",
    "hook_progress",
    "base64",
    "image",
    "file-history-snapshot",
    "waiting_for_task",
    "create",
    "update",
    "queue-operation",
];

/// Classify one decoded JSON value. A single line can yield more than one
/// event: an assistant line carrying `tool_use` blocks also yields a
/// `ToolUse` per block, and a user line carrying `tool_result` blocks also
/// yields a `ToolResult` per block, in addition to the primary event.
pub fn classify(value: &Value) -> Vec<ClassifiedEvent> {
    let Some(obj) = value.as_object() else {
        return vec![ClassifiedEvent::Skipped {
            reason: "input is not a JSON object".to_string(),
        }];
    };
    let Some(kind) = obj.get("type").and_then(Value::as_str) else {
        return vec![ClassifiedEvent::Skipped {
            reason: "missing type field".to_string(),
        }];
    };
    if NON_SEMANTIC_KINDS.contains(&kind) {
        return vec![ClassifiedEvent::Skipped {
            reason: format!("non-semantic type: {kind}"),
        }];
    }
    match kind {
        "user" => classify_user(value),
        "assistant" => classify_assistant(value),
        "summary" => vec![classify_summary(value)],
        "system" => vec![classify_system(value)],
        other => vec![ClassifiedEvent::Skipped {
            reason: format!("unknown type: {other}"),
        }],
    }
}

fn classify_user(value: &Value) -> Vec<ClassifiedEvent> {
    let Some(uuid) = value.get("uuid").and_then(Value::as_str) else {
        return vec![ClassifiedEvent::Skipped { reason: "user event missing uuid".into() }];
    };
    let Some(timestamp) = value.get("timestamp") else {
        return vec![ClassifiedEvent::Skipped { reason: "user event missing timestamp".into() }];
    };
    let Some(message) = value.get("message") else {
        return vec![ClassifiedEvent::Skipped { reason: "user event missing message".into() }];
    };
    let mut events = Vec::new();
    let content = match message.get("content") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(blocks)) => {
            events.extend(tool_results_in(blocks, timestamp));
            concat_tool_result_blocks(blocks)
        }
        _ => String::new(),
    };
    events.insert(
        0,
        ClassifiedEvent::User {
            uuid: uuid.to_string(),
            content,
            timestamp: timestamp.clone(),
            cwd: value.get("cwd").and_then(Value::as_str).map(str::to_string),
            git_branch: value.get("gitBranch").and_then(Value::as_str).map(str::to_string),
        },
    );
    events
}

fn concat_tool_result_blocks(blocks: &[Value]) -> String {
    blocks
        .iter()
        .filter(|b| b.get("type").and_then(Value::as_str) == Some("tool_result"))
        .map(|b| match b.get("content") {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn classify_assistant(value: &Value) -> Vec<ClassifiedEvent> {
    let Some(uuid) = value.get("uuid").and_then(Value::as_str) else {
        return vec![ClassifiedEvent::Skipped { reason: "assistant event missing uuid".into() }];
    };
    let Some(timestamp) = value.get("timestamp") else {
        return vec![ClassifiedEvent::Skipped { reason: "assistant event missing timestamp".into() }];
    };
    let Some(message) = value.get("message") else {
        return vec![ClassifiedEvent::Skipped { reason: "assistant event missing message".into() }];
    };
    let content_blocks: Vec<ContentBlock> = match message.get("content") {
        Some(Value::Array(blocks)) => blocks.iter().filter_map(to_content_block).collect(),
        Some(Value::String(s)) => vec![ContentBlock::Text(s.clone())],
        _ => Vec::new(),
    };
    let tool_uses = tool_uses_in(&content_blocks, timestamp);
    let mut events = vec![ClassifiedEvent::Assistant {
        uuid: uuid.to_string(),
        content_blocks,
        model: message.get("model").and_then(Value::as_str).map(str::to_string),
        usage: message.get("usage").cloned(),
        timestamp: timestamp.clone(),
    }];
    events.extend(tool_uses);
    events
}

fn to_content_block(block: &Value) -> Option<ContentBlock> {
    match block.get("type").and_then(Value::as_str) {
        Some("text") => block
            .get("text")
            .and_then(Value::as_str)
            .map(|s| ContentBlock::Text(s.to_string())),
        Some("tool_use") => {
            let id = block.get("id").and_then(Value::as_str)?;
            let name = block.get("name").and_then(Value::as_str)?;
            let input = block.get("input").cloned().unwrap_or(Value::Null);
            Some(ContentBlock::ToolUse {
                id: id.to_string(),
                name: name.to_string(),
                input,
            })
        }
        // "thinking" and anything else is discarded at this boundary.
        _ => None,
    }
}

/// Extract the `ToolUse` child events embedded in an assistant event's
/// content blocks; each becomes its own `tool_uses` row alongside the
/// assistant message itself.
fn tool_uses_in(content_blocks: &[ContentBlock], timestamp: &Value) -> Vec<ClassifiedEvent> {
    content_blocks
        .iter()
        .filter_map(|b| match b {
            ContentBlock::ToolUse { id, name, input } => Some(ClassifiedEvent::ToolUse {
                id: id.clone(),
                name: name.clone(),
                input: input.clone(),
                timestamp: timestamp.clone(),
            }),
            ContentBlock::Text(_) => None,
        })
        .collect()
}

/// Extract `ToolResult` child events from a user event's `message.content`
/// blocks, mirroring [`tool_uses_in`] for the user side.
fn tool_results_in(blocks: &[Value], timestamp: &Value) -> Vec<ClassifiedEvent> {
    blocks
        .iter()
        .filter(|b| b.get("type").and_then(Value::as_str) == Some("tool_result"))
        .filter_map(|b| {
            let tool_use_id = b.get("tool_use_id").and_then(Value::as_str)?;
            let content = match b.get("content") {
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => String::new(),
            };
            let is_error = b.get("is_error").and_then(Value::as_bool).unwrap_or(false);
            Some(ClassifiedEvent::ToolResult {
                tool_use_id: tool_use_id.to_string(),
                content,
                is_error,
                timestamp: timestamp.clone(),
            })
        })
        .collect()
}

fn classify_summary(value: &Value) -> ClassifiedEvent {
    let Some(summary) = value.get("summary").and_then(Value::as_str) else {
        return ClassifiedEvent::Skipped { reason: "summary event missing summary".into() };
    };
    let timestamp = value.get("timestamp").cloned().unwrap_or(Value::Null);
    ClassifiedEvent::Summary {
        content: summary.to_string(),
        leaf_uuid: value.get("leafUuid").and_then(Value::as_str).map(str::to_string),
        timestamp,
    }
}

fn classify_system(value: &Value) -> ClassifiedEvent {
    let Some(subtype) = value.get("subtype").and_then(Value::as_str) else {
        return ClassifiedEvent::Skipped { reason: "system event missing subtype".into() };
    };
    let Some(timestamp) = value.get("timestamp") else {
        return ClassifiedEvent::Skipped { reason: "system event missing timestamp".into() };
    };
    ClassifiedEvent::System {
        subtype: subtype.to_string(),
        data: value.clone(),
        timestamp: timestamp.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classifies_basic_user_event() {
        let v = json!({
            "type": "user",
            "uuid": "u1",
            "timestamp": "2026-01-28T10:00:00Z",
            "message": {"role": "user", "content": "Hello Claude"}
        });
        let events = classify(&v);
        assert_eq!(events.len(), 1);
        match &events[0] {
            ClassifiedEvent::User { uuid, content, .. } => {
                assert_eq!(uuid, "u1");
                assert_eq!(content, "Hello Claude");
            }
            other => panic!("expected User, got {other:?}"),
        }
    }

    #[test]
    fn classifies_assistant_text_and_drops_thinking() {
        let v = json!({
            "type": "assistant",
            "uuid": "a1",
            "timestamp": "2026-01-28T10:00:01Z",
            "message": {
                "content": [
                    {"type": "thinking", "thinking": "internal"},
                    {"type": "text", "text": "Hi"}
                ]
            }
        });
        let events = classify(&v);
        assert_eq!(events.len(), 1);
        match &events[0] {
            ClassifiedEvent::Assistant { content_blocks, .. } => {
                assert_eq!(content_blocks.len(), 1);
                assert_eq!(content_blocks[0], ContentBlock::Text("Hi".to_string()));
            }
            other => panic!("expected Assistant, got {other:?}"),
        }
    }

    #[test]
    fn extracts_tool_use_blocks() {
        let v = json!({
            "type": "assistant",
            "uuid": "a2",
            "timestamp": "2026-01-28T10:00:02Z",
            "message": {
                "content": [
                    {"type": "tool_use", "id": "t1", "name": "Bash", "input": {"command": "ls"}}
                ]
            }
        });
        let events = classify(&v);
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], ClassifiedEvent::Assistant { .. }));
        match &events[1] {
            ClassifiedEvent::ToolUse { id, name, .. } => {
                assert_eq!(id, "t1");
                assert_eq!(name, "Bash");
            }
            other => panic!("expected ToolUse, got {other:?}"),
        }
    }

    #[test]
    fn extracts_tool_result_from_user_event() {
        let v = json!({
            "type": "user",
            "uuid": "u2",
            "timestamp": "2026-01-28T10:00:03Z",
            "message": {
                "content": [
                    {"type": "tool_result", "tool_use_id": "t1", "content": "file list", "is_error": false}
                ]
            }
        });
        let events = classify(&v);
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], ClassifiedEvent::User { .. }));
        match &events[1] {
            ClassifiedEvent::ToolResult { tool_use_id, content, is_error, .. } => {
                assert_eq!(tool_use_id, "t1");
                assert_eq!(content, "file list");
                assert!(!is_error);
            }
            other => panic!("expected ToolResult, got {other:?}"),
        }
    }

    #[test]
    fn non_semantic_kinds_are_skipped() {
        for kind in NON_SEMANTIC_KINDS {
            let v = json!({"type": kind});
            assert!(matches!(classify(&v)[..], [ClassifiedEvent::Skipped { .. }]));
        }
    }

    #[test]
    fn missing_type_is_skipped() {
        let v = json!({"uuid": "u1"});
        assert!(matches!(classify(&v)[..], [ClassifiedEvent::Skipped { .. }]));
    }

    #[test]
    fn non_object_input_is_skipped() {
        let v = json!("just a string");
        assert!(matches!(classify(&v)[..], [ClassifiedEvent::Skipped { .. }]));
    }

    #[test]
    fn unknown_type_defaults_to_skipped() {
        let v = json!({"type": "some-future-kind"});
        assert!(matches!(classify(&v)[..], [ClassifiedEvent::Skipped { .. }]));
    }

    #[test]
    fn user_event_missing_required_field_is_skipped() {
        let v = json!({"type": "user", "timestamp": "2026-01-28T10:00:00Z"});
        assert!(matches!(classify(&v)[..], [ClassifiedEvent::Skipped { .. }]));
    }

    #[test]
    fn summary_event_requires_summary_field() {
        let v = json!({"type": "summary", "timestamp": "2026-01-28T10:00:00Z"});
        assert!(matches!(classify(&v)[..], [ClassifiedEvent::Skipped { .. }]));

        let v2 = json!({"type": "summary", "summary": "recap", "leafUuid": "leaf1"});
        match &classify(&v2)[..] {
            [ClassifiedEvent::Summary { content, leaf_uuid, .. }] => {
                assert_eq!(content, "recap");
                assert_eq!(leaf_uuid.as_deref(), Some("leaf1"));
            }
            other => panic!("expected Summary, got {other:?}"),
        }
    }

    #[test]
    fn system_event_requires_subtype() {
        let v = json!({"type": "system", "timestamp": "2026-01-28T10:00:00Z"});
        assert!(matches!(classify(&v)[..], [ClassifiedEvent::Skipped { .. }]));

        let v2 = json!({"type": "system", "subtype": "git_branch_change", "timestamp": "2026-01-28T10:00:00Z"});
        assert!(matches!(classify(&v2)[..], [ClassifiedEvent::System { .. }]));
    }
}
