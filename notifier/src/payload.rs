use serde_json::Value;

/// Sender details carried by webhook envelopes, used only for alert text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sender {
    pub first_name: Option<String>,
    pub username: Option<String>,
}

impl Sender {
    pub fn display(&self) -> String {
        match (&self.first_name, &self.username) {
            (Some(name), Some(username)) => format!("{name} (@{username})"),
            (Some(name), None) => name.clone(),
            (None, Some(username)) => format!("@{username}"),
            (None, None) => "unknown".to_string(),
        }
    }
}

/// The two inbound envelope shapes, resolved once at the top of request
/// handling rather than probed field-by-field through the logic.
///
/// A webhook envelope (`message.chat.id`) takes precedence over a direct-call
/// envelope (top-level `chat_id`). Missing or non-string text is `None` in
/// every variant; it is never a parse failure.
#[derive(Debug, PartialEq)]
pub enum InboundPayload {
    /// Platform webhook: `{message: {text, chat: {id}, from?}}`
    Webhook {
        chat_id: String,
        text: Option<String>,
        from: Option<Sender>,
    },
    /// Direct API call: `{chat_id, message: {text}}`
    Direct {
        chat_id: String,
        text: Option<String>,
    },
    /// Neither identifier present: `{message: {text}}`
    Bare { text: Option<String> },
}

impl InboundPayload {
    pub fn classify(value: &Value) -> InboundPayload {
        let message = &value["message"];
        let text = message["text"].as_str().map(str::to_string);

        if let Some(chat_id) = id_to_string(&message["chat"]["id"]) {
            let from = message["from"].as_object().map(|from| Sender {
                first_name: from.get("first_name").and_then(Value::as_str).map(str::to_string),
                username: from.get("username").and_then(Value::as_str).map(str::to_string),
            });
            return InboundPayload::Webhook {
                chat_id,
                text,
                from,
            };
        }

        if let Some(chat_id) = id_to_string(&value["chat_id"]) {
            return InboundPayload::Direct { chat_id, text };
        }

        InboundPayload::Bare { text }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            InboundPayload::Webhook { text, .. }
            | InboundPayload::Direct { text, .. }
            | InboundPayload::Bare { text } => text.as_deref(),
        }
    }
}

// Chat ids arrive as JSON numbers from the platform and as strings from
// direct callers; normalize both to strings.
fn id_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}
