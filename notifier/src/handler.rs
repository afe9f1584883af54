use crate::dispatch::Dispatcher;
use crate::metrics_defs::{MESSAGES_DELIVERED, UNAUTHORIZED_REJECTS};
use crate::payload::{InboundPayload, Sender};
use chrono::{SecondsFormat, Utc};
use http::StatusCode;
use paramstore::cache::{ParamCache, RelayParams};
use paramstore::store::StoreError;
use serde_json::json;
use shared::counter;

/// Ceiling on the inbound request body, checked before any parsing.
pub const MAX_BODY_CHARS: usize = 10_000;

/// How much of the offending message text an unauthorized-access alert quotes.
const ALERT_TEXT_CHARS: usize = 256;

/// Transport-independent response: a status code and a JSON body.
#[derive(Debug)]
pub struct RelayResponse {
    pub status: StatusCode,
    pub body: String,
}

impl RelayResponse {
    fn message(status: StatusCode, message: &str) -> Self {
        RelayResponse {
            status,
            body: json!({ "message": message }).to_string(),
        }
    }

    fn error(status: StatusCode, error: &str) -> Self {
        RelayResponse {
            status,
            body: json!({ "error": error }).to_string(),
        }
    }

    fn delivered(chat_id: &str) -> Self {
        RelayResponse {
            status: StatusCode::OK,
            body: json!({ "message": "message sent", "chat_id": chat_id }).to_string(),
        }
    }
}

/// Orchestrates one inbound request: resolve configuration, validate the
/// envelope, authorize the destination, dispatch, map the outcome.
///
/// No state survives across requests except through the parameter cache.
#[derive(Clone)]
pub struct RelayHandler {
    params: ParamCache,
    dispatcher: Dispatcher,
}

impl RelayHandler {
    pub fn new(params: ParamCache, dispatcher: Dispatcher) -> Self {
        RelayHandler { params, dispatcher }
    }

    pub async fn handle(&self, body: Option<&str>) -> RelayResponse {
        // Configuration first: without it nothing downstream can proceed.
        let params = match self.params.resolve().await {
            Ok(params) => params,
            Err(e @ (StoreError::NotFound { .. } | StoreError::AccessDenied { .. })) => {
                tracing::error!(error = %e, "Configuration retrieval failed");
                return RelayResponse::error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "server configuration error",
                );
            }
            Err(e) => {
                tracing::error!(error = %e, "Parameter store request failed");
                return RelayResponse::error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error",
                );
            }
        };

        let Some(body) = body else {
            return RelayResponse::error(StatusCode::BAD_REQUEST, "invalid request: missing body");
        };

        if body.chars().count() > MAX_BODY_CHARS {
            tracing::warn!(length = body.len(), "Rejected oversized request body");
            return RelayResponse::error(
                StatusCode::PAYLOAD_TOO_LARGE,
                "request body too large",
            );
        }

        let value: serde_json::Value = match serde_json::from_str(body) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, "Rejected malformed request body");
                return RelayResponse::error(
                    StatusCode::BAD_REQUEST,
                    "invalid request: malformed JSON",
                );
            }
        };

        let payload = InboundPayload::classify(&value);

        // Absence of a message is not a failure; acknowledge and do nothing.
        let text = match payload.text() {
            None => return RelayResponse::message(StatusCode::OK, "no message to send"),
            Some(t) if t.trim().is_empty() => {
                return RelayResponse::message(StatusCode::OK, "empty message ignored");
            }
            Some(t) => t,
        };

        let chat_id = match &payload {
            InboundPayload::Webhook { chat_id, from, .. } => {
                if !params.is_authorized(chat_id) {
                    counter!(UNAUTHORIZED_REJECTS).increment(1);
                    tracing::warn!(%chat_id, "Rejected webhook from unauthorized chat");
                    self.alert_unauthorized(&params, chat_id, from.as_ref(), text)
                        .await;
                    // Webhook callers get a disguised success so probing
                    // reveals nothing about the authorization logic.
                    return RelayResponse::message(StatusCode::OK, "unauthorized");
                }
                chat_id
            }
            InboundPayload::Direct { chat_id, .. } => {
                if !params.is_authorized(chat_id) {
                    counter!(UNAUTHORIZED_REJECTS).increment(1);
                    tracing::warn!(%chat_id, "Rejected direct call for unauthorized chat");
                    self.alert_unauthorized(&params, chat_id, None, text).await;
                    return RelayResponse::error(StatusCode::FORBIDDEN, "forbidden");
                }
                chat_id
            }
            InboundPayload::Bare { .. } => {
                return RelayResponse::error(StatusCode::BAD_REQUEST, "chat_id is required");
            }
        };

        match self
            .dispatcher
            .send(Some(text), chat_id, &params.bot_token)
            .await
        {
            Ok(_) => {
                counter!(MESSAGES_DELIVERED).increment(1);
                tracing::info!(%chat_id, "Message delivered");
                RelayResponse::delivered(chat_id)
            }
            Err(e) => {
                tracing::error!(%chat_id, error = %e, "Failed to deliver message");
                RelayResponse::error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "failed to send message",
                )
            }
        }
    }

    /// Best-effort security alert to the admin chat. Failures are logged and
    /// never change the response to the original caller.
    async fn alert_unauthorized(
        &self,
        params: &RelayParams,
        chat_id: &str,
        from: Option<&Sender>,
        text: &str,
    ) {
        let sender = from.map(Sender::display).unwrap_or_else(|| "unknown".into());
        // Quote only a prefix so the alert itself stays deliverable.
        let preview: String = text.chars().take(ALERT_TEXT_CHARS).collect();
        let alert = format!(
            "Unauthorized access attempt\nchat_id: {chat_id}\nsender: {sender}\ntext: {preview}\ntime: {}",
            Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        );

        if let Err(e) = self
            .dispatcher
            .send(Some(&alert), &params.admin_chat_id, &params.bot_token)
            .await
        {
            tracing::warn!(error = %e, "Failed to deliver unauthorized-access alert");
        }
    }
}
