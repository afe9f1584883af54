use thiserror::Error;

/// Errors produced while delivering a message to the messaging API.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Message is too long: {length} characters (limit 4096)")]
    MessageTooLong { length: usize },

    #[error("Bot token is missing")]
    MissingToken,

    #[error("Destination chat id is missing")]
    MissingChatId,

    #[error("Messaging API error (status {status}): {description}")]
    Api { status: u16, description: String },

    #[error("Failed to reach messaging API: {0}")]
    Network(String),

    #[error("Failed to send message: all attempts exhausted")]
    SendFailed,
}
