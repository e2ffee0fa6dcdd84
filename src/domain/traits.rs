//! # Domain Traits
//!
//! Abstract interface for the chat transport.
//! Allows for pluggable implementations in the Infrastructure layer.

use async_trait::async_trait;

use crate::domain::types::ReplyOptions;

/// Abstract interface for a Chat Provider (e.g., Matrix, Console)
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Send a message to the chat, returning the transport's message id
    async fn send_message(
        &self,
        content: &str,
        options: Option<&ReplyOptions>,
    ) -> Result<String, String>;

    /// Get the current chat ID
    fn room_id(&self) -> String;
}
