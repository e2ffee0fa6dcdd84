//! # Matrix Service Adapter
//!
//! Implements the `ChatProvider` trait for the Matrix protocol using the `matrix_sdk`.
//! Also converts Matrix room message events into transport-neutral `InboundEvent`s.
//! No other module touches Matrix types.

use async_trait::async_trait;
use matrix_sdk::room::Room;
use matrix_sdk::ruma::UserId;
use matrix_sdk::ruma::events::room::message::{
    MessageType, OriginalSyncRoomMessageEvent, RoomMessageEventContent,
};

use crate::domain::traits::ChatProvider;
use crate::domain::types::{ChatId, InboundEvent, ReplyOptions};
use crate::strings::messages;

#[derive(Clone)]
pub struct MatrixService {
    room: Room,
}

impl MatrixService {
    pub fn new(room: Room) -> Self {
        Self { room }
    }

    /// Builds an `InboundEvent` from a text message. Non-text messages yield `None`.
    pub async fn inbound_event(&self, ev: &OriginalSyncRoomMessageEvent) -> Option<InboundEvent> {
        let MessageType::Text(text) = &ev.content.msgtype else {
            return None;
        };

        let display_name = match self.room.get_member(&ev.sender).await {
            Ok(Some(member)) => member.display_name().map(str::to_string),
            Ok(None) => None,
            Err(e) => {
                tracing::debug!("Could not fetch member {}: {}", ev.sender, e);
                None
            }
        };

        Some(InboundEvent {
            chat_id: Some(ChatId::from(self.room.room_id().as_str())),
            handle: Some(handle_of(&ev.sender)),
            display_name,
            text: Some(text.body.clone()),
        })
    }
}

/// Localpart of a Matrix user id, e.g. `alice` for `@alice:example.org`.
fn handle_of(user: &UserId) -> String {
    user.localpart().to_string()
}

/// Keyboards are not available in Matrix; suggested answers are listed under the text.
pub fn render(content: &str, options: Option<&ReplyOptions>) -> String {
    let buttons: Vec<&String> = options
        .map(|o| o.keyboard.iter().flatten().collect())
        .unwrap_or_default();
    if buttons.is_empty() {
        return content.to_string();
    }

    let mut out = format!("{content}\n\n{}", messages::SUGGESTED_ANSWERS);
    for (i, button) in buttons.iter().enumerate() {
        out.push_str(&format!("\n{}. {}", i + 1, button));
    }
    out
}

/// Message content as sent to the room: markdown, like the rest of the bot's output.
fn message_content(content: &str, options: Option<&ReplyOptions>) -> RoomMessageEventContent {
    RoomMessageEventContent::text_markdown(render(content, options))
}

#[async_trait]
impl ChatProvider for MatrixService {
    fn room_id(&self) -> String {
        self.room.room_id().as_str().to_string()
    }

    async fn send_message(
        &self,
        content: &str,
        options: Option<&ReplyOptions>,
    ) -> Result<String, String> {
        let message = message_content(content, options);
        tracing::info!("Bot sending message to {}: {}", self.room_id(), message.body());
        self.room
            .send(message)
            .await
            .map(|resp| resp.event_id.to_string())
            .map_err(|e| e.to_string())
    }
}
