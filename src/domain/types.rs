//! # Domain Types
//!
//! The survey records that get persisted (`ChatRecord`, `AnswerRecord`), the conversation
//! state enumeration, and the transport-neutral inbound/outbound message shapes.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::error::TransportEventError;

/// Format used for answer timestamps in the persisted file.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Identity of a chat. Numeric ids are persisted as JSON integers,
/// opaque ids (e.g. Matrix room ids) as strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChatId {
    Numeric(i64),
    Opaque(String),
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatId::Numeric(id) => write!(f, "{id}"),
            ChatId::Opaque(id) => f.write_str(id),
        }
    }
}

impl From<i64> for ChatId {
    fn from(id: i64) -> Self {
        ChatId::Numeric(id)
    }
}

impl From<&str> for ChatId {
    fn from(id: &str) -> Self {
        ChatId::Opaque(id.to_string())
    }
}

/// Position of a chat in the survey.
///
/// `Unrecognized` keeps whatever value a persisted record carried so it is
/// written back verbatim until the engine restarts that chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ChatState {
    New,
    Q1,
    Q2,
    Extra,
    Unrecognized(String),
}

impl From<String> for ChatState {
    fn from(value: String) -> Self {
        match value.as_str() {
            "new" => ChatState::New,
            "q1" => ChatState::Q1,
            "q2" => ChatState::Q2,
            "extra" => ChatState::Extra,
            _ => ChatState::Unrecognized(value),
        }
    }
}

impl From<ChatState> for String {
    fn from(state: ChatState) -> Self {
        match state {
            ChatState::New => "new".to_string(),
            ChatState::Q1 => "q1".to_string(),
            ChatState::Q2 => "q2".to_string(),
            ChatState::Extra => "extra".to_string(),
            ChatState::Unrecognized(raw) => raw,
        }
    }
}

impl fmt::Display for ChatState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from(self.clone()))
    }
}

/// Which question an answer belongs to. Unknown tags from older files are kept as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum QuestionId {
    Q1,
    Q2,
    Extra,
    Other(String),
}

impl From<String> for QuestionId {
    fn from(value: String) -> Self {
        match value.as_str() {
            "q1" => QuestionId::Q1,
            "q2" => QuestionId::Q2,
            "extra" => QuestionId::Extra,
            _ => QuestionId::Other(value),
        }
    }
}

impl From<QuestionId> for String {
    fn from(qid: QuestionId) -> Self {
        match qid {
            QuestionId::Q1 => "q1".to_string(),
            QuestionId::Q2 => "q2".to_string(),
            QuestionId::Extra => "extra".to_string(),
            QuestionId::Other(raw) => raw,
        }
    }
}

/// A single recorded answer. Never modified after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub qid: QuestionId,
    pub answer: String,
    pub timestamp: String,
}

impl AnswerRecord {
    pub fn new(qid: QuestionId, answer: &str, captured_at: DateTime<FixedOffset>) -> Self {
        Self {
            qid,
            answer: answer.to_string(),
            timestamp: captured_at.format(TIMESTAMP_FORMAT).to_string(),
        }
    }
}

/// Persistent survey record for one chat.
/// Field names match the layout of the chats file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRecord {
    pub cid: ChatId,
    pub current: ChatState,
    pub uname: String,
    pub tgid: String,
    #[serde(default)]
    pub answers: Vec<AnswerRecord>,
}

impl ChatRecord {
    pub fn new(cid: ChatId, display_name: &str, handle: &str) -> Self {
        let uname = if display_name.trim().is_empty() {
            handle.to_string()
        } else {
            display_name.to_string()
        };
        Self {
            cid,
            current: ChatState::New,
            uname,
            tgid: handle.to_string(),
            answers: Vec::new(),
        }
    }

    /// Latest answer recorded for the given question, if any.
    pub fn last_answer(&self, qid: &QuestionId) -> Option<&AnswerRecord> {
        self.answers.iter().rev().find(|a| &a.qid == qid)
    }
}

/// Raw event as handed over by a transport adapter.
#[derive(Debug, Clone, Default)]
pub struct InboundEvent {
    pub chat_id: Option<ChatId>,
    pub handle: Option<String>,
    pub display_name: Option<String>,
    pub text: Option<String>,
}

/// A validated inbound message: identity and text are guaranteed present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub chat_id: ChatId,
    pub handle: String,
    pub display_name: String,
    pub text: String,
}

impl TryFrom<InboundEvent> for InboundMessage {
    type Error = TransportEventError;

    fn try_from(event: InboundEvent) -> Result<Self, Self::Error> {
        let chat_id = event.chat_id.ok_or(TransportEventError::MissingChat)?;
        let handle = event
            .handle
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty())
            .ok_or_else(|| TransportEventError::MissingParticipant(chat_id.to_string()))?;
        let text = event
            .text
            .ok_or_else(|| TransportEventError::MissingText(chat_id.to_string()))?;
        let display_name = event
            .display_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| handle.clone());

        Ok(Self {
            chat_id,
            handle,
            display_name,
            text,
        })
    }
}

/// Presentation hints for an outbound message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReplyOptions {
    /// Suggested answers; each inner vec is one keyboard row.
    pub keyboard: Vec<Vec<String>>,
    /// Ask the transport to hide a previously shown keyboard.
    pub remove_keyboard: bool,
}

impl ReplyOptions {
    pub fn keyboard(buttons: &[&str], row_width: usize) -> Self {
        let keyboard = buttons
            .chunks(row_width.max(1))
            .map(|row| row.iter().map(|b| b.to_string()).collect())
            .collect();
        Self {
            keyboard,
            remove_keyboard: false,
        }
    }

    pub fn remove_keyboard() -> Self {
        Self {
            keyboard: Vec::new(),
            remove_keyboard: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub text: String,
    pub options: Option<ReplyOptions>,
}

impl OutboundMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            options: None,
        }
    }

    pub fn with_options(text: impl Into<String>, options: ReplyOptions) -> Self {
        Self {
            text: text.into(),
            options: Some(options),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_state_keeps_unknown_values() {
        let state: ChatState = serde_json::from_str("\"bogus\"").unwrap();
        assert_eq!(state, ChatState::Unrecognized("bogus".to_string()));
        assert_eq!(serde_json::to_string(&state).unwrap(), "\"bogus\"");

        let state: ChatState = serde_json::from_str("\"extra\"").unwrap();
        assert_eq!(state, ChatState::Extra);
    }

    #[test]
    fn test_chat_id_serializes_numeric_as_integer() {
        assert_eq!(serde_json::to_string(&ChatId::from(42)).unwrap(), "42");
        let id: ChatId = serde_json::from_str("\"!room:example.org\"").unwrap();
        assert_eq!(id, ChatId::from("!room:example.org"));
    }

    #[test]
    fn test_inbound_event_requires_participant() {
        let event = InboundEvent {
            chat_id: Some(ChatId::from(1)),
            handle: Some("  ".to_string()),
            display_name: None,
            text: Some("hi".to_string()),
        };
        assert!(matches!(
            InboundMessage::try_from(event),
            Err(TransportEventError::MissingParticipant(_))
        ));
    }

    #[test]
    fn test_inbound_event_display_name_falls_back_to_handle() {
        let event = InboundEvent {
            chat_id: Some(ChatId::from(1)),
            handle: Some("alice".to_string()),
            display_name: None,
            text: Some("hi".to_string()),
        };
        let msg = InboundMessage::try_from(event).unwrap();
        assert_eq!(msg.display_name, "alice");
    }

    #[test]
    fn test_keyboard_rows() {
        let opts = ReplyOptions::keyboard(&["a", "b", "c"], 2);
        assert_eq!(opts.keyboard, vec![vec!["a", "b"], vec!["c"]]);
    }
}
