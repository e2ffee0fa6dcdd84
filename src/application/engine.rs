//! # Conversation Engine
//!
//! The survey state machine. Given a chat record and one inbound message it decides the
//! next state, appends at most one answer, and returns what should be sent back.
//! Sending and persistence are left to the Router.

use chrono::{DateTime, FixedOffset};

use crate::domain::config::AdminList;
use crate::domain::types::{
    AnswerRecord, ChatRecord, ChatState, InboundMessage, OutboundMessage, QuestionId, ReplyOptions,
};
use crate::strings::{logs, messages};

/// Result of handling one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Turn {
    /// Messages to send, in order. The record was mutated.
    Reply(Vec<OutboundMessage>),
    /// A privileged statistics request. The record was not touched.
    Stats,
}

pub struct ConversationEngine {
    admins: AdminList,
}

impl ConversationEngine {
    pub fn new(admins: AdminList) -> Self {
        Self { admins }
    }

    pub fn is_admin(&self, handle: &str) -> bool {
        self.admins.is_admin(handle)
    }

    pub fn handle(
        &self,
        record: &mut ChatRecord,
        msg: &InboundMessage,
        now: DateTime<FixedOffset>,
    ) -> Turn {
        let chat = record.cid.to_string();
        let before = record.current.clone();

        if record.current == ChatState::New || is_command(&msg.text, messages::START_COMMAND) {
            let turn = self.start(record, &msg.handle);
            log_transition(&chat, &before, &record.current);
            return turn;
        }

        if self.is_admin(&msg.handle) && is_command(&msg.text, messages::STAT_COMMAND) {
            tracing::info!("Statistics requested by @{} in {}", msg.handle, chat);
            return Turn::Stats;
        }

        let reply = match before.clone() {
            ChatState::Q1 => {
                record.answers.push(AnswerRecord::new(QuestionId::Q1, &msg.text, now));
                record.current = ChatState::Q2;
                OutboundMessage::with_options(
                    messages::QUESTION_2,
                    ReplyOptions::keyboard(&messages::QUESTION_2_OPTIONS, 2),
                )
            }
            ChatState::Q2 => {
                record.answers.push(AnswerRecord::new(QuestionId::Q2, &msg.text, now));
                record.current = ChatState::Extra;
                OutboundMessage::with_options(messages::FINISH, ReplyOptions::remove_keyboard())
            }
            ChatState::Extra => {
                record
                    .answers
                    .push(AnswerRecord::new(QuestionId::Extra, &msg.text, now));
                OutboundMessage::with_options(messages::EXTRA_ACK, ReplyOptions::remove_keyboard())
            }
            ChatState::Unrecognized(raw) => {
                tracing::warn!("{}", logs::unknown_state(&chat, &raw));
                let turn = self.start(record, &msg.handle);
                log_transition(&chat, &before, &record.current);
                return turn;
            }
            // Handled above; kept so the match stays exhaustive.
            ChatState::New => return self.start(record, &msg.handle),
        };

        log_transition(&chat, &before, &record.current);
        Turn::Reply(vec![reply])
    }

    /// Greeting and first question. Previously recorded answers are kept.
    fn start(&self, record: &mut ChatRecord, handle: &str) -> Turn {
        let mut replies = vec![
            OutboundMessage::text(messages::greeting(&record.uname)),
            OutboundMessage::with_options(
                messages::QUESTION_1,
                ReplyOptions::keyboard(&messages::QUESTION_1_OPTIONS, 1),
            ),
        ];
        if self.is_admin(handle) {
            replies.push(OutboundMessage::text(messages::admin_notice()));
        }
        record.current = ChatState::Q1;
        Turn::Reply(replies)
    }
}

fn is_command(text: &str, command: &str) -> bool {
    text.trim().eq_ignore_ascii_case(command)
}

fn log_transition(chat: &str, from: &ChatState, to: &ChatState) {
    tracing::debug!(
        "{}",
        logs::state_transition(chat, &from.to_string(), &to.to_string())
    );
}
