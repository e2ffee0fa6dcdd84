//! # Message Router
//!
//! Entry point for every inbound event. Validates it, resolves the chat record,
//! runs the conversation engine (or the statistics report), sends the replies and
//! writes the store back to disk.

use anyhow::Result;
use chrono::{FixedOffset, Utc};
use std::sync::Arc;

use crate::application::engine::{ConversationEngine, Turn};
use crate::application::stats::StatReporter;
use crate::application::store::ChatStore;
use crate::domain::traits::ChatProvider;
use crate::domain::types::{InboundEvent, InboundMessage, OutboundMessage};
use crate::strings::logs;

pub struct MessageRouter {
    store: Arc<ChatStore>,
    engine: ConversationEngine,
    timezone: FixedOffset,
    stats_limit: usize,
}

impl MessageRouter {
    pub fn new(
        store: Arc<ChatStore>,
        engine: ConversationEngine,
        timezone: FixedOffset,
        stats_limit: usize,
    ) -> Self {
        Self {
            store,
            engine,
            timezone,
            stats_limit,
        }
    }

    pub async fn route<C>(&self, chat: &C, event: InboundEvent) -> Result<()>
    where
        C: ChatProvider,
    {
        let msg = match InboundMessage::try_from(event) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::warn!("Dropping inbound event: {}", e);
                return Ok(());
            }
        };
        tracing::info!(
            "{}",
            logs::message_received(&msg.chat_id.to_string(), &msg.handle, &msg.text)
        );

        let (record, _created) = self
            .store
            .lookup_or_create(&msg.chat_id, &msg.display_name, &msg.handle)
            .await;

        // The chat lock is released before sending or saving; save_all reads every chat.
        let turn = {
            let mut record = record.lock().await;
            let now = Utc::now().with_timezone(&self.timezone);
            self.engine.handle(&mut record, &msg, now)
        };

        match turn {
            Turn::Reply(replies) => {
                self.send_all(chat, &replies).await;
                if let Err(e) = self.store.save_all().await {
                    tracing::error!("Failed to save chats: {}", e);
                }
            }
            Turn::Stats => {
                let records = self.store.snapshot().await;
                let report = StatReporter::summarize(&records, self.stats_limit);
                self.send_all(chat, &[OutboundMessage::text(report)]).await;
            }
        }
        Ok(())
    }

    async fn send_all<C: ChatProvider>(&self, chat: &C, replies: &[OutboundMessage]) {
        for reply in replies {
            if let Err(e) = chat.send_message(&reply.text, reply.options.as_ref()).await {
                tracing::error!("Failed to send message to {}: {}", chat.room_id(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config::AdminList;
    use crate::domain::types::{ChatId, ChatState, QuestionId, ReplyOptions};
    use crate::strings::messages;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;
    use tempfile::TempDir;

    /// Records everything sent instead of delivering it.
    struct RecordingChat {
        room: String,
        sent: StdMutex<Vec<String>>,
    }

    impl RecordingChat {
        fn new(room: &str) -> Self {
            Self {
                room: room.to_string(),
                sent: StdMutex::new(Vec::new()),
            }
        }

        fn take(&self) -> Vec<String> {
            std::mem::take(&mut *self.sent.lock().unwrap())
        }
    }

    #[async_trait]
    impl ChatProvider for RecordingChat {
        async fn send_message(
            &self,
            content: &str,
            _options: Option<&ReplyOptions>,
        ) -> Result<String, String> {
            self.sent.lock().unwrap().push(content.to_string());
            Ok("msg-id".to_string())
        }

        fn room_id(&self) -> String {
            self.room.clone()
        }
    }

    fn router(dir: &TempDir) -> (MessageRouter, Arc<ChatStore>) {
        let store = Arc::new(ChatStore::new(dir.path().join("chats.json")));
        let router = MessageRouter::new(
            store.clone(),
            ConversationEngine::new(AdminList::parse("boss")),
            FixedOffset::east_opt(3 * 3600).unwrap(),
            8,
        );
        (router, store)
    }

    fn event(cid: i64, handle: &str, text: &str) -> InboundEvent {
        InboundEvent {
            chat_id: Some(ChatId::from(cid)),
            handle: Some(handle.to_string()),
            display_name: None,
            text: Some(text.to_string()),
        }
    }

    #[tokio::test]
    async fn test_survey_scenario_is_persisted() {
        let dir = TempDir::new().unwrap();
        let (router, store) = router(&dir);
        let chat = RecordingChat::new("1");

        router.route(&chat, event(1, "alice", "/start")).await.unwrap();
        let sent = chat.take();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1], messages::QUESTION_1);

        router
            .route(&chat, event(1, "alice", "Предприниматель"))
            .await
            .unwrap();
        assert_eq!(chat.take(), vec![messages::QUESTION_2.to_string()]);

        router.route(&chat, event(1, "alice", "Да")).await.unwrap();
        assert_eq!(chat.take(), vec![messages::FINISH.to_string()]);

        let reloaded = ChatStore::new(store.path());
        assert_eq!(reloaded.load_all().await.unwrap(), 1);
        let records = reloaded.snapshot().await;
        assert_eq!(records[0].current, ChatState::Extra);
        assert_eq!(records[0].answers[0].qid, QuestionId::Q1);
        assert_eq!(records[0].answers[0].answer, "Предприниматель");
        assert_eq!(records[0].answers[1].answer, "Да");
    }

    #[tokio::test]
    async fn test_admin_stats_leave_other_chats_untouched() {
        let dir = TempDir::new().unwrap();
        let (router, store) = router(&dir);
        let user = RecordingChat::new("1");
        let admin = RecordingChat::new("2");

        router.route(&user, event(1, "carol", "hi")).await.unwrap();
        router.route(&admin, event(2, "Boss", "/start")).await.unwrap();
        assert_eq!(admin.take().len(), 3);

        router.route(&admin, event(2, "Boss", "/stat")).await.unwrap();
        let sent = admin.take();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("@carol\nQ1: \nQ2: "));

        let records = store.snapshot().await;
        assert_eq!(records[0].current, ChatState::Q1);
        assert!(records[0].answers.is_empty());
        assert_eq!(records[1].current, ChatState::Q1);
        assert!(records[1].answers.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_turns_lose_no_answers() {
        let dir = TempDir::new().unwrap();
        let (router, store) = router(&dir);
        let router = Arc::new(router);

        let chat = RecordingChat::new("100");
        for text in ["/start", "IT", "Да"] {
            router.route(&chat, event(100, "erin", text)).await.unwrap();
        }

        let mut tasks = Vec::new();
        for i in 0..30 {
            let router = router.clone();
            tasks.push(tokio::spawn(async move {
                let chat = RecordingChat::new("100");
                router
                    .route(&chat, event(100, "erin", &format!("note {i}")))
                    .await
            }));
        }
        for cid in 0..20 {
            let router = router.clone();
            tasks.push(tokio::spawn(async move {
                let chat = RecordingChat::new(&cid.to_string());
                router.route(&chat, event(cid, &format!("user{cid}"), "hi")).await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let records = store.snapshot().await;
        assert_eq!(records.len(), 21);

        let erin = &records[0];
        assert_eq!(erin.current, ChatState::Extra);
        assert_eq!(erin.answers.len(), 32);
        for i in 0..30 {
            let text = format!("note {i}");
            let count = erin.answers.iter().filter(|a| a.answer == text).count();
            assert_eq!(count, 1, "{text}");
        }
        assert!(records[1..].iter().all(|r| r.current == ChatState::Q1));

        let reloaded = ChatStore::new(store.path());
        assert_eq!(reloaded.load_all().await.unwrap(), 21);
        assert_eq!(reloaded.snapshot().await, records);
    }

    #[tokio::test]
    async fn test_malformed_event_is_dropped() {
        let dir = TempDir::new().unwrap();
        let (router, store) = router(&dir);
        let chat = RecordingChat::new("1");

        let mut anonymous = event(1, "x", "hello");
        anonymous.handle = None;
        router.route(&chat, anonymous).await.unwrap();

        assert!(chat.take().is_empty());
        assert_eq!(store.len().await, 0);
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_bogus_persisted_state_restarts_flow() {
        let dir = TempDir::new().unwrap();
        let (router, store) = router(&dir);
        std::fs::write(
            store.path(),
            r#"[{"cid": 5, "current": "bogus", "uname": "dan", "tgid": "dan", "answers": []}]"#,
        )
        .unwrap();
        store.load_all().await.unwrap();

        let chat = RecordingChat::new("5");
        router.route(&chat, event(5, "dan", "hello")).await.unwrap();

        assert_eq!(chat.take().len(), 2);
        assert_eq!(store.snapshot().await[0].current, ChatState::Q1);
    }
}
