//! # Statistics Report
//!
//! Read-only summary of the most recent registrations, sent to administrators on request.

use crate::domain::types::{ChatRecord, QuestionId};
use crate::strings::messages;

pub struct StatReporter;

impl StatReporter {
    /// One block per chat for the last `limit` registrations, oldest first.
    pub fn summarize(records: &[ChatRecord], limit: usize) -> String {
        let start = records.len().saturating_sub(limit);
        let blocks: Vec<String> = records[start..].iter().map(Self::chat_block).collect();

        let mut report = format!(
            "{}\n{}",
            messages::STATS_HEADER,
            messages::registered_count(records.len())
        );
        if !blocks.is_empty() {
            report.push_str("\n\n");
            report.push_str(&blocks.join("\n\n"));
        }
        report
    }

    fn chat_block(record: &ChatRecord) -> String {
        let answer = |qid: QuestionId| {
            record
                .last_answer(&qid)
                .map(|a| a.answer.as_str())
                .unwrap_or_default()
        };

        let mut parts = vec![format!("@{}", record.tgid)];
        if record.uname != record.tgid {
            parts.push(record.uname.clone());
        }
        parts.push(format!("Q1: {}", answer(QuestionId::Q1)));
        parts.push(format!("Q2: {}", answer(QuestionId::Q2)));

        let extra = answer(QuestionId::Extra);
        if !extra.is_empty() {
            parts.push(extra.to_string());
        }
        if let Some(last) = record.answers.last() {
            parts.push(trim_seconds(&last.timestamp).to_string());
        }
        parts.join("\n")
    }
}

/// `YYYY-MM-DD HH:MM:SS` -> `YYYY-MM-DD HH:MM`
fn trim_seconds(timestamp: &str) -> &str {
    match timestamp.rfind(':') {
        Some(idx) if idx > timestamp.find(':').unwrap_or(idx) => &timestamp[..idx],
        _ => timestamp,
    }
}
