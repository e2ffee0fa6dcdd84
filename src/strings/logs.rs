//! # Log Strings
//!
//! Format helpers for recurring operator-facing log lines.

pub fn message_received(chat: &str, handle: &str, text: &str) -> String {
    format!("Message from @{handle} in {chat}: {text}")
}

pub fn state_transition(chat: &str, from: &str, to: &str) -> String {
    format!("Chat {chat}: {from} -> {to}")
}

pub fn chats_saved(count: usize, path: &str) -> String {
    format!("Saved {count} chats to {path}")
}

pub fn chats_loaded(count: usize, path: &str) -> String {
    format!("Loaded {count} chats from {path}")
}

pub fn record_skipped(index: usize, err: &str) -> String {
    format!("Skipping unreadable chat record #{index}: {err}")
}

pub fn unknown_state(chat: &str, state: &str) -> String {
    format!("Chat {chat} has unrecognized state '{state}', restarting survey")
}

pub const SHUTDOWN: &str = "Shutting down, saving chats...";
