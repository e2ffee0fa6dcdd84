//! # Strings Module
//!
//! Centralizes user-facing survey texts and recurring log lines.

pub mod logs;
pub mod messages;
