//! # Infrastructure Layer
//!
//! Handles interactions with external systems.
//! Implements the traits defined in the Domain layer (e.g., ChatProvider).

pub mod logging;
pub mod matrix;
