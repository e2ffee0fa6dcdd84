//! # Domain Layer
//!
//! Core definitions, types, and traits that define the survey domain.
//! Independent of the chat transport, serving as the contract for other layers.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;
