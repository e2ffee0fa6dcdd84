//! # Application Layer
//!
//! Contains the core survey logic: the conversation engine, the chat store,
//! the statistics report and the router that ties them to the transport.

pub mod engine;
pub mod router;
pub mod stats;
pub mod store;
