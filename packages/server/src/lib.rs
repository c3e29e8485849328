//! Real-time chat fan-out and notification consolidation server.
//!
//! Clients connect over WebSocket, join chat rooms and exchange
//! `{"event", "data"}` frames. Each new message is persisted, consolidated
//! into one unread notification per sender for every recipient, and fanned
//! out to the chat room and the recipients' identity channels.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

pub mod config;
