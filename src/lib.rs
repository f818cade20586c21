//! AgroMind: a terminal chat client for an agriculture question-answering
//! backend.

pub mod app;
pub mod clipboard;
pub mod config;
pub mod conversation;
pub mod events;
pub mod gateway;
pub mod sanitize;
pub mod ui;
