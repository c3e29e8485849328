//! Utilities shared between the Hangspace server binary, its library and tests.

pub mod logger;
pub mod time;
