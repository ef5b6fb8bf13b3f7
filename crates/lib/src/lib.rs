//! Relay core library: Telegram webhook in, OpenAI-compatible completion, reply back out.

pub mod channels;
pub mod config;
pub mod error;
pub mod gateway;
pub mod llm;
pub mod relay;
