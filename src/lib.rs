//! vozbot - Telegram companion bot replying with a mix of text and voice.

pub mod bot;
pub mod config;
