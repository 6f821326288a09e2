//! Rendering of command outcomes for Discord.

pub mod embeds;
