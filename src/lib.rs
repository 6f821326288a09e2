//! MaiSum Music: a Discord music bot built around one playback actor per guild.

pub mod audio;
pub mod bot;
pub mod config;
pub mod error;
pub mod sources;
pub mod ui;
