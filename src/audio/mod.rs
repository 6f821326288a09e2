//! # Audio Module
//!
//! Per-guild playback orchestration for MaiSum Music.
//!
//! ## Architecture
//!
//! ### [`scheduler`] - Playback Scheduler
//! - Entry point for every parsed command
//! - Creates guild sessions on first `play`/`join` and routes everything else
//! - Resolves tracks outside the session, then enqueues the result
//!
//! ### [`session`] - Guild Session
//! - One actor per guild owning connection, queue, current track and idle timer
//! - Track completion and timer expiry arrive as messages, never as shared mutation
//!
//! ### [`registry`] - Session Registry
//! - `GuildId` → live session mailbox, removed exactly once per session
//!
//! ### [`player`] / [`songbird_backend`] - Voice
//! - Capability traits the session plays through, and their songbird implementation
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use maisum_music::audio::scheduler::{Command, PlaybackScheduler};
//! use serenity::all::{ChannelId, GuildId};
//!
//! # async fn example(scheduler: PlaybackScheduler) {
//! let guild_id = GuildId::new(123456789);
//! let channel = Some(ChannelId::new(42));
//!
//! let outcome = scheduler
//!     .dispatch(guild_id, channel, Command::Play { input: "lofi beats".into() })
//!     .await;
//! println!("{}", outcome.message);
//! # }
//! ```

pub mod outcome;
pub mod player;
pub mod presence;
pub mod queue;
pub mod registry;
pub mod scheduler;
pub mod session;
pub mod songbird_backend;

#[cfg(test)]
pub(crate) mod testing;

pub use outcome::{CommandOutcome, QueueListing, Status};
pub use scheduler::{Command, PlaybackScheduler, SchedulerSettings};
