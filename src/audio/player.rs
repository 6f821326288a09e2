//! Playback and voice-connection capabilities.
//!
//! The session only talks to these traits; [`super::songbird_backend`] is the
//! production implementation.

use async_trait::async_trait;
use serenity::model::id::{ChannelId, GuildId};

use crate::error::{MusicError, MusicResult};

/// Completion callback handed to [`Player::start`].
///
/// Receives `Some(error)` when the engine failed mid-track.
pub type OnFinished = Box<dyn FnOnce(Option<MusicError>) + Send + 'static>;

#[async_trait]
pub trait Player: Send + Sync {
    /// Starts streaming `stream_url`.
    ///
    /// After `Ok`, `on_finished` fires exactly once: when the track ends, when
    /// the engine reports an error, or when it is interrupted by [`Player::stop`].
    /// After `Err` it is dropped without firing.
    async fn start(&self, stream_url: &str, on_finished: OnFinished) -> MusicResult<()>;

    async fn stop(&self);

    async fn pause(&self);

    async fn resume(&self);

    async fn is_playing(&self) -> bool;

    async fn is_paused(&self) -> bool;
}

/// Conexión de voz de una guild. La sesión es su único dueño.
#[async_trait]
pub trait VoiceConnection: Player {
    async fn current_channel(&self) -> Option<ChannelId>;

    async fn is_connected(&self) -> bool;

    /// Mueve la conexión existente sin reconectar
    async fn move_to(&self, channel_id: ChannelId) -> MusicResult<()>;

    async fn disconnect(&self);
}

/// Abre conexiones de voz.
#[async_trait]
pub trait VoiceGateway: Send + Sync {
    async fn connect(&self, guild_id: GuildId, channel_id: ChannelId) -> MusicResult<Box<dyn VoiceConnection>>;
}
