use dashmap::DashMap;
use serenity::model::id::GuildId;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use super::{
    outcome::CommandOutcome,
    session::{SessionCommand, SessionMessage},
};

/// Buzón de una sesión viva.
///
/// `epoch` distingue a una sesión de la que la reemplace en la misma guild.
#[derive(Clone)]
pub struct SessionHandle {
    epoch: u64,
    tx: mpsc::UnboundedSender<SessionMessage>,
}

impl SessionHandle {
    pub(crate) fn new(epoch: u64, tx: mpsc::UnboundedSender<SessionMessage>) -> Self {
        Self { epoch, tx }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Envía un comando y espera la respuesta. `None` si la sesión ya cerró.
    pub async fn request(&self, command: SessionCommand) -> Option<CommandOutcome> {
        let (reply, response) = oneshot::channel();
        self.tx.send(SessionMessage::Command { command, reply }).ok()?;
        response.await.ok()
    }

    /// Mensaje sin respuesta (eventos de gateway, temporizadores).
    pub(crate) fn notify(&self, message: SessionMessage) -> bool {
        self.tx.send(message).is_ok()
    }
}

/// guild → sesión activa. Cada entrada se aísla en su propio actor; no hay lock global.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<DashMap<GuildId, SessionHandle>>,
    epochs: Arc<AtomicU64>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, guild_id: GuildId) -> Option<SessionHandle> {
        self.sessions.get(&guild_id).map(|entry| entry.value().clone())
    }

    /// Devuelve la sesión de la guild o crea una con `spawn(epoch)`.
    pub fn get_or_spawn<F>(&self, guild_id: GuildId, spawn: F) -> SessionHandle
    where
        F: FnOnce(u64) -> SessionHandle,
    {
        self.sessions
            .entry(guild_id)
            .or_insert_with(|| {
                let epoch = self.epochs.fetch_add(1, Ordering::Relaxed) + 1;
                debug!("🆕 Nueva sesión para guild {} (epoch {})", guild_id, epoch);
                spawn(epoch)
            })
            .value()
            .clone()
    }

    /// Quita la sesión sólo si sigue siendo la misma `epoch`.
    ///
    /// Returns `false` when it was already gone or replaced, so repeated removals are no-ops.
    pub fn remove(&self, guild_id: GuildId, epoch: u64) -> bool {
        let removed = self
            .sessions
            .remove_if(&guild_id, |_, handle| handle.epoch == epoch)
            .is_some();

        if removed {
            debug!("🧹 Sesión de guild {} eliminada (epoch {})", guild_id, epoch);
        }
        removed
    }

    pub fn guilds(&self) -> Vec<GuildId> {
        self.sessions.iter().map(|entry| *entry.key()).collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
