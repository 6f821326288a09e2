use futures::future::join_all;
use serenity::model::id::{ChannelId, GuildId};
use std::{sync::Arc, time::Duration};
use tracing::{debug, info, warn};

use super::{
    outcome::CommandOutcome,
    player::VoiceGateway,
    presence::PresenceReporter,
    registry::{SessionHandle, SessionRegistry},
    session::{GuildSession, SessionCommand, SessionDeps, SessionMessage},
};
use crate::sources::TrackResolver;

/// Comandos que llegan desde Discord, ya parseados.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Play { input: String },
    Pause,
    Resume,
    Skip,
    Queue,
    Clear,
    Join,
    Leave,
}

#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub idle_timeout: Duration,
    pub max_queue_size: usize,
}

/// Enruta comandos a la sesión de cada guild.
///
/// The scheduler never touches session state itself; it only creates sessions,
/// forwards commands into their mailboxes and resolves tracks before enqueueing.
pub struct PlaybackScheduler {
    resolver: Arc<TrackResolver>,
    deps: SessionDeps,
}

impl PlaybackScheduler {
    pub fn new(
        resolver: Arc<TrackResolver>,
        gateway: Arc<dyn VoiceGateway>,
        presence: Arc<dyn PresenceReporter>,
        settings: SchedulerSettings,
    ) -> Self {
        Self {
            resolver,
            deps: SessionDeps {
                gateway,
                presence,
                registry: SessionRegistry::new(),
                idle_timeout: settings.idle_timeout,
                max_queue_size: settings.max_queue_size,
            },
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.deps.registry
    }

    /// Ejecuta `command` en la sesión de la guild y devuelve el resultado a renderizar.
    ///
    /// `requester_channel` is the voice channel of whoever issued the command;
    /// only `play` and `join` need it.
    pub async fn dispatch(
        &self,
        guild_id: GuildId,
        requester_channel: Option<ChannelId>,
        command: Command,
    ) -> CommandOutcome {
        debug!("🎛️ {:?} en guild {}", command, guild_id);

        match command {
            Command::Play { input } => self.play(guild_id, requester_channel, &input).await,
            Command::Join => match requester_channel {
                Some(channel_id) => self.request(guild_id, SessionCommand::Join(channel_id), true).await,
                None => not_in_voice(),
            },
            Command::Pause => self.existing(guild_id, SessionCommand::Pause, "🔇 No hay nada reproduciéndose").await,
            Command::Resume => self.existing(guild_id, SessionCommand::Resume, "▶️ No hay nada en pausa").await,
            Command::Skip => self.existing(guild_id, SessionCommand::Skip, "🔇 No hay nada que saltar").await,
            Command::Queue => self.existing(guild_id, SessionCommand::Queue, "📭 La cola está vacía").await,
            Command::Clear => self.existing(guild_id, SessionCommand::Clear, "📭 La cola ya está vacía").await,
            Command::Leave => self.existing(guild_id, SessionCommand::Leave, "🔇 No estoy en un canal de voz").await,
        }
    }

    /// Une la sesión al canal, resuelve fuera de la sesión y encola el resultado.
    async fn play(&self, guild_id: GuildId, requester_channel: Option<ChannelId>, input: &str) -> CommandOutcome {
        let Some(channel_id) = requester_channel else {
            return not_in_voice();
        };
        let input = input.trim();
        if input.is_empty() {
            return CommandOutcome::error("❌ Indica un enlace o una búsqueda");
        }

        let joined = self.request(guild_id, SessionCommand::Join(channel_id), true).await;
        if !joined.is_ok() {
            return joined;
        }

        let resolved = match self.resolver.resolve(input).await {
            Ok(resolved) => resolved,
            Err(e) => {
                warn!("❌ No se pudo resolver '{}' en guild {}: {}", input, guild_id, e);
                self.request(guild_id, SessionCommand::ResumeIdleWatch, false).await;
                return CommandOutcome::error(format!("❌ {}", e));
            }
        };

        self.request(guild_id, SessionCommand::Enqueue(resolved), true).await
    }

    /// Comandos que no crean sesión: sin sesión, no hay nada que hacer.
    async fn existing(&self, guild_id: GuildId, command: SessionCommand, idle_message: &str) -> CommandOutcome {
        if self.registry().get(guild_id).is_none() {
            return CommandOutcome::no_op(idle_message);
        }
        self.request(guild_id, command, false).await
    }

    /// Envía a la sesión viva, reintentando una vez si cerró entre la búsqueda y el envío.
    async fn request(&self, guild_id: GuildId, command: SessionCommand, spawn: bool) -> CommandOutcome {
        for _ in 0..2 {
            let Some(handle) = self.session(guild_id, spawn) else {
                return CommandOutcome::no_op("🔇 No estoy en un canal de voz");
            };

            if let Some(outcome) = handle.request(command.clone()).await {
                return outcome;
            }

            debug!("Sesión de guild {} cerrada (epoch {}), reintentando", guild_id, handle.epoch());
            self.registry().remove(guild_id, handle.epoch());
        }

        CommandOutcome::error("❌ La sesión de voz no respondió, intenta de nuevo")
    }

    fn session(&self, guild_id: GuildId, spawn: bool) -> Option<SessionHandle> {
        if !spawn {
            return self.registry().get(guild_id);
        }

        let deps = self.deps.clone();
        Some(
            self.registry()
                .get_or_spawn(guild_id, |epoch| GuildSession::spawn(guild_id, epoch, deps)),
        )
    }

    /// El gateway informa que el bot ya no está en un canal de esta guild.
    pub fn connection_lost(&self, guild_id: GuildId) {
        if let Some(handle) = self.registry().get(guild_id) {
            handle.notify(SessionMessage::ConnectionLost);
        }
    }

    /// Sale de todos los canales de voz.
    pub async fn shutdown(&self) {
        let guilds = self.registry().guilds();
        info!("🛑 Cerrando {} sesiones de voz", guilds.len());

        join_all(
            guilds
                .into_iter()
                .filter_map(|guild_id| self.registry().get(guild_id))
                .map(|handle| async move { handle.request(SessionCommand::Leave).await }),
        )
        .await;
    }
}

fn not_in_voice() -> CommandOutcome {
    CommandOutcome::error("🔇 Debes estar en un canal de voz")
}
