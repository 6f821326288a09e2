//! Per-guild playback state machine.
//!
//! Each [`GuildSession`] runs as its own task and owns the voice connection, the
//! queue, the current track and the idle timer. Everything that mutates that
//! state arrives through one mailbox: user commands, track completion from the
//! audio engine, the idle timer and gateway disconnects. Transitions for a guild
//! are therefore totally ordered while guilds run fully in parallel.

use serenity::model::id::{ChannelId, GuildId};
use std::{sync::Arc, time::Duration};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{
    outcome::{CommandOutcome, LISTING_LIMIT},
    player::{OnFinished, VoiceConnection, VoiceGateway},
    presence::PresenceReporter,
    queue::MusicQueue,
    registry::{SessionHandle, SessionRegistry},
};
use crate::{
    error::{MusicError, MusicResult},
    sources::Resolved,
};

/// Comandos que una sesión atiende y responde.
#[derive(Debug, Clone)]
pub enum SessionCommand {
    Join(ChannelId),
    Enqueue(Resolved),
    /// Re-arma el temporizador si la sesión quedó conectada sin nada que hacer.
    ResumeIdleWatch,
    Pause,
    Resume,
    Skip,
    Clear,
    Queue,
    Leave,
}

pub enum SessionMessage {
    Command {
        command: SessionCommand,
        reply: oneshot::Sender<CommandOutcome>,
    },
    TrackFinished {
        generation: u64,
        error: Option<MusicError>,
    },
    IdleTimeout {
        token: u64,
    },
    /// El gateway informó que el bot salió del canal de voz.
    ConnectionLost,
    #[cfg(test)]
    Inspect(oneshot::Sender<SessionSnapshot>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Close,
}

/// Lo que una sesión necesita del exterior.
#[derive(Clone)]
pub struct SessionDeps {
    pub gateway: Arc<dyn VoiceGateway>,
    pub presence: Arc<dyn PresenceReporter>,
    pub registry: SessionRegistry,
    pub idle_timeout: Duration,
    pub max_queue_size: usize,
}

struct IdleTimer {
    token: u64,
    cancel: CancellationToken,
}

pub struct GuildSession {
    guild_id: GuildId,
    epoch: u64,
    connection: Option<Box<dyn VoiceConnection>>,
    queue: MusicQueue,
    idle_timer: Option<IdleTimer>,
    idle_tokens: u64,
    /// Identifica el `start` vigente; las notificaciones de pistas anteriores se descartan.
    generation: u64,
    deps: SessionDeps,
    mailbox: mpsc::WeakUnboundedSender<SessionMessage>,
}

impl GuildSession {
    /// Lanza el actor y devuelve su handle.
    pub fn spawn(guild_id: GuildId, epoch: u64, deps: SessionDeps) -> SessionHandle {
        let (tx, rx) = mpsc::unbounded_channel();

        let session = Self {
            guild_id,
            epoch,
            connection: None,
            queue: MusicQueue::new(deps.max_queue_size),
            idle_timer: None,
            idle_tokens: 0,
            generation: 0,
            deps,
            mailbox: tx.downgrade(),
        };
        tokio::spawn(session.run(rx));

        SessionHandle::new(epoch, tx)
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<SessionMessage>) {
        while let Some(message) = rx.recv().await {
            let (flow, reply) = match message {
                SessionMessage::Command { command, reply } => {
                    let (outcome, flow) = self.handle(command).await;
                    (flow, Some((reply, outcome)))
                }
                SessionMessage::TrackFinished { generation, error } => {
                    (self.on_track_finished(generation, error).await, None)
                }
                SessionMessage::IdleTimeout { token } => (self.idle_timeout_fire(token).await, None),
                SessionMessage::ConnectionLost => (self.on_connection_lost().await, None),
                #[cfg(test)]
                SessionMessage::Inspect(reply) => {
                    let _ = reply.send(self.snapshot());
                    (Flow::Continue, None)
                }
            };

            // Fuera del registro antes de responder: quien reciba la respuesta ya ve la guild libre
            if flow == Flow::Close {
                self.deps.registry.remove(self.guild_id, self.epoch);
            }
            if let Some((reply, outcome)) = reply {
                let _ = reply.send(outcome);
            }
            if flow == Flow::Close {
                break;
            }
        }

        self.cancel_idle();
        debug!("Sesión de guild {} finalizada (epoch {})", self.guild_id, self.epoch);
    }

    async fn handle(&mut self, command: SessionCommand) -> (CommandOutcome, Flow) {
        let outcome = match command {
            SessionCommand::Join(channel_id) => match self.join(channel_id).await {
                Ok(()) => CommandOutcome::ok(format!("🔊 Conectado a <#{}>", channel_id)),
                Err(e) => CommandOutcome::error(e.to_string()),
            },
            SessionCommand::Enqueue(resolved) => self.enqueue(resolved).await,
            SessionCommand::ResumeIdleWatch => {
                self.resume_idle_watch().await;
                CommandOutcome::no_op("")
            }
            SessionCommand::Pause => self.pause().await,
            SessionCommand::Resume => self.resume().await,
            SessionCommand::Skip => self.skip().await,
            SessionCommand::Clear => match self.queue.clear() {
                0 => CommandOutcome::no_op("📭 La cola ya está vacía"),
                removed => CommandOutcome::ok(format!("🗑️ Cola limpiada ({} canciones)", removed)),
            },
            SessionCommand::Queue => self.show_queue(),
            SessionCommand::Leave => return (self.leave().await, Flow::Close),
        };

        // Una sesión sin conexión no tiene nada que custodiar
        let flow = if self.connection.is_none() {
            Flow::Close
        } else {
            Flow::Continue
        };
        (outcome, flow)
    }

    /// Conecta o mueve la conexión existente. Cancela el temporizador.
    async fn join(&mut self, channel_id: ChannelId) -> MusicResult<()> {
        self.cancel_idle();

        if let Some(connection) = self.connection.as_ref() {
            if connection.is_connected().await {
                if connection.current_channel().await != Some(channel_id) {
                    connection.move_to(channel_id).await?;
                }
                return Ok(());
            }
            // Lo que quedó de la conexión muerta no se retoma
            debug!("Conexión previa de guild {} ya no está activa, reconectando", self.guild_id);
            self.queue.clear();
            self.queue.finish_current();
            self.deps.presence.report(self.guild_id, None).await;
        }

        let connection = self.deps.gateway.connect(self.guild_id, channel_id).await?;
        self.connection = Some(connection);
        Ok(())
    }

    async fn enqueue(&mut self, resolved: Resolved) -> CommandOutcome {
        let Resolved { tracks, failed } = resolved;
        let total = tracks.len();

        if total == 0 {
            self.resume_idle_watch().await;
            return match failed {
                0 => CommandOutcome::no_op("🔍 No se encontró ninguna canción"),
                n => CommandOutcome::no_op(format!("🔍 No se resolvió ninguna canción ({} fallidas)", n)),
            };
        }

        if !self.is_connected().await {
            return CommandOutcome::error(MusicError::Connection("no estoy conectado a un canal de voz".into()).to_string());
        }

        let first_title = tracks[0].title().to_string();
        let position = self.queue.len() + 1;
        let added = self.queue.add_tracks(tracks);
        let rejected = total - added;

        if added == 0 {
            self.resume_idle_watch().await;
            return CommandOutcome::error(MusicError::QueueFull(self.deps.max_queue_size).to_string());
        }

        self.cancel_idle();
        let was_idle = self.queue.current().is_none();
        let started = was_idle && self.play_next().await;

        if was_idle && !started {
            // Ninguna arrancó: la sesión vuelve a quedar vacía
            self.deps.presence.report(self.guild_id, None).await;
            self.schedule_idle();
            return if added == 1 {
                CommandOutcome::error(format!("❌ No se pudo reproducir: **{}**", first_title))
            } else {
                CommandOutcome::error(format!("❌ No se pudo reproducir ninguna de las {} canciones", added))
            };
        }

        let mut message = if total == 1 && failed == 0 {
            if started {
                format!("🎵 Reproduciendo: **{}**", first_title)
            } else {
                format!("➕ Añadida a la cola: **{}** (posición {})", first_title, position)
            }
        } else {
            format!("📋 {} añadidas, {} fallidas", added, failed)
        };
        if rejected > 0 {
            message.push_str(&format!(" ({} descartadas: cola llena)", rejected));
        }

        CommandOutcome::ok(message)
    }

    /// Saca el siguiente de la cola y lo reproduce. Salta las pistas que no arrancan.
    async fn play_next(&mut self) -> bool {
        let Some(connection) = self.connection.as_ref() else {
            return false;
        };
        if !connection.is_connected().await {
            return false;
        }

        while let Some(track) = self.queue.next_track() {
            self.generation += 1;
            let generation = self.generation;
            let mailbox = self.mailbox.clone();
            let on_finished: OnFinished = Box::new(move |error| {
                if let Some(tx) = mailbox.upgrade() {
                    let _ = tx.send(SessionMessage::TrackFinished { generation, error });
                }
            });

            match connection.start(track.stream_url(), on_finished).await {
                Ok(()) => {
                    info!("🎵 Reproduciendo en guild {}: {}", self.guild_id, track.title());
                    self.deps.presence.report(self.guild_id, Some(&track)).await;
                    return true;
                }
                Err(e) => warn!("❌ No se pudo reproducir {}: {}", track.title(), e),
            }
        }

        self.queue.finish_current();
        false
    }

    async fn on_track_finished(&mut self, generation: u64, error: Option<MusicError>) -> Flow {
        if generation != self.generation || self.queue.current().is_none() {
            debug!("Fin de pista obsoleto en guild {} (gen {})", self.guild_id, generation);
            return Flow::Continue;
        }

        if let Some(e) = error {
            warn!("⚠️ Error de reproducción en guild {}: {}", self.guild_id, e);
        }

        self.queue.finish_current();
        if self.play_next().await {
            return Flow::Continue;
        }

        info!("📭 Cola terminada en guild {}", self.guild_id);
        self.deps.presence.report(self.guild_id, None).await;
        self.schedule_idle();
        Flow::Continue
    }

    /// Reemplaza cualquier temporizador anterior; sólo el último puede disparar.
    fn schedule_idle(&mut self) {
        self.cancel_idle();

        self.idle_tokens += 1;
        let token = self.idle_tokens;
        let cancel = CancellationToken::new();
        let cancelled = cancel.clone();
        let mailbox = self.mailbox.clone();
        let wait = self.deps.idle_timeout;

        tokio::spawn(async move {
            tokio::select! {
                _ = cancelled.cancelled() => {}
                _ = tokio::time::sleep(wait) => {
                    if let Some(tx) = mailbox.upgrade() {
                        let _ = tx.send(SessionMessage::IdleTimeout { token });
                    }
                }
            }
        });

        debug!("⏲️ Desconexión por inactividad en {:?} para guild {}", wait, self.guild_id);
        self.idle_timer = Some(IdleTimer { token, cancel });
    }

    fn cancel_idle(&mut self) {
        if let Some(timer) = self.idle_timer.take() {
            timer.cancel.cancel();
            debug!("⏲️ Temporizador {} cancelado en guild {}", timer.token, self.guild_id);
        }
    }

    async fn resume_idle_watch(&mut self) {
        if self.idle_timer.is_none()
            && self.queue.current().is_none()
            && self.queue.is_empty()
            && self.is_connected().await
        {
            self.schedule_idle();
        }
    }

    async fn idle_timeout_fire(&mut self, token: u64) -> Flow {
        if self.idle_timer.as_ref().map(|timer| timer.token) != Some(token) {
            debug!("Temporizador {} obsoleto en guild {}", token, self.guild_id);
            return Flow::Continue;
        }
        self.idle_timer = None;

        let Some(connection) = self.connection.as_ref() else {
            return Flow::Continue;
        };
        if !connection.is_connected().await {
            debug!("Guild {}: la conexión ya no existe, nada que desconectar", self.guild_id);
            return Flow::Continue;
        }
        if connection.is_playing().await || self.queue.current().is_some() {
            return Flow::Continue;
        }

        info!("💤 Desconectando por inactividad en guild {}", self.guild_id);
        self.teardown().await;
        Flow::Close
    }

    async fn on_connection_lost(&mut self) -> Flow {
        // Un leave seguido de play puede dejar una notificación vieja detrás de la nueva conexión
        if self.is_connected().await {
            debug!("Guild {}: desconexión ignorada, hay una conexión activa", self.guild_id);
            return Flow::Continue;
        }

        info!("🔌 Conexión perdida en guild {}, cerrando sesión", self.guild_id);
        self.teardown().await;
        Flow::Close
    }

    async fn pause(&mut self) -> CommandOutcome {
        if let (Some(connection), Some(track)) = (self.connection.as_ref(), self.queue.current()) {
            if connection.is_playing().await {
                connection.pause().await;
                return CommandOutcome::ok(format!("⏸️ Pausado: **{}**", track.title()));
            }
        }
        CommandOutcome::no_op("🔇 No hay nada reproduciéndose")
    }

    async fn resume(&mut self) -> CommandOutcome {
        if let (Some(connection), Some(track)) = (self.connection.as_ref(), self.queue.current()) {
            if connection.is_paused().await {
                connection.resume().await;
                return CommandOutcome::ok(format!("▶️ Reanudado: **{}**", track.title()));
            }
        }
        CommandOutcome::no_op("▶️ No hay nada en pausa")
    }

    /// Detiene la pista actual; el fin de pista que provoca avanza la cola.
    /// Se permite también en pausa.
    async fn skip(&mut self) -> CommandOutcome {
        if let (Some(connection), Some(track)) = (self.connection.as_ref(), self.queue.current()) {
            let title = track.title().to_string();
            connection.stop().await;
            return CommandOutcome::ok(format!("⏭️ Saltada: **{}**", title));
        }
        CommandOutcome::no_op("🔇 No hay nada que saltar")
    }

    fn show_queue(&self) -> CommandOutcome {
        if self.queue.current().is_none() && self.queue.is_empty() {
            return CommandOutcome::no_op("📭 La cola está vacía");
        }
        CommandOutcome::ok("📋 Cola de reproducción").with_listing(self.queue.listing(LISTING_LIMIT))
    }

    async fn leave(&mut self) -> CommandOutcome {
        if !self.is_connected().await {
            self.teardown().await;
            return CommandOutcome::no_op("🔇 No estoy en un canal de voz");
        }

        self.teardown().await;
        CommandOutcome::ok("👋 Desconectado del canal de voz")
    }

    /// Cola, temporizador, pista actual, presencia y conexión: todo fuera.
    async fn teardown(&mut self) {
        self.cancel_idle();
        self.queue.clear();
        self.queue.finish_current();

        if let Some(connection) = self.connection.take() {
            connection.stop().await;
            connection.disconnect().await;
        }

        self.deps.presence.report(self.guild_id, None).await;
    }

    async fn is_connected(&self) -> bool {
        match self.connection.as_ref() {
            Some(connection) => connection.is_connected().await,
            None => false,
        }
    }

    #[cfg(test)]
    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            current: self.queue.current().map(|t| t.title().to_string()),
            queued: self.queue.len(),
            idle_armed: self.idle_timer.is_some(),
            idle_timers_created: self.idle_tokens,
            connected: self.connection.is_some(),
        }
    }
}

#[cfg(test)]
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub current: Option<String>,
    pub queued: usize,
    pub idle_armed: bool,
    pub idle_timers_created: u64,
    pub connected: bool,
}
