use async_trait::async_trait;
use parking_lot::Mutex as SyncMutex;
use serenity::model::id::{ChannelId, GuildId};
use songbird::{
    input::{HttpRequest, Input},
    tracks::{PlayMode, TrackHandle},
    Call, Event, EventContext, EventHandler as VoiceEventHandler, Songbird, TrackEvent,
};
use std::{sync::Arc, time::Duration};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::player::{OnFinished, Player, VoiceConnection, VoiceGateway};
use crate::error::{MusicError, MusicResult};

/// Abre llamadas de voz a través de songbird
pub struct SongbirdGateway {
    manager: Arc<Songbird>,
    http: reqwest::Client,
}

impl SongbirdGateway {
    pub fn new(manager: Arc<Songbird>) -> Self {
        Self {
            manager,
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
        }
    }
}

#[async_trait]
impl VoiceGateway for SongbirdGateway {
    async fn connect(&self, guild_id: GuildId, channel_id: ChannelId) -> MusicResult<Box<dyn VoiceConnection>> {
        let call = self.manager.join(guild_id, channel_id).await.map_err(|e| {
            error!("Error al obtener handler de voz: {:?}", e);
            MusicError::Connection(format!("no se pudo conectar al canal de voz: {}", e))
        })?;

        info!("🔊 Conectado al canal de voz {} en guild {}", channel_id, guild_id);

        Ok(Box::new(SongbirdConnection {
            guild_id,
            manager: self.manager.clone(),
            call,
            http: self.http.clone(),
            track: SyncMutex::new(None),
        }))
    }
}

pub struct SongbirdConnection {
    guild_id: GuildId,
    manager: Arc<Songbird>,
    call: Arc<Mutex<Call>>,
    http: reqwest::Client,
    track: SyncMutex<Option<TrackHandle>>,
}

impl SongbirdConnection {
    fn current_track(&self) -> Option<TrackHandle> {
        self.track.lock().clone()
    }

    async fn play_mode(&self) -> Option<PlayMode> {
        let track = self.current_track()?;
        track.get_info().await.ok().map(|info| info.playing)
    }
}

#[async_trait]
impl Player for SongbirdConnection {
    async fn start(&self, stream_url: &str, on_finished: OnFinished) -> MusicResult<()> {
        let input = Input::from(HttpRequest::new(self.http.clone(), stream_url.to_string()));

        let track = {
            let mut call = self.call.lock().await;
            call.play_input(input)
        };

        // End y Error comparten el mismo callback; el primero que llegue lo consume
        let slot = Arc::new(SyncMutex::new(Some(on_finished)));
        for event in [TrackEvent::End, TrackEvent::Error] {
            let handler = TrackFinishedHandler {
                guild_id: self.guild_id,
                slot: slot.clone(),
            };
            if let Err(e) = track.add_event(Event::Track(event), handler) {
                let _ = track.stop();
                return Err(MusicError::Playback(format!("Error al agregar event handler: {}", e)));
            }
        }

        *self.track.lock() = Some(track);
        Ok(())
    }

    async fn stop(&self) {
        if let Some(track) = self.track.lock().take() {
            let _ = track.stop();
            info!("⏹️ Reproducción detenida en guild {}", self.guild_id);
        }
    }

    async fn pause(&self) {
        if let Some(track) = self.current_track() {
            let _ = track.pause();
            info!("⏸️ Reproducción pausada en guild {}", self.guild_id);
        }
    }

    async fn resume(&self) {
        if let Some(track) = self.current_track() {
            let _ = track.play();
            info!("▶️ Reproducción reanudada en guild {}", self.guild_id);
        }
    }

    async fn is_playing(&self) -> bool {
        matches!(self.play_mode().await, Some(PlayMode::Play))
    }

    async fn is_paused(&self) -> bool {
        matches!(self.play_mode().await, Some(PlayMode::Pause))
    }
}

#[async_trait]
impl VoiceConnection for SongbirdConnection {
    async fn current_channel(&self) -> Option<ChannelId> {
        let call = self.call.lock().await;
        call.current_channel().map(|channel| ChannelId::from(channel.0))
    }

    async fn is_connected(&self) -> bool {
        let call = self.call.lock().await;
        call.current_connection().is_some()
    }

    async fn move_to(&self, channel_id: ChannelId) -> MusicResult<()> {
        self.manager
            .join(self.guild_id, channel_id)
            .await
            .map_err(|e| MusicError::Connection(format!("no se pudo mover al canal: {}", e)))?;

        info!("🚚 Movido al canal {} en guild {}", channel_id, self.guild_id);
        Ok(())
    }

    async fn disconnect(&self) {
        self.track.lock().take();

        match self.manager.remove(self.guild_id).await {
            Ok(()) => info!("👋 Desconectado del canal de voz en guild {}", self.guild_id),
            Err(e) => debug!("Llamada ya cerrada en guild {}: {:?}", self.guild_id, e),
        }
    }
}

/// Handler para cuando termina (o falla) una canción
struct TrackFinishedHandler {
    guild_id: GuildId,
    slot: Arc<SyncMutex<Option<OnFinished>>>,
}

#[async_trait]
impl VoiceEventHandler for TrackFinishedHandler {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        let error = match ctx {
            EventContext::Track(tracks) => tracks.iter().find_map(|(state, _)| match &state.playing {
                PlayMode::Errored(e) => Some(MusicError::Playback(format!("{:?}", e))),
                _ => None,
            }),
            _ => None,
        };

        if let Some(e) = &error {
            warn!("❌ Error en track para guild {}: {}", self.guild_id, e);
        } else {
            debug!("Track terminado en guild {}", self.guild_id);
        }

        let callback = self.slot.lock().take();
        if let Some(on_finished) = callback {
            on_finished(error);
        }

        None
    }
}
