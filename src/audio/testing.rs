//! In-memory collaborators for session and scheduler tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use serenity::model::id::{ChannelId, GuildId};
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use super::{
    player::{OnFinished, Player, VoiceConnection, VoiceGateway},
    presence::PresenceReporter,
};
use crate::{
    error::{MusicError, MusicResult},
    sources::{Catalog, CatalogEntry, CatalogKind, Resolver, TrackMetadata, TrackRef},
};

#[derive(Default)]
struct GuildVoice {
    channel: Option<ChannelId>,
    connected: bool,
    playing: bool,
    paused: bool,
    on_finished: Option<OnFinished>,
}

#[derive(Default)]
struct VoiceState {
    guilds: HashMap<GuildId, GuildVoice>,
    connects: Vec<(GuildId, ChannelId)>,
    moves: Vec<(GuildId, ChannelId)>,
    disconnects: Vec<GuildId>,
    started: Vec<(GuildId, String)>,
    fail_start: HashSet<String>,
}

/// Motor de voz falso. `stop` dispara el callback en el acto, como lo haría el motor real.
#[derive(Clone, Default)]
pub struct FakeVoice {
    state: Arc<Mutex<VoiceState>>,
}

impl FakeVoice {
    pub fn new() -> Self {
        Self::default()
    }

    /// `start` con esta URL fallará.
    pub fn fail_start(&self, stream_url: &str) {
        self.state.lock().fail_start.insert(stream_url.to_string());
    }

    /// La pista actual termina por sí sola.
    pub fn finish(&self, guild_id: GuildId, error: Option<MusicError>) {
        let callback = {
            let mut state = self.state.lock();
            let guild = state.guilds.entry(guild_id).or_default();
            guild.playing = false;
            guild.paused = false;
            guild.on_finished.take()
        };
        if let Some(on_finished) = callback {
            on_finished(error);
        }
    }

    /// El canal desaparece sin que la sesión lo pida.
    pub fn drop_connection(&self, guild_id: GuildId) {
        let mut state = self.state.lock();
        let guild = state.guilds.entry(guild_id).or_default();
        guild.connected = false;
        guild.channel = None;
    }

    pub fn connects(&self) -> Vec<(GuildId, ChannelId)> {
        self.state.lock().connects.clone()
    }

    pub fn moves(&self) -> Vec<(GuildId, ChannelId)> {
        self.state.lock().moves.clone()
    }

    pub fn disconnects(&self) -> Vec<GuildId> {
        self.state.lock().disconnects.clone()
    }

    pub fn started(&self, guild_id: GuildId) -> Vec<String> {
        self.state
            .lock()
            .started
            .iter()
            .filter(|(guild, _)| *guild == guild_id)
            .map(|(_, url)| url.clone())
            .collect()
    }

    pub fn is_paused(&self, guild_id: GuildId) -> bool {
        self.state.lock().guilds.get(&guild_id).is_some_and(|g| g.paused)
    }
}

#[async_trait]
impl VoiceGateway for FakeVoice {
    async fn connect(&self, guild_id: GuildId, channel_id: ChannelId) -> MusicResult<Box<dyn VoiceConnection>> {
        let mut state = self.state.lock();
        state.connects.push((guild_id, channel_id));
        state.guilds.insert(
            guild_id,
            GuildVoice {
                channel: Some(channel_id),
                connected: true,
                ..Default::default()
            },
        );

        Ok(Box::new(FakeConnection {
            guild_id,
            voice: self.clone(),
        }))
    }
}

struct FakeConnection {
    guild_id: GuildId,
    voice: FakeVoice,
}

impl FakeConnection {
    fn with_guild<T>(&self, f: impl FnOnce(&mut GuildVoice) -> T) -> T {
        let mut state = self.voice.state.lock();
        f(state.guilds.entry(self.guild_id).or_default())
    }
}

#[async_trait]
impl Player for FakeConnection {
    async fn start(&self, stream_url: &str, on_finished: OnFinished) -> MusicResult<()> {
        let mut state = self.voice.state.lock();
        if state.fail_start.contains(stream_url) {
            return Err(MusicError::Playback(format!("no se pudo abrir {stream_url}")));
        }

        state.started.push((self.guild_id, stream_url.to_string()));
        let guild = state.guilds.entry(self.guild_id).or_default();
        guild.playing = true;
        guild.paused = false;
        guild.on_finished = Some(on_finished);
        Ok(())
    }

    async fn stop(&self) {
        self.voice.finish(self.guild_id, None);
    }

    async fn pause(&self) {
        self.with_guild(|g| {
            if g.playing {
                g.playing = false;
                g.paused = true;
            }
        });
    }

    async fn resume(&self) {
        self.with_guild(|g| {
            if g.paused {
                g.paused = false;
                g.playing = true;
            }
        });
    }

    async fn is_playing(&self) -> bool {
        self.with_guild(|g| g.playing)
    }

    async fn is_paused(&self) -> bool {
        self.with_guild(|g| g.paused)
    }
}

#[async_trait]
impl VoiceConnection for FakeConnection {
    async fn current_channel(&self) -> Option<ChannelId> {
        self.with_guild(|g| g.channel)
    }

    async fn is_connected(&self) -> bool {
        self.with_guild(|g| g.connected)
    }

    async fn move_to(&self, channel_id: ChannelId) -> MusicResult<()> {
        let mut state = self.voice.state.lock();
        state.moves.push((self.guild_id, channel_id));
        state.guilds.entry(self.guild_id).or_default().channel = Some(channel_id);
        Ok(())
    }

    async fn disconnect(&self) {
        let mut state = self.voice.state.lock();
        state.disconnects.push(self.guild_id);
        let guild = state.guilds.entry(self.guild_id).or_default();
        guild.connected = false;
        guild.channel = None;
        guild.playing = false;
        guild.paused = false;
    }
}

/// Guarda cada reporte como `(guild, título)`.
#[derive(Default)]
pub struct RecordingPresence {
    reports: Mutex<Vec<(GuildId, Option<String>)>>,
}

impl RecordingPresence {
    pub fn reports(&self) -> Vec<(GuildId, Option<String>)> {
        self.reports.lock().clone()
    }
}

#[async_trait]
impl PresenceReporter for RecordingPresence {
    async fn report(&self, guild_id: GuildId, track: Option<&TrackRef>) {
        self.reports.lock().push((guild_id, track.map(|t| t.title().to_string())));
    }
}

/// Resuelve cualquier texto a una pista con ese título; falla si contiene "missing".
pub struct StubResolver;

fn stub_metadata(title: &str) -> MusicResult<TrackMetadata> {
    if title.contains("missing") {
        return Err(MusicError::Resolution(format!("no se encontraron resultados para: {title}")));
    }
    Ok(TrackMetadata {
        stream_url: format!("stream://{title}"),
        title: title.to_string(),
        thumbnail: None,
        duration_seconds: Some(180),
    })
}

#[async_trait]
impl Resolver for StubResolver {
    async fn lookup_by_link(&self, url: &str) -> MusicResult<TrackMetadata> {
        stub_metadata(url)
    }

    async fn lookup_by_query(&self, text: &str) -> MusicResult<TrackMetadata> {
        stub_metadata(text)
    }
}

/// Catálogo fijo: cualquier enlace se expande a estas entradas.
pub struct StubCatalog(pub Vec<&'static str>);

#[async_trait]
impl Catalog for StubCatalog {
    async fn expand(&self, _kind: CatalogKind, _id: &str) -> MusicResult<Vec<CatalogEntry>> {
        Ok(self
            .0
            .iter()
            .map(|title| CatalogEntry {
                title: title.to_string(),
                artists: Vec::new(),
            })
            .collect())
    }
}
