use async_trait::async_trait;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{Catalog, CatalogEntry, CatalogKind};
use crate::error::{MusicError, MusicResult};

const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const API_BASE: &str = "https://api.spotify.com/v1";

/// Cliente de la Web API de Spotify (client credentials).
///
/// Only reads catalog metadata; audio always comes from the media host.
pub struct SpotifyClient {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    token: Mutex<Option<AccessToken>>,
    max_items: usize,
}

struct AccessToken {
    value: String,
    expires_at: Instant,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct SpotifyArtist {
    name: String,
}

#[derive(Debug, Deserialize)]
struct SpotifyTrack {
    name: String,
    #[serde(default)]
    artists: Vec<SpotifyArtist>,
}

#[derive(Debug, Deserialize)]
struct Page<T> {
    items: Vec<T>,
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItem {
    track: Option<SpotifyTrack>,
}

impl From<SpotifyTrack> for CatalogEntry {
    fn from(track: SpotifyTrack) -> Self {
        Self {
            title: track.name,
            artists: track.artists.into_iter().map(|a| a.name).collect(),
        }
    }
}

impl SpotifyClient {
    pub fn new(client_id: String, client_secret: String, max_items: usize) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(15))
                .build()
                .unwrap_or_default(),
            client_id,
            client_secret,
            token: Mutex::new(None),
            max_items,
        }
    }

    /// Token en caché, renovado un minuto antes de expirar
    async fn access_token(&self) -> MusicResult<String> {
        let mut token = self.token.lock().await;

        if let Some(current) = token.as_ref() {
            if current.expires_at > Instant::now() {
                return Ok(current.value.clone());
            }
        }

        debug!("🔑 Solicitando token de Spotify");
        let response: TokenResponse = self
            .http
            .post(TOKEN_URL)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(unavailable)?
            .json()
            .await
            .map_err(unavailable)?;

        let lifetime = Duration::from_secs(response.expires_in.saturating_sub(60));
        *token = Some(AccessToken {
            value: response.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });

        Ok(response.access_token)
    }

    async fn get<T: for<'de> Deserialize<'de>>(&self, url: &str) -> MusicResult<T> {
        let token = self.access_token().await?;

        self.http
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(unavailable)?
            .json()
            .await
            .map_err(unavailable)
    }

    /// Recorre todas las páginas hasta `max_items`
    async fn collect_pages<T, F>(&self, first_url: String, mut extract: F) -> MusicResult<Vec<CatalogEntry>>
    where
        T: for<'de> Deserialize<'de>,
        F: FnMut(T) -> Option<CatalogEntry>,
    {
        let mut entries = Vec::new();
        let mut next = Some(first_url);

        while let Some(url) = next.take() {
            let page: Page<T> = self.get(&url).await?;
            entries.extend(page.items.into_iter().filter_map(&mut extract));

            if entries.len() >= self.max_items {
                entries.truncate(self.max_items);
                break;
            }
            next = page.next;
        }

        Ok(entries)
    }
}

#[async_trait]
impl Catalog for SpotifyClient {
    async fn expand(&self, kind: CatalogKind, id: &str) -> MusicResult<Vec<CatalogEntry>> {
        info!("🎧 Expandiendo {} de Spotify: {}", kind.as_str(), id);

        let entries = match kind {
            CatalogKind::Track => {
                let track: SpotifyTrack = self.get(&format!("{}/tracks/{}", API_BASE, id)).await?;
                vec![CatalogEntry::from(track)]
            }
            CatalogKind::Album => {
                self.collect_pages(format!("{}/albums/{}/tracks?limit=50", API_BASE, id), |track: SpotifyTrack| {
                    Some(CatalogEntry::from(track))
                })
                .await?
            }
            CatalogKind::Playlist => {
                self.collect_pages(format!("{}/playlists/{}/tracks?limit=100", API_BASE, id), playlist_entry)
                    .await?
            }
        };

        if entries.is_empty() {
            warn!("📭 {} {} no tiene canciones", kind.as_str(), id);
        }

        Ok(entries)
    }
}

/// Las playlists pueden contener items sin pista (episodios o pistas eliminadas)
fn playlist_entry(item: PlaylistItem) -> Option<CatalogEntry> {
    item.track.map(CatalogEntry::from)
}

fn unavailable(e: reqwest::Error) -> MusicError {
    warn!("❌ Error de la API de Spotify: {}", e);
    MusicError::CatalogUnavailable(format!("error al procesar el enlace de Spotify: {}", e))
}
