//! # Sources Module
//!
//! Turns what a user typed into playable [`TrackRef`]s.
//!
//! ## Input shapes
//!
//! - **Direct media link** (YouTube watch/short/embed URLs): one lookup, one track
//! - **Catalog link** (Spotify track/album/playlist): expanded into search
//!   descriptors, each resolved as free text
//! - **Free text**: searched, first match wins
//!
//! The lookups themselves are capabilities ([`Resolver`], [`Catalog`]) backed by
//! [`youtube::YtDlpClient`] and [`spotify::SpotifyClient`] in production.

pub mod spotify;
pub mod youtube;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use regex::Regex;
use std::{sync::Arc, sync::LazyLock, time::Duration};
use tracing::{debug, info, warn};

use crate::error::{MusicError, MusicResult};

pub use spotify::SpotifyClient;
pub use youtube::YtDlpClient;

static YOUTUBE_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(https?://)?(www\.|m\.|music\.)?(youtube|youtu|youtube-nocookie)\.(com|be)/(watch\?v=|embed/|v/|shorts/|.+\?v=)?([^&=%\?]{11})",
    )
    .expect("regex de YouTube válida")
});

static CATALOG_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(https?://)?open\.spotify\.com/(track|album|playlist)/([a-zA-Z0-9]+)")
        .expect("regex de Spotify válida")
});

/// Pista resuelta y lista para reproducir. Inmutable una vez construida.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackRef {
    stream_url: String,
    title: String,
    thumbnail: Option<String>,
    duration_seconds: Option<u64>,
    original_input: String,
}

impl TrackRef {
    pub fn new(metadata: TrackMetadata, original_input: impl Into<String>) -> Self {
        Self {
            stream_url: metadata.stream_url,
            title: metadata.title,
            thumbnail: metadata.thumbnail,
            duration_seconds: metadata.duration_seconds,
            original_input: original_input.into(),
        }
    }

    pub fn stream_url(&self) -> &str {
        &self.stream_url
    }
    pub fn title(&self) -> &str {
        &self.title
    }
    pub fn thumbnail(&self) -> Option<&str> {
        self.thumbnail.as_deref()
    }
    pub fn duration_seconds(&self) -> Option<u64> {
        self.duration_seconds
    }
    pub fn duration(&self) -> Option<Duration> {
        self.duration_seconds.map(Duration::from_secs)
    }
    pub fn original_input(&self) -> &str {
        &self.original_input
    }
}

/// Metadata devuelta por un [`Resolver`].
#[derive(Debug, Clone, PartialEq)]
pub struct TrackMetadata {
    pub stream_url: String,
    pub title: String,
    pub thumbnail: Option<String>,
    pub duration_seconds: Option<u64>,
}

/// One catalog item, before it has been searched for.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub title: String,
    pub artists: Vec<String>,
}

impl CatalogEntry {
    /// `"<title> <artist> <artist>..."`
    pub fn search_query(&self) -> String {
        std::iter::once(self.title.as_str())
            .chain(self.artists.iter().map(String::as_str))
            .filter(|part| !part.trim().is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogKind {
    Track,
    Album,
    Playlist,
}

impl CatalogKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CatalogKind::Track => "track",
            CatalogKind::Album => "album",
            CatalogKind::Playlist => "playlist",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputKind {
    DirectMediaLink,
    CatalogLink { kind: CatalogKind, id: String },
    FreeText,
}

/// Clasifica la entrada del usuario por la forma de la URL.
pub fn classify(input: &str) -> InputKind {
    let input = input.trim();

    if YOUTUBE_LINK.is_match(input) {
        return InputKind::DirectMediaLink;
    }

    if let Some(captures) = CATALOG_LINK.captures(input) {
        let kind = match &captures[2] {
            "track" => CatalogKind::Track,
            "album" => CatalogKind::Album,
            _ => CatalogKind::Playlist,
        };
        return InputKind::CatalogLink {
            kind,
            id: captures[3].to_string(),
        };
    }

    InputKind::FreeText
}

/// Link and search lookups against the media host.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn lookup_by_link(&self, url: &str) -> MusicResult<TrackMetadata>;

    async fn lookup_by_query(&self, text: &str) -> MusicResult<TrackMetadata>;
}

/// Expansión de enlaces de catálogo (track/album/playlist) en descriptores de búsqueda.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn expand(&self, kind: CatalogKind, id: &str) -> MusicResult<Vec<CatalogEntry>>;
}

/// Resultado de resolver una entrada: pistas en orden + cuántos items fallaron.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolved {
    pub tracks: Vec<TrackRef>,
    pub failed: usize,
}

pub struct TrackResolver {
    resolver: Arc<dyn Resolver>,
    catalog: Option<Arc<dyn Catalog>>,
    max_playlist_size: usize,
    concurrency: usize,
}

impl TrackResolver {
    pub fn new(
        resolver: Arc<dyn Resolver>,
        catalog: Option<Arc<dyn Catalog>>,
        max_playlist_size: usize,
        concurrency: usize,
    ) -> Self {
        Self {
            resolver,
            catalog,
            max_playlist_size,
            concurrency: concurrency.max(1),
        }
    }

    /// Resolves `input` into tracks.
    ///
    /// Single lookups fail with [`MusicError::Resolution`]. Catalog links fail
    /// only when the catalog itself is unavailable; individual items that cannot
    /// be found are counted in [`Resolved::failed`] and the rest keep catalog order.
    pub async fn resolve(&self, input: &str) -> MusicResult<Resolved> {
        let input = input.trim();

        match classify(input) {
            InputKind::DirectMediaLink => {
                debug!("🔗 Enlace directo: {}", input);
                let metadata = self.resolver.lookup_by_link(input).await?;
                Ok(Resolved {
                    tracks: vec![TrackRef::new(metadata, input)],
                    failed: 0,
                })
            }
            InputKind::FreeText => {
                debug!("🔍 Búsqueda: {}", input);
                let metadata = self.resolver.lookup_by_query(input).await?;
                Ok(Resolved {
                    tracks: vec![TrackRef::new(metadata, input)],
                    failed: 0,
                })
            }
            InputKind::CatalogLink { kind, id } => self.resolve_catalog(input, kind, &id).await,
        }
    }

    async fn resolve_catalog(&self, input: &str, kind: CatalogKind, id: &str) -> MusicResult<Resolved> {
        let catalog = self.catalog.as_ref().ok_or_else(|| {
            MusicError::CatalogUnavailable("credenciales de Spotify no configuradas".to_string())
        })?;

        let mut entries = catalog.expand(kind, id).await?;
        if entries.len() > self.max_playlist_size {
            info!(
                "✂️ {} {} tiene {} canciones, se usarán las primeras {}",
                kind.as_str(),
                id,
                entries.len(),
                self.max_playlist_size
            );
            entries.truncate(self.max_playlist_size);
        }

        info!("📋 Resolviendo {} canciones de {} {}", entries.len(), kind.as_str(), id);

        let resolver = &self.resolver;
        // `buffered` keeps catalog order regardless of completion order
        let results: Vec<Option<TrackRef>> = stream::iter(entries.into_iter().enumerate())
            .map(|(index, entry)| {
                let query = entry.search_query();
                async move {
                    match resolver.lookup_by_query(&query).await {
                        Ok(metadata) => Some(TrackRef::new(metadata, input)),
                        Err(e) => {
                            warn!("⚠️ Falló la canción {} ({}): {}", index + 1, query, e);
                            None
                        }
                    }
                }
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let failed = results.iter().filter(|r| r.is_none()).count();
        let tracks: Vec<TrackRef> = results.into_iter().flatten().collect();

        if failed > 0 {
            warn!("⚠️ {} de {} canciones no se pudieron resolver", failed, failed + tracks.len());
        }

        Ok(Resolved { tracks, failed })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;
    use pretty_assertions::assert_eq;

    fn metadata(title: &str) -> TrackMetadata {
        TrackMetadata {
            stream_url: format!("https://media.example/{}", title.replace(' ', "-")),
            title: title.to_string(),
            thumbnail: None,
            duration_seconds: Some(200),
        }
    }

    fn entry(title: &str, artists: &[&str]) -> CatalogEntry {
        CatalogEntry {
            title: title.to_string(),
            artists: artists.iter().map(|a| a.to_string()).collect(),
        }
    }

    #[test]
    fn classifies_youtube_links_as_direct_media() {
        for link in [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ",
            "youtube.com/embed/dQw4w9WgXcQ",
            "https://music.youtube.com/watch?v=dQw4w9WgXcQ",
        ] {
            assert_eq!(classify(link), InputKind::DirectMediaLink, "{link}");
        }
    }

    #[test]
    fn classifies_spotify_links_by_kind() {
        assert_eq!(
            classify("https://open.spotify.com/playlist/37i9dQZF1DXcBWIGoYBM5M?si=abc"),
            InputKind::CatalogLink {
                kind: CatalogKind::Playlist,
                id: "37i9dQZF1DXcBWIGoYBM5M".to_string()
            }
        );
        assert_eq!(
            classify("open.spotify.com/album/1DFixLWuPkv3KT3TnV35m3"),
            InputKind::CatalogLink {
                kind: CatalogKind::Album,
                id: "1DFixLWuPkv3KT3TnV35m3".to_string()
            }
        );
        assert_eq!(
            classify("https://open.spotify.com/track/4uLU6hMCjMI75M1A2tKUQC"),
            InputKind::CatalogLink {
                kind: CatalogKind::Track,
                id: "4uLU6hMCjMI75M1A2tKUQC".to_string()
            }
        );
    }

    #[test]
    fn anything_else_is_free_text() {
        assert_eq!(classify("never gonna give you up"), InputKind::FreeText);
        assert_eq!(classify("https://open.spotify.com/artist/0gxyHStUsqpMadRV0Di1Qt"), InputKind::FreeText);
        assert_eq!(classify("https://example.com/song.mp3"), InputKind::FreeText);
    }

    #[test]
    fn search_query_joins_title_and_artists() {
        assert_eq!(entry("Song", &["A", "B"]).search_query(), "Song A B");
        assert_eq!(entry("Solo", &[]).search_query(), "Solo");
    }

    #[tokio::test]
    async fn direct_link_uses_link_lookup() {
        let mut resolver = MockResolver::new();
        resolver
            .expect_lookup_by_link()
            .with(eq("https://youtu.be/dQw4w9WgXcQ"))
            .times(1)
            .returning(|_| Ok(metadata("Rick")));
        resolver.expect_lookup_by_query().times(0);

        let tracks = TrackResolver::new(Arc::new(resolver), None, 100, 4);
        let resolved = tracks.resolve("  https://youtu.be/dQw4w9WgXcQ ").await.unwrap();

        assert_eq!(resolved.failed, 0);
        assert_eq!(resolved.tracks.len(), 1);
        assert_eq!(resolved.tracks[0].title(), "Rick");
        assert_eq!(resolved.tracks[0].original_input(), "https://youtu.be/dQw4w9WgXcQ");
    }

    #[tokio::test]
    async fn free_text_failure_is_a_resolution_error() {
        let mut resolver = MockResolver::new();
        resolver
            .expect_lookup_by_query()
            .returning(|_| Err(MusicError::Resolution("sin resultados".to_string())));

        let tracks = TrackResolver::new(Arc::new(resolver), None, 100, 4);
        let result = tracks.resolve("nothing matches this").await;

        assert!(matches!(result, Err(MusicError::Resolution(_))));
    }

    #[tokio::test]
    async fn catalog_without_credentials_fails_before_any_lookup() {
        let mut resolver = MockResolver::new();
        resolver.expect_lookup_by_query().times(0);
        resolver.expect_lookup_by_link().times(0);

        let tracks = TrackResolver::new(Arc::new(resolver), None, 100, 4);
        let result = tracks.resolve("https://open.spotify.com/album/1DFixLWuPkv3KT3TnV35m3").await;

        assert!(matches!(result, Err(MusicError::CatalogUnavailable(_))));
    }

    #[tokio::test]
    async fn catalog_partial_failures_keep_order_and_count() {
        let mut catalog = MockCatalog::new();
        catalog
            .expect_expand()
            .with(eq(CatalogKind::Playlist), eq("abc123"))
            .times(1)
            .returning(|_, _| {
                Ok(vec![
                    entry("One", &["X"]),
                    entry("Two", &["bad"]),
                    entry("Three", &["Y"]),
                    entry("Four", &["bad"]),
                    entry("Five", &["Z"]),
                ])
            });

        let mut resolver = MockResolver::new();
        resolver.expect_lookup_by_query().times(5).returning(|query| {
            if query.ends_with("bad") {
                Err(MusicError::Resolution(format!("no encontrado: {query}")))
            } else {
                Ok(metadata(query))
            }
        });

        let tracks = TrackResolver::new(Arc::new(resolver), Some(Arc::new(catalog)), 100, 3);
        let resolved = tracks.resolve("https://open.spotify.com/playlist/abc123").await.unwrap();

        let titles: Vec<&str> = resolved.tracks.iter().map(|t| t.title()).collect();
        assert_eq!(titles, vec!["One X", "Three Y", "Five Z"]);
        assert_eq!(resolved.failed, 2);
        assert!(resolved
            .tracks
            .iter()
            .all(|t| t.original_input() == "https://open.spotify.com/playlist/abc123"));
    }

    #[tokio::test]
    async fn catalog_expansion_is_capped() {
        let mut catalog = MockCatalog::new();
        catalog
            .expect_expand()
            .returning(|_, _| Ok((0..10).map(|i| entry(&format!("Song {i}"), &[])).collect()));

        let mut resolver = MockResolver::new();
        resolver
            .expect_lookup_by_query()
            .times(3)
            .returning(|query| Ok(metadata(query)));

        let tracks = TrackResolver::new(Arc::new(resolver), Some(Arc::new(catalog)), 3, 2);
        let resolved = tracks.resolve("https://open.spotify.com/album/xyz").await.unwrap();

        assert_eq!(resolved.tracks.len(), 3);
        assert_eq!(resolved.tracks[2].title(), "Song 2");
    }

    #[tokio::test]
    async fn catalog_errors_propagate() {
        let mut catalog = MockCatalog::new();
        catalog
            .expect_expand()
            .returning(|_, _| Err(MusicError::CatalogUnavailable("404".to_string())));
        let resolver = MockResolver::new();

        let tracks = TrackResolver::new(Arc::new(resolver), Some(Arc::new(catalog)), 100, 4);
        let result = tracks.resolve("https://open.spotify.com/track/missing").await;

        assert!(matches!(result, Err(MusicError::CatalogUnavailable(_))));
    }
}
