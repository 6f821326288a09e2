use anyhow::{Context, Result};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    // Discord
    pub discord_token: String,
    pub application_id: u64,
    pub guild_id: Option<u64>, // Para comandos de desarrollo
    pub command_prefix: String,

    // Reproducción
    pub idle_timeout: Duration,
    pub max_queue_size: usize,
    pub max_playlist_size: usize,
    pub resolve_concurrency: usize,

    // Fuentes
    pub ytdlp_path: String,
    pub spotify_client_id: Option<String>,
    pub spotify_client_secret: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self::from_vars(|key| std::env::var(key).ok())?;
        config.validate()?;

        Ok(config)
    }

    /// Builds a configuration from an arbitrary key lookup.
    ///
    /// `load` passes the process environment; tests pass a map.
    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let or_default = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let config = Self {
            // Discord
            discord_token: get("DISCORD_TOKEN").context("DISCORD_TOKEN no está definido")?,
            application_id: get("APPLICATION_ID")
                .context("APPLICATION_ID no está definido")?
                .parse()
                .context("APPLICATION_ID inválido")?,
            guild_id: get("GUILD_ID").and_then(|s| s.parse().ok()),
            command_prefix: or_default("COMMAND_PREFIX", "!"),

            // Reproducción
            idle_timeout: humantime::parse_duration(&or_default("IDLE_TIMEOUT", "60s"))
                .context("IDLE_TIMEOUT inválido (ejemplo: 60s, 2m)")?,
            max_queue_size: or_default("MAX_QUEUE_SIZE", "1000")
                .parse()
                .context("MAX_QUEUE_SIZE inválido")?,
            max_playlist_size: or_default("MAX_PLAYLIST_SIZE", "100")
                .parse()
                .context("MAX_PLAYLIST_SIZE inválido")?,
            resolve_concurrency: or_default("RESOLVE_CONCURRENCY", "4")
                .parse()
                .context("RESOLVE_CONCURRENCY inválido")?,

            // Fuentes
            ytdlp_path: or_default("YTDLP_PATH", "yt-dlp"),
            spotify_client_id: get("SPOTIFY_CLIENT_ID"),
            spotify_client_secret: get("SPOTIFY_CLIENT_SECRET"),
        };

        Ok(config)
    }

    /// Validates configuration values for correctness.
    ///
    /// # Validation Rules
    ///
    /// - Idle timeout must be non-zero
    /// - Queue, playlist and concurrency limits must be greater than 0
    /// - The command prefix must not be empty
    pub fn validate(&self) -> Result<()> {
        if self.idle_timeout.is_zero() {
            anyhow::bail!("Idle timeout must be greater than 0");
        }

        if self.max_queue_size == 0 {
            anyhow::bail!("Max queue size must be greater than 0");
        }

        if self.max_playlist_size == 0 {
            anyhow::bail!("Max playlist size must be greater than 0");
        }

        if self.resolve_concurrency == 0 {
            anyhow::bail!("Resolve concurrency must be greater than 0");
        }

        if self.command_prefix.trim().is_empty() {
            anyhow::bail!("Command prefix cannot be empty");
        }

        Ok(())
    }

    /// Catalog credentials, only when both halves are present.
    pub fn spotify_credentials(&self) -> Option<(String, String)> {
        match (&self.spotify_client_id, &self.spotify_client_secret) {
            (Some(id), Some(secret)) => Some((id.clone(), secret.clone())),
            _ => None,
        }
    }

    /// Returns a summary of the current configuration for logging.
    ///
    /// Excludes the bot token and catalog secret.
    pub fn summary(&self) -> String {
        format!(
            "Config Summary:\n  \
            Discord: App ID {} (Guild: {}), prefix '{}'\n  \
            Playback: idle timeout {}, queue {}, playlist {}\n  \
            Sources: yt-dlp '{}', {} concurrent lookups, Spotify={}",
            self.application_id,
            self.guild_id.map_or("global".to_string(), |id| id.to_string()),
            self.command_prefix,
            humantime::format_duration(self.idle_timeout),
            self.max_queue_size,
            self.max_playlist_size,
            self.ytdlp_path,
            self.resolve_concurrency,
            if self.spotify_credentials().is_some() { "on" } else { "off" },
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            // Discord (no defaults - must be provided)
            discord_token: String::new(),
            application_id: 0,
            guild_id: None,
            command_prefix: "!".to_string(),

            idle_timeout: Duration::from_secs(60),
            max_queue_size: 1000,
            max_playlist_size: 100,
            resolve_concurrency: 4,

            ytdlp_path: "yt-dlp".to_string(),
            spotify_client_id: None,
            spotify_client_secret: None,
        }
    }
}
