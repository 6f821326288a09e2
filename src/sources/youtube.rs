use async_process::Command;
use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use super::{Resolver, TrackMetadata};
use crate::error::{MusicError, MusicResult};

/// Cliente para resolver enlaces y búsquedas con yt-dlp
pub struct YtDlpClient {
    executable: String,
    // Limitar procesos concurrentes para evitar rate limiting
    rate_limiter: Semaphore,
}

/// Información extraída de yt-dlp
#[derive(Debug, Deserialize)]
struct YtDlpInfo {
    title: Option<String>,
    url: Option<String>,
    thumbnail: Option<String>,
    duration: Option<f64>,
    entries: Option<Vec<YtDlpInfo>>,
}

impl YtDlpClient {
    pub fn new(executable: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
            rate_limiter: Semaphore::new(3),
        }
    }

    /// Ejecuta yt-dlp y devuelve la metadata de la primera entrada
    async fn extract(&self, target: &str) -> MusicResult<TrackMetadata> {
        let _permit = self
            .rate_limiter
            .acquire()
            .await
            .map_err(|e| MusicError::Resolution(e.to_string()))?;

        debug!("📊 Obteniendo info de: {}", target);

        let output = Command::new(&self.executable)
            .args([
                "--no-playlist",
                "--dump-json",
                "-f",
                "bestaudio/best",
                "--no-warnings",
                target,
            ])
            .output()
            .await
            .map_err(|e| MusicError::Resolution(format!("Error al ejecutar yt-dlp: {}", e)))?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            warn!("❌ yt-dlp falló para {}: {}", target, error.trim());
            return Err(MusicError::Resolution(format!("yt-dlp error: {}", error.trim())));
        }

        let metadata = parse_info(&String::from_utf8_lossy(&output.stdout))?;
        info!("✅ Resuelto: {}", metadata.title);
        Ok(metadata)
    }

    /// Verifica que el ejecutable responda (usado por `--health-check`)
    pub async fn version(&self) -> MusicResult<String> {
        let output = Command::new(&self.executable)
            .arg("--version")
            .output()
            .await
            .map_err(|e| MusicError::Resolution(e.to_string()))?;

        if !output.status.success() {
            return Err(MusicError::Resolution("yt-dlp no puede ejecutarse correctamente".to_string()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[async_trait]
impl Resolver for YtDlpClient {
    async fn lookup_by_link(&self, link: &str) -> MusicResult<TrackMetadata> {
        let normalized = if link.starts_with("http://") || link.starts_with("https://") {
            link.to_string()
        } else {
            format!("https://{}", link)
        };

        url::Url::parse(&normalized)
            .map_err(|_| MusicError::Resolution(format!("URL mal formada: {}", link)))?;

        self.extract(&normalized).await
    }

    async fn lookup_by_query(&self, text: &str) -> MusicResult<TrackMetadata> {
        info!("🔍 Buscando en YouTube: {}", text);
        self.extract(&format!("ytsearch1:{}", text)).await
    }
}

/// Convierte la salida de `--dump-json` en metadata.
///
/// Search and playlist results may come back wrapped in `entries`; the first one wins.
fn parse_info(stdout: &str) -> MusicResult<TrackMetadata> {
    let line = stdout
        .lines()
        .find(|line| !line.trim().is_empty())
        .ok_or_else(|| MusicError::Resolution("No se encontraron resultados".to_string()))?;

    let mut info: YtDlpInfo = serde_json::from_str(line)
        .map_err(|e| MusicError::Resolution(format!("Error al parsear respuesta de yt-dlp: {}", e)))?;

    if let Some(entries) = info.entries.take() {
        info = entries
            .into_iter()
            .next()
            .ok_or_else(|| MusicError::Resolution("No se encontraron resultados".to_string()))?;
    }

    let stream_url = info
        .url
        .ok_or_else(|| MusicError::Resolution("yt-dlp no devolvió URL de stream".to_string()))?;

    Ok(TrackMetadata {
        stream_url,
        title: info.title.unwrap_or_else(|| "Desconocido".to_string()),
        thumbnail: info.thumbnail,
        duration_seconds: info.duration.map(|d| d.round() as u64),
    })
}
