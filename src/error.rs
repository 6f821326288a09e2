use thiserror::Error;

/// Errores del núcleo de reproducción.
///
/// Ninguno de ellos cruza la frontera de comandos: el scheduler los convierte en
/// un [`CommandOutcome`](crate::audio::outcome::CommandOutcome) con estado `Error`.
#[derive(Debug, Clone, Error)]
pub enum MusicError {
    /// The link or search lookup failed; the queue is left untouched.
    #[error("No se pudo resolver la pista: {0}")]
    Resolution(String),

    /// Catalog credentials are missing or the catalog link could not be expanded.
    #[error("Catálogo no disponible: {0}")]
    CatalogUnavailable(String),

    /// The playback engine reported an error for the current track.
    #[error("Error de reproducción: {0}")]
    Playback(String),

    /// Joining, moving or leaving the voice channel failed.
    #[error("Error de conexión de voz: {0}")]
    Connection(String),

    #[error("La cola está llena (máximo {0} canciones)")]
    QueueFull(usize),
}

pub type MusicResult<T> = Result<T, MusicError>;
