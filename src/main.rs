use anyhow::Result;
use maisum_music::{
    audio::{presence::DiscordPresence, songbird_backend::SongbirdGateway, PlaybackScheduler, SchedulerSettings},
    bot::MaiSumBot,
    config::Config,
    sources::{Catalog, SpotifyClient, TrackResolver, YtDlpClient},
};
use serenity::{model::gateway::GatewayIntents, Client};
use songbird::{SerenityInit, Songbird};
use std::sync::Arc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Inicializar logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("maisum_music=debug".parse()?)
                .add_directive("serenity=info".parse()?)
                .add_directive("songbird=info".parse()?),
        )
        .init();

    info!("🎵 Iniciando MaiSum Music v{}", env!("CARGO_PKG_VERSION"));

    // Cargar configuración
    let config = Config::load()?;
    info!("{}", config.summary());

    let ytdlp = Arc::new(YtDlpClient::new(config.ytdlp_path.clone()));

    // Manejar health check si es necesario
    if std::env::args().any(|arg| arg == "--health-check") {
        let version = ytdlp.version().await?;
        info!("✅ yt-dlp {}", version);
        println!("OK");
        return Ok(());
    }

    let catalog: Option<Arc<dyn Catalog>> = match config.spotify_credentials() {
        Some((client_id, client_secret)) => Some(Arc::new(SpotifyClient::new(
            client_id,
            client_secret,
            config.max_playlist_size,
        ))),
        None => {
            warn!("⚠️ Spotify no configurado: los enlaces de Spotify no estarán disponibles");
            None
        }
    };
    let resolver = Arc::new(TrackResolver::new(
        ytdlp,
        catalog,
        config.max_playlist_size,
        config.resolve_concurrency,
    ));

    let songbird = Songbird::serenity();
    let presence = Arc::new(DiscordPresence::new());
    let scheduler = Arc::new(PlaybackScheduler::new(
        resolver,
        Arc::new(SongbirdGateway::new(songbird.clone())),
        presence.clone(),
        SchedulerSettings {
            idle_timeout: config.idle_timeout,
            max_queue_size: config.max_queue_size,
        },
    ));

    // Configurar intents mínimos necesarios
    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_VOICE_STATES
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let config = Arc::new(config);
    let handler = MaiSumBot::new(config.clone(), scheduler.clone(), presence);

    // Construir cliente
    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(handler)
        .register_songbird_with(songbird)
        .await?;

    // Manejar shutdown graceful
    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Error al registrar Ctrl+C: {:?}", e);
            return;
        }
        info!("⚠️ Señal de shutdown recibida, cerrando...");
        scheduler.shutdown().await;
        shard_manager.shutdown_all().await;
    });

    // Iniciar bot
    info!("🚀 Bot iniciado exitosamente");
    if let Err(why) = client.start().await {
        error!("Error al ejecutar cliente: {:?}", why);
    }

    Ok(())
}
