//! # Bot Module
//!
//! Discord surface of MaiSum Music.
//!
//! This module contains the gateway-facing logic:
//! - Slash command registration and parsing
//! - Prefix commands (`!play`, `!pular`, ...)
//! - Voice state updates that end a session when the bot is kicked
//!
//! ## Architecture
//!
//! [`MaiSumBot`] implements Serenity's [`EventHandler`] trait. It owns no playback
//! state: every command is parsed into an [`audio::Command`](crate::audio::Command)
//! and handed to the [`PlaybackScheduler`], whose result is rendered back to Discord.

use anyhow::Result;
use serenity::{
    all::{Context, EventHandler, GuildId, Interaction, Message, Ready, VoiceState},
    async_trait,
};
use std::sync::Arc;
use tracing::{error, info, warn};

pub mod commands;
pub mod handlers;

use crate::{
    audio::{presence::DiscordPresence, PlaybackScheduler},
    config::Config,
};

/// Main Discord bot handler for MaiSum Music.
///
/// ## Fields
///
/// - `config`: Bot configuration (tokens, prefix, limits)
/// - `scheduler`: Routes parsed commands to per-guild sessions
/// - `presence`: Receives the gateway context once the bot is ready
pub struct MaiSumBot {
    config: Arc<Config>,
    pub scheduler: Arc<PlaybackScheduler>,
    presence: Arc<DiscordPresence>,
}

impl MaiSumBot {
    pub fn new(config: Arc<Config>, scheduler: Arc<PlaybackScheduler>, presence: Arc<DiscordPresence>) -> Self {
        Self {
            config,
            scheduler,
            presence,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Registers slash commands with Discord.
    ///
    /// Commands are registered per guild when `GUILD_ID` is set (fast propagation,
    /// meant for development) and globally otherwise.
    async fn register_commands(&self, ctx: &Context) -> Result<()> {
        info!("📝 Registrando comandos slash...");
        info!("🔧 Application ID: {}", self.config.application_id);

        match self.config.guild_id {
            Some(guild_id) => {
                let guild_id = GuildId::new(guild_id);

                if !ctx.cache.guilds().contains(&guild_id) {
                    warn!("⚠️ El bot no está en la guild especificada: {}", guild_id);
                    return Ok(());
                }

                commands::register_guild_commands(ctx, guild_id).await.map_err(|e| {
                    error!("❌ Error registrando comandos de guild: {:?}", e);
                    anyhow::anyhow!("No se pudieron registrar comandos de guild. Verifica que el bot tenga permisos de 'applications.commands' en la guild.")
                })?;
                info!("✅ Comandos de guild registrados para: {}", guild_id);
            }
            None => {
                commands::register_global_commands(ctx).await.map_err(|e| {
                    error!("❌ Error registrando comandos globales: {:?}", e);
                    anyhow::anyhow!("No se pudieron registrar comandos globales. Verifica que el bot tenga permisos de 'applications.commands'.")
                })?;
                info!("✅ Comandos globales registrados");
            }
        }

        Ok(())
    }
}

#[async_trait]
impl EventHandler for MaiSumBot {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("🤖 {} está en línea!", ready.user.name);
        info!("📊 Conectado a {} servidores", ready.guilds.len());

        if let Err(e) = self.register_commands(&ctx).await {
            error!("Error al registrar comandos: {:?}", e);
        }

        self.presence.attach(ctx);
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        if let Interaction::Command(command) = interaction {
            if let Err(e) = handlers::handle_command(&ctx, command, self).await {
                error!("Error manejando comando: {:?}", e);
            }
        }
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }

        if let Err(e) = handlers::handle_message(&ctx, &msg, self).await {
            error!("Error manejando mensaje: {:?}", e);
        }
    }

    /// Si el bot sale del canal de voz sin un `leave`, la sesión de esa guild se cierra.
    async fn voice_state_update(&self, ctx: Context, old: Option<VoiceState>, new: VoiceState) {
        let current_user_id = ctx.cache.current_user().id;
        if new.user_id != current_user_id || old.is_none() || new.channel_id.is_some() {
            return;
        }

        if let Some(guild_id) = new.guild_id {
            info!("🔌 Bot desconectado en guild {}", guild_id);
            self.scheduler.connection_lost(guild_id);
        }
    }
}
