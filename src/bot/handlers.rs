use anyhow::Result;
use serenity::{
    builder::{
        CreateInteractionResponse, CreateInteractionResponseMessage, CreateMessage, EditInteractionResponse,
    },
    model::{
        application::CommandInteraction,
        channel::Message,
        id::{ChannelId, GuildId, UserId},
    },
    prelude::Context,
};
use tracing::info;

use super::{commands, MaiSumBot};
use crate::{
    audio::{Command, Status},
    ui::embeds,
};

/// Maneja comandos slash
pub async fn handle_command(ctx: &Context, command: CommandInteraction, bot: &MaiSumBot) -> Result<()> {
    let Some(guild_id) = command.guild_id else {
        return respond_ephemeral(ctx, &command, "❌ Este comando sólo funciona en un servidor").await;
    };

    info!(
        "📝 Comando /{} usado por {} en guild {}",
        command.data.name, command.user.name, guild_id
    );

    let argument = command
        .data
        .options
        .iter()
        .find(|opt| opt.name == "query")
        .and_then(|opt| opt.value.as_str());

    let Some(parsed) = commands::parse(&command.data.name, argument) else {
        return respond_ephemeral(ctx, &command, "❌ Comando no reconocido").await;
    };

    let requester_channel = user_voice_channel(ctx, guild_id, command.user.id);

    // Resolver puede tardar más que la ventana de 3s de Discord
    if matches!(parsed, Command::Play { .. }) {
        command
            .create_response(
                &ctx.http,
                CreateInteractionResponse::Defer(CreateInteractionResponseMessage::new()),
            )
            .await?;

        let outcome = bot.scheduler.dispatch(guild_id, requester_channel, parsed).await;
        command
            .edit_response(&ctx.http, EditInteractionResponse::new().embed(embeds::outcome_embed(&outcome)))
            .await?;
        return Ok(());
    }

    let outcome = bot.scheduler.dispatch(guild_id, requester_channel, parsed).await;
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .embed(embeds::outcome_embed(&outcome))
                    .ephemeral(outcome.status == Status::Error),
            ),
        )
        .await?;

    Ok(())
}

/// Maneja comandos con prefijo (`!play`, `!pular`, ...)
pub async fn handle_message(ctx: &Context, msg: &Message, bot: &MaiSumBot) -> Result<()> {
    let Some(guild_id) = msg.guild_id else {
        return Ok(());
    };
    let Some(parsed) = commands::parse_prefix(&msg.content, &bot.config().command_prefix) else {
        return Ok(());
    };

    info!("📝 Comando {:?} usado por {} en guild {}", parsed, msg.author.name, guild_id);

    let requester_channel = user_voice_channel(ctx, guild_id, msg.author.id);
    let outcome = bot.scheduler.dispatch(guild_id, requester_channel, parsed).await;

    msg.channel_id
        .send_message(&ctx.http, CreateMessage::new().content(embeds::outcome_text(&outcome)))
        .await?;

    Ok(())
}

async fn respond_ephemeral(ctx: &Context, command: &CommandInteraction, content: &str) -> Result<()> {
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new().content(content).ephemeral(true),
            ),
        )
        .await?;
    Ok(())
}

/// Canal de voz del usuario según la caché de la guild
fn user_voice_channel(ctx: &Context, guild_id: GuildId, user_id: UserId) -> Option<ChannelId> {
    let guild = guild_id.to_guild_cached(&ctx.cache)?;

    guild
        .voice_states
        .get(&user_id)
        .and_then(|voice_state| voice_state.channel_id)
}
