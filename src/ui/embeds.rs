use serenity::{
    all::{Colour, Timestamp},
    builder::{CreateEmbed, CreateEmbedFooter},
};
use std::time::Duration;

use crate::{
    audio::{CommandOutcome, QueueListing, Status},
    sources::TrackRef,
};

/// Paleta de colores estandarizada para el bot
pub mod colors {
    use serenity::all::Colour;

    pub const SUCCESS_GREEN: Colour = Colour::from_rgb(67, 181, 129);
    pub const ERROR_RED: Colour = Colour::from_rgb(220, 53, 69);
    pub const INFO_BLUE: Colour = Colour::from_rgb(52, 144, 220);
    pub const NEUTRAL_GRAY: Colour = Colour::from_rgb(108, 117, 125);
}

/// Footer estandarizado para todos los embeds
const STANDARD_FOOTER: &str = "🎵 MaiSum Music";

fn status_colour(status: Status) -> Colour {
    match status {
        Status::Ok => colors::SUCCESS_GREEN,
        Status::NoOp => colors::NEUTRAL_GRAY,
        Status::Error => colors::ERROR_RED,
    }
}

/// Embed para la respuesta de cualquier comando
pub fn outcome_embed(outcome: &CommandOutcome) -> CreateEmbed {
    let mut embed = CreateEmbed::default()
        .description(&outcome.message)
        .color(status_colour(outcome.status));

    if let Some(listing) = &outcome.listing {
        embed = queue_embed(listing);
    }

    embed
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
        .timestamp(Timestamp::now())
}

/// Crea un embed para mostrar la cola de reproducción
fn queue_embed(listing: &QueueListing) -> CreateEmbed {
    let mut embed = CreateEmbed::default()
        .title("📋 Cola de Reproducción")
        .color(colors::INFO_BLUE);

    if let Some(current) = &listing.current {
        embed = embed.field("▶️ Reproduciendo", track_line(current), false);
        if let Some(thumbnail) = current.thumbnail() {
            embed = embed.thumbnail(thumbnail);
        }
    }

    if !listing.upcoming.is_empty() {
        embed = embed.field("Próximas canciones", upcoming_lines(listing), false);
    }

    embed
}

/// Texto plano para respuestas a comandos con prefijo
pub fn outcome_text(outcome: &CommandOutcome) -> String {
    let Some(listing) = &outcome.listing else {
        return outcome.message.clone();
    };

    let mut text = outcome.message.clone();
    if let Some(current) = &listing.current {
        text.push_str(&format!("\n▶️ {}", track_line(current)));
    }
    if !listing.upcoming.is_empty() {
        text.push('\n');
        text.push_str(&upcoming_lines(listing));
    }
    text
}

fn track_line(track: &TrackRef) -> String {
    match track.duration() {
        Some(duration) => format!("**{}** `[{}]`", track.title(), format_duration(duration)),
        None => format!("**{}**", track.title()),
    }
}

fn upcoming_lines(listing: &QueueListing) -> String {
    let mut lines: Vec<String> = listing
        .upcoming
        .iter()
        .enumerate()
        .map(|(i, track)| format!("**{}**. {}", i + 1, track_line(track)))
        .collect();

    if listing.remaining > 0 {
        lines.push(format!("... y {} más", listing.remaining));
    }

    lines.join("\n")
}

/// Formatea una duración en formato legible
fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}
