use anyhow::Result;
use serenity::{
    builder::{CreateCommand, CreateCommandOption},
    model::{application::CommandOptionType, id::GuildId},
    prelude::Context,
};

use crate::audio::Command;

/// Registra comandos globales
pub async fn register_global_commands(ctx: &Context) -> Result<()> {
    for command in all_commands() {
        ctx.http.create_global_command(&command).await?;
    }

    Ok(())
}

/// Registra comandos para una guild específica (desarrollo)
pub async fn register_guild_commands(ctx: &Context, guild_id: GuildId) -> Result<()> {
    guild_id.set_commands(&ctx.http, all_commands()).await?;

    Ok(())
}

fn all_commands() -> Vec<CreateCommand> {
    vec![
        play_command(),
        pause_command(),
        resume_command(),
        skip_command(),
        queue_command(),
        clear_command(),
        join_command(),
        leave_command(),
    ]
}

/// Traduce un comando (slash o prefijo) a su [`Command`].
///
/// Accepts the canonical names and the legacy aliases (`pular`, `fila`, `limpar`,
/// `chamar`, `expulsar`). `play` without an argument yields `None`.
pub fn parse(name: &str, argument: Option<&str>) -> Option<Command> {
    let command = match name.to_lowercase().as_str() {
        "play" | "p" => {
            let input = argument.map(str::trim).filter(|a| !a.is_empty())?;
            Command::Play {
                input: input.to_string(),
            }
        }
        "pause" => Command::Pause,
        "resume" => Command::Resume,
        "skip" | "pular" => Command::Skip,
        "queue" | "fila" => Command::Queue,
        "clear" | "limpar" => Command::Clear,
        "join" | "chamar" => Command::Join,
        "leave" | "expulsar" => Command::Leave,
        _ => return None,
    };
    Some(command)
}

/// Parsea un mensaje con prefijo, p. ej. `!play never gonna`.
///
/// `None` when the message does not start with `prefix` or names no known command.
pub fn parse_prefix(content: &str, prefix: &str) -> Option<Command> {
    let rest = content.trim().strip_prefix(prefix)?;
    let mut parts = rest.splitn(2, char::is_whitespace);
    let name = parts.next().filter(|n| !n.is_empty())?;

    parse(name, parts.next())
}

// Comandos de reproducción

fn play_command() -> CreateCommand {
    CreateCommand::new("play")
        .description("Reproduce una canción, álbum o playlist")
        .add_option(
            CreateCommandOption::new(
                CommandOptionType::String,
                "query",
                "URL de YouTube/Spotify o término de búsqueda",
            )
            .required(true),
        )
}

// Comandos de control

fn pause_command() -> CreateCommand {
    CreateCommand::new("pause").description("Pausa la reproducción actual")
}

fn resume_command() -> CreateCommand {
    CreateCommand::new("resume").description("Reanuda la reproducción pausada")
}

fn skip_command() -> CreateCommand {
    CreateCommand::new("skip").description("Salta a la siguiente canción")
}

// Comandos de cola

fn queue_command() -> CreateCommand {
    CreateCommand::new("queue").description("Muestra la cola de reproducción")
}

fn clear_command() -> CreateCommand {
    CreateCommand::new("clear").description("Limpia la cola sin detener la canción actual")
}

// Comandos de conexión

fn join_command() -> CreateCommand {
    CreateCommand::new("join").description("Conecta el bot a tu canal de voz")
}

fn leave_command() -> CreateCommand {
    CreateCommand::new("leave").description("Desconecta el bot del canal de voz")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn aliases_map_to_the_same_command() {
        assert_eq!(parse("pular", None), Some(Command::Skip));
        assert_eq!(parse("fila", None), Some(Command::Queue));
        assert_eq!(parse("limpar", None), Some(Command::Clear));
        assert_eq!(parse("chamar", None), Some(Command::Join));
        assert_eq!(parse("expulsar", None), Some(Command::Leave));
        assert_eq!(parse("SKIP", None), Some(Command::Skip));
    }

    #[test]
    fn play_needs_an_argument() {
        assert_eq!(parse("play", None), None);
        assert_eq!(parse("play", Some("   ")), None);
        assert_eq!(
            parse("play", Some(" lofi beats ")),
            Some(Command::Play {
                input: "lofi beats".to_string()
            })
        );
    }

    #[test]
    fn prefix_messages_are_parsed() {
        assert_eq!(
            parse_prefix("!play https://youtu.be/dQw4w9WgXcQ", "!"),
            Some(Command::Play {
                input: "https://youtu.be/dQw4w9WgXcQ".to_string()
            })
        );
        assert_eq!(parse_prefix("!pular", "!"), Some(Command::Skip));
        assert_eq!(parse_prefix("hola !skip", "!"), None);
        assert_eq!(parse_prefix("!", "!"), None);
        assert_eq!(parse_prefix("!volume 10", "!"), None);
    }

    #[test]
    fn every_registered_command_parses() {
        for name in ["play", "pause", "resume", "skip", "queue", "clear", "join", "leave"] {
            assert!(parse(name, Some("x")).is_some(), "{name}");
        }
        assert_eq!(all_commands().len(), 8);
    }
}
