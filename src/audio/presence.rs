use async_trait::async_trait;
use parking_lot::RwLock;
use serenity::{all::ActivityData, client::Context, model::id::GuildId};
use tracing::debug;

use crate::sources::TrackRef;

/// Estado "escuchando ahora" visible en Discord.
///
/// Best-effort: implementations swallow their own failures and never block playback.
#[async_trait]
pub trait PresenceReporter: Send + Sync {
    /// `None` limpia el estado.
    async fn report(&self, guild_id: GuildId, track: Option<&TrackRef>);
}

/// Reporta el estado a través del gateway de Discord.
///
/// The context only exists after `ready`, so reports before that are dropped.
#[derive(Default)]
pub struct DiscordPresence {
    ctx: RwLock<Option<Context>>,
}

impl DiscordPresence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&self, ctx: Context) {
        *self.ctx.write() = Some(ctx);
    }
}

/// "Listening to <título>" con el nombre de la guild como estado; sin pista no hay actividad.
fn activity_for(track: Option<&TrackRef>, guild_name: Option<String>) -> Option<ActivityData> {
    let track = track?;
    let mut activity = ActivityData::listening(track.title());
    activity.state = guild_name;
    Some(activity)
}

#[async_trait]
impl PresenceReporter for DiscordPresence {
    async fn report(&self, guild_id: GuildId, track: Option<&TrackRef>) {
        let Some(ctx) = self.ctx.read().clone() else {
            debug!("Presencia ignorada en guild {}: el bot aún no está listo", guild_id);
            return;
        };

        let guild_name = track.and_then(|_| guild_id.name(&ctx.cache));
        ctx.set_activity(activity_for(track, guild_name));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::TrackMetadata;
    use pretty_assertions::assert_eq;
    use serenity::all::ActivityType;

    #[test]
    fn no_track_clears_the_activity() {
        assert!(activity_for(None, Some("Servidor".to_string())).is_none());
    }

    #[test]
    fn track_is_listened_to_in_its_guild() {
        let track = TrackRef::new(
            TrackMetadata {
                stream_url: "stream://Song".to_string(),
                title: "Song".to_string(),
                thumbnail: None,
                duration_seconds: None,
            },
            "Song",
        );

        let activity = activity_for(Some(&track), Some("Servidor".to_string())).unwrap();

        assert_eq!(activity.name, "Song");
        assert_eq!(activity.kind, ActivityType::Listening);
        assert_eq!(activity.state.as_deref(), Some("Servidor"));
    }
}
