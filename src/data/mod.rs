//! This module contains everything relating to [Data].

mod queue;
mod session;
pub(crate) mod track;

use std::collections::HashMap;
use std::collections::HashSet;

use std::sync::Arc;

use reqwest::Client;
use serenity::GuildId;
use serenity::UserId;
use tokio::sync::Mutex;

use crate::error::UserError;
use crate::lib::youtube::Resolver;
use crate::serenity;
use crate::setup::MusicConfig;
use crate::Context;
use crate::LarkError;
pub use queue::TrackQueue;
pub use session::PlaybackState;
pub use session::Session;
pub use session::Volume;
pub use track::Track;

/// Convenience type alias for [GuildData]
pub type GuildDataRef = Arc<Mutex<GuildData>>;

/// The data kept between shards
#[derive(Debug)]
pub struct Data {
    /// List of users to send bug notifications
    pub notify_list: HashSet<UserId>,
    /// Per-Guild data, a guild's entry lives until the bot leaves its voice channel.
    pub guild_data: Mutex<HashMap<GuildId, GuildDataRef>>,
    /// Shared by every guild, it holds no per-guild state.
    pub resolver: Arc<Resolver>,
    /// Playback settings.
    pub music: MusicConfig,
}

/// Data stored on a per-guild basis.
#[derive(Debug, Default)]
pub struct GuildData {
    /// Queue and transport state.
    pub session: Session,
}

impl GuildData {
    fn new(volume: Volume) -> Self {
        Self {
            session: Session::new(volume),
        }
    }
}

/// Key to store a [Client] in a [TypeMapKey](serenity::prelude::TypeMapKey)
pub struct HttpKey;
impl serenity::prelude::TypeMapKey for HttpKey {
    type Value = Client;
}

/// Is able to get a [GuildData] and [Client].
pub trait GetData {
    /// Returns a [Client].
    async fn http_client(&self) -> Result<Client, LarkError>;
    /// Returns a reference to [GuildData], creating it if needed. Errors if not in a guild.
    async fn guild_data(&self) -> Result<GuildDataRef, UserError>;
    /// Drop this guild's [GuildData].
    async fn remove_guild_data(&self) -> Result<(), UserError>;
}

impl GetData for Context<'_> {
    async fn http_client(&self) -> Result<Client, LarkError> {
        self.serenity_context()
            .data
            .read()
            .await
            .get::<HttpKey>()
            // Client internally uses an Arc, so this is cheap to clone
            .cloned()
            .ok_or(LarkError::MissingFromSetup {
                reason: "Expecting http client.".to_string(),
            })
    }

    async fn guild_data(&self) -> Result<GuildDataRef, UserError> {
        let guild = self.guild_id().ok_or(UserError::GuildOnly)?;
        let mut map = self.data().guild_data.lock().await;

        let data = map.entry(guild).or_insert_with(|| {
            // Checked when the config is read.
            let volume = Volume::new(self.data().music.default_volume).unwrap_or_default();
            Arc::new(Mutex::new(GuildData::new(volume)))
        });
        Ok(data.clone())
    }

    async fn remove_guild_data(&self) -> Result<(), UserError> {
        let guild = self.guild_id().ok_or(UserError::GuildOnly)?;
        let mut map = self.data().guild_data.lock().await;
        map.remove(&guild);
        Ok(())
    }
}
