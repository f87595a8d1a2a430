//! Event handling

use std::time::Duration;

use async_trait::async_trait;
use songbird::CoreEvent;
use songbird::Event;
use songbird::EventContext;
use songbird::EventHandler;
use songbird::TrackEvent;

use super::call::get_manager;
use super::call::CallRef;
use super::player::Advanced;
use super::player::Player;
use crate::data::GetData;
use crate::data::GuildDataRef;
use crate::data::Volume;
use crate::error::UserError;
use crate::serenity;
use crate::Context;
use crate::LarkError;

/// Initialize global events.
/// Only initializes if a [songbird::Call] hasn't been initialized yet.
pub async fn init_global_events(ctx: &Context<'_>) -> Result<CallRef, LarkError> {
    let manager = get_manager(ctx).await?;
    let guild_id = ctx.guild_id().ok_or(UserError::GuildOnly)?;
    // Only init if call hasn't been initialized
    let call = {
        match manager.get(guild_id) {
            Some(call) => call,
            None => {
                let call = manager.get_or_insert(guild_id);

                tracing::info!("Initializing global events.");

                let guild_data = ctx.guild_data().await?;
                let idle_timeout = Duration::from_secs(ctx.data().music.idle_timeout_secs);
                // Checked when the config is read.
                let volume = Volume::new(ctx.data().music.default_volume).unwrap_or_default();

                // Create the events.
                let idle_event = CheckIdle::new(&call, &guild_data, volume, ctx);
                let dc_event = DisconnectStop::new(&call, &guild_data, volume);
                let end_event = AdvanceQueue::new(&call, ctx).await?;

                // Register them as global events.
                idle_event.register(idle_timeout).await;
                dc_event.register().await;
                end_event.register().await;
                call
            }
        }
    };
    Ok(call)
}

/// Check if there are non-bot users in the call, if not then stop and disconnect.
struct CheckIdle {
    /// The call to check.
    call: CallRef,
    /// Session to reset when leaving.
    guild_data: GuildDataRef,
    /// Volume of the fresh session.
    volume: Volume,
    /// Needed to find channels and guilds.
    ctx: serenity::Context,
}

impl CheckIdle {
    /// Constructor for [CheckIdle]
    fn new(call: &CallRef, guild_data: &GuildDataRef, volume: Volume, ctx: &Context<'_>) -> Self {
        // Should be cheap to clone
        let ctx = ctx.serenity_context().clone();
        let call = call.clone();
        let guild_data = guild_data.clone();
        Self {
            call,
            guild_data,
            volume,
            ctx,
        }
    }

    /// Register this as a global event
    async fn register(self, duration: Duration) {
        tracing::debug!("Registering check idle global event.");
        let call = self.call.clone();
        let mut call = call.lock().await;
        call.add_global_event(Event::Periodic(duration, None), self);
    }

    /// Whether a non-bot user is in the call's channel.
    /// `None` when that can't be determined right now.
    async fn has_listeners(&self) -> Option<bool> {
        let channel_id = {
            let call = self.call.lock().await;
            // Convert songbird::ChannelId -> u64 -> serenity::ChannelId
            call.current_channel()
                .map(|c| serenity::ChannelId::from(c.0))
        };

        // No channel means nobody is listening.
        let Some(channel_id) = channel_id else {
            return Some(false);
        };

        let channel = channel_id.to_channel(&self.ctx).await.ok()?;
        let guild = channel.guild()?;
        let members = guild.members(&self.ctx).ok()?;
        Some(members.iter().any(|m| !m.user.bot))
    }
}

#[async_trait]
impl EventHandler for CheckIdle {
    async fn act(&self, _ctx: &EventContext<'_>) -> Option<Event> {
        // Each try operator (?) causes this handler to retry on it's next trigger if it fails.
        if self.has_listeners().await? {
            return None;
        }

        tracing::info!("Idle! Stopping and disconnecting from voice channel.");
        self.guild_data.lock().await.session.reset(self.volume);

        let mut call = self.call.lock().await;
        if call.current_channel().is_some() {
            call.leave().await.ok()?;
        }
        None
    }
}

/// Reset the session when the bot disconnects.
/// 'Resetting' means:
/// - End anything currently playing.
/// - Clear the queue.
/// - Forget loop mode, volume and the announce channel.
struct DisconnectStop {
    /// Reference to the call that will be dropped.
    call: CallRef,
    /// Session to reset.
    guild_data: GuildDataRef,
    /// Volume of the fresh session.
    volume: Volume,
}

impl DisconnectStop {
    /// Constructor for [DisconnectStop]
    fn new(call: &CallRef, guild_data: &GuildDataRef, volume: Volume) -> Self {
        let call = call.clone();
        let guild_data = guild_data.clone();
        Self {
            call,
            guild_data,
            volume,
        }
    }

    /// Register this as a global event.
    async fn register(self) {
        tracing::debug!("Registering disconnect on stop global event.");
        let call = self.call.clone();
        let mut call = call.lock().await;
        call.add_global_event(Event::Core(CoreEvent::DriverDisconnect), self);
    }
}

#[async_trait]
impl EventHandler for DisconnectStop {
    async fn act(&self, _ectx: &EventContext<'_>) -> Option<Event> {
        tracing::info!("Resetting on disconnect!");
        self.guild_data.lock().await.session.reset(self.volume);
        None
    }
}

/// Start the next track when the current one ends or fails.
struct AdvanceQueue {
    /// Reference to call.
    call: CallRef,
    /// Plays the next track.
    player: Player,
    /// Guild data, to find the announce channel.
    guild_data: GuildDataRef,
    /// Needed to send announcements.
    ctx: serenity::Context,
}

impl AdvanceQueue {
    /// Constructor for [AdvanceQueue]
    async fn new(call: &CallRef, ctx: &Context<'_>) -> Result<Self, LarkError> {
        let call = call.clone();
        let guild_data = ctx.guild_data().await?;
        let player = Player::new(
            call.clone(),
            guild_data.clone(),
            ctx.http_client().await?,
            ctx.data().resolver.clone(),
        );
        let ctx = ctx.serenity_context().clone();
        Ok(Self {
            call,
            player,
            guild_data,
            ctx,
        })
    }

    /// Register this as a global event
    async fn register(self) {
        tracing::debug!("Registering advance queue global events.");
        let call = self.call.clone();
        let mut call = call.lock().await;
        call.add_global_event(Event::Track(TrackEvent::End), self.clone_handler());
        call.add_global_event(Event::Track(TrackEvent::Error), self);
    }

    /// A second handler sharing the same state.
    fn clone_handler(&self) -> Self {
        Self {
            call: self.call.clone(),
            player: self.player.clone(),
            guild_data: self.guild_data.clone(),
            ctx: self.ctx.clone(),
        }
    }

    /// Post `content` where the last music command was used.
    async fn announce(&self, content: String) {
        let channel = self.guild_data.lock().await.session.announce_channel();
        if let Some(channel) = channel {
            if let Err(e) = channel.say(&self.ctx, content).await {
                tracing::error!("Failed to announce track change. {e}");
            }
        }
    }
}

#[async_trait]
impl EventHandler for AdvanceQueue {
    async fn act(&self, ectx: &EventContext<'_>) -> Option<Event> {
        let EventContext::Track(ended) = ectx else {
            return None;
        };

        for (state, handle) in *ended {
            if let songbird::tracks::PlayMode::Errored(e) = &state.playing {
                tracing::error!("Track failed: {e}");
            }

            match self.player.track_ended(handle).await {
                Ok(Advanced::Stale) => {}
                Ok(Advanced::Next(track)) => {
                    self.announce(format!("**Now playing:** {track}")).await;
                }
                Ok(Advanced::Finished) => {
                    self.announce("Queue finished.".to_string()).await;
                }
                Err(e) => tracing::error!("Failed to start the next track. {e}"),
            }
        }
        None
    }
}
