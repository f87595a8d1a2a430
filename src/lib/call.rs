//! Manages [voice calls](songbird::Call).
//!
//! Currently the bot monitors for the following:
//! - On idle (alone for some time), the bot stops the session, then disconnects.
//! - On disconnect, the bot stops the session.
//! - On track end, the next track in the session's queue starts.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::instrument;

use crate::error::UserError;

use crate::lib::events;
use crate::serenity;
use crate::Context;
use crate::LarkError;

/// Convenience type alias for [songbird::Call].
pub type CallRef = Arc<Mutex<songbird::Call>>;
/// Convenience type alias for [songbird::Songbird].
type Manager = Arc<songbird::Songbird>;

/// Alias for discovery.
/// Must always use this function to initialize a call.
pub use events::init_global_events as get_call;

/// Get the [Manager] from [Context]
pub async fn get_manager(ctx: &Context<'_>) -> Result<Manager, LarkError> {
    songbird::get(ctx.serenity_context())
        .await
        .ok_or(LarkError::MissingFromSetup {
            reason: "Expecting songbird manager.".to_string(),
        })
}

/// Join (or move to) the author's voice channel and register global songbird events.
#[instrument(skip(ctx), fields(author=%ctx.author(), guild=?ctx.guild_id(), channel=?ctx.channel_id()))]
pub async fn join_author(ctx: &Context<'_>) -> Result<CallRef, LarkError> {
    // Initializes only once
    events::init_global_events(ctx).await?;

    let manager = get_manager(ctx).await?;
    let author = ctx.author();

    // Try to find the user's guild
    let (guild_id, guild_name, voice_states) = match ctx.guild() {
        Some(guild) => (guild.id, guild.name.clone(), guild.voice_states.clone()),
        None => Err(UserError::NotInGuild)?,
    };

    // Try to find the user's voice channel
    let channel_id = voice_states
        .get(&author.id)
        .and_then(|vs| vs.channel_id)
        .ok_or(UserError::NotInVoice)?;

    // Already there, nothing to do.
    if let Some(call) = manager.get(guild_id) {
        let current = call.lock().await.current_channel();
        // Convert songbird::ChannelId -> u64 -> serenity::ChannelId
        if current.is_some_and(|c| serenity::ChannelId::from(c.0) == channel_id) {
            return Ok(call);
        }
    }

    tracing::info!("Joining {user} at {guild_name}", user = author.name);

    // Try to join the call.
    let call = manager.join(guild_id, channel_id).await?;

    Ok(call)
}

/// Leave the voice channel and drop the call with all its global events.
#[instrument(skip(ctx), fields(guild=?ctx.guild_id()))]
pub async fn leave(ctx: &Context<'_>) -> Result<(), LarkError> {
    let manager = get_manager(ctx).await?;
    let guild_id = ctx.guild_id().ok_or(UserError::GuildOnly)?;

    if manager.get(guild_id).is_some() {
        tracing::info!("Leaving voice.");
        manager.remove(guild_id).await?;
    }
    Ok(())
}
