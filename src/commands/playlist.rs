//! Implements the `/playlist` command.

use tracing::instrument;

use crate::lib::player::Player;
use crate::Context;
use crate::LarkError;

/// Queue the first tracks of a youtube playlist.
#[instrument(skip(ctx))]
#[poise::command(slash_command, prefix_command, guild_only, guild_cooldown = 5)]
pub async fn playlist(
    ctx: Context<'_>,
    #[description = "Youtube playlist url"] url: String,
) -> Result<(), LarkError> {
    ctx.defer().await?;

    let requester = ctx.author().name.clone();
    let tracks = ctx.data().resolver.playlist(&url, &requester).await?;
    let count = tracks.len();

    let player = Player::join(&ctx).await?;
    let enqueued = player.enqueue(ctx.channel_id(), tracks).await?;

    let mut reply = format!("Added {count} tracks to the queue.");
    if let Some(track) = enqueued.started {
        reply.push_str(&format!("\n**Now playing:** {track}"));
    }
    ctx.reply(reply).await?;
    Ok(())
}
