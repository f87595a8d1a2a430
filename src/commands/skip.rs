//! Implements the `/skip` and `/tskip` commands.
//!
//! `skip` finishes the current track and starts the next one in the queue (if there is one).
//! `tskip` moves within the current track.

use tracing::instrument;

use crate::lib;
use crate::lib::player::Player;
use crate::Context;
use crate::LarkError;

/// Skips the current audio track.
#[instrument(skip(ctx))]
#[poise::command(slash_command, prefix_command, guild_only, guild_cooldown = 2)]
pub async fn skip(ctx: Context<'_>) -> Result<(), LarkError> {
    let player = Player::from_ctx(&ctx).await?;
    let (skipped, next) = player.skip().await?;

    let title = &skipped.title;
    tracing::info!("Skipped {title}");
    let reply = match next {
        Some(track) => format!("Skipped `{title}`.\n**Now playing:** {track}"),
        None => format!("Skipped `{title}`. The queue is empty."),
    };
    ctx.reply(reply).await?;
    Ok(())
}

/// Jump to a timestamp in the current track.
#[instrument(skip(ctx))]
#[poise::command(slash_command, prefix_command, guild_only, guild_cooldown = 2)]
pub async fn tskip(
    ctx: Context<'_>,
    #[description = "Timestamp as mm:ss"] timestamp: String,
) -> Result<(), LarkError> {
    let offset = lib::parse_timestamp(&timestamp)?;

    let player = Player::from_ctx(&ctx).await?;
    let track = player.seek(offset).await?;

    let at = lib::format_duration(&offset);
    ctx.reply(format!("Jumped to {at} in `{}`.", track.title))
        .await?;
    Ok(())
}
