//! Implements the `/pause` and `/resume` commands.

use tracing::instrument;

use crate::data::GetData;
use crate::Context;
use crate::LarkError;

/// Pause the current track.
#[instrument(skip(ctx))]
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn pause(ctx: Context<'_>) -> Result<(), LarkError> {
    let title = {
        let guild_data = ctx.guild_data().await?;
        let mut guild = guild_data.lock().await;
        guild.session.pause()?.title.clone()
    };

    tracing::info!("Paused {title}");
    ctx.reply(format!("Paused `{title}`.")).await?;
    Ok(())
}

/// Resume the paused track.
#[instrument(skip(ctx))]
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn resume(ctx: Context<'_>) -> Result<(), LarkError> {
    let title = {
        let guild_data = ctx.guild_data().await?;
        let mut guild = guild_data.lock().await;
        guild.session.resume()?.title.clone()
    };

    tracing::info!("Resumed {title}");
    ctx.reply(format!("Resumed `{title}`.")).await?;
    Ok(())
}
