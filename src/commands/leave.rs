//! Implements the `/leave` command.
//!
//! This stops playback, deletes the session, and disconnects the
//! bot from the current voice channel.

use tracing::instrument;

use crate::data::GetData;
use crate::lib::call;
use crate::Context;
use crate::LarkError;

/// Stop the bot, delete the queue, and leave the call.
#[instrument(skip(ctx))]
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn leave(ctx: Context<'_>) -> Result<(), LarkError> {
    {
        let guild_data = ctx.guild_data().await?;
        let mut guild = guild_data.lock().await;
        tracing::info!("Stopping the session.");
        guild.session.stop_all();
    }
    ctx.remove_guild_data().await?;
    call::leave(&ctx).await?;

    ctx.reply("Queue deleted, bye!").await?;
    Ok(())
}
