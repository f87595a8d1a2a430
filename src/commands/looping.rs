//! Implements the `/loop` command.

use tracing::instrument;

use crate::data::GetData;
use crate::Context;
use crate::LarkError;

/// Toggle loop mode, finished tracks go back to the end of the queue
#[instrument(skip(ctx))]
#[poise::command(slash_command, prefix_command, guild_only, rename = "loop")]
pub async fn loop_(ctx: Context<'_>) -> Result<(), LarkError> {
    let looping = {
        let guild_data = ctx.guild_data().await?;
        let mut guild = guild_data.lock().await;
        guild.session.toggle_loop()
    };

    let state = if looping { "on" } else { "off" };
    tracing::info!("Loop turned {state}");
    ctx.reply(format!("Loop is {state}.")).await?;
    Ok(())
}
