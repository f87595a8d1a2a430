//! Implements the `/volume` command.

use tracing::instrument;

use crate::data::GetData;
use crate::data::Volume;
use crate::Context;
use crate::LarkError;

/// Set the playback volume
#[instrument(skip(ctx))]
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn volume(
    ctx: Context<'_>,
    #[description = "Volume from 0 to 100"] percent: u16,
) -> Result<(), LarkError> {
    let volume = Volume::new(percent)?;

    {
        let guild_data = ctx.guild_data().await?;
        let mut guild = guild_data.lock().await;
        guild.session.set_volume(volume)?;
    }

    ctx.reply(format!("Volume set to {}%.", volume.percent()))
        .await?;
    Ok(())
}
