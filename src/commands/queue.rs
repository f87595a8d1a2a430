//! Implements the queue commands.
//!
//! `/qlist` responds with an embed displaying what's playing and what's coming up.

use poise::CreateReply;
use serenity::CreateEmbed;
use tracing::instrument;

use crate::data::GetData;
use crate::error::UserError;
use crate::lib::player::Player;
use crate::serenity;
use crate::Context;
use crate::LarkError;

/// Show what's playing and what's coming up
#[instrument(skip(ctx))]
#[poise::command(slash_command, prefix_command, guild_only, guild_cooldown = 2)]
pub async fn qlist(ctx: Context<'_>) -> Result<(), LarkError> {
    let guild = ctx.guild().ok_or(UserError::NotInGuild)?.name.clone();

    let (description, thumbnail) = {
        let guild_data = ctx.guild_data().await?;
        let lock = guild_data.lock().await;
        let session = &lock.session;
        let thumbnail = session
            .current()
            .or(session.queue().front())
            .and_then(|track| track.thumbnail_url.clone());
        (session.display_string(), thumbnail)
    };

    let mut embed = CreateEmbed::default()
        .description(description)
        .title(format!("{guild} Queue"));

    if let Some(url) = thumbnail {
        embed = embed.thumbnail(url)
    };

    let reply = CreateReply::default().embed(embed);

    ctx.send(reply).await?;

    Ok(())
}

/// Clear the queue and stop the current track
#[instrument(skip(ctx))]
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn qclear(ctx: Context<'_>) -> Result<(), LarkError> {
    let player = Player::from_ctx(&ctx).await?;
    let cleared = player.clear().await?;

    tracing::info!("Cleared {cleared} tracks.");
    ctx.reply(format!("Cleared {cleared} tracks.")).await?;
    Ok(())
}

/// Play a queued track right away, positions start at 0
#[instrument(skip(ctx))]
#[poise::command(slash_command, prefix_command, guild_only, guild_cooldown = 2)]
pub async fn qskip(
    ctx: Context<'_>,
    #[description = "Position in the queue, as shown by qlist"] index: usize,
) -> Result<(), LarkError> {
    let player = Player::from_ctx(&ctx).await?;
    let track = player.jump(index).await?;

    ctx.reply(format!("**Now playing:** {track}")).await?;
    Ok(())
}

/// Shuffle the upcoming tracks
#[instrument(skip(ctx))]
#[poise::command(slash_command, prefix_command, guild_only, guild_cooldown = 2)]
pub async fn shuffle(ctx: Context<'_>) -> Result<(), LarkError> {
    let shuffled = {
        let guild_data = ctx.guild_data().await?;
        let mut guild = guild_data.lock().await;
        guild.session.shuffle()?
    };

    ctx.reply(format!("Shuffled {shuffled} tracks.")).await?;
    Ok(())
}
