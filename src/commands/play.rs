//! Implements the `/play` command.
//!
//! The bot joins the author's voice channel, resolves the query and adds it to the queue.
//! Playback starts right away when nothing else is playing.

use tracing::instrument;

use crate::data::Track;
use crate::lib::player::Enqueued;
use crate::lib::player::Player;
use crate::Context;
use crate::LarkError;

/// Play a youtube url, or the top search result for anything else.
#[instrument(skip(ctx))]
#[poise::command(slash_command, prefix_command, guild_only, guild_cooldown = 2)]
pub async fn play(
    ctx: Context<'_>,
    #[description = "Youtube url or search query"]
    #[rest]
    query: String,
) -> Result<(), LarkError> {
    // Resolving takes a while.
    ctx.defer().await?;

    let player = Player::join(&ctx).await?;
    let requester = ctx.author().name.clone();
    let track = ctx.data().resolver.resolve(&query, &requester).await?;

    let enqueued = player.enqueue(ctx.channel_id(), vec![track.clone()]).await?;
    ctx.reply(enqueued_message(&track, &enqueued)).await?;
    Ok(())
}

/// Reply for a single enqueued track.
pub(super) fn enqueued_message(track: &Track, enqueued: &Enqueued) -> String {
    match &enqueued.started {
        Some(_) => format!("**Now playing:** {track}"),
        None => format!("Queued at position `{}`: {track}", enqueued.position),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::data::track::test::track;

    #[test]
    fn reports_start_or_position() {
        let song = track("a");

        let started = Enqueued {
            started: Some(song.clone()),
            position: 0,
            queue_len: 0,
        };
        assert!(enqueued_message(&song, &started).starts_with("**Now playing:** [a]"));

        let queued = Enqueued {
            started: None,
            position: 2,
            queue_len: 3,
        };
        assert!(enqueued_message(&song, &queued).starts_with("Queued at position `2`: [a]"));
    }
}
