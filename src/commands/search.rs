//! Implements the `/search` command.
//!
//! The bot lists the top results and waits for the author to pick one by typing its
//! number in the channel. Typing `queue` picks the first result.

use std::fmt::Write;

use poise::CreateReply;
use serenity::CreateEmbed;
use tracing::instrument;

use crate::data::Track;
use crate::error::UserError;
use crate::lib::player::Player;
use crate::serenity;
use crate::Context;
use crate::LarkError;

/// Search youtube and pick a result to play.
#[instrument(skip(ctx))]
#[poise::command(slash_command, prefix_command, guild_only, guild_cooldown = 2)]
pub async fn search(
    ctx: Context<'_>,
    #[description = "What to search for"]
    #[rest]
    query: String,
) -> Result<(), LarkError> {
    ctx.defer().await?;

    let requester = ctx.author().name.clone();
    let mut results = ctx.data().resolver.search(&query, &requester).await?;

    let timeout = ctx.data().music.selection_timeout();
    let embed = CreateEmbed::default()
        .title(format!("Results for `{query}`"))
        .description(results_list(&results))
        .footer(serenity::CreateEmbedFooter::new(format!(
            "Type a number to pick, or `queue` for the first result. Expires in {}s.",
            timeout.as_secs()
        )));
    ctx.send(CreateReply::default().embed(embed)).await?;

    // Wait for the author to pick something valid.
    let count = results.len();
    let picked = ctx
        .channel_id()
        .await_reply(ctx.serenity_context())
        .author_id(ctx.author().id)
        .filter(move |msg| parse_selection(&msg.content, count).is_some())
        .timeout(timeout)
        .await
        .and_then(|msg| parse_selection(&msg.content, count))
        .ok_or(UserError::SelectionTimedOut)?;

    let track = results.swap_remove(picked);
    let player = Player::join(&ctx).await?;
    let enqueued = player.enqueue(ctx.channel_id(), vec![track.clone()]).await?;
    ctx.reply(super::play::enqueued_message(&track, &enqueued))
        .await?;
    Ok(())
}

/// Numbered results, starting from 0.
fn results_list(results: &[Track]) -> String {
    let mut buffer = String::new();
    for (num, track) in results.iter().enumerate() {
        writeln!(buffer, "`{num}.` {track}").expect("write to string buffer can't fail");
    }
    buffer
}

/// Index picked by a reply: a number below `count`, or `queue` for the first.
fn parse_selection(reply: &str, count: usize) -> Option<usize> {
    let reply = reply.trim();
    if reply.eq_ignore_ascii_case("queue") {
        return (count > 0).then_some(0);
    }
    reply.parse::<usize>().ok().filter(|&index| index < count)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::data::track::test::track;

    #[test]
    fn picks_in_range_numbers() {
        assert_eq!(parse_selection("0", 5), Some(0));
        assert_eq!(parse_selection(" 4 ", 5), Some(4));
        assert_eq!(parse_selection("5", 5), None);
        assert_eq!(parse_selection("-1", 5), None);
        assert_eq!(parse_selection("hello", 5), None);
    }

    #[test]
    fn queue_picks_first() {
        assert_eq!(parse_selection("queue", 3), Some(0));
        assert_eq!(parse_selection("QUEUE", 3), Some(0));
        assert_eq!(parse_selection("queue", 0), None);
    }

    #[test]
    fn lists_from_zero() {
        let listed = results_list(&[track("a"), track("b")]);
        let lines: Vec<&str> = listed.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("`0.` [a]"));
        assert!(lines[1].starts_with("`1.` [b]"));
    }
}
