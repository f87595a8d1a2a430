//! Implements the `/team` command.
//!
//! Randomly assigns 2 to 5 players to League of Legends lanes.

use std::fmt::Display;

use poise::CreateReply;
use rand::seq::SliceRandom;
use rand::Rng;
use serenity::CreateEmbed;
use serenity::CreateEmbedFooter;
use tracing::instrument;

use crate::error::UserError;
use crate::serenity;
use crate::Context;
use crate::LarkError;

/// Lanes in the order they are handed out.
const LANES: [Lane; 5] = [Lane::Top, Lane::Jungle, Lane::Mid, Lane::Bot, Lane::Support];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::missing_docs_in_private_items)]
enum Lane {
    Top,
    Jungle,
    Mid,
    Bot,
    Support,
}

impl Display for Lane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Lane::Top => "Top",
            Lane::Jungle => "Jungle",
            Lane::Mid => "Mid",
            Lane::Bot => "Bot",
            Lane::Support => "Support",
        };
        f.write_str(name)
    }
}

/// Randomly assign players to lanes
#[instrument(skip(ctx))]
#[poise::command(slash_command, prefix_command)]
pub async fn team(
    ctx: Context<'_>,
    #[description = "Comma separated players, 2 to 5"]
    #[rest]
    players: String,
) -> Result<(), LarkError> {
    let assignments = assign_lanes(&players, &mut rand::rng())?;
    let count = assignments.len();

    let fields = assignments
        .into_iter()
        .map(|(lane, player)| (lane.to_string(), player, true));
    let embed = CreateEmbed::default()
        .title("League of Legends Team Assignment")
        .description("Here's your randomly assigned team composition!")
        .colour(serenity::Colour::BLUE)
        .fields(fields)
        .footer(CreateEmbedFooter::new(format!("Total Players: {count}")));

    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Shuffle comma separated `players` onto the lanes, in lane order.
fn assign_lanes<R: Rng + ?Sized>(
    players: &str,
    rng: &mut R,
) -> Result<Vec<(Lane, String)>, UserError> {
    let mut players: Vec<String> = players
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect();

    if !(2..=LANES.len()).contains(&players.len()) {
        return Err(UserError::TeamSize {
            count: players.len(),
        });
    }

    players.shuffle(rng);
    Ok(LANES.into_iter().zip(players).collect())
}

#[cfg(test)]
mod test {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn everyone_gets_one_lane() {
        let mut rng = StdRng::seed_from_u64(3);
        let assigned = assign_lanes("ann, bob,cat , dan,eve", &mut rng).unwrap();

        let lanes: Vec<Lane> = assigned.iter().map(|(lane, _)| *lane).collect();
        assert_eq!(lanes, LANES);

        let mut players: Vec<&str> = assigned.iter().map(|(_, p)| p.as_str()).collect();
        players.sort();
        assert_eq!(players, ["ann", "bob", "cat", "dan", "eve"]);
    }

    #[test]
    fn small_teams_fill_lanes_in_order() {
        let mut rng = StdRng::seed_from_u64(3);
        let assigned = assign_lanes("ann, bob", &mut rng).unwrap();

        let lanes: Vec<Lane> = assigned.iter().map(|(lane, _)| *lane).collect();
        assert_eq!(lanes, [Lane::Top, Lane::Jungle]);
    }

    #[test]
    fn team_size_is_checked() {
        let mut rng = StdRng::seed_from_u64(3);
        assert!(matches!(
            assign_lanes("solo", &mut rng),
            Err(UserError::TeamSize { count: 1 })
        ));
        assert!(matches!(
            assign_lanes("a,b,c,d,e,f", &mut rng),
            Err(UserError::TeamSize { count: 6 })
        ));
        // Blank entries don't count as players.
        assert!(matches!(
            assign_lanes("a, ,", &mut rng),
            Err(UserError::TeamSize { count: 1 })
        ));
    }
}
