//! Implements the `/help` command.

use tracing::instrument;

use crate::Context;
use crate::LarkError;

/// Show available commands, or details for one of them
#[instrument(skip(ctx))]
#[poise::command(slash_command, prefix_command)]
pub async fn help(
    ctx: Context<'_>,
    #[description = "Command to show help for"]
    #[autocomplete = "poise::builtins::autocomplete_command"]
    command: Option<String>,
) -> Result<(), LarkError> {
    let config = poise::builtins::HelpConfiguration {
        extra_text_at_bottom: "Queue positions start at 0, see qlist.",
        ephemeral: true,
        ..Default::default()
    };
    poise::builtins::help(ctx, command.as_deref(), config).await?;
    Ok(())
}
