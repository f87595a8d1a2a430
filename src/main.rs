//! A Discord bot that plays youtube audio in voice channels and makes teams.

mod commands;
mod data;
mod error;
mod lib;
mod log;
mod setup;

use poise::serenity_prelude as serenity;

use data::Data;
use error::LarkError;
use setup::Config;

/// Convenient type alias, this is the only [poise::Context] type used.
type Context<'a> = poise::Context<'a, Data, LarkError>;

#[tokio::main]
async fn main() -> Result<(), LarkError> {
    let config = match Config::read() {
        Ok(config) => config,
        Err(e) => {
            // Tracing isn't installed without a config.
            eprintln!("{e}");
            return Err(e.into());
        }
    };

    // Keep the guard alive so file logs are flushed.
    let _guard = log::install_tracing(&config);

    let mut client = setup::client(config).await.inspect_err(|e| {
        tracing::error!("Failed to build the discord client: {e}");
    })?;

    client.start().await.inspect_err(|e| {
        tracing::error!("Client stopped: {e}");
    })?;

    Ok(())
}
