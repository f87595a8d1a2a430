//! Logs into youtube with a headless browser and writes fresh cookies for yt-dlp.
//!
//! The existing cookie jar is only replaced once the new one has been checked with yt-dlp.
//! Exits with 0 on success and 1 on any failure.

mod browser;
mod error;
mod jar;
mod validate;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::filter::LevelFilter;

use error::RefreshError;
use jar::StagedJar;

#[derive(Debug, Parser)]
#[command(
    name = "refresh-cookies",
    version,
    about = "Refresh the youtube cookie jar used by lark-bot"
)]
struct Args {
    /// Google account email.
    #[arg(long, env = "YOUTUBE_EMAIL")]
    email: String,

    /// Google account password.
    #[arg(long, env = "YOUTUBE_PASSWORD", hide_env_values = true)]
    password: String,

    /// Cookie jar to replace.
    #[arg(long, env = "YT_COOKIE_FILE", default_value = "cookies.txt")]
    cookies: PathBuf,

    /// A running chromedriver.
    #[arg(long, env = "WEBDRIVER_URL", default_value = "http://localhost:9515")]
    webdriver: String,

    /// yt-dlp executable used to check the new cookies.
    #[arg(long, default_value = "yt-dlp")]
    ytdlp: String,

    /// Video fetched to check the new cookies.
    #[arg(long, default_value = "https://www.youtube.com/watch?v=dQw4w9WgXcQ")]
    probe_url: String,

    /// Seconds to wait for each page or check.
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,
}

impl Args {
    fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::INFO)
        .with_target(false)
        .init();

    let args = Args::parse();

    match run(&args).await {
        Ok(count) => {
            tracing::info!("Wrote {count} cookies to {}.", args.cookies.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("Cookie refresh failed, {} is unchanged: {e}", args.cookies.display());
            ExitCode::FAILURE
        }
    }
}

/// Log in, stage the new jar, check it, then swap it in.
async fn run(args: &Args) -> Result<usize, RefreshError> {
    let cookies = browser::login(args).await?;
    let cookies = jar::youtube_cookies(cookies);
    if cookies.is_empty() {
        return Err(RefreshError::NoCookies);
    }

    // Dropping the stage on any error below removes it.
    let staged = StagedJar::write(&args.cookies, &jar::render(&cookies)).await?;
    validate::check(&args.ytdlp, staged.path(), &args.probe_url, args.timeout()).await?;
    staged.commit().await?;

    Ok(cookies.len())
}
