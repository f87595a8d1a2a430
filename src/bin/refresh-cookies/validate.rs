//! Checks a cookie jar by letting yt-dlp fetch a known video's title with it.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use crate::error::RefreshError;

/// Run `yt-dlp --cookies <jar> --get-title <probe_url>`.
/// The jar works when yt-dlp exits cleanly and prints a title.
pub async fn check(
    program: &str,
    jar: &Path,
    probe_url: &str,
    timeout: Duration,
) -> Result<(), RefreshError> {
    tracing::info!("Checking the new cookies against {probe_url}.");

    let mut command = tokio::process::Command::new(program);
    command
        .arg("--cookies")
        .arg(jar)
        .args(["--quiet", "--no-warnings", "--skip-download", "--get-title"])
        .arg(probe_url)
        .stdin(Stdio::null())
        .kill_on_drop(true);

    let output = tokio::time::timeout(timeout, command.output())
        .await
        .map_err(|_| RefreshError::ValidationTimedOut {
            secs: timeout.as_secs(),
        })??;

    let title = String::from_utf8_lossy(&output.stdout);
    let title = title.trim();
    if output.status.success() && !title.is_empty() {
        tracing::info!("yt-dlp sees '{title}' with the new cookies.");
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let reason = match stderr.trim() {
        "" => format!("exited with {} and no title", output.status),
        err => err.to_string(),
    };
    Err(RefreshError::Rejected { reason })
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn missing_program_is_an_error() {
        let result = check(
            "definitely-not-yt-dlp",
            Path::new("cookies.txt"),
            "https://www.youtube.com/watch?v=abc",
            Duration::from_secs(5),
        )
        .await;

        assert!(matches!(result, Err(RefreshError::Io(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn silent_success_is_rejected() {
        // `true` exits 0 without printing a title.
        let result = check(
            "true",
            Path::new("cookies.txt"),
            "https://www.youtube.com/watch?v=abc",
            Duration::from_secs(5),
        )
        .await;

        assert!(matches!(result, Err(RefreshError::Rejected { .. })));
    }
}
