//! The cookie jar handed to yt-dlp and the out-of-process refresher that renews it.
//!
//! The bot only ever reads the jar. The `refresh-cookies` binary replaces it atomically,
//! so there is nothing to lock here.

use std::path::Path;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;
use std::time::SystemTime;

use tokio::sync::Mutex;

/// Netscape cookie jar on disk.
#[derive(Debug, Clone)]
pub struct CookieFile {
    /// Where the jar lives.
    path: PathBuf,
}

impl CookieFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// yt-dlp arguments for using the jar, empty if there is no jar yet.
    pub fn args(&self) -> Vec<String> {
        if self.path.is_file() {
            vec!["--cookies".to_string(), self.path.display().to_string()]
        } else {
            Vec::new()
        }
    }

    /// When the jar was last written.
    pub fn freshness(&self) -> Option<SystemTime> {
        std::fs::metadata(&self.path)
            .and_then(|meta| meta.modified())
            .ok()
    }

    /// Time since the jar was last written.
    pub fn age(&self) -> Option<Duration> {
        SystemTime::now().duration_since(self.freshness()?).ok()
    }
}

/// Launches the cookie refresher program.
/// At most one refresh runs at a time and runs are spaced by a cooldown.
/// Internally uses an [Arc], so it's cheap to clone.
#[derive(Debug, Clone)]
pub struct CookieRefresher {
    #[allow(clippy::missing_docs_in_private_items)]
    inner: Arc<RefresherInner>,
}

#[derive(Debug)]
struct RefresherInner {
    /// Program to launch.
    program: String,
    /// Extra arguments for `program`.
    args: Vec<String>,
    /// The jar the refresher should write.
    cookies: CookieFile,
    /// Minimum time between two runs.
    cooldown: Duration,
    /// A run taking longer than this is killed.
    timeout: Duration,
    /// Set while a refresh is in flight.
    running: AtomicBool,
    /// Start of the last run.
    last_run: Mutex<Option<Instant>>,
}

impl CookieRefresher {
    pub fn new(
        program: String,
        args: Vec<String>,
        cookies: CookieFile,
        cooldown: Duration,
        timeout: Duration,
    ) -> Self {
        let inner = RefresherInner {
            program,
            args,
            cookies,
            cooldown,
            timeout,
            running: AtomicBool::new(false),
            last_run: Mutex::new(None),
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Ask for a refresh in the background. Ignored while one is running or cooling down.
    pub fn request(&self, reason: &str) {
        if self.inner.running.swap(true, Ordering::AcqRel) {
            tracing::debug!("Cookie refresh already running, ignoring request ({reason}).");
            return;
        }

        let inner = self.inner.clone();
        let reason = reason.to_string();
        tokio::spawn(async move {
            inner.run(&reason).await;
            inner.running.store(false, Ordering::Release);
        });
    }

    /// Request a refresh every `interval` when the jar is older than `interval`.
    pub fn schedule(&self, interval: Duration) {
        tracing::info!("Scheduling cookie refresh every {interval:?}.");
        let refresher = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let stale = refresher
                    .inner
                    .cookies
                    .age()
                    .map_or(true, |age| age >= interval);
                if stale {
                    refresher.request("scheduled refresh");
                }
            }
        });
    }
}

impl RefresherInner {
    async fn run(&self, reason: &str) {
        {
            let mut last_run = self.last_run.lock().await;
            let now = Instant::now();
            if !should_run(*last_run, now, self.cooldown) {
                tracing::debug!("Cookie refresh on cooldown, ignoring request ({reason}).");
                return;
            }
            *last_run = Some(now);
        }

        tracing::info!("Refreshing cookies: {reason}");
        let mut command = tokio::process::Command::new(&self.program);
        command
            .args(&self.args)
            .env("YT_COOKIE_FILE", self.cookies.path())
            .stdin(Stdio::null())
            .kill_on_drop(true);

        // Dropping the future on timeout kills the child.
        let Ok(output) = tokio::time::timeout(self.timeout, command.output()).await else {
            tracing::error!(
                "Cookie refresher '{}' did not finish within {:?}, killed it.",
                self.program,
                self.timeout
            );
            return;
        };

        match output {
            Ok(out) if out.status.success() => {
                tracing::info!("Cookies refreshed, jar written at {:?}.", self.cookies.freshness());
            }
            Ok(out) => {
                let stderr = String::from_utf8_lossy(&out.stderr);
                tracing::error!(
                    "Cookie refresher exited with {status}: {stderr}",
                    status = out.status
                );
            }
            Err(e) => tracing::error!("Could not launch cookie refresher '{}': {e}", self.program),
        }
    }
}

/// Whether enough time passed since `last` to run again.
fn should_run(last: Option<Instant>, now: Instant, cooldown: Duration) -> bool {
    match last {
        None => true,
        Some(last) => now.saturating_duration_since(last) >= cooldown,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn cooldown_spaces_runs() {
        let cooldown = Duration::from_secs(900);
        let start = Instant::now();

        assert!(should_run(None, start, cooldown));
        assert!(!should_run(Some(start), start + Duration::from_secs(10), cooldown));
        assert!(should_run(Some(start), start + cooldown, cooldown));
    }

    #[test]
    fn missing_jar_adds_no_args() {
        let dir = tempfile::tempdir().unwrap();
        let jar = CookieFile::new(dir.path().join("cookies.txt"));

        assert!(jar.args().is_empty());
        assert!(jar.freshness().is_none());
    }

    #[test]
    fn existing_jar_is_passed_to_ytdlp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.txt");
        std::fs::write(&path, "# Netscape HTTP Cookie File\n").unwrap();
        let jar = CookieFile::new(&path);

        assert_eq!(jar.args(), ["--cookies".to_string(), path.display().to_string()]);
        assert!(jar.age().is_some_and(|age| age < Duration::from_secs(60)));
    }

    #[tokio::test]
    async fn second_request_waits_for_cooldown() {
        let dir = tempfile::tempdir().unwrap();
        let refresher = CookieRefresher::new(
            "true".to_string(),
            Vec::new(),
            CookieFile::new(dir.path().join("cookies.txt")),
            Duration::from_secs(900),
            Duration::from_secs(60),
        );

        refresher.inner.run("first").await;
        let first = *refresher.inner.last_run.lock().await;
        refresher.inner.run("second").await;
        let second = *refresher.inner.last_run.lock().await;

        assert!(first.is_some());
        assert_eq!(first, second);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn hung_refresh_is_killed_and_released() {
        let dir = tempfile::tempdir().unwrap();
        let refresher = CookieRefresher::new(
            "sleep".to_string(),
            vec!["3600".to_string()],
            CookieFile::new(dir.path().join("cookies.txt")),
            Duration::ZERO,
            Duration::from_millis(200),
        );

        refresher.request("first");
        assert!(refresher.inner.running.load(Ordering::Acquire));

        let released = tokio::time::timeout(Duration::from_secs(10), async {
            while refresher.inner.running.load(Ordering::Acquire) {
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await;
        assert!(released.is_ok(), "a hung refresh kept the refresher busy");

        // The next request is accepted again.
        refresher.request("second");
        assert!(refresher.inner.running.load(Ordering::Acquire));
    }
}
