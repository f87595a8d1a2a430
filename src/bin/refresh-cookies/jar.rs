//! Netscape cookie jars, written next to the target and renamed over it once checked.

use std::collections::HashSet;
use std::fmt::Write;
use std::path::Path;
use std::path::PathBuf;

use fantoccini::cookies::Cookie;

/// The header yt-dlp expects on the first line.
const HEADER: &str = "# Netscape HTTP Cookie File\n\
# https://curl.haxx.se/rfc/cookie_spec.html\n\
# This is a generated file! Do not edit.\n\n";

/// One line of a cookie jar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JarCookie {
    pub domain: String,
    pub path: String,
    pub secure: bool,
    pub http_only: bool,
    /// Unix seconds, `0` for session cookies.
    pub expires: i64,
    pub name: String,
    pub value: String,
}

impl From<&Cookie<'_>> for JarCookie {
    fn from(cookie: &Cookie<'_>) -> Self {
        // The leading dot is stripped on the way out of the browser,
        // so every cookie is written as a domain cookie.
        let domain = cookie.domain().unwrap_or_default().trim_start_matches('.');
        Self {
            domain: format!(".{domain}"),
            path: cookie.path().unwrap_or("/").to_string(),
            secure: cookie.secure().unwrap_or(false),
            http_only: cookie.http_only().unwrap_or(false),
            expires: cookie
                .expires_datetime()
                .map_or(0, |at| at.unix_timestamp().max(0)),
            name: cookie.name().to_string(),
            value: cookie.value().to_string(),
        }
    }
}

/// Cookies for youtube and google, without duplicates.
pub fn youtube_cookies<'c>(cookies: impl IntoIterator<Item = Cookie<'c>>) -> Vec<JarCookie> {
    let mut seen = HashSet::new();
    cookies
        .into_iter()
        .map(|cookie| JarCookie::from(&cookie))
        .filter(|c| c.domain.contains("youtube.com") || c.domain.contains("google.com"))
        .filter(|c| seen.insert((c.domain.clone(), c.path.clone(), c.name.clone())))
        .collect()
}

/// Render cookies in the Netscape format.
pub fn render(cookies: &[JarCookie]) -> String {
    let mut buffer = String::from(HEADER);
    for c in cookies {
        let include_subdomains = c.domain.starts_with('.');
        let http_only = if c.http_only { "#HttpOnly_" } else { "" };
        writeln!(
            buffer,
            "{http_only}{domain}\t{subdomains}\t{path}\t{secure}\t{expires}\t{name}\t{value}",
            domain = c.domain,
            subdomains = flag(include_subdomains),
            path = c.path,
            secure = flag(c.secure),
            expires = c.expires,
            name = c.name,
            value = c.value,
        )
        .expect("write to string buffer can't fail");
    }
    buffer
}

#[allow(clippy::missing_docs_in_private_items)]
fn flag(value: bool) -> &'static str {
    if value {
        "TRUE"
    } else {
        "FALSE"
    }
}

/// A new jar written beside its target.
/// [commit](StagedJar::commit) renames it over the target, dropping it removes it.
#[derive(Debug)]
pub struct StagedJar {
    /// Where the new jar is written first.
    staged: PathBuf,
    /// The jar to replace.
    target: PathBuf,
    /// Set once renamed, so drop leaves it alone.
    committed: bool,
}

impl StagedJar {
    /// Write `content` to `<target>.tmp`.
    pub async fn write(target: &Path, content: &str) -> std::io::Result<Self> {
        let mut staged = target.as_os_str().to_owned();
        staged.push(".tmp");

        let jar = Self {
            staged: PathBuf::from(staged),
            target: target.to_path_buf(),
            committed: false,
        };
        tokio::fs::write(&jar.staged, content).await?;
        Ok(jar)
    }

    pub fn path(&self) -> &Path {
        &self.staged
    }

    /// Atomically replace the target.
    pub async fn commit(mut self) -> std::io::Result<()> {
        tokio::fs::rename(&self.staged, &self.target).await?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for StagedJar {
    fn drop(&mut self) {
        if !self.committed {
            if let Err(e) = std::fs::remove_file(&self.staged) {
                tracing::debug!("Could not remove staged jar {}: {e}", self.staged.display());
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn cookie(domain: &str, name: &str) -> Cookie<'static> {
        let mut cookie = Cookie::new(name.to_string(), "v".to_string());
        cookie.set_domain(domain.to_string());
        cookie.set_path("/");
        cookie.set_secure(true);
        cookie
    }

    #[test]
    fn keeps_youtube_and_google_once() {
        let cookies = youtube_cookies([
            cookie(".youtube.com", "SID"),
            cookie(".youtube.com", "SID"),
            cookie("accounts.google.com", "LSID"),
            cookie(".example.com", "other"),
        ]);

        let names: Vec<&str> = cookies.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["SID", "LSID"]);
        assert_eq!(cookies[0].domain, ".youtube.com");
        assert_eq!(cookies[1].domain, ".accounts.google.com");
    }

    #[test]
    fn renders_netscape_lines() {
        let jar = render(&[
            JarCookie {
                domain: ".youtube.com".to_string(),
                path: "/".to_string(),
                secure: true,
                http_only: false,
                expires: 1_800_000_000,
                name: "SID".to_string(),
                value: "abc".to_string(),
            },
            JarCookie {
                domain: "accounts.google.com".to_string(),
                path: "/".to_string(),
                secure: false,
                http_only: true,
                expires: 0,
                name: "LSID".to_string(),
                value: "def".to_string(),
            },
        ]);

        assert!(jar.starts_with("# Netscape HTTP Cookie File\n"));
        let lines: Vec<&str> = jar.lines().filter(|l| l.contains('\t')).collect();
        assert_eq!(
            lines,
            [
                ".youtube.com\tTRUE\t/\tTRUE\t1800000000\tSID\tabc",
                "#HttpOnly_accounts.google.com\tFALSE\t/\tFALSE\t0\tLSID\tdef",
            ]
        );
    }

    #[tokio::test]
    async fn commit_replaces_target() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("cookies.txt");
        std::fs::write(&target, "old").unwrap();

        let staged = StagedJar::write(&target, "new").await.unwrap();
        let staged_path = staged.path().to_path_buf();
        staged.commit().await.unwrap();

        assert_eq!(std::fs::read_to_string(&target).unwrap(), "new");
        assert!(!staged_path.exists());
    }

    #[tokio::test]
    async fn failed_run_leaves_old_jar() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("cookies.txt");
        std::fs::write(&target, "old").unwrap();

        let staged = StagedJar::write(&target, "new").await.unwrap();
        let staged_path = staged.path().to_path_buf();
        assert!(staged_path.exists());
        // Validation failed, the stage is dropped without committing.
        drop(staged);

        assert_eq!(std::fs::read_to_string(&target).unwrap(), "old");
        assert!(!staged_path.exists());
    }
}
