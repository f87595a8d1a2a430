//! Functionality for interfacing with youtube through yt-dlp.
//!
//! Metadata comes from `yt-dlp -J`. Audio is streamed later through songbird's lazy
//! [YoutubeDl] input, since the direct media urls expire.

use std::process::Stdio;
use std::time::Duration;

use serde::Deserialize;
use songbird::input::Input;
use songbird::input::YoutubeDl;
use tracing::instrument;

use super::cookies::CookieFile;
use super::cookies::CookieRefresher;
use crate::data::Track;
use crate::error::ResolveError;
use crate::error::UserError;
use crate::setup::MusicConfig;
use crate::LarkError;

/// Arguments passed to every yt-dlp call.
const BASE_ARGS: [&str; 6] = [
    "-J",
    "--no-warnings",
    "--ignore-config",
    "--no-playlist",
    "-f",
    "bestaudio/best",
];

/// Turns urls and search terms into [Track]s.
#[derive(Debug)]
pub struct Resolver {
    /// The yt-dlp executable. Songbird wants a `'static` program name.
    program: &'static str,
    /// Passed along to yt-dlp when present.
    cookies: CookieFile,
    /// Max tracks taken from a playlist.
    playlist_limit: usize,
    /// Number of results shown by a search.
    search_limit: usize,
    /// Asked to renew the cookies when youtube wants a login.
    refresher: Option<CookieRefresher>,
}

impl Resolver {
    pub fn new(music: &MusicConfig, cookies: CookieFile, refresher: Option<CookieRefresher>) -> Self {
        // Leaked once at startup.
        let program: &'static str = Box::leak(music.ytdlp_program.clone().into_boxed_str());
        Self {
            program,
            cookies,
            playlist_limit: music.playlist_limit,
            search_limit: music.search_results,
            refresher,
        }
    }

    /// Resolve a url, or the top search result for anything that isn't a url.
    #[instrument(skip(self))]
    pub async fn resolve(&self, query: &str, requester: &str) -> Result<Track, LarkError> {
        let target = match as_url(query) {
            Some(url) => url.to_string(),
            None => format!("ytsearch1:{query}"),
        };

        let info = self.run(&[target]).await?;
        info.into_tracks(requester)
            .into_iter()
            .next()
            .ok_or_else(|| not_found(query))
    }

    /// The top search results for `query`.
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str, requester: &str) -> Result<Vec<Track>, LarkError> {
        let target = format!("ytsearch{}:{query}", self.search_limit);
        let info = self.run(&["--flat-playlist".to_string(), target]).await?;

        let tracks = info.into_tracks(requester);
        if tracks.is_empty() {
            Err(not_found(query))
        } else {
            Ok(tracks)
        }
    }

    /// The first entries of a playlist url.
    #[instrument(skip(self))]
    pub async fn playlist(&self, url: &str, requester: &str) -> Result<Vec<Track>, LarkError> {
        let url = as_url(url).ok_or_else(|| UserError::InvalidUrl {
            input: url.to_string(),
        })?;

        let args = [
            "--yes-playlist".to_string(),
            "--flat-playlist".to_string(),
            "--ignore-errors".to_string(),
            "--playlist-items".to_string(),
            format!("1-{}", self.playlist_limit),
            url.to_string(),
        ];
        let info = self.run(&args).await?;

        if !info.is_playlist() {
            Err(UserError::NotAPlaylist)?
        }
        let tracks = info.into_tracks(requester);
        if tracks.is_empty() {
            Err(UserError::NotAPlaylist)?
        }
        Ok(tracks)
    }

    /// Lazy songbird input for `track`, nothing is fetched until it starts playing.
    pub fn input(&self, http: reqwest::Client, track: &Track) -> Input {
        YoutubeDl::new_ytdl_like(self.program, http, track.source_url.clone())
            .user_args(self.cookies.args())
            .into()
    }

    /// Run yt-dlp with `args` and parse its json.
    async fn run(&self, args: &[String]) -> Result<Info, LarkError> {
        let cookie_args = self.cookies.args();
        if !cookie_args.is_empty() {
            tracing::debug!(
                "Using cookie jar {:?}, written {:?}.",
                self.cookies.path(),
                self.cookies.freshness()
            );
        }

        let output = tokio::process::Command::new(self.program)
            .args(BASE_ARGS)
            .args(cookie_args)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await?;

        // Playlists with unavailable entries exit non-zero but still print json.
        if !output.status.success() && output.stdout.is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let error = classify(&stderr);
            tracing::info!("yt-dlp failed ({error:?}): {}", stderr.trim());

            if error == ResolveError::AuthRequired {
                if let Some(refresher) = &self.refresher {
                    refresher.request("youtube asked for a login");
                }
            }
            Err(error)?
        }

        let stdout = String::from_utf8(output.stdout)?;
        parse_info(&stdout)
    }
}

/// `query` as an http(s) url, if it is one.
pub fn as_url(query: &str) -> Option<url::Url> {
    url::Url::parse(query.trim())
        .ok()
        .filter(|url| matches!(url.scheme(), "http" | "https"))
}

#[allow(clippy::missing_docs_in_private_items)]
fn not_found(query: &str) -> LarkError {
    ResolveError::NotFound {
        query: query.to_string(),
    }
    .into()
}

/// Sort a failed yt-dlp run into a [ResolveError] by its stderr.
pub fn classify(stderr: &str) -> ResolveError {
    let lower = stderr.to_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

    // The last error line is the most specific.
    let reason = stderr
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("unknown error")
        .trim_start_matches("ERROR:")
        .trim()
        .to_string();

    if has(&[
        "confirm your age",
        "age-restricted",
        "inappropriate for some users",
        "available in your country",
        "geo restrict",
    ]) {
        ResolveError::Restricted { reason }
    } else if has(&["sign in to confirm", "not a bot", "use --cookies", "login required"]) {
        ResolveError::AuthRequired
    } else if has(&["video unavailable", "private video", "has been removed", "is not available"]) {
        ResolveError::Unavailable { reason }
    } else {
        ResolveError::Extractor { reason }
    }
}

/// Parse `yt-dlp -J` output, pointing at the bad field when it doesn't fit.
fn parse_info(json: &str) -> Result<Info, LarkError> {
    let de = &mut serde_json::Deserializer::from_str(json);
    serde_path_to_error::deserialize(de).map_err(|e| LarkError::ExtractorOutput {
        path: e.path().to_string(),
        reason: e.inner().to_string(),
    })
}

/// The parts of yt-dlp's info json that we use.
/// Single videos, searches and playlists all share this shape.
#[derive(Debug, Deserialize)]
struct Info {
    /// `playlist`, `url` (flat entries) or missing for videos.
    #[serde(rename = "_type")]
    kind: Option<String>,
    id: Option<String>,
    title: Option<String>,
    /// The page of the video.
    webpage_url: Option<String>,
    /// Media url for full extractions, page url for flat entries.
    url: Option<String>,
    /// Seconds.
    duration: Option<f64>,
    channel: Option<String>,
    uploader: Option<String>,
    thumbnail: Option<String>,
    #[serde(default)]
    thumbnails: Option<Vec<Thumbnail>>,
    /// Unavailable entries show up as `null`.
    #[serde(default)]
    entries: Option<Vec<Option<Info>>>,
}

#[derive(Debug, Deserialize)]
#[allow(clippy::missing_docs_in_private_items)]
struct Thumbnail {
    url: String,
}

impl Info {
    fn is_playlist(&self) -> bool {
        self.kind.as_deref() == Some("playlist") || self.entries.is_some()
    }

    /// Flatten into tracks, skipping entries without a usable url.
    fn into_tracks(self, requester: &str) -> Vec<Track> {
        match self.entries {
            Some(entries) => entries
                .into_iter()
                .flatten()
                .filter_map(|entry| entry.into_track(requester))
                .collect(),
            None => self.into_track(requester).into_iter().collect(),
        }
    }

    fn into_track(self, requester: &str) -> Option<Track> {
        let is_flat = self.kind.as_deref() == Some("url");

        let (source_url, stream_url) = match (self.webpage_url, self.url) {
            (Some(page), media) => (page, media.filter(|_| !is_flat)),
            (None, Some(url)) if is_flat => (url, None),
            (None, _) => (
                format!("https://www.youtube.com/watch?v={}", self.id?),
                None,
            ),
        };

        let thumbnail_url = self.thumbnail.or_else(|| {
            self.thumbnails
                .and_then(|thumbs| thumbs.into_iter().last())
                .map(|thumb| thumb.url)
        });

        let duration = self
            .duration
            .filter(|secs| secs.is_finite() && *secs >= 0.0)
            .map(Duration::from_secs_f64);

        Some(Track {
            title: self.title.unwrap_or_else(|| "<MISSING TITLE>".to_string()),
            source_url,
            stream_url,
            duration,
            channel: self.channel.or(self.uploader),
            thumbnail_url,
            requester: requester.to_string(),
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn only_http_urls_are_urls() {
        assert!(as_url("https://www.youtube.com/watch?v=abc").is_some());
        assert!(as_url(" http://youtu.be/abc ").is_some());
        assert!(as_url("never gonna give you up").is_none());
        assert!(as_url("ftp://example.com/song.mp3").is_none());
        assert!(as_url("mailto:someone@example.com").is_none());
    }

    #[test]
    fn classifies_auth_errors() {
        let stderr = "ERROR: [youtube] abc: Sign in to confirm you're not a bot. Use --cookies-from-browser or --cookies for the authentication.";
        assert_eq!(classify(stderr), ResolveError::AuthRequired);
    }

    #[test]
    fn classifies_restricted_and_unavailable() {
        let age = "ERROR: [youtube] abc: Sign in to confirm your age. This video may be inappropriate for some users.";
        assert!(matches!(classify(age), ResolveError::Restricted { .. }));

        let region = "ERROR: [youtube] abc: The uploader has not made this video available in your country";
        assert!(matches!(classify(region), ResolveError::Restricted { .. }));

        let gone = "WARNING: something\nERROR: [youtube] abc: Video unavailable";
        assert_eq!(
            classify(gone),
            ResolveError::Unavailable {
                reason: "[youtube] abc: Video unavailable".to_string()
            }
        );

        let private = "ERROR: [youtube] abc: Private video. Sign in if you've been granted access";
        assert!(matches!(classify(private), ResolveError::Unavailable { .. }));
    }

    #[test]
    fn unknown_failures_keep_last_line() {
        let stderr = "ERROR: Unable to download webpage: timed out\n";
        assert_eq!(
            classify(stderr),
            ResolveError::Extractor {
                reason: "Unable to download webpage: timed out".to_string()
            }
        );
    }

    #[test]
    fn parses_single_video() {
        let json = r#"{
            "id": "abc",
            "title": "A song",
            "webpage_url": "https://www.youtube.com/watch?v=abc",
            "url": "https://rr1---sn.googlevideo.com/videoplayback?expire=1",
            "duration": 212.0,
            "channel": "Someone",
            "thumbnail": "https://i.ytimg.com/vi/abc/hq.jpg",
            "formats": [{"format_id": "251"}]
        }"#;

        let tracks = parse_info(json).unwrap().into_tracks("me");
        assert_eq!(tracks.len(), 1);

        let track = &tracks[0];
        assert_eq!(track.title, "A song");
        assert_eq!(track.source_url, "https://www.youtube.com/watch?v=abc");
        assert!(track.stream_url.as_deref().unwrap().contains("googlevideo"));
        assert_eq!(track.duration, Some(Duration::from_secs(212)));
        assert_eq!(track.channel.as_deref(), Some("Someone"));
        assert_eq!(track.requester, "me");
    }

    #[test]
    fn parses_flat_playlist_and_skips_missing_entries() {
        let json = r#"{
            "_type": "playlist",
            "title": "Mix",
            "entries": [
                {"_type": "url", "id": "a", "url": "https://www.youtube.com/watch?v=a", "title": "First", "duration": 60, "uploader": "Up",
                 "thumbnails": [{"url": "https://i.ytimg.com/a/small.jpg"}, {"url": "https://i.ytimg.com/a/big.jpg"}]},
                null,
                {"_type": "url", "id": "b", "title": "Second"}
            ]
        }"#;

        let info = parse_info(json).unwrap();
        assert!(info.is_playlist());

        let tracks = info.into_tracks("me");
        let titles: Vec<&str> = tracks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, ["First", "Second"]);

        assert_eq!(tracks[0].source_url, "https://www.youtube.com/watch?v=a");
        assert_eq!(tracks[0].stream_url, None);
        assert_eq!(tracks[0].channel.as_deref(), Some("Up"));
        assert_eq!(
            tracks[0].thumbnail_url.as_deref(),
            Some("https://i.ytimg.com/a/big.jpg")
        );
        assert_eq!(tracks[1].source_url, "https://www.youtube.com/watch?v=b");
        assert_eq!(tracks[1].duration, None);
    }

    #[test]
    fn empty_search_has_no_tracks() {
        let json = r#"{"_type": "playlist", "id": "q", "entries": []}"#;
        assert!(parse_info(json).unwrap().into_tracks("me").is_empty());
    }

    #[test]
    fn bad_json_points_at_field() {
        let json = r#"{"title": "ok", "duration": "long"}"#;
        match parse_info(json) {
            Err(LarkError::ExtractorOutput { path, .. }) => assert_eq!(path, "duration"),
            other => panic!("expected extractor output error, got {other:?}"),
        }
    }
}
