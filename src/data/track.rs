//! A resolved track and its display implementation.

use std::fmt::Display;
use std::time::Duration;

use crate::lib;

/// A playable track produced by the [resolver](crate::lib::youtube::Resolver).
/// Never modified once it is enqueued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    /// Title of the track.
    pub title: String,
    /// Page the track was resolved from, used to (re)create the audio input.
    pub source_url: String,
    /// Direct media url seen at resolve time. These expire, so playback never relies on it.
    pub stream_url: Option<String>,
    /// Duration of the track, missing for live streams.
    pub duration: Option<Duration>,
    /// The source's channel name.
    pub channel: Option<String>,
    /// The url to the source's thumbnail.
    pub thumbnail_url: Option<String>,
    /// Display name of whoever asked for it.
    pub requester: String,
}

impl Display for Track {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let title = &self.title;
        let duration = match self.duration {
            None => String::new(),
            Some(dur) => lib::format_duration(&dur),
        };
        let channel = self.channel.as_deref().unwrap_or_default();
        let url = &self.source_url;

        write!(f, "[{title}]({url}) {duration} {channel}")
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;

    /// Bare track for tests, `name` doubles as the url path.
    pub fn track(name: &str) -> Track {
        Track {
            title: name.to_string(),
            source_url: format!("https://www.youtube.com/watch?v={name}"),
            stream_url: None,
            duration: Some(Duration::from_secs(61)),
            channel: None,
            thumbnail_url: None,
            requester: "tester".to_string(),
        }
    }

    #[test]
    fn display_links_title() {
        let shown = track("abc").to_string();
        assert!(shown.starts_with("[abc](https://www.youtube.com/watch?v=abc)"));
        assert!(shown.contains("[01m:01s]"));
    }
}
