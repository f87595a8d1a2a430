//! Per-guild playback session.
//!
//! A [Session] owns the [TrackQueue], the current [Track] with its songbird handle and
//! the transport state `Idle -> Playing <-> Paused -> Idle`. The current track is never
//! part of the queue.

use std::fmt::Write;

use songbird::error::ControlError;
use songbird::tracks::TrackHandle;

use super::Track;
use super::TrackQueue;
use crate::error::UserError;
use crate::serenity;
use crate::LarkError;

/// An embed has a limit of 4096 chars.
const EMBED_LIMIT: usize = 4096;

/// A handle whose track already ended (its end event is still on the way) is
/// the same as nothing playing for the user.
fn from_control(e: ControlError) -> LarkError {
    match e {
        ControlError::Finished | ControlError::Dropped => UserError::NothingPlaying.into(),
        other => other.into(),
    }
}

/// Transport state of a [Session].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    #[default]
    Idle,
    Playing,
    Paused,
}

impl PlaybackState {
    /// `Playing -> Paused`
    pub fn pause(self) -> Result<Self, UserError> {
        match self {
            PlaybackState::Playing => Ok(PlaybackState::Paused),
            PlaybackState::Paused => Err(UserError::AlreadyPaused),
            PlaybackState::Idle => Err(UserError::NothingPlaying),
        }
    }

    /// `Paused -> Playing`
    pub fn resume(self) -> Result<Self, UserError> {
        match self {
            PlaybackState::Paused => Ok(PlaybackState::Playing),
            PlaybackState::Playing | PlaybackState::Idle => Err(UserError::NotPaused),
        }
    }
}

/// Playback volume in percent, `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Volume(u8);

impl Volume {
    /// Validate a user supplied percentage.
    pub fn new(percent: u16) -> Result<Self, UserError> {
        match u8::try_from(percent) {
            Ok(p) if p <= 100 => Ok(Volume(p)),
            _ => Err(UserError::VolumeOutOfRange { given: percent }),
        }
    }

    pub fn percent(self) -> u8 {
        self.0
    }

    /// Gain for songbird where `1.0` is unchanged.
    pub fn gain(self) -> f32 {
        f32::from(self.0) / 100.0
    }
}

impl Default for Volume {
    fn default() -> Self {
        Volume(100)
    }
}

/// Everything the bot tracks about playback in one guild.
#[derive(Debug, Default)]
pub struct Session {
    /// Upcoming tracks.
    queue: TrackQueue,
    /// What's playing (or paused) right now.
    current: Option<Track>,
    /// Songbird's handle for `current`.
    handle: Option<TrackHandle>,
    state: PlaybackState,
    volume: Volume,
    /// Re-enqueue finished tracks at the tail.
    looping: bool,
    /// Where to announce track changes that aren't replies to a command.
    announce_channel: Option<serenity::ChannelId>,
}

impl Session {
    /// A new idle session.
    pub fn new(volume: Volume) -> Self {
        Self {
            volume,
            ..Default::default()
        }
    }

    pub fn queue(&self) -> &TrackQueue {
        &self.queue
    }

    pub fn queue_mut(&mut self) -> &mut TrackQueue {
        &mut self.queue
    }

    pub fn current(&self) -> Option<&Track> {
        self.current.as_ref()
    }

    pub fn current_handle(&self) -> Option<&TrackHandle> {
        self.handle.as_ref()
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn volume(&self) -> Volume {
        self.volume
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn announce_channel(&self) -> Option<serenity::ChannelId> {
        self.announce_channel
    }

    pub fn set_announce_channel(&mut self, channel: serenity::ChannelId) {
        self.announce_channel = Some(channel);
    }

    /// Whether `handle` belongs to the current track.
    pub fn is_current(&self, handle: &TrackHandle) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|current| current.uuid() == handle.uuid())
    }

    /// Make `track` the current track, replacing (and stopping) whatever was playing.
    /// A replaced track is discarded, even in loop mode.
    pub fn begin(&mut self, track: Track, handle: Option<TrackHandle>) {
        self.stop_handle();
        self.current = Some(track);
        self.handle = handle;
        self.state = PlaybackState::Playing;
    }

    /// End the current track and go idle.
    /// In loop mode the finished track goes back to the tail of the queue.
    pub fn finish_current(&mut self) -> Option<Track> {
        self.stop_handle();
        self.state = PlaybackState::Idle;
        let finished = self.current.take()?;
        if self.looping {
            self.queue.enqueue(finished.clone());
        }
        Some(finished)
    }

    /// Finish the current track and take the next one from the queue.
    /// The caller is expected to [begin](Session::begin) the returned track.
    pub fn advance(&mut self) -> Option<Track> {
        self.finish_current();
        self.queue.pop_next()
    }

    /// `Playing -> Paused`
    pub fn pause(&mut self) -> Result<&Track, LarkError> {
        let next = self.state.pause()?;
        if let Some(handle) = &self.handle {
            handle.pause().map_err(from_control)?;
        }
        self.state = next;
        self.current
            .as_ref()
            .ok_or(UserError::NothingPlaying.into())
    }

    /// `Paused -> Playing`
    pub fn resume(&mut self) -> Result<&Track, LarkError> {
        let next = self.state.resume()?;
        if let Some(handle) = &self.handle {
            handle.play().map_err(from_control)?;
        }
        self.state = next;
        self.current
            .as_ref()
            .ok_or(UserError::NothingPlaying.into())
    }

    /// Change the volume of the current and all later tracks.
    pub fn set_volume(&mut self, volume: Volume) -> Result<(), LarkError> {
        if let Some(handle) = &self.handle {
            handle.set_volume(volume.gain()).map_err(from_control)?;
        }
        self.volume = volume;
        Ok(())
    }

    /// Flip loop mode, returning the new value.
    pub fn toggle_loop(&mut self) -> bool {
        self.looping = !self.looping;
        self.looping
    }

    /// Shuffle the upcoming tracks, the current track stays where it is.
    pub fn shuffle(&mut self) -> Result<usize, UserError> {
        if self.queue.len() < 2 {
            return Err(UserError::NotEnoughToShuffle);
        }
        self.queue.shuffle();
        Ok(self.queue.len())
    }

    /// Drop the queue and the current track without looping anything.
    pub fn stop_all(&mut self) {
        self.queue.clear();
        self.stop_handle();
        self.current = None;
        self.state = PlaybackState::Idle;
    }

    /// Like [stop_all](Session::stop_all), but refuses an idle session with nothing queued.
    /// Returns how many tracks were dropped.
    pub fn clear(&mut self) -> Result<usize, UserError> {
        let cleared = self.queue.len() + usize::from(self.current.is_some());
        if cleared == 0 {
            return Err(UserError::EmptyQueue);
        }
        self.stop_all();
        Ok(cleared)
    }

    /// Stop everything and forget loop mode, volume and announce channel.
    pub fn reset(&mut self, volume: Volume) {
        self.stop_all();
        *self = Session::new(volume);
    }

    /// Stop songbird's track if there is one.
    fn stop_handle(&mut self) {
        if let Some(handle) = self.handle.take() {
            // Errors here only mean the track already ended.
            if let Err(e) = handle.stop() {
                tracing::debug!("Stopping an ended track: {e}");
            }
        }
    }

    /// The now playing line followed by the upcoming tracks, numbered from 0.
    pub fn display_string(&self) -> String {
        if self.current.is_none() && self.queue.is_empty() {
            return "Empty queue!".to_string();
        }

        let mut buffer = String::new();
        if let Some(track) = &self.current {
            let paused = match self.state {
                PlaybackState::Paused => " (paused)",
                _ => "",
            };
            writeln!(buffer, "**Now playing{paused}:** {track}\n")
                .expect("write to string buffer can't fail");
        }
        if self.looping {
            buffer.push_str("*Loop is on.*\n");
        }
        if self.queue.is_empty() {
            return buffer;
        }

        buffer.push_str("**Up next:**\n");
        let total = self.queue.len();
        for (num, track) in self.queue.iter().enumerate() {
            let next_line = format!("`{num}.` {track}\n");
            // Leave room for the trailing "...and N more" line.
            if buffer.len() + next_line.len() > EMBED_LIMIT - 32 {
                let remaining = total - num;
                writeln!(buffer, "...and {remaining} more")
                    .expect("write to string buffer can't fail");
                break;
            }
            buffer.push_str(&next_line);
        }
        buffer
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::data::track::test::track;

    fn session_with(names: &[&str]) -> Session {
        let mut session = Session::default();
        session.queue_mut().enqueue_many(names.iter().map(|n| track(n)));
        session
    }

    /// Start the next queued track the way the player does, without audio.
    fn play_next(session: &mut Session) -> Option<String> {
        let next = session.advance()?;
        let title = next.title.clone();
        session.begin(next, None);
        Some(title)
    }

    #[test]
    fn state_transitions() {
        use PlaybackState::*;
        assert_eq!(Playing.pause().unwrap(), Paused);
        assert_eq!(Paused.resume().unwrap(), Playing);
        assert!(matches!(Idle.pause(), Err(UserError::NothingPlaying)));
        assert!(matches!(Paused.pause(), Err(UserError::AlreadyPaused)));
        assert!(matches!(Playing.resume(), Err(UserError::NotPaused)));
        assert!(matches!(Idle.resume(), Err(UserError::NotPaused)));
    }

    #[test]
    fn pause_while_idle_reports_nothing_playing() {
        let mut session = Session::default();
        let err = session.pause().unwrap_err();
        assert!(matches!(
            err,
            LarkError::UserError(UserError::NothingPlaying)
        ));
        assert_eq!(session.state(), PlaybackState::Idle);
    }

    #[test]
    fn pause_and_resume_current() {
        let mut session = session_with(&["a"]);
        play_next(&mut session);

        assert_eq!(session.pause().unwrap().title, "a");
        assert_eq!(session.state(), PlaybackState::Paused);
        assert_eq!(session.resume().unwrap().title, "a");
        assert_eq!(session.state(), PlaybackState::Playing);
    }

    #[test]
    fn advance_plays_in_order_then_idles() {
        let mut session = session_with(&["a", "b", "c"]);

        let played: Vec<String> = std::iter::from_fn(|| play_next(&mut session)).collect();
        assert_eq!(played, ["a", "b", "c"]);
        assert_eq!(session.state(), PlaybackState::Idle);
        assert!(session.current().is_none());
    }

    #[test]
    fn current_is_never_queued() {
        let mut session = session_with(&["a", "b"]);
        play_next(&mut session);

        let current = session.current().unwrap().clone();
        assert!(session.queue().iter().all(|t| *t != current));
    }

    #[test]
    fn loop_requeues_finished_track_at_tail() {
        let mut session = session_with(&["a", "b"]);
        assert!(session.toggle_loop());

        let played: Vec<String> = (0..5).filter_map(|_| play_next(&mut session)).collect();
        assert_eq!(played, ["a", "b", "a", "b", "a"]);
        assert_eq!(session.queue().len(), 1);
    }

    #[test]
    fn begin_discards_replaced_track_even_when_looping() {
        let mut session = session_with(&["a", "b", "c"]);
        session.toggle_loop();
        play_next(&mut session);

        let jumped = session.queue_mut().jump(1).unwrap();
        session.begin(jumped, None);

        assert_eq!(session.current().unwrap().title, "c");
        let queued: Vec<&str> = session.queue().iter().map(|t| t.title.as_str()).collect();
        assert_eq!(queued, ["b"]);
    }

    #[test]
    fn shuffle_needs_two_tracks() {
        let mut session = session_with(&["a"]);
        assert!(matches!(
            session.shuffle(),
            Err(UserError::NotEnoughToShuffle)
        ));

        let mut session = session_with(&["a", "b", "c"]);
        play_next(&mut session);
        assert_eq!(session.shuffle().unwrap(), 2);
        assert_eq!(session.current().unwrap().title, "a");
    }

    #[test]
    fn stop_all_goes_idle() {
        let mut session = session_with(&["a", "b"]);
        session.toggle_loop();
        play_next(&mut session);

        session.stop_all();
        assert!(session.queue().is_empty());
        assert!(session.current().is_none());
        assert_eq!(session.state(), PlaybackState::Idle);
    }

    #[test]
    fn clear_refuses_empty_session() {
        let mut session = Session::default();
        assert!(matches!(session.clear(), Err(UserError::EmptyQueue)));

        let mut session = session_with(&["a", "b", "c"]);
        play_next(&mut session);
        assert_eq!(session.clear().unwrap(), 3);
        assert!(session.current().is_none());
        assert!(matches!(session.clear(), Err(UserError::EmptyQueue)));
    }

    #[test]
    fn reset_forgets_settings() {
        let mut session = session_with(&["a", "b"]);
        session.toggle_loop();
        session.set_volume(Volume::new(30).unwrap()).unwrap();
        session.set_announce_channel(serenity::ChannelId::new(42));
        play_next(&mut session);

        session.reset(Volume::new(80).unwrap());
        assert!(session.queue().is_empty());
        assert!(session.current().is_none());
        assert_eq!(session.state(), PlaybackState::Idle);
        assert!(!session.is_looping());
        assert_eq!(session.volume().percent(), 80);
        assert_eq!(session.announce_channel(), None);
    }

    #[test]
    fn ended_handle_is_nothing_playing() {
        for ended in [ControlError::Finished, ControlError::Dropped] {
            assert!(matches!(
                from_control(ended),
                LarkError::UserError(UserError::NothingPlaying)
            ));
        }
    }

    #[test]
    fn volume_bounds() {
        assert_eq!(Volume::new(0).unwrap().percent(), 0);
        assert_eq!(Volume::new(100).unwrap().gain(), 1.0);
        assert!(matches!(
            Volume::new(101),
            Err(UserError::VolumeOutOfRange { given: 101 })
        ));
        assert!(Volume::new(300).is_err());
    }

    #[test]
    fn display_lists_from_zero() {
        let mut session = session_with(&["a", "b", "c"]);
        assert!(session.display_string().contains("`0.` [a]"));

        play_next(&mut session);
        let shown = session.display_string();
        assert!(shown.starts_with("**Now playing:** [a]"));
        assert!(shown.contains("`0.` [b]"));
        assert!(shown.contains("`1.` [c]"));

        assert_eq!(Session::default().display_string(), "Empty queue!");
    }

    #[test]
    fn display_truncates_long_queues() {
        let names: Vec<String> = (0..500).map(|i| format!("track number {i}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let session = session_with(&refs);

        let shown = session.display_string();
        assert!(shown.len() <= EMBED_LIMIT);
        assert!(shown.trim_end().ends_with("more"));
    }
}
