//! Drives a guild's [Session] into its voice call.
//!
//! Locks are always taken in the order guild data, then call.

use std::sync::Arc;
use std::time::Duration;

use songbird::tracks::Track as SongbirdTrack;
use songbird::tracks::TrackHandle;

use super::call;
use super::call::CallRef;
use super::youtube::Resolver;
use crate::data::GetData;
use crate::data::GuildDataRef;
use crate::data::Session;
use crate::data::Track;
use crate::error::UserError;
use crate::serenity;
use crate::Context;
use crate::LarkError;

/// Result of adding tracks to a session.
#[derive(Debug)]
pub struct Enqueued {
    /// The track that started because the session was idle.
    pub started: Option<Track>,
    /// Queue index of the first track that is still waiting.
    pub position: usize,
    /// How many tracks are waiting in the queue now.
    pub queue_len: usize,
}

/// Result of a track ending on its own.
#[derive(Debug)]
pub enum Advanced {
    /// The ended track was already replaced, nothing changed.
    Stale,
    /// The next track started.
    Next(Track),
    /// Nothing left to play.
    Finished,
}

/// Everything needed to play a guild's queue.
#[derive(Clone)]
pub struct Player {
    /// The voice call audio goes to.
    call: CallRef,
    /// Where the [Session] lives.
    guild_data: GuildDataRef,
    /// Used by songbird to stream.
    http: reqwest::Client,
    /// Creates inputs for tracks.
    resolver: Arc<Resolver>,
}

impl Player {
    pub fn new(
        call: CallRef,
        guild_data: GuildDataRef,
        http: reqwest::Client,
        resolver: Arc<Resolver>,
    ) -> Self {
        Self {
            call,
            guild_data,
            http,
            resolver,
        }
    }

    /// Join the author's voice channel first.
    pub async fn join(ctx: &Context<'_>) -> Result<Self, LarkError> {
        let call = call::join_author(ctx).await?;
        Self::with_call(ctx, call).await
    }

    /// Use whatever call the guild has, without joining.
    pub async fn from_ctx(ctx: &Context<'_>) -> Result<Self, LarkError> {
        let call = call::get_call(ctx).await?;
        Self::with_call(ctx, call).await
    }

    #[allow(clippy::missing_docs_in_private_items)]
    async fn with_call(ctx: &Context<'_>, call: CallRef) -> Result<Self, LarkError> {
        let guild_data = ctx.guild_data().await?;
        let http = ctx.http_client().await?;
        let resolver = ctx.data().resolver.clone();
        Ok(Self::new(call, guild_data, http, resolver))
    }

    /// Add tracks to the back of the queue, starting playback if the session is idle.
    /// Announcements for later tracks go to `channel`.
    pub async fn enqueue(
        &self,
        channel: serenity::ChannelId,
        tracks: Vec<Track>,
    ) -> Result<Enqueued, LarkError> {
        let mut guild = self.guild_data.lock().await;
        let session = &mut guild.session;
        session.set_announce_channel(channel);

        let position = session.queue().len();
        session.queue_mut().enqueue_many(tracks);

        let started = match session.current() {
            Some(_) => None,
            None => match session.queue_mut().pop_next() {
                Some(next) => {
                    self.start(session, next.clone(), None).await?;
                    Some(next)
                }
                None => None,
            },
        };

        Ok(Enqueued {
            started,
            position,
            queue_len: session.queue().len(),
        })
    }

    /// Finish the current track and start the next one.
    /// Returns the skipped track and what plays now.
    pub async fn skip(&self) -> Result<(Track, Option<Track>), LarkError> {
        let mut guild = self.guild_data.lock().await;
        let session = &mut guild.session;

        let skipped = session
            .current()
            .cloned()
            .ok_or(UserError::NothingPlaying)?;
        let next = self.advance_session(session).await?;
        Ok((skipped, next))
    }

    /// Called when songbird reports that `ended` stopped on its own.
    pub async fn track_ended(&self, ended: &TrackHandle) -> Result<Advanced, LarkError> {
        let mut guild = self.guild_data.lock().await;
        let session = &mut guild.session;

        if !session.is_current(ended) {
            return Ok(Advanced::Stale);
        }
        match self.advance_session(session).await? {
            Some(next) => Ok(Advanced::Next(next)),
            None => Ok(Advanced::Finished),
        }
    }

    /// Remove the track at `index` from the queue and play it right away.
    pub async fn jump(&self, index: usize) -> Result<Track, LarkError> {
        let mut guild = self.guild_data.lock().await;
        let session = &mut guild.session;

        let track = session.queue_mut().jump(index)?;
        self.start(session, track.clone(), None).await?;
        Ok(track)
    }

    /// Move the current track to `offset`.
    /// Seeks in place when the source allows it, otherwise restarts the track at `offset`.
    pub async fn seek(&self, offset: Duration) -> Result<Track, LarkError> {
        let mut guild = self.guild_data.lock().await;
        let session = &mut guild.session;

        let track = session
            .current()
            .cloned()
            .ok_or(UserError::NothingPlaying)?;
        let handle = session
            .current_handle()
            .cloned()
            .ok_or(UserError::NothingPlaying)?;

        match handle.seek_async(offset).await {
            Ok(position) => tracing::debug!("Seeked to {position:?}."),
            Err(e) => {
                tracing::info!("Seeking in place failed ({e}), restarting at {offset:?}.");
                self.start(session, track.clone(), Some(offset)).await?;
            }
        }
        Ok(track)
    }

    /// Clear the queue and stop the current track.
    pub async fn clear(&self) -> Result<usize, LarkError> {
        let mut guild = self.guild_data.lock().await;
        Ok(guild.session.clear()?)
    }

    /// Finish the current track and start the next queued one.
    async fn advance_session(&self, session: &mut Session) -> Result<Option<Track>, LarkError> {
        match session.advance() {
            Some(next) => {
                self.start(session, next.clone(), None).await?;
                Ok(Some(next))
            }
            None => Ok(None),
        }
    }

    /// Play `track` now, replacing whatever is current.
    async fn start(
        &self,
        session: &mut Session,
        track: Track,
        offset: Option<Duration>,
    ) -> Result<(), LarkError> {
        tracing::info!("Starting {title}", title = track.title);

        let input = self.resolver.input(self.http.clone(), &track);
        let audio = SongbirdTrack::new(input).volume(session.volume().gain());

        let handle = {
            let mut call = self.call.lock().await;
            call.play(audio)
        };

        if let Some(offset) = offset {
            // The outcome shows up as a track event.
            let _pending = handle.seek(offset);
        }

        session.begin(track, Some(handle));
        Ok(())
    }
}
