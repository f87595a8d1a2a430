//! Error types used throughout the bot.
//!
//! [LarkError] is the framework's error type. Anything wrapped in [UserError] is
//! expected (bad input, nothing playing, ...) and is only replied to the user, everything
//! else is treated as a bug.

use std::string::FromUtf8Error;
use std::time::Duration;

use songbird::error::ControlError;
use songbird::error::JoinError;
use thiserror::Error;

use crate::serenity;

/// Top level error for the bot.
#[derive(Debug, Error)]
pub enum LarkError {
    #[error(transparent)]
    UserError(#[from] UserError),

    #[error("Config error: {0}")]
    ConfigError(#[from] ConfigError),

    #[error("Command check failed: {reason:?}")]
    CheckFailed { reason: Option<String> },

    #[error("Command panicked: {payload:?}")]
    Panic { payload: Option<String> },

    #[error("Command structure mismatch: {description}")]
    CommandStructureMismatch { description: String },

    #[error("Missing from setup: {reason}")]
    MissingFromSetup { reason: String },

    #[error("Discord error: {0}")]
    SerenityError(#[from] serenity::Error),

    #[error("Failed to join voice: {0}")]
    JoinError(#[from] JoinError),

    #[error("Track control failed: {0}")]
    ControlError(#[from] ControlError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Output was not utf8: {0}")]
    Utf8Error(#[from] FromUtf8Error),

    #[error("Unexpected yt-dlp output at '{path}': {reason}")]
    ExtractorOutput { path: String, reason: String },
}

/// Errors caused by users, these are shown to them and not treated as bugs.
#[derive(Debug, Error)]
pub enum UserError {
    #[error("This command requires one of these subcommands: {subcmds}")]
    MissingSubcommand { subcmds: String },

    #[error("Could not understand the arguments: `{}`", input.as_deref().unwrap_or_default())]
    BadArgs { input: Option<String> },

    #[error("Slow down! Try again in {} seconds.", remaining_cooldown.as_secs().max(1))]
    OnCooldown { remaining_cooldown: Duration },

    #[error("I'm missing permissions: {missing_permissions}")]
    MissingBotPermissions {
        missing_permissions: serenity::Permissions,
    },

    #[error("You're missing permissions: {}", missing_permissions.map(|p| p.to_string()).unwrap_or_default())]
    MissingUserPermissions {
        missing_permissions: Option<serenity::Permissions>,
    },

    #[error("Only owners can use this command.")]
    NotOwner,

    #[error("This command only works in a server.")]
    GuildOnly,

    #[error("This command only works in DMs.")]
    DmOnly,

    #[error("This command only works in NSFW channels.")]
    NsfwOnly,

    #[error("Could not find your server.")]
    NotInGuild,

    #[error("You need to be in a voice channel.")]
    NotInVoice,

    #[error("The queue is empty.")]
    EmptyQueue,

    #[error("Nothing is playing.")]
    NothingPlaying,

    #[error("Already paused.")]
    AlreadyPaused,

    #[error("Nothing is paused. Use play to start something.")]
    NotPaused,

    #[error("No track at position {index}, the queue has {len} tracks.")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Invalid timestamp `{input}`. Use mm:ss or m:ss.")]
    BadTimestamp { input: String },

    #[error("`{input}` is not a valid url.")]
    InvalidUrl { input: String },

    #[error("This url does not appear to be a playlist.")]
    NotAPlaylist,

    #[error("Volume must be between 0 and 100, got {given}.")]
    VolumeOutOfRange { given: u16 },

    #[error("Teams need 2 to 5 players, got {count}.")]
    TeamSize { count: usize },

    #[error("Not enough songs in the queue to shuffle.")]
    NotEnoughToShuffle,

    #[error("Song selection timed out. Please try again.")]
    SelectionTimedOut,

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

/// Failures from the media extractor that are reported to users.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("No results for `{query}`.")]
    NotFound { query: String },

    #[error("This video is restricted: {reason}")]
    Restricted { reason: String },

    #[error("This video is unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("YouTube wants a login for this. Fresh credentials were requested, try again later.")]
    AuthRequired,

    #[error("Could not extract audio: {reason}")]
    Extractor { reason: String },
}

/// Failures while reading `config.toml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid config: {reason}")]
    InvalidConfig { reason: String },

    #[error("Missing config file. {action_msg}")]
    MissingConfig { action_msg: String },

    #[error("Could not access config file: {0}")]
    IoError(std::io::Error),
}

impl From<ResolveError> for LarkError {
    fn from(e: ResolveError) -> Self {
        LarkError::UserError(e.into())
    }
}
