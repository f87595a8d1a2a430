//! Bot commands.
//!
//! Every command works both as a slash command and with the configured text prefix.

mod help;
mod leave;
mod looping;
mod pause;
mod play;
mod playlist;
mod queue;
mod search;
mod skip;
mod team;
mod volume;

use crate::{Data, LarkError};

/// Convenient type alias for [poise::Command].
pub type Command = poise::Command<Data, LarkError>;

/// Lists all the implemented commands
pub fn list() -> Vec<Command> {
    vec![
        play::play(),
        search::search(),
        playlist::playlist(),
        pause::pause(),
        pause::resume(),
        skip::skip(),
        skip::tskip(),
        queue::qlist(),
        queue::qclear(),
        queue::qskip(),
        queue::shuffle(),
        looping::loop_(),
        volume::volume(),
        leave::leave(),
        team::team(),
        help::help(),
    ]
}
