//! Mixer error types

use thiserror::Error;

use crate::stream::StreamError;

/// Errors returned by mixer playback and stream operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MixerError {
    /// Every channel slot is occupied
    #[error("No free channel slot")]
    NoFreeSlot,

    /// A live channel already carries this id
    #[error("A sound with id {0} is already playing")]
    DuplicateId(i32),

    /// The handle addresses a channel that does not accept appended data
    #[error("Channel {0} is not a streaming channel")]
    NotAStream(usize),

    /// Playback requested before the mixer was bound to a backend
    #[error("Mixer is not bound to an audio backend")]
    NotBound,

    #[error(transparent)]
    Stream(#[from] StreamError),
}

pub type MixerResult<T> = Result<T, MixerError>;
