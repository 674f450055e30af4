//! Media playback seam.
//!
//! The engine decides *which* clip plays and *when*; actually decoding
//! and presenting video or audio belongs to the host. Sessions take one
//! player for video and one for audio.

use crate::content::ClipHandle;

/// A media output the session can drive.
pub trait MediaPlayer {
    /// Swap the current clip. Does not start playback on its own.
    fn assign_clip(&mut self, clip: ClipHandle);

    /// Start (or restart) playback of the assigned clip.
    fn play(&mut self);
}

/// A player that discards everything. For hosts without a media stack.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPlayer;

impl MediaPlayer for NullPlayer {
    fn assign_clip(&mut self, _clip: ClipHandle) {}

    fn play(&mut self) {}
}
