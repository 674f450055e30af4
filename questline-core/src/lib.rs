//! Branching visual-novel quest engine.
//!
//! This crate provides:
//! - A YAML-backed story loader with structural validation
//! - A quest session state machine (menu, dialog, choices, endings)
//! - Rolling per-character text reveal for dialog surfaces
//! - Scripted headless playthroughs for tests and tooling
//!
//! # Quick Start
//!
//! ```ignore
//! use questline_core::{
//!     FsContentRepository, NullPlayer, QuestSession, SessionConfig, Stage,
//!     TextBuffer, TextReveal,
//! };
//!
//! let repo = Box::new(FsContentRepository::new("content"));
//! let stage = Stage::new(
//!     Box::new(NullPlayer),
//!     Box::new(NullPlayer),
//!     TextReveal::new(Box::new(TextBuffer::new())),
//!     TextReveal::new(Box::new(TextBuffer::new())),
//! );
//!
//! let mut session = QuestSession::new(SessionConfig::new("demo"), repo, stage);
//! session.start();
//! loop {
//!     session.tick();
//!     // draw the stage, feed player input into advance_dialog /
//!     // select_option, stop when your frontend quits
//! }
//! ```

pub mod content;
pub mod headless;
pub mod loader;
pub mod media;
pub mod reveal;
pub mod session;
pub mod story;
pub mod surface;
pub mod testing;

// Primary public API
pub use content::{ClipHandle, ContentError, ContentRepository, FsContentRepository};
pub use headless::{HeadlessConfig, HeadlessRunner, TranscriptEntry};
pub use loader::LoadError;
pub use media::{MediaPlayer, NullPlayer};
pub use reveal::{FadeMode, TextReveal};
pub use session::{QuestSession, QuestState, SessionConfig, SessionError, Stage};
pub use story::StoryGraph;
pub use surface::{TextBuffer, TextSurface};
pub use testing::{MemoryRepository, QuestHarness, RecordingPlayer};
