//! Text surface seam for the reveal state machine.
//!
//! A [`TextSurface`] is whatever ultimately draws text: a terminal
//! widget, a mesh of glyph quads, a test buffer. The reveal machine
//! only needs per-character alpha staging and an explicit commit.

/// A mutable text element with per-character alpha.
///
/// Alpha mutations are staged; `commit` publishes them to whatever
/// renders the surface. One commit per tick is enough.
pub trait TextSurface {
    /// Current text content.
    fn text(&self) -> &str;

    /// Replace the text content. Per-character alpha is re-sized to the
    /// new character count; callers are expected to reset alpha right
    /// after.
    fn set_text(&mut self, text: &str);

    /// Number of characters in the current text.
    fn character_count(&self) -> usize;

    /// Staged alpha of the character at `index`. Out-of-range reads
    /// return 0.
    fn vertex_alpha(&self, index: usize) -> u8;

    /// Stage a new alpha for the character at `index`. Out-of-range
    /// writes are ignored.
    fn set_vertex_alpha(&mut self, index: usize, alpha: u8);

    /// Publish staged changes.
    fn commit(&mut self);
}

/// An in-memory [`TextSurface`].
///
/// Used directly by the terminal front end (which reads text and alpha
/// back out when drawing) and by tests. The revision counter increments
/// on every commit so a renderer can cheaply detect changes.
#[derive(Debug, Default)]
pub struct TextBuffer {
    text: String,
    alpha: Vec<u8>,
    revision: u64,
}

impl TextBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with initial text, alpha all zero.
    pub fn with_text(text: impl Into<String>) -> Self {
        let text = text.into();
        let count = text.chars().count();
        Self {
            text,
            alpha: vec![0; count],
            revision: 0,
        }
    }

    /// Number of commits so far.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Staged alpha values, one per character.
    pub fn alphas(&self) -> &[u8] {
        &self.alpha
    }
}

impl TextSurface for TextBuffer {
    fn text(&self) -> &str {
        &self.text
    }

    fn set_text(&mut self, text: &str) {
        self.text = text.to_string();
        self.alpha = vec![0; self.text.chars().count()];
    }

    fn character_count(&self) -> usize {
        self.alpha.len()
    }

    fn vertex_alpha(&self, index: usize) -> u8 {
        self.alpha.get(index).copied().unwrap_or(0)
    }

    fn set_vertex_alpha(&mut self, index: usize, alpha: u8) {
        if let Some(slot) = self.alpha.get_mut(index) {
            *slot = alpha;
        }
    }

    fn commit(&mut self) {
        self.revision += 1;
    }
}
