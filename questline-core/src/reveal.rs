//! Rolling per-character text reveal.
//!
//! [`TextReveal`] is a cooperative state machine bound to one
//! [`TextSurface`]. Callers enqueue requests (idle, fade, jump to
//! target, change text); the host drives [`TextReveal::tick`] at a fixed
//! interval. Each tick handles at most one queued request, and a new
//! request always cancels an in-flight fade before its entry action
//! runs. When no request is pending, a tick advances the fade
//! animation instead: a window rolls left to right over the text,
//! stepping each character's alpha toward the target until every
//! character has settled.

use std::collections::VecDeque;

use tracing::debug;

use crate::surface::TextSurface;

/// Whether the animation target is full visibility or full
/// transparency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeMode {
    FadeIn,
    FadeOut,
}

/// Observable states of a [`TextReveal`].
///
/// The `*Requested` states are transient: a request tick passes through
/// the requested state while running its entry action and lands on the
/// settled counterpart before the tick returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealState {
    None,
    Idle,
    IdleRequested,
    FadingRequested,
    Fading,
    TargetAlphaRequested,
    TargetAlpha,
    ChangeTextRequested,
    ChangeText,
}

/// A queued state change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevealRequest {
    SetIdle,
    SetFade,
    SetTargetAlpha,
    SetText(String),
}

/// In-flight fade window. `start` is the first unsettled character,
/// `end` the last character currently stepping.
#[derive(Debug, Clone, Copy)]
struct FadeWindow {
    start: usize,
    end: usize,
}

/// The reveal state machine. One per animated text element.
pub struct TextReveal {
    surface: Box<dyn TextSurface>,
    mode: FadeMode,
    spread: usize,
    state: RevealState,
    queue: VecDeque<RevealRequest>,
    anim: Option<FadeWindow>,
}

impl TextReveal {
    pub fn new(surface: Box<dyn TextSurface>) -> Self {
        Self {
            surface,
            mode: FadeMode::FadeIn,
            spread: 10,
            state: RevealState::None,
            queue: VecDeque::new(),
            anim: None,
        }
    }

    /// Rolling window spread. Controls both the per-tick alpha step
    /// (`255 / spread`, at least 1) and, indirectly, how many
    /// characters are mid-fade at once.
    pub fn with_spread(mut self, spread: usize) -> Self {
        self.spread = spread.max(1);
        self
    }

    pub fn with_mode(mut self, mode: FadeMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn state(&self) -> RevealState {
        self.state
    }

    pub fn mode(&self) -> FadeMode {
        self.mode
    }

    pub fn surface(&self) -> &dyn TextSurface {
        self.surface.as_ref()
    }

    pub fn is_animating(&self) -> bool {
        self.anim.is_some()
    }

    /// True when the queue is drained and no fade is in flight.
    pub fn is_settled(&self) -> bool {
        self.queue.is_empty() && self.anim.is_none()
    }

    /// Alpha every character resets to: 0 when fading in, 255 when
    /// fading out. Depends only on the mode.
    pub fn default_alpha(&self) -> u8 {
        match self.mode {
            FadeMode::FadeIn => 0,
            FadeMode::FadeOut => 255,
        }
    }

    /// Alpha every character settles at; always the complement of
    /// [`Self::default_alpha`].
    pub fn target_alpha(&self) -> u8 {
        255 - self.default_alpha()
    }

    pub fn request(&mut self, request: RevealRequest) {
        self.queue.push_back(request);
    }

    pub fn set_idle(&mut self) {
        self.request(RevealRequest::SetIdle);
    }

    pub fn set_fade(&mut self) {
        self.request(RevealRequest::SetFade);
    }

    pub fn set_target_alpha(&mut self) {
        self.request(RevealRequest::SetTargetAlpha);
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.request(RevealRequest::SetText(text.into()));
    }

    /// Switch to fade-in mode and reset through the queue.
    pub fn set_fade_in(&mut self) {
        self.mode = FadeMode::FadeIn;
        self.set_idle();
    }

    /// Switch to fade-out mode and reset through the queue.
    pub fn set_fade_out(&mut self) {
        self.mode = FadeMode::FadeOut;
        self.set_idle();
    }

    /// Drop pending requests and the in-flight fade. Used at session
    /// teardown so nothing animates into a torn-down stage.
    pub fn cancel(&mut self) {
        self.queue.clear();
        self.anim = None;
        self.state = RevealState::None;
    }

    /// Advance one step: handle one queued request, or move the fade
    /// along when nothing is queued.
    pub fn tick(&mut self) {
        if let Some(request) = self.queue.pop_front() {
            self.anim = None;
            self.apply(request);
            return;
        }
        if self.state == RevealState::Fading {
            self.advance_fade();
        }
    }

    fn apply(&mut self, request: RevealRequest) {
        debug!(?request, from = ?self.state, "text reveal request");
        match request {
            RevealRequest::SetIdle => {
                self.state = RevealState::IdleRequested;
                self.fill(self.default_alpha());
                self.state = RevealState::Idle;
            }
            RevealRequest::SetFade => {
                self.state = RevealState::FadingRequested;
                self.fill(self.default_alpha());
                if self.surface.character_count() == 0 {
                    // Nothing to animate.
                    self.state = RevealState::TargetAlpha;
                } else {
                    self.anim = Some(FadeWindow { start: 0, end: 0 });
                    self.state = RevealState::Fading;
                }
            }
            RevealRequest::SetTargetAlpha => {
                self.state = RevealState::TargetAlphaRequested;
                self.fill(self.target_alpha());
                self.state = RevealState::TargetAlpha;
            }
            RevealRequest::SetText(text) => {
                self.state = RevealState::ChangeTextRequested;
                self.surface.set_text(&text);
                self.fill(self.default_alpha());
                self.state = RevealState::ChangeText;
            }
        }
    }

    fn fill(&mut self, alpha: u8) {
        for index in 0..self.surface.character_count() {
            self.surface.set_vertex_alpha(index, alpha);
        }
        self.surface.commit();
    }

    fn step(&self) -> u8 {
        (255 / self.spread).max(1) as u8
    }

    fn advance_fade(&mut self) {
        let Some(mut window) = self.anim else {
            self.state = RevealState::TargetAlpha;
            return;
        };
        let count = self.surface.character_count();
        if count == 0 {
            self.anim = None;
            self.state = RevealState::TargetAlpha;
            return;
        }

        let target = self.target_alpha();
        let step = self.step();
        let last = window.end.min(count - 1);
        for index in window.start..=last {
            let alpha = self.surface.vertex_alpha(index);
            // Target is the clamp bound in both modes, so saturating
            // arithmetic lands on it exactly.
            let next = match self.mode {
                FadeMode::FadeIn => alpha.saturating_add(step),
                FadeMode::FadeOut => alpha.saturating_sub(step),
            };
            self.surface.set_vertex_alpha(index, next);
        }

        while window.start < count && self.surface.vertex_alpha(window.start) == target {
            window.start += 1;
        }
        if window.end + 1 < count {
            window.end += 1;
        }
        self.surface.commit();

        if window.start == count {
            self.anim = None;
            self.state = RevealState::TargetAlpha;
        } else {
            self.anim = Some(window);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::TextBuffer;

    fn reveal(text: &str) -> TextReveal {
        TextReveal::new(Box::new(TextBuffer::with_text(text)))
    }

    fn alphas(reveal: &TextReveal) -> Vec<u8> {
        let surface = reveal.surface();
        (0..surface.character_count())
            .map(|index| surface.vertex_alpha(index))
            .collect()
    }

    /// Runs ticks until the machine settles, with a safety bound.
    fn settle(reveal: &mut TextReveal) {
        for _ in 0..1000 {
            if reveal.is_settled() {
                return;
            }
            reveal.tick();
        }
        panic!("reveal did not settle, state {:?}", reveal.state());
    }

    #[test]
    fn test_set_text_then_fade_reaches_target() {
        let mut reveal = reveal("");
        reveal.set_text("abc");
        reveal.set_fade();

        reveal.tick();
        assert_eq!(reveal.state(), RevealState::ChangeText);
        assert_eq!(reveal.surface().text(), "abc");
        assert_eq!(alphas(&reveal), vec![0, 0, 0]);

        reveal.tick();
        assert_eq!(reveal.state(), RevealState::Fading);
        assert!(reveal.is_animating());

        settle(&mut reveal);
        assert_eq!(reveal.state(), RevealState::TargetAlpha);
        assert_eq!(alphas(&reveal), vec![255, 255, 255]);
    }

    #[test]
    fn test_window_rolls_left_to_right() {
        // Spread 1 settles one character per tick, making the window
        // mechanics directly observable.
        let mut reveal = reveal("abc").with_spread(1);
        reveal.set_fade();
        reveal.tick();
        assert_eq!(reveal.state(), RevealState::Fading);

        reveal.tick();
        assert_eq!(alphas(&reveal), vec![255, 0, 0]);
        reveal.tick();
        assert_eq!(alphas(&reveal), vec![255, 255, 0]);
        reveal.tick();
        assert_eq!(alphas(&reveal), vec![255, 255, 255]);
        assert_eq!(reveal.state(), RevealState::TargetAlpha);
        assert!(!reveal.is_animating());
    }

    #[test]
    fn test_one_request_per_tick() {
        let mut reveal = reveal("hi");
        reveal.set_text("ho");
        reveal.set_fade();

        reveal.tick();
        assert_eq!(reveal.state(), RevealState::ChangeText);
        assert!(!reveal.is_settled());

        reveal.tick();
        assert_eq!(reveal.state(), RevealState::Fading);
    }

    #[test]
    fn test_new_request_preempts_fade() {
        let mut reveal = reveal("abcdef");
        reveal.set_fade();
        reveal.tick();
        reveal.tick();
        assert!(reveal.is_animating());

        reveal.set_idle();
        reveal.tick();
        assert_eq!(reveal.state(), RevealState::Idle);
        assert!(!reveal.is_animating());
        assert_eq!(alphas(&reveal), vec![0; 6]);
    }

    #[test]
    fn test_target_complements_default() {
        let fade_in = reveal("x");
        assert_eq!(fade_in.default_alpha(), 0);
        assert_eq!(fade_in.target_alpha(), 255);

        let fade_out = reveal("x").with_mode(FadeMode::FadeOut);
        assert_eq!(fade_out.default_alpha(), 255);
        assert_eq!(fade_out.target_alpha(), 0);
    }

    #[test]
    fn test_fade_out_hides_characters() {
        let mut reveal = reveal("").with_mode(FadeMode::FadeOut).with_spread(1);
        reveal.set_text("ab");
        reveal.tick();
        assert_eq!(alphas(&reveal), vec![255, 255]);

        reveal.set_fade();
        reveal.tick();
        settle(&mut reveal);
        assert_eq!(reveal.state(), RevealState::TargetAlpha);
        assert_eq!(alphas(&reveal), vec![0, 0]);
    }

    #[test]
    fn test_empty_text_settles_immediately() {
        let mut reveal = reveal("");
        reveal.set_fade();
        reveal.tick();
        assert_eq!(reveal.state(), RevealState::TargetAlpha);
        assert!(!reveal.is_animating());
    }

    #[test]
    fn test_mode_switch_resets_through_queue() {
        let mut reveal = reveal("ab");
        reveal.set_fade_out();
        assert_eq!(reveal.mode(), FadeMode::FadeOut);
        // The reset is queued, not applied in place.
        assert_eq!(alphas(&reveal), vec![0, 0]);

        reveal.tick();
        assert_eq!(reveal.state(), RevealState::Idle);
        assert_eq!(alphas(&reveal), vec![255, 255]);
    }

    #[test]
    fn test_set_target_alpha_snaps() {
        let mut reveal = reveal("abc");
        reveal.set_target_alpha();
        reveal.tick();
        assert_eq!(reveal.state(), RevealState::TargetAlpha);
        assert_eq!(alphas(&reveal), vec![255, 255, 255]);
    }

    #[test]
    fn test_cancel_drops_queue_and_animation() {
        let mut reveal = reveal("abc");
        reveal.set_fade();
        reveal.tick();
        reveal.set_text("next");
        assert!(reveal.is_animating());

        reveal.cancel();
        assert!(reveal.is_settled());
        assert_eq!(reveal.state(), RevealState::None);

        // A cancelled machine stays put until a new request arrives.
        reveal.tick();
        assert_eq!(reveal.state(), RevealState::None);
    }
}
