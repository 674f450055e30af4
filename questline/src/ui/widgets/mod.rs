//! TUI widgets for the quest player

pub mod dialog;
pub mod options;
pub mod title;

pub use dialog::DialogWidget;
pub use options::OptionsWidget;
pub use title::TitleWidget;

use ratatui::style::Style;
use ratatui::text::Span;

use questline_core::TextReveal;

/// Build styled spans from a reveal surface, one span per run of equal
/// character alpha.
pub(crate) fn reveal_spans(
    reveal: &TextReveal,
    style_for: impl Fn(u8) -> Style,
) -> Vec<Span<'static>> {
    let surface = reveal.surface();
    let text = surface.text();

    let mut spans = Vec::new();
    let mut run = String::new();
    let mut run_alpha: Option<u8> = None;

    for (index, ch) in text.chars().enumerate() {
        let alpha = surface.vertex_alpha(index);
        match run_alpha {
            Some(current) if current == alpha => run.push(ch),
            Some(current) => {
                spans.push(Span::styled(std::mem::take(&mut run), style_for(current)));
                run.push(ch);
                run_alpha = Some(alpha);
            }
            None => {
                run.push(ch);
                run_alpha = Some(alpha);
            }
        }
    }
    if let Some(alpha) = run_alpha {
        spans.push(Span::styled(run, style_for(alpha)));
    }
    spans
}
