//! Menu title widget with rolling fade

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    text::Line,
    widgets::{Paragraph, Widget, Wrap},
};

use questline_core::TextReveal;

use crate::ui::theme::QuestTheme;
use crate::ui::widgets::reveal_spans;

/// Widget for the quest title fading in on the menu screen.
pub struct TitleWidget<'a> {
    reveal: &'a TextReveal,
    theme: &'a QuestTheme,
}

impl<'a> TitleWidget<'a> {
    pub fn new(reveal: &'a TextReveal, theme: &'a QuestTheme) -> Self {
        Self { reveal, theme }
    }
}

impl Widget for TitleWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let spans = reveal_spans(self.reveal, |alpha| self.theme.title_style(alpha));
        Paragraph::new(Line::from(spans))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: false })
            .render(area, buf);
    }
}
