//! Dialog box widget with per-character reveal alpha

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::Line,
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
};

use questline_core::TextReveal;

use crate::ui::theme::QuestTheme;
use crate::ui::widgets::reveal_spans;

/// Widget for displaying the current dialog line as it fades in.
pub struct DialogWidget<'a> {
    reveal: &'a TextReveal,
    speaker: Option<&'a str>,
    theme: &'a QuestTheme,
}

impl<'a> DialogWidget<'a> {
    pub fn new(reveal: &'a TextReveal, theme: &'a QuestTheme) -> Self {
        Self {
            reveal,
            speaker: None,
            theme,
        }
    }

    pub fn speaker(mut self, speaker: Option<&'a str>) -> Self {
        self.speaker = speaker;
        self
    }
}

impl Widget for DialogWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let title = match self.speaker {
            Some(name) => format!(" {name} "),
            None => String::new(),
        };

        let block = Block::default()
            .title(title)
            .title_style(self.theme.speaker_style())
            .borders(Borders::ALL)
            .border_style(self.theme.border_style());

        let inner = block.inner(area);
        block.render(area, buf);

        let spans = reveal_spans(self.reveal, |alpha| self.theme.dialog_style(alpha));
        Paragraph::new(Line::from(spans))
            .wrap(Wrap { trim: false })
            .render(inner, buf);
    }
}
