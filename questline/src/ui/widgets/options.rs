//! Dialog option list widget

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
};

use questline_core::session::OptionEntry;

use crate::ui::theme::QuestTheme;

/// Widget for the numbered choice list under the dialog box.
pub struct OptionsWidget<'a> {
    options: &'a [OptionEntry],
    selected: usize,
    theme: &'a QuestTheme,
}

impl<'a> OptionsWidget<'a> {
    pub fn new(options: &'a [OptionEntry], theme: &'a QuestTheme) -> Self {
        Self {
            options,
            selected: 0,
            theme,
        }
    }

    pub fn selected(mut self, selected: usize) -> Self {
        self.selected = selected;
        self
    }
}

impl Widget for OptionsWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .title(" Choose ")
            .borders(Borders::ALL)
            .border_style(self.theme.border_style());

        let inner = block.inner(area);
        block.render(area, buf);

        let mut lines = Vec::new();
        for (index, option) in self.options.iter().enumerate() {
            let selected = index == self.selected;
            let marker = if selected { "▸" } else { " " };
            let text = format!("{marker} {}) {}", index + 1, option.text);
            lines.push(Line::from(Span::styled(
                text,
                self.theme.option_style(selected),
            )));
        }

        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .render(inner, buf);
    }
}
