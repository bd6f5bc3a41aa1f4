use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
};

/// Yes/No modal shown over the main screen.
pub struct ConfirmDialog {
    pub message: String,
    pub selected: bool, // true = Yes
}

impl ConfirmDialog {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), selected: false }
    }

    pub fn toggle(&mut self) {
        self.selected = !self.selected;
    }

    pub fn render(&self, f: &mut Frame) {
        let width = (self.message.chars().count() as u16 + 6).max(30);
        let area = centered_rect(width, 6, f.area());
        f.render_widget(Clear, area);

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow))
            .title(" Quit ");
        let inner = block.inner(area);
        f.render_widget(block, area);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Length(1), Constraint::Length(1), Constraint::Length(1)])
            .split(inner);

        let msg = Paragraph::new(Span::styled(self.message.as_str(), Style::default().fg(Color::White)))
            .alignment(Alignment::Center);
        f.render_widget(msg, rows[1]);

        let active = |color: Color| Style::default().fg(Color::Black).bg(color).add_modifier(Modifier::BOLD);
        let idle = Style::default().fg(Color::DarkGray);
        let (yes, no) = if self.selected { (active(Color::Green), idle) } else { (idle, active(Color::Red)) };

        let buttons = Line::from(vec![
            Span::styled("  [Yes]  ", yes),
            Span::raw("   "),
            Span::styled("  [No]  ", no),
        ]);
        f.render_widget(Paragraph::new(buttons).alignment(Alignment::Center), rows[3]);
    }
}

/// Centered `Rect` of `width` x `height` inside `area`, clipped to it.
fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    Rect::new(x, y, width.min(area.width), height.min(area.height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_no() {
        let mut d = ConfirmDialog::new("Quit?");
        assert!(!d.selected);
        d.toggle();
        assert!(d.selected);
    }

    #[test]
    fn centered_rect_clips() {
        let area = Rect::new(0, 0, 20, 4);
        assert_eq!(centered_rect(40, 6, area), Rect::new(0, 0, 20, 4));
        assert_eq!(centered_rect(10, 2, Rect::new(0, 0, 20, 10)), Rect::new(5, 4, 10, 2));
    }
}
