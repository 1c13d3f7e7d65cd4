//! Popup for the open account form.

use ratatui::{
  Frame,
  layout::Rect,
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Borders, Clear, Paragraph},
};

use crate::form::Form;

/// `width` x `height` centred in `area`, clipped to fit.
fn centered(area: Rect, width: u16, height: u16) -> Rect {
  let width = width.min(area.width);
  let height = height.min(area.height);
  Rect {
    x: area.x + (area.width - width) / 2,
    y: area.y + (area.height - height) / 2,
    width,
    height,
  }
}

pub fn draw(f: &mut Frame, form: &Form) {
  let lines: Vec<Line> = form
    .labels()
    .iter()
    .zip(&form.values)
    .enumerate()
    .map(|(i, (label, value))| {
      let shown = if form.is_secret(i) {
        "*".repeat(value.chars().count())
      } else {
        value.clone()
      };
      let focused = i == form.focus;
      let cursor = if focused { "_" } else { "" };
      let label_style = if focused {
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
      } else {
        Style::default().fg(Color::DarkGray)
      };
      Line::from(vec![
        Span::styled(format!("{label:>13}: "), label_style),
        Span::raw(format!("{shown}{cursor}")),
      ])
    })
    .collect();

  let area = centered(f.area(), 60, lines.len() as u16 + 2);
  let block = Block::default()
    .title(format!(" {} ", form.kind.title()))
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Cyan));

  f.render_widget(Clear, area);
  f.render_widget(Paragraph::new(lines).block(block), area);
}
