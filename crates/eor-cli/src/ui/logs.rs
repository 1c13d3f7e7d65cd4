//! Logs tab: tag filter toggles above a page of entries.

use eor_core::tag::Tag;
use ratatui::{
  Frame,
  layout::{Constraint, Direction, Layout, Rect},
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Borders, Paragraph, Row, Table},
};

use super::placeholder;
use crate::app::App;

pub fn draw(f: &mut Frame, area: Rect, app: &App) {
  let rows = Layout::default()
    .direction(Direction::Vertical)
    .constraints([Constraint::Length(1), Constraint::Min(0)])
    .split(area);

  // One toggle per tag, numbered by its key.
  let toggles: Vec<Span> = Tag::ALL
    .iter()
    .enumerate()
    .flat_map(|(i, tag)| {
      let on = app.tag_filter.contains(*tag);
      let style = if on {
        Style::default()
          .fg(Color::Yellow)
          .add_modifier(Modifier::BOLD)
      } else {
        Style::default().fg(Color::DarkGray)
      };
      [
        Span::styled(format!("[{}]{} ", i + 1, if on { "x" } else { " " }), style),
        Span::styled(format!("{tag}  "), style),
      ]
    })
    .collect();
  f.render_widget(Paragraph::new(Line::from(toggles)), rows[0]);

  let block = Block::default()
    .title(format!(" Logs (page {}) ", app.log_page + 1))
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::DarkGray));

  if app.logs.is_empty() {
    placeholder(f, rows[1], block, "No matching entries.");
    return;
  }

  let entries: Vec<Row> = app
    .logs
    .iter()
    .map(|log| {
      Row::new(vec![
        log.observed_date.to_string(),
        log.author_user_name.clone(),
        log.tags.names().join(", "),
        log.note.replace('\n', " "),
      ])
    })
    .collect();

  let table = Table::new(entries, [
    Constraint::Length(10),
    Constraint::Length(16),
    Constraint::Length(28),
    Constraint::Min(20),
  ])
  .header(
    Row::new(vec!["Date", "Author", "Tags", "Note"])
      .style(Style::default().add_modifier(Modifier::BOLD)),
  )
  .column_spacing(2)
  .block(block);
  f.render_widget(table, rows[1]);
}
