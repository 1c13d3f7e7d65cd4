//! TUI rendering: orchestrates all panes.

pub mod form;
pub mod logs;
pub mod status;
pub mod users;

use ratatui::{
  Frame,
  layout::{Constraint, Direction, Layout, Rect},
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Paragraph, Tabs},
};

use crate::app::{App, Tab};

pub(crate) const DATE_TIME: &str = "%Y-%m-%d %H:%M:%S";

// ─── Root draw ────────────────────────────────────────────────────────────────

/// Main draw function called each frame.
pub fn draw(f: &mut Frame, app: &App) {
  let area = f.area();

  let rows = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // header
      Constraint::Length(1), // tabs
      Constraint::Min(0),    // body
      Constraint::Length(1), // status bar
    ])
    .split(area);

  draw_header(f, rows[0], app);
  draw_tabs(f, rows[1], app);
  match app.tab {
    Tab::Status => status::draw(f, rows[2], app),
    Tab::Logs => logs::draw(f, rows[2], app),
    Tab::Users => users::draw(f, rows[2], app),
  }
  draw_status(f, rows[3], app);

  if let Some(form) = &app.form {
    form::draw(f, form);
  }
}

// ─── Header ───────────────────────────────────────────────────────────────────

fn draw_header(f: &mut Frame, area: Rect, app: &App) {
  let left = Span::styled(
    " eor  [Tab] switch  [F5] refresh  [e] profile  [q] quit",
    Style::default()
      .fg(Color::White)
      .add_modifier(Modifier::BOLD),
  );
  let who = app
    .account
    .as_ref()
    .map(|a| format!("{}  ", a.username))
    .unwrap_or_default();
  let right = Span::styled(
    format!("{who}{} UTC ", app.now.format(DATE_TIME)),
    Style::default().fg(Color::White),
  );

  let left_width = left.content.chars().count() as u16;
  let right_width = right.content.chars().count() as u16;
  let pad = area
    .width
    .saturating_sub(left_width)
    .saturating_sub(right_width);

  let line = Line::from(vec![
    left,
    Span::raw(" ".repeat(pad as usize)),
    right,
  ]);

  let block = Block::default().style(Style::default().bg(Color::DarkGray));
  let inner = block.inner(area);
  f.render_widget(block, area);
  f.render_widget(Paragraph::new(line), inner);
}

fn draw_tabs(f: &mut Frame, area: Rect, app: &App) {
  let tabs = Tabs::new(Tab::ALL.iter().map(|t| t.title()))
    .select(app.tab.index())
    .style(Style::default().fg(Color::DarkGray))
    .highlight_style(
      Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD),
    );
  f.render_widget(tabs, area);
}

// ─── Status bar ───────────────────────────────────────────────────────────────

fn draw_status(f: &mut Frame, area: Rect, app: &App) {
  let hints = match (app.tab, &app.form) {
    (_, Some(_)) => "Tab/Enter next field  Enter on last saves  Esc cancel",
    (Tab::Status, None) => "Tab next view  F5 refresh  e edit profile  q quit",
    (Tab::Logs, None) => "1-7 toggle tag  0 clear  n/p page  F5 refresh  q quit",
    (Tab::Users, None) => "↑↓/jk select  a add  d deactivate  r reactivate  q quit",
  };

  let status = if app.status_msg.is_empty() {
    hints.to_string()
  } else {
    app.status_msg.clone()
  };

  let mode_span = Span::styled(
    format!(" {} ", app.tab.title().to_uppercase()),
    Style::default()
      .fg(Color::Black)
      .bg(Color::Cyan)
      .add_modifier(Modifier::BOLD),
  );
  let hint_span = Span::styled(
    format!("  {status}"),
    Style::default().fg(Color::DarkGray),
  );

  f.render_widget(
    Paragraph::new(Line::from(vec![mode_span, hint_span]))
      .style(Style::default().bg(Color::Black)),
    area,
  );
}

/// A dimmed one-line placeholder inside a bordered pane.
pub(crate) fn placeholder(f: &mut Frame, area: Rect, block: Block, text: &str) {
  let inner = block.inner(area);
  f.render_widget(block, area);
  f.render_widget(
    Paragraph::new(text.to_string()).style(Style::default().fg(Color::DarkGray)),
    inner,
  );
}
