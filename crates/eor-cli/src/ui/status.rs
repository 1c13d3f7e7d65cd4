//! Status tab: what the telescope is doing and the latest log entry.

use eor_core::observation::Observation;
use ratatui::{
  Frame,
  layout::{Constraint, Direction, Layout, Rect},
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Borders, Paragraph, Row, Table, Wrap},
};

use super::{DATE_TIME, placeholder};
use crate::app::App;

fn pane(title: &str) -> Block<'static> {
  Block::default()
    .title(format!(" {title} "))
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::DarkGray))
}

fn label(text: &str) -> Span<'static> {
  Span::styled(
    format!("{text:<14}"),
    Style::default()
      .fg(Color::Cyan)
      .add_modifier(Modifier::BOLD),
  )
}

fn observation_row(obs: &Observation) -> Row<'static> {
  Row::new(vec![
    obs.observation_number.to_string(),
    obs.obsname.clone(),
    obs.projectid.clone(),
    obs.start_time.format(DATE_TIME).to_string(),
    obs.files.to_string(),
  ])
}

pub fn draw(f: &mut Frame, area: Rect, app: &App) {
  let Some(snapshot) = &app.status else {
    placeholder(f, area, pane("Status"), "Loading…");
    return;
  };

  let rows = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(4),
      Constraint::Min(4),
      Constraint::Length(7),
    ])
    .split(area);

  // Now observing and the future schedule.
  let current = match snapshot.current(app.now) {
    Some(obs) => Line::from(vec![
      label("Observing"),
      Span::styled(
        format!("{} ({}, {})", obs.obsname, obs.projectid, obs.observation_number),
        Style::default().fg(Color::Green),
      ),
    ]),
    None => Line::from(vec![
      label("Observing"),
      Span::styled("nothing", Style::default().fg(Color::DarkGray)),
    ]),
  };
  let future = Line::from(vec![
    label("Scheduled"),
    Span::raw(format!(
      "{} to come, {} finishing in the next 24 hours",
      snapshot.future.total, snapshot.future.next_24
    )),
  ]);
  f.render_widget(
    Paragraph::new(vec![current, future]).block(pane("Now")),
    rows[0],
  );

  // Recent observations.
  let past: Vec<Row> = snapshot.past(app.now).map(observation_row).collect();
  if past.is_empty() {
    placeholder(f, rows[1], pane("Recent observations"), "None yet.");
  } else {
    let table = Table::new(past, [
      Constraint::Length(12),
      Constraint::Min(12),
      Constraint::Length(8),
      Constraint::Length(20),
      Constraint::Length(6),
    ])
    .header(
      Row::new(vec!["Obs ID", "Name", "Project", "Start (UTC)", "Files"])
        .style(Style::default().add_modifier(Modifier::BOLD)),
    )
    .block(pane("Recent observations"));
    f.render_widget(table, rows[1]);
  }

  // Latest log.
  match &snapshot.latest_log {
    Some(log) => {
      let lines = vec![
        Line::from(vec![label("Date"), Span::raw(log.observed_date.to_string())]),
        Line::from(vec![label("Author"), Span::raw(log.author_user_name.clone())]),
        Line::from(vec![label("Tags"), Span::raw(log.tags.names().join(", "))]),
        Line::from(vec![label("Note"), Span::raw(log.note.clone())]),
      ];
      f.render_widget(
        Paragraph::new(lines)
          .wrap(Wrap { trim: true })
          .block(pane("Latest log")),
        rows[2],
      );
    }
    None => placeholder(f, rows[2], pane("Latest log"), "No log entries."),
  }
}
