//! Users tab: admin view with activation controls.

use eor_core::user::UserStatus;
use ratatui::{
  Frame,
  layout::Rect,
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Borders, List, ListItem, ListState},
};

use super::placeholder;
use crate::app::App;

pub fn draw(f: &mut Frame, area: Rect, app: &App) {
  let block = Block::default()
    .title(format!(" Users ({}) ", app.users.len()))
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::DarkGray));

  if app.users.is_empty() {
    placeholder(f, area, block, "No users loaded. Listing users needs admin rights.");
    return;
  }

  let items: Vec<ListItem> = app
    .users
    .iter()
    .map(|user| {
      let (badge, badge_style) = match user.status() {
        UserStatus::Active => ("active        ".to_string(), Style::default().fg(Color::Green)),
        UserStatus::Deactivated { since } => (
          format!("off {}", since.format("%Y-%m-%d")),
          Style::default().fg(Color::Red),
        ),
      };
      let admin = if user.is_admin() { " admin" } else { "" };
      ListItem::new(Line::from(vec![
        Span::styled(badge, badge_style),
        Span::raw(format!("  {:<16}", user.username)),
        Span::raw(format!("{:<24}", user.name)),
        Span::styled(user.email.clone(), Style::default().fg(Color::DarkGray)),
        Span::styled(admin, Style::default().fg(Color::Yellow)),
      ]))
    })
    .collect();

  let mut state = ListState::default();
  state.select(Some(app.user_cursor));

  f.render_stateful_widget(
    List::new(items)
      .block(block)
      .highlight_style(
        Style::default()
          .bg(Color::Blue)
          .fg(Color::White)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol(""),
    area,
    &mut state,
  );
}
