//! Application state machine and event dispatcher.
//!
//! Fetches never block the draw loop: each one is spawned with a
//! [`Ticket`] and its result comes back over a channel as a [`Fetched`],
//! which [`App::apply`] drops if the ticket has been superseded.

use std::{future::Future, sync::Arc};

use chrono::{DateTime, Utc};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use eor_core::{
  log::ObservationLog,
  observation::{FutureObservationCounts, Observation},
  tag::{Tag, TagMask},
  user::{ProfileUpdate, User, UserDraft},
};
use tokio::sync::mpsc;

use crate::{
  client::ApiClient,
  form::{Form, FormEvent, FormKind, Submission},
  sequence::{RequestSequencer, Ticket, View},
};

/// Entries per page on the Logs tab.
pub const LOG_PAGE_SIZE: u32 = 10;

// ─── Tab ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
  Status,
  Logs,
  Users,
}

impl Tab {
  pub const ALL: [Tab; 3] = [Tab::Status, Tab::Logs, Tab::Users];

  pub fn title(self) -> &'static str {
    match self {
      Tab::Status => "Status",
      Tab::Logs => "Logs",
      Tab::Users => "Users",
    }
  }

  pub fn index(self) -> usize {
    Self::ALL.iter().position(|t| *t == self).unwrap_or(0)
  }

  fn view(self) -> View {
    match self {
      Tab::Status => View::Status,
      Tab::Logs => View::Logs,
      Tab::Users => View::Users,
    }
  }

  fn next(self) -> Tab { Self::ALL[(self.index() + 1) % Self::ALL.len()] }

  fn prev(self) -> Tab {
    Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
  }
}

// ─── Fetched data ─────────────────────────────────────────────────────────────

/// Everything the Status tab shows apart from the clock.
#[derive(Debug, Clone, Default)]
pub struct StatusSnapshot {
  pub observations: Vec<Observation>,
  pub future:       FutureObservationCounts,
  pub latest_log:   Option<ObservationLog>,
}

impl StatusSnapshot {
  pub fn current(&self, now: DateTime<Utc>) -> Option<&Observation> {
    self.observations.iter().find(|o| o.is_running_at(now))
  }

  pub fn past(&self, now: DateTime<Utc>) -> impl Iterator<Item = &Observation> {
    self.observations.iter().filter(move |o| o.stop_time <= now)
  }
}

#[derive(Debug)]
pub enum Update {
  Status(StatusSnapshot),
  Logs(Vec<ObservationLog>),
  Users(Vec<User>),
  Account(User),
}

/// A completed fetch, tagged with the ticket it was issued under.
#[derive(Debug)]
pub struct Fetched {
  pub ticket: Ticket,
  pub result: Result<Update, String>,
}

// ─── App ──────────────────────────────────────────────────────────────────────

/// Top-level application state.
pub struct App {
  pub tab:         Tab,
  /// Wall clock shown in the header; advanced by [`App::tick`].
  pub now:         DateTime<Utc>,
  pub status:      Option<StatusSnapshot>,
  pub logs:        Vec<ObservationLog>,
  pub tag_filter:  TagMask,
  /// Zero-based page of the Logs tab.
  pub log_page:    u32,
  pub users:       Vec<User>,
  pub user_cursor: usize,
  /// The signed-in user, once fetched or saved.
  pub account:     Option<User>,
  /// Open text-entry form; captures all keys but Ctrl-C.
  pub form:        Option<Form>,
  /// One-line message shown in the status bar.
  pub status_msg:  String,

  client:    Arc<ApiClient>,
  sequencer: RequestSequencer,
  tx:        mpsc::UnboundedSender<Fetched>,
}

impl App {
  /// Create an empty [`App`] and the receiving end of its fetch channel.
  pub fn new(client: ApiClient, now: DateTime<Utc>) -> (Self, mpsc::UnboundedReceiver<Fetched>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let app = Self {
      tab: Tab::Status,
      now,
      status: None,
      logs: Vec::new(),
      tag_filter: TagMask::EMPTY,
      log_page: 0,
      users: Vec::new(),
      user_cursor: 0,
      account: None,
      form: None,
      status_msg: String::new(),
      client: Arc::new(client),
      sequencer: RequestSequencer::default(),
      tx,
    };
    (app, rx)
  }

  pub fn tick(&mut self, now: DateTime<Utc>) { self.now = now; }

  pub fn selected_user(&self) -> Option<&User> { self.users.get(self.user_cursor) }

  // ── Fetching ──────────────────────────────────────────────────────────────

  fn spawn<F>(&self, ticket: Ticket, fetch: F)
  where
    F: Future<Output = anyhow::Result<Update>> + Send + 'static,
  {
    let tx = self.tx.clone();
    tokio::spawn(async move {
      let result = fetch.await.map_err(|e| format!("{e:#}"));
      // Fails only once the app has shut down.
      let _ = tx.send(Fetched { ticket, result });
    });
  }

  /// Start fetching `view`, superseding any fetch already in flight for it.
  pub fn refresh(&mut self, view: View) -> Ticket {
    let ticket = self.sequencer.issue(view);
    let client = self.client.clone();
    self.status_msg = "Loading…".into();

    match view {
      View::Status => self.spawn(ticket, async move {
        let (observations, future, latest_log) = tokio::try_join!(
          client.recent_observations(),
          client.future_observation_counts(),
          client.latest_log(),
        )?;
        Ok::<_, anyhow::Error>(Update::Status(StatusSnapshot { observations, future, latest_log }))
      }),
      View::Logs => {
        let (tags, offset) = (self.tag_filter, self.log_page * LOG_PAGE_SIZE);
        self.spawn(ticket, async move {
          Ok::<_, anyhow::Error>(Update::Logs(client.list_logs(tags, LOG_PAGE_SIZE, offset).await?))
        })
      }
      View::Users => self.spawn(ticket, async move {
        Ok::<_, anyhow::Error>(Update::Users(client.list_users().await?))
      }),
      View::Account => self.spawn(ticket, async move {
        Ok::<_, anyhow::Error>(Update::Account(client.current_user().await?))
      }),
    }
    ticket
  }

  /// Create a user, then reload the user list. Input the server would reject
  /// is reported in the status bar without a request being made.
  pub fn create_user(&mut self, draft: UserDraft) -> Option<Ticket> {
    if let Err(e) = draft.clone().validate() {
      self.status_msg = format!("Error: {e}");
      return None;
    }

    let ticket = self.sequencer.issue(View::Users);
    let client = self.client.clone();
    self.status_msg = format!("Creating {}…", draft.username.trim());
    self.spawn(ticket, async move {
      client.create_user(&draft).await?;
      Ok::<_, anyhow::Error>(Update::Users(client.list_users().await?))
    });
    Some(ticket)
  }

  /// Save changes to the signed-in user's profile.
  pub fn update_profile(&mut self, update: ProfileUpdate) -> Option<Ticket> {
    let update = match update.normalized() {
      Ok(update) => update,
      Err(e) => {
        self.status_msg = format!("Error: {e}");
        return None;
      }
    };

    let ticket = self.sequencer.issue(View::Account);
    let client = self.client.clone();
    self.status_msg = "Saving profile…".into();
    self.spawn(ticket, async move {
      Ok::<_, anyhow::Error>(Update::Account(client.update_current_user(&update).await?))
    });
    Some(ticket)
  }

  /// Deactivate or reactivate the user under the cursor, then reload the
  /// user list. Any list fetch already in flight is superseded.
  pub fn set_selected_user_active(&mut self, active: bool) -> Option<Ticket> {
    let user = self.selected_user()?;
    let (id, username) = (user.id, user.username.clone());

    let ticket = self.sequencer.issue(View::Users);
    let client = self.client.clone();
    self.spawn(ticket, async move {
      client.set_user_active(id, active).await?;
      Ok::<_, anyhow::Error>(Update::Users(client.list_users().await?))
    });
    self.status_msg = format!("Updating {username}…");
    Some(ticket)
  }

  /// Apply a completed fetch. Returns `false` if it was stale and dropped.
  pub fn apply(&mut self, fetched: Fetched) -> bool {
    if !self.sequencer.is_current(fetched.ticket) {
      tracing::debug!(view = ?fetched.ticket.view(), "discarding stale response");
      return false;
    }

    match fetched.result {
      Ok(Update::Status(snapshot)) => self.status = Some(snapshot),
      Ok(Update::Logs(logs)) => self.logs = logs,
      Ok(Update::Users(users)) => {
        self.users = users;
        self.user_cursor = self.user_cursor.min(self.users.len().saturating_sub(1));
      }
      Ok(Update::Account(user)) => {
        self.status_msg = format!("Signed in as {} <{}>", user.name, user.email);
        self.account = Some(user);
        return true;
      }
      Err(e) => {
        self.status_msg = format!("Error: {e}");
        return true;
      }
    }
    self.status_msg.clear();
    true
  }

  // ── Key handling ──────────────────────────────────────────────────────────

  /// Process a key event. Returns `true` to continue, `false` to quit.
  pub fn handle_key(&mut self, key: KeyEvent) -> bool {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
      return false;
    }

    if let Some(form) = &mut self.form {
      match form.handle_key(key) {
        FormEvent::Editing => {}
        FormEvent::Cancelled => self.form = None,
        FormEvent::Submitted(submission) => {
          let sent = match submission {
            Submission::AddUser(draft) => self.create_user(draft),
            Submission::Profile(update) => self.update_profile(update),
          };
          if sent.is_some() {
            self.form = None;
          }
        }
      }
      return true;
    }

    match key.code {
      KeyCode::Char('q') => return false,
      KeyCode::Char('e') => self.form = Some(Form::new(FormKind::Profile)),
      KeyCode::Tab => self.switch_tab(self.tab.next()),
      KeyCode::BackTab => self.switch_tab(self.tab.prev()),
      KeyCode::F(5) => {
        self.refresh(self.tab.view());
      }
      _ => match self.tab {
        Tab::Status => {}
        Tab::Logs => self.handle_logs_key(key),
        Tab::Users => self.handle_users_key(key),
      },
    }
    true
  }

  fn switch_tab(&mut self, tab: Tab) {
    self.tab = tab;
    self.refresh(tab.view());
  }

  fn handle_logs_key(&mut self, key: KeyEvent) {
    match key.code {
      KeyCode::Char(c @ '1'..='9') => {
        let index = c as usize - '1' as usize;
        if let Some(tag) = Tag::from_index(index) {
          self.tag_filter = self.tag_filter.toggled(tag);
          self.log_page = 0;
          self.refresh(View::Logs);
        }
      }
      KeyCode::Char('0') => {
        self.tag_filter = TagMask::EMPTY;
        self.log_page = 0;
        self.refresh(View::Logs);
      }
      KeyCode::Char('n') | KeyCode::PageDown => {
        if self.logs.len() as u32 >= LOG_PAGE_SIZE {
          self.log_page += 1;
          self.refresh(View::Logs);
        }
      }
      KeyCode::Char('p') | KeyCode::PageUp => {
        if self.log_page > 0 {
          self.log_page -= 1;
          self.refresh(View::Logs);
        }
      }
      _ => {}
    }
  }

  fn handle_users_key(&mut self, key: KeyEvent) {
    match key.code {
      KeyCode::Down | KeyCode::Char('j') => {
        if self.user_cursor + 1 < self.users.len() {
          self.user_cursor += 1;
        }
      }
      KeyCode::Up | KeyCode::Char('k') => {
        self.user_cursor = self.user_cursor.saturating_sub(1);
      }
      KeyCode::Char('d') => {
        self.set_selected_user_active(false);
      }
      KeyCode::Char('r') => {
        self.set_selected_user_active(true);
      }
      KeyCode::Char('a') => self.form = Some(Form::new(FormKind::AddUser)),
      _ => {}
    }
  }
}

#[cfg(test)]
mod tests {
  use chrono::{Duration, NaiveDate, TimeZone};

  use super::*;
  use crate::client::ApiConfig;

  fn now() -> DateTime<Utc> { Utc.with_ymd_and_hms(2014, 8, 5, 6, 32, 0).unwrap() }

  fn app() -> (App, mpsc::UnboundedReceiver<Fetched>) {
    let client = ApiClient::new(ApiConfig {
      base_url: "http://127.0.0.1:9".into(),
      username: "alice".into(),
      password: "secret".into(),
    })
    .unwrap();
    App::new(client, now())
  }

  fn key(code: KeyCode) -> KeyEvent { KeyEvent::new(code, KeyModifiers::NONE) }

  fn log(id: i64) -> ObservationLog {
    ObservationLog {
      id,
      created_date: now(),
      observed_date: NaiveDate::from_ymd_opt(2014, 8, 4).unwrap(),
      author_user_id: 1,
      author_user_name: "Alice".into(),
      note: format!("entry {id}"),
      tags: TagMask::EMPTY,
    }
  }

  fn user(id: i64, username: &str) -> User {
    User {
      id,
      username: username.into(),
      name: username.into(),
      email: format!("{username}@example.org"),
      created_at: now(),
      deactivated_date: None,
      admin_level: 0,
    }
  }

  fn observation(n: i64, start: DateTime<Utc>) -> Observation {
    Observation {
      observation_number: n,
      obsname: format!("high_{n}"),
      projectid: "G0009".into(),
      start_time: start,
      stop_time: start + Duration::minutes(2),
      files: 0,
    }
  }

  #[tokio::test]
  async fn stale_response_is_discarded() {
    let (mut app, _rx) = app();
    let old = app.refresh(View::Logs);
    let new = app.refresh(View::Logs);

    assert!(app.apply(Fetched { ticket: new, result: Ok(Update::Logs(vec![log(2)])) }));
    assert!(!app.apply(Fetched { ticket: old, result: Ok(Update::Logs(vec![log(1)])) }));
    assert_eq!(app.logs, vec![log(2)]);
  }

  #[tokio::test]
  async fn failed_fetch_reports_in_status_bar() {
    let (mut app, _rx) = app();
    let ticket = app.refresh(View::Status);
    assert!(app.apply(Fetched { ticket, result: Err("GET /users → 403".into()) }));
    assert_eq!(app.status_msg, "Error: GET /users → 403");
    assert!(app.status.is_none());
  }

  #[tokio::test]
  async fn tag_keys_toggle_filter_and_reset_paging() {
    let (mut app, _rx) = app();
    app.tab = Tab::Logs;
    app.log_page = 3;

    app.handle_key(key(KeyCode::Char('2')));
    assert_eq!(app.tag_filter, TagMask::EMPTY.with(Tag::Fine));
    assert_eq!(app.log_page, 0);

    app.handle_key(key(KeyCode::Char('4')));
    assert_eq!(app.tag_filter.bits(), 10);

    app.handle_key(key(KeyCode::Char('2')));
    assert_eq!(app.tag_filter, TagMask::EMPTY.with(Tag::HardwareIssue));

    app.handle_key(key(KeyCode::Char('8')));
    assert_eq!(app.tag_filter, TagMask::EMPTY.with(Tag::HardwareIssue));

    app.handle_key(key(KeyCode::Char('0')));
    assert!(app.tag_filter.is_empty());
  }

  #[tokio::test]
  async fn paging_stops_at_a_short_page() {
    let (mut app, _rx) = app();
    app.tab = Tab::Logs;

    app.logs = (0..3).map(log).collect();
    app.handle_key(key(KeyCode::Char('n')));
    assert_eq!(app.log_page, 0);

    app.logs = (0..LOG_PAGE_SIZE as i64).map(log).collect();
    app.handle_key(key(KeyCode::Char('n')));
    assert_eq!(app.log_page, 1);

    app.handle_key(key(KeyCode::Char('p')));
    app.handle_key(key(KeyCode::Char('p')));
    assert_eq!(app.log_page, 0);
  }

  #[tokio::test]
  async fn user_change_supersedes_pending_list() {
    let (mut app, _rx) = app();
    app.tab = Tab::Users;
    app.users = vec![user(1, "alice"), user(2, "bob")];
    let pending = app.refresh(View::Users);

    app.handle_key(key(KeyCode::Char('j')));
    app.handle_key(key(KeyCode::Char('d')));
    assert_eq!(app.status_msg, "Updating bob…");
    assert!(!app.apply(Fetched { ticket: pending, result: Ok(Update::Users(vec![])) }));
    assert_eq!(app.users.len(), 2);
  }

  fn type_text(app: &mut App, text: &str) {
    for c in text.chars() {
      app.handle_key(key(KeyCode::Char(c)));
    }
  }

  #[tokio::test]
  async fn add_user_form_supersedes_pending_list() {
    let (mut app, _rx) = app();
    app.tab = Tab::Users;
    app.users = vec![user(1, "alice")];
    let pending = app.refresh(View::Users);

    app.handle_key(key(KeyCode::Char('a')));
    assert_eq!(app.form.as_ref().map(|f| f.kind), Some(FormKind::AddUser));
    for value in ["carol", "Carol", "carol@example.org", "pw"] {
      type_text(&mut app, value);
      app.handle_key(key(KeyCode::Enter));
    }

    assert!(app.form.is_none());
    assert_eq!(app.status_msg, "Creating carol…");
    assert!(!app.apply(Fetched { ticket: pending, result: Ok(Update::Users(vec![])) }));
    assert_eq!(app.users.len(), 1);
  }

  #[tokio::test]
  async fn invalid_new_user_keeps_form_open() {
    let (mut app, _rx) = app();
    app.tab = Tab::Users;
    app.handle_key(key(KeyCode::Char('a')));
    type_text(&mut app, "dave");
    for _ in 0..4 {
      app.handle_key(key(KeyCode::Enter));
    }

    assert!(app.form.is_some());
    assert_eq!(app.status_msg, "Error: required field missing: name");
    // Typing into the form never quits.
    assert!(app.handle_key(key(KeyCode::Char('q'))));
  }

  #[tokio::test]
  async fn saved_profile_is_shown() {
    let (mut app, _rx) = app();
    app.handle_key(key(KeyCode::Char('e')));
    type_text(&mut app, "Alice A");
    for _ in 0..3 {
      app.handle_key(key(KeyCode::Enter));
    }
    assert!(app.form.is_none());
    assert_eq!(app.status_msg, "Saving profile…");

    let ticket = app.refresh(View::Account);
    let saved = User { name: "Alice A".into(), ..user(1, "alice") };
    assert!(app.apply(Fetched { ticket, result: Ok(Update::Account(saved.clone())) }));
    assert_eq!(app.account, Some(saved));
    assert_eq!(app.status_msg, "Signed in as Alice A <alice@example.org>");
  }

  #[tokio::test]
  async fn empty_profile_update_is_still_sent() {
    let (mut app, _rx) = app();
    assert!(app.update_profile(ProfileUpdate::default()).is_some());
    assert!(app.update_profile(ProfileUpdate { name: Some(" ".into()), ..Default::default() }).is_none());
    assert_eq!(app.status_msg, "Error: required field missing: name");
  }

  #[tokio::test]
  async fn cursor_is_clamped_when_list_shrinks() {
    let (mut app, _rx) = app();
    app.users = vec![user(1, "alice"), user(2, "bob")];
    app.user_cursor = 1;
    let ticket = app.refresh(View::Users);
    app.apply(Fetched { ticket, result: Ok(Update::Users(vec![user(1, "alice")])) });
    assert_eq!(app.user_cursor, 0);
    assert_eq!(app.selected_user().map(|u| u.id), Some(1));
  }

  #[tokio::test]
  async fn tab_cycles_and_quit_stops() {
    let (mut app, _rx) = app();
    assert!(app.handle_key(key(KeyCode::Tab)));
    assert_eq!(app.tab, Tab::Logs);
    app.handle_key(key(KeyCode::BackTab));
    app.handle_key(key(KeyCode::BackTab));
    assert_eq!(app.tab, Tab::Users);
    assert!(!app.handle_key(key(KeyCode::Char('q'))));
  }

  #[test]
  fn snapshot_splits_current_from_past() {
    let snapshot = StatusSnapshot {
      observations: vec![
        observation(3, now() - Duration::minutes(1)),
        observation(2, now() - Duration::minutes(10)),
        observation(1, now() - Duration::minutes(20)),
      ],
      ..Default::default()
    };
    assert_eq!(snapshot.current(now()).map(|o| o.observation_number), Some(3));
    let past: Vec<_> = snapshot.past(now()).map(|o| o.observation_number).collect();
    assert_eq!(past, vec![2, 1]);
  }
}
