//! Text-entry forms for account changes.
//!
//! While a form is open every printable key goes into the focused field,
//! the same way the filter bar captures input.

use crossterm::event::{KeyCode, KeyEvent};
use eor_core::user::{ProfileUpdate, UserDraft};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormKind {
  /// Admin: create a user.
  AddUser,
  /// Edit the signed-in user's own profile.
  Profile,
}

impl FormKind {
  pub fn title(self) -> &'static str {
    match self {
      FormKind::AddUser => "Add user",
      FormKind::Profile => "Edit profile",
    }
  }

  fn labels(self) -> &'static [&'static str] {
    match self {
      FormKind::AddUser => &["Username", "Name", "Email", "Password"],
      FormKind::Profile => &["Name", "Email", "New password"],
    }
  }
}

/// A validated form, ready to send.
#[derive(Debug, Clone)]
pub enum Submission {
  AddUser(UserDraft),
  Profile(ProfileUpdate),
}

/// What a key press did to the form.
#[derive(Debug)]
pub enum FormEvent {
  Editing,
  Cancelled,
  Submitted(Submission),
}

#[derive(Debug, Clone)]
pub struct Form {
  pub kind:   FormKind,
  pub values: Vec<String>,
  pub focus:  usize,
}

impl Form {
  pub fn new(kind: FormKind) -> Self {
    Self { kind, values: vec![String::new(); kind.labels().len()], focus: 0 }
  }

  pub fn labels(&self) -> &'static [&'static str] { self.kind.labels() }

  /// Whether the field at `index` is shown masked.
  pub fn is_secret(&self, index: usize) -> bool {
    self.labels().get(index).is_some_and(|l| l.ends_with("assword"))
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> FormEvent {
    let last = self.values.len() - 1;
    match key.code {
      KeyCode::Esc => return FormEvent::Cancelled,
      KeyCode::Enter if self.focus == last => return FormEvent::Submitted(self.submission()),
      KeyCode::Enter | KeyCode::Tab | KeyCode::Down => self.focus = (self.focus + 1).min(last),
      KeyCode::BackTab | KeyCode::Up => self.focus = self.focus.saturating_sub(1),
      KeyCode::Backspace => {
        self.values[self.focus].pop();
      }
      KeyCode::Char(c) => self.values[self.focus].push(c),
      _ => {}
    }
    FormEvent::Editing
  }

  /// The form's contents as a request body. Blank profile fields mean
  /// "leave unchanged".
  fn submission(&self) -> Submission {
    let optional = |i: usize| {
      let v = self.values[i].trim();
      (!v.is_empty()).then(|| v.to_owned())
    };
    match self.kind {
      FormKind::AddUser => Submission::AddUser(UserDraft {
        username: self.values[0].clone(),
        name:     self.values[1].clone(),
        email:    self.values[2].clone(),
        password: self.values[3].clone(),
      }),
      FormKind::Profile => Submission::Profile(ProfileUpdate {
        name:     optional(0),
        email:    optional(1),
        password: optional(2),
      }),
    }
  }
}
