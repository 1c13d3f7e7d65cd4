//! Per-view request tickets.
//!
//! Every fetch takes a [`Ticket`] for the view it will populate. When the
//! response arrives it is applied only if no newer ticket has been issued
//! for that view since, so a slow response can never overwrite a fresher one.

use std::collections::HashMap;

/// The independently refreshed parts of the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
  Status,
  Logs,
  Users,
  /// The signed-in user's own profile.
  Account,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
  view: View,
  seq:  u64,
}

impl Ticket {
  pub fn view(self) -> View { self.view }
}

#[derive(Debug, Default)]
pub struct RequestSequencer {
  next:   u64,
  latest: HashMap<View, u64>,
}

impl RequestSequencer {
  /// Issue a ticket for `view`, superseding any outstanding one.
  pub fn issue(&mut self, view: View) -> Ticket {
    self.next += 1;
    self.latest.insert(view, self.next);
    Ticket { view, seq: self.next }
  }

  pub fn is_current(&self, ticket: Ticket) -> bool {
    self.latest.get(&ticket.view) == Some(&ticket.seq)
  }
}
