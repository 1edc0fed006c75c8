//! Tickets and the state machine that moves them.
//!
//! A ticket only ever moves forward: `OPEN → PENDING → CLOSED`. The methods
//! here check a transition against the ticket's current state and apply it in
//! memory; storage backends call them inside the transaction that persists
//! the result, so a check and its write can never interleave with another
//! writer.

use std::{fmt, str::FromStr};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Rejection, UnknownVariant};

/// The most tickets a caseworker may hold in `PENDING` at once.
pub const MAX_PENDING_PER_CASEWORKER: u64 = 6;

// ─── Enumerations ────────────────────────────────────────────────────────────

/// The kind of card a fraud report is filed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CardType {
  Credit,
  Debit,
}

impl CardType {
  pub fn as_str(self) -> &'static str {
    match self {
      CardType::Credit => "CREDIT",
      CardType::Debit => "DEBIT",
    }
  }
}

impl fmt::Display for CardType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for CardType {
  type Err = UnknownVariant;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "CREDIT" => Ok(CardType::Credit),
      "DEBIT" => Ok(CardType::Debit),
      other => Err(UnknownVariant::new("card type", other)),
    }
  }
}

/// Where a ticket sits in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
  Open,
  Pending,
  Closed,
}

impl TicketStatus {
  pub fn as_str(self) -> &'static str {
    match self {
      TicketStatus::Open => "OPEN",
      TicketStatus::Pending => "PENDING",
      TicketStatus::Closed => "CLOSED",
    }
  }

  /// `OPEN` and `PENDING` tickets count against the one-active-ticket-per-card
  /// rule; `CLOSED` ones do not.
  pub fn is_active(self) -> bool { !matches!(self, TicketStatus::Closed) }
}

impl fmt::Display for TicketStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for TicketStatus {
  type Err = UnknownVariant;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "OPEN" => Ok(TicketStatus::Open),
      "PENDING" => Ok(TicketStatus::Pending),
      "CLOSED" => Ok(TicketStatus::Closed),
      other => Err(UnknownVariant::new("ticket status", other)),
    }
  }
}

/// A caseworker-driven move between states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
  /// `OPEN → PENDING`, taking ownership.
  Claim,
  /// `PENDING → CLOSED`, by the owning caseworker.
  Close,
}

impl Transition {
  /// The status a ticket must be in for this transition to apply.
  pub fn from_status(self) -> TicketStatus {
    match self {
      Transition::Claim => TicketStatus::Open,
      Transition::Close => TicketStatus::Pending,
    }
  }
}

impl fmt::Display for Transition {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Transition::Claim => "claim",
      Transition::Close => "close",
    })
  }
}

// ─── Ticket ──────────────────────────────────────────────────────────────────

/// A summary of the account on either side of a ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketParty {
  pub id:        i64,
  pub rut:       String,
  #[serde(rename = "fullname")]
  pub full_name: String,
  pub email:     String,
}

/// A fraud report filed against one card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
  pub id:         i64,
  pub card_type:  CardType,
  pub comment:    String,
  pub status:     TicketStatus,
  pub start_date: NaiveDate,
  pub end_date:   Option<NaiveDate>,
  pub client:     TicketParty,
  /// Absent until a caseworker claims the ticket; never reassigned.
  pub manager:    Option<TicketParty>,
}

impl Ticket {
  /// Move an `OPEN` ticket to `PENDING` under `manager`.
  pub fn claim(&mut self, manager: TicketParty) -> Result<(), Rejection> {
    self.expect_status(Transition::Claim)?;
    self.status = TicketStatus::Pending;
    self.manager = Some(manager);
    Ok(())
  }

  /// Move a `PENDING` ticket to `CLOSED`. Only the caseworker recorded on the
  /// ticket may do this.
  pub fn close(&mut self, manager_id: i64, today: NaiveDate) -> Result<(), Rejection> {
    self.expect_status(Transition::Close)?;
    match &self.manager {
      Some(m) if m.id == manager_id => {}
      _ => return Err(Rejection::NotOwner(self.id)),
    }
    self.status = TicketStatus::Closed;
    self.end_date = Some(today);
    Ok(())
  }

  /// Whole days between filing and closure, clamped at zero against clock
  /// skew. `None` while the ticket is still open.
  pub fn days_to_close(&self) -> Option<i64> {
    self
      .end_date
      .map(|end| (end - self.start_date).num_days().max(0))
  }

  fn expect_status(&self, transition: Transition) -> Result<(), Rejection> {
    if self.status != transition.from_status() {
      return Err(Rejection::InvalidTransition {
        id: self.id,
        status: self.status,
        transition,
      });
    }
    Ok(())
  }
}

/// Refuse a claim that would push a caseworker past
/// [`MAX_PENDING_PER_CASEWORKER`].
pub fn check_capacity(pending_held: u64) -> Result<(), Rejection> {
  if pending_held >= MAX_PENDING_PER_CASEWORKER {
    return Err(Rejection::CapacityExceeded {
      held:  pending_held,
      limit: MAX_PENDING_PER_CASEWORKER,
    });
  }
  Ok(())
}

/// Refuse a new ticket while `active` (an `OPEN` or `PENDING` ticket for the
/// same client and card) exists.
pub fn check_no_active(card_type: CardType, active: Option<i64>) -> Result<(), Rejection> {
  match active {
    Some(ticket_id) => Err(Rejection::DuplicateActiveTicket { card_type, ticket_id }),
    None => Ok(()),
  }
}
