//! Error types for `fraudesk-core`.

use thiserror::Error;

use crate::ticket::{CardType, TicketStatus, Transition};

/// A business rule refused the requested operation.
///
/// Every rejection is detected before any write is applied, so a rejected
/// operation leaves the store exactly as it found it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
  #[error("a {card_type} ticket is still being processed (ticket {ticket_id})")]
  DuplicateActiveTicket { card_type: CardType, ticket_id: i64 },

  #[error("caseworker already holds {held} pending tickets (limit {limit})")]
  CapacityExceeded { held: u64, limit: u64 },

  #[error("ticket {0} not found")]
  TicketNotFound(i64),

  #[error("ticket {id} is {status}; cannot {transition} it")]
  InvalidTransition {
    id:         i64,
    status:     TicketStatus,
    transition: Transition,
  },

  #[error("ticket {0} is not held by this caseworker")]
  NotOwner(i64),

  #[error("rut already taken")]
  RutTaken,

  #[error("account number already taken")]
  AccountTaken,

  #[error("email already taken")]
  EmailTaken,
}

/// A stored or submitted discriminant did not name a known variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind}: {value:?}")]
pub struct UnknownVariant {
  pub kind:  &'static str,
  pub value: String,
}

impl UnknownVariant {
  pub(crate) fn new(kind: &'static str, value: &str) -> Self {
    Self { kind, value: value.to_owned() }
  }
}
