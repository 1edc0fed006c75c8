//! Closure notifications and their best-effort delivery.
//!
//! The ticket desk never talks to a mail server itself: it drops each
//! [`Notification`] on an unbounded outbox and returns. A background task
//! drains the outbox into a [`Mailer`]; delivery failures are logged and go
//! no further.

use std::{convert::Infallible, future::Future};

use fraudesk_core::ticket::Ticket;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
  pub to:      String,
  pub from:    String,
  pub subject: String,
  pub body:    String,
}

impl Notification {
  /// Tell the filing client that `ticket` has been closed.
  pub fn ticket_closed(ticket: &Ticket, from: &str) -> Self {
    let manager = ticket
      .manager
      .as_ref()
      .map_or("a caseworker", |m| m.full_name.as_str());
    Self {
      to:      ticket.client.email.clone(),
      from:    from.to_owned(),
      subject: "Your ticket has been closed".into(),
      body:    format!(
        "Congratulations {}: the ticket with id {} associated with your {} card has been \
         closed by the manager {}.",
        ticket.client.full_name, ticket.id, ticket.card_type, manager,
      ),
    }
  }
}

pub type Outbox = mpsc::UnboundedSender<Notification>;

pub fn outbox() -> (Outbox, mpsc::UnboundedReceiver<Notification>) { mpsc::unbounded_channel() }

/// Something that can deliver a notification.
pub trait Mailer: Send + Sync + 'static {
  type Error: std::error::Error + Send + Sync + 'static;

  fn send(&self, notification: &Notification) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

/// Records each notification in the log instead of sending it.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

impl Mailer for LogMailer {
  type Error = Infallible;

  async fn send(&self, n: &Notification) -> Result<(), Infallible> {
    tracing::info!(to = %n.to, from = %n.from, subject = %n.subject, body = %n.body, "mail");
    Ok(())
  }
}

/// Drain `rx` into `mailer` until every sender is dropped.
pub async fn run_delivery<M: Mailer>(mailer: M, mut rx: mpsc::UnboundedReceiver<Notification>) {
  while let Some(notification) = rx.recv().await {
    if let Err(e) = mailer.send(&notification).await {
      tracing::warn!(to = %notification.to, error = %e, "notification delivery failed");
    }
  }
  tracing::debug!("notification outbox closed");
}
