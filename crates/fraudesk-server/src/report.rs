//! Plain-text report of the tickets a caseworker has closed.

use std::fmt::Write as _;

use fraudesk_core::ticket::{Ticket, TicketStatus};

const HEADERS: [&str; 6] = [
  "ID",
  "TYPE OF CARD",
  "CLIENT RUT",
  "START DATE",
  "END DATE",
  "DAYS UNTIL CLOSED",
];

/// Aggregate resolution times over a set of closed tickets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
  pub count:        usize,
  /// `None` when there are no tickets to average over.
  pub average_days: Option<i64>,
  pub max_days:     i64,
}

impl Stats {
  pub fn of<'a>(tickets: impl IntoIterator<Item = &'a Ticket>) -> Self {
    let days: Vec<i64> = tickets.into_iter().filter_map(Ticket::days_to_close).collect();
    let count = days.len();
    let total: i64 = days.iter().sum();
    Self {
      count,
      average_days: i64::try_from(count).ok().filter(|&n| n > 0).map(|n| total / n),
      max_days: days.iter().copied().max().unwrap_or(0),
    }
  }
}

/// Render the report for caseworker `name`. Only `CLOSED` tickets are
/// listed, sorted by id.
pub fn render(name: &str, tickets: &[Ticket]) -> String {
  let mut closed: Vec<&Ticket> = tickets
    .iter()
    .filter(|t| t.status == TicketStatus::Closed)
    .collect();
  closed.sort_by_key(|t| t.id);

  let rows: Vec<[String; 6]> = closed
    .iter()
    .map(|t| {
      [
        t.id.to_string(),
        t.card_type.to_string(),
        t.client.rut.clone(),
        t.start_date.to_string(),
        t.end_date.map(|d| d.to_string()).unwrap_or_default(),
        t.days_to_close().unwrap_or(0).to_string(),
      ]
    })
    .collect();

  let mut widths = HEADERS.map(str::len);
  for row in &rows {
    for (w, cell) in widths.iter_mut().zip(row) {
      *w = (*w).max(cell.len());
    }
  }

  let mut out = String::new();
  let _ = writeln!(out, "REPORT OF CLOSED TICKETS OF {}", name.to_uppercase());
  out.push('\n');
  push_row(&mut out, &widths, HEADERS.iter().copied());
  push_row(&mut out, &widths, widths.iter().map(|&w| "-".repeat(w)));
  for row in &rows {
    push_row(&mut out, &widths, row.iter());
  }
  out.push('\n');

  let stats = Stats::of(closed.iter().copied());
  let average = stats
    .average_days
    .map_or_else(|| "n/a".to_owned(), |d| d.to_string());
  let _ = writeln!(out, "Number of tickets: {}", stats.count);
  let _ = writeln!(out, "Average days taken to resolve: {average}");
  let _ = writeln!(out, "Maximum days taken to resolve: {}", stats.max_days);
  out
}

fn push_row<T: AsRef<str>>(out: &mut String, widths: &[usize; 6], cells: impl Iterator<Item = T>) {
  let line = cells
    .zip(widths)
    .map(|(cell, &w)| format!("{:<w$}", cell.as_ref()))
    .collect::<Vec<_>>()
    .join("  ");
  out.push_str(line.trim_end());
  out.push('\n');
}
