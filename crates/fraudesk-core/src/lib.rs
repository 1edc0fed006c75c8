//! Core types and trait definitions for the fraudesk ticket desk.
//!
//! This crate is deliberately free of HTTP and database dependencies. It owns
//! the ticket state machine and the rules that guard it; storage backends run
//! those rules inside their own transactions.

// Native `async fn` in traits; the `Send` bounds are spelled out on the
// returned futures instead.
#![allow(async_fn_in_trait)]

pub mod account;
pub mod error;
pub mod store;
pub mod ticket;

pub use error::{Rejection, UnknownVariant};
