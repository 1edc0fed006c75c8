//! HTTP handlers, one module per resource.

pub mod clients;
pub mod managers;
pub mod register;
pub mod tickets;
