//! Route-level access policy, declared once for the whole router.
//!
//! Rules are matched in order against the request method and path; the first
//! match decides. Patterns are either exact paths or a prefix ending in
//! `/**`, which matches the prefix itself and everything beneath it.

use std::sync::Arc;

use axum::{
  extract::{Request, State},
  http::Method,
  middleware::Next,
  response::{IntoResponse, Response},
};
use fraudesk_core::account::Role;

use crate::{auth::Caller, error::ApiError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
  Public,
  Authenticated,
  Only(Role),
}

#[derive(Debug, Clone)]
struct Rule {
  /// `None` matches every method.
  method:  Option<Method>,
  pattern: &'static str,
  access:  Access,
}

#[derive(Debug, Clone)]
pub struct RoutePolicy {
  rules:    Vec<Rule>,
  fallback: Access,
}

impl RoutePolicy {
  /// The desk's route table.
  pub fn standard() -> Self {
    use Access::*;
    use Role::*;

    Self::new(Authenticated)
      .rule(None, "/register/**", Public)
      .rule(Some(Method::POST), "/login", Public)
      .rule(Some(Method::GET), "/managers/**", Only(Caseworker))
      .rule(Some(Method::GET), "/tickets/mine", Only(AccountHolder))
      .rule(Some(Method::GET), "/tickets/**", Only(Caseworker))
      .rule(Some(Method::POST), "/tickets", Only(AccountHolder))
      .rule(Some(Method::POST), "/tickets/**", Only(Caseworker))
      .rule(Some(Method::GET), "/clients/**", Only(Caseworker))
  }

  pub fn new(fallback: Access) -> Self { Self { rules: Vec::new(), fallback } }

  pub fn rule(mut self, method: Option<Method>, pattern: &'static str, access: Access) -> Self {
    self.rules.push(Rule { method, pattern, access });
    self
  }

  pub fn access(&self, method: &Method, path: &str) -> Access {
    self
      .rules
      .iter()
      .find(|r| r.method.as_ref().is_none_or(|m| m == method) && matches(r.pattern, path))
      .map_or(self.fallback, |r| r.access)
  }

  /// Decide whether `caller` may make this request.
  pub fn check(&self, method: &Method, path: &str, caller: Option<&Caller>) -> Result<(), ApiError> {
    match (self.access(method, path), caller) {
      (Access::Public, _) => Ok(()),
      (_, None) => Err(ApiError::Unauthenticated),
      (Access::Authenticated, Some(_)) => Ok(()),
      (Access::Only(role), Some(c)) if c.role == role => Ok(()),
      (Access::Only(_), Some(_)) => Err(ApiError::Forbidden),
    }
  }
}

fn matches(pattern: &str, path: &str) -> bool {
  match pattern.strip_suffix("/**") {
    Some(prefix) => path
      .strip_prefix(prefix)
      .is_some_and(|rest| rest.is_empty() || rest.starts_with('/')),
    None => path == pattern,
  }
}

/// Middleware applying `policy` to every request that reaches it.
pub async fn enforce(State(policy): State<Arc<RoutePolicy>>, req: Request, next: Next) -> Response {
  let verdict = policy.check(req.method(), req.uri().path(), req.extensions().get::<Caller>());
  match verdict {
    Ok(()) => next.run(req).await,
    Err(e) => {
      tracing::debug!(method = %req.method(), path = req.uri().path(), error = %e, "route policy refused");
      e.into_response()
    }
  }
}
