//! Identities, roles, and the role-specific account profiles.
//!
//! An [`Identity`] is the credential record looked up at login. Each identity
//! owns exactly one profile: a [`Client`] (account holder) or a [`Manager`]
//! (caseworker), chosen by its [`Role`].

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::UnknownVariant;

// ─── Role ────────────────────────────────────────────────────────────────────

/// The single role carried by an identity and embedded in its tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
  AccountHolder,
  Caseworker,
}

impl Role {
  pub fn as_str(self) -> &'static str {
    match self {
      Role::AccountHolder => "ACCOUNT_HOLDER",
      Role::Caseworker => "CASEWORKER",
    }
  }
}

impl fmt::Display for Role {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Role {
  type Err = UnknownVariant;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "ACCOUNT_HOLDER" => Ok(Role::AccountHolder),
      "CASEWORKER" => Ok(Role::Caseworker),
      other => Err(UnknownVariant::new("role", other)),
    }
  }
}

// ─── Identity ────────────────────────────────────────────────────────────────

/// Credential record keyed by rut. The secret and role never change after
/// registration.
#[derive(Debug, Clone)]
pub struct Identity {
  pub id:            i64,
  pub rut:           String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
  pub role:          Role,
}

// ─── Profiles ────────────────────────────────────────────────────────────────

/// An account holder: files tickets against their own cards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
  pub id:           i64,
  pub rut:          String,
  #[serde(rename = "fullname")]
  pub full_name:    String,
  pub address:      String,
  pub email:        String,
  pub account:      String,
  pub phone_number: String,
  #[serde(skip)]
  pub identity_id:  i64,
}

/// A caseworker: claims open tickets and closes the ones they hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manager {
  pub id:          i64,
  pub rut:         String,
  #[serde(rename = "fullname")]
  pub full_name:   String,
  pub email:       String,
  pub address:     String,
  #[serde(skip)]
  pub identity_id: i64,
}

/// The profile owned by an identity, resolved once from its [`Role`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Profile {
  Client(Client),
  Manager(Manager),
}

impl Profile {
  pub fn id(&self) -> i64 {
    match self {
      Profile::Client(c) => c.id,
      Profile::Manager(m) => m.id,
    }
  }

  pub fn display_name(&self) -> &str {
    match self {
      Profile::Client(c) => &c.full_name,
      Profile::Manager(m) => &m.full_name,
    }
  }

  pub fn role(&self) -> Role {
    match self {
      Profile::Client(_) => Role::AccountHolder,
      Profile::Manager(_) => Role::Caseworker,
    }
  }
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// Everything needed to register an account holder. The password is already
/// hashed by the time it reaches the store.
#[derive(Debug, Clone)]
pub struct NewClient {
  pub rut:           String,
  pub password_hash: String,
  pub full_name:     String,
  pub address:       String,
  pub email:         String,
  pub account:       String,
  pub phone_number:  String,
}

/// A caseworker account to seed at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct NewManager {
  pub rut:           String,
  pub full_name:     String,
  pub email:         String,
  pub address:       String,
  pub password_hash: String,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn role_text_round_trips() {
    for role in [Role::AccountHolder, Role::Caseworker] {
      assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
    }
    assert!("ROLE_CLIENT".parse::<Role>().is_err());
  }

  #[test]
  fn profile_reports_its_role() {
    let manager = Manager {
      id:          3,
      rut:         "13933875-8".into(),
      full_name:   "Juan Carlos".into(),
      email:       "juan@example.com".into(),
      address:     "Calle 2".into(),
      identity_id: 9,
    };
    let profile = Profile::Manager(manager);
    assert_eq!(profile.role(), Role::Caseworker);
    assert_eq!(profile.id(), 3);
    assert_eq!(profile.display_name(), "Juan Carlos");
  }

  #[test]
  fn client_serialises_without_identity() {
    let client = Client {
      id:           1,
      rut:          "10744718-0".into(),
      full_name:    "Ana Maria".into(),
      address:      "Calle 1".into(),
      email:        "ana@example.com".into(),
      account:      "12345678".into(),
      phone_number: "+56912345678".into(),
      identity_id:  4,
    };
    let json = serde_json::to_value(&client).unwrap();
    assert_eq!(json["fullname"], "Ana Maria");
    assert!(json.get("identity_id").is_none());
  }
}
