//! Input-shape rules for registration.

use std::sync::OnceLock;

use fraudesk_core::account::NewClient;
use regex::Regex;
use serde::Deserialize;
use validator::{Validate, ValidationError, ValidationErrors};

/// Request body for `POST /register`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegistrationRequest {
  #[validate(custom(function = "validate_rut"))]
  pub rut:          String,
  #[validate(custom(function = "validate_password"))]
  pub password:     String,
  #[validate(custom(function = "validate_full_name"))]
  pub fullname:     String,
  #[validate(custom(function = "validate_not_blank"))]
  pub address:      String,
  #[validate(email(message = "must be a valid email address"))]
  pub email:        String,
  #[validate(custom(function = "validate_account"))]
  pub account:      String,
  #[validate(custom(function = "validate_phone"))]
  pub phone_number: String,
}

impl RegistrationRequest {
  pub fn into_new_client(self, password_hash: String) -> NewClient {
    NewClient {
      rut: self.rut,
      password_hash,
      full_name: self.fullname,
      address: self.address,
      email: self.email,
      account: self.account,
      phone_number: self.phone_number,
    }
  }
}

/// Flatten validation errors into sorted `"field: message"` lines.
pub fn violations(errors: &ValidationErrors) -> Vec<String> {
  let mut out: Vec<String> = errors
    .field_errors()
    .iter()
    .flat_map(|(field, errs)| {
      errs.iter().map(move |e| {
        format!("{field}: {}", e.message.as_deref().unwrap_or("is invalid"))
      })
    })
    .collect();
  out.sort();
  out
}

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
  ValidationError::new(code).with_message(message.into())
}

macro_rules! pattern {
  ($name:ident, $re:literal) => {
    fn $name() -> &'static Regex {
      static RE: OnceLock<Regex> = OnceLock::new();
      RE.get_or_init(|| Regex::new($re).expect("pattern is valid"))
    }
  };
}

pattern!(rut_pattern, r"^(\d{1,8})-?([\dkK])$");
pattern!(name_pattern, r"^[A-Za-z]{4,}( [A-Za-z]+){0,3}$");
pattern!(password_pattern, r"^\d{4}$");
pattern!(account_pattern, r"^\d{8,12}$");
pattern!(phone_pattern, r"^(\+?56)?(\s?)(0?9)(\s?)[9876543]\d{7}$");

/// The modulo-11 check digit for the numeric body of a rut.
pub fn rut_check_digit(body: &str) -> Option<char> {
  let mut sum = 0u32;
  for (i, c) in body.chars().rev().enumerate() {
    let digit = c.to_digit(10)?;
    sum += digit * (2 + (i as u32 % 6));
  }
  Some(match 11 - (sum % 11) {
    11 => '0',
    10 => 'K',
    d => char::from_digit(d, 10)?,
  })
}

pub fn validate_rut(rut: &str) -> Result<(), ValidationError> {
  let caps = rut_pattern()
    .captures(rut)
    .ok_or_else(|| invalid("rut_format", "must be digits followed by a check digit"))?;
  let expected = rut_check_digit(&caps[1]);
  let given = caps[2].chars().next().map(|c| c.to_ascii_uppercase());
  if expected.is_none() || expected != given {
    return Err(invalid("rut_check_digit", "check digit does not match"));
  }
  Ok(())
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
  if !password_pattern().is_match(password) {
    return Err(invalid("password_format", "must be exactly four digits"));
  }
  Ok(())
}

pub fn validate_full_name(name: &str) -> Result<(), ValidationError> {
  if !name_pattern().is_match(name) {
    return Err(invalid(
      "name_format",
      "must be one to four words of letters, the first at least four long",
    ));
  }
  Ok(())
}

pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
  if value.trim().is_empty() {
    return Err(invalid("blank", "must not be blank"));
  }
  Ok(())
}

pub fn validate_account(account: &str) -> Result<(), ValidationError> {
  if !account_pattern().is_match(account) {
    return Err(invalid("account_format", "must be 8 to 12 digits"));
  }
  Ok(())
}

pub fn validate_phone(phone: &str) -> Result<(), ValidationError> {
  if !phone_pattern().is_match(phone) {
    return Err(invalid("phone_format", "must be a Chilean mobile number"));
  }
  Ok(())
}
