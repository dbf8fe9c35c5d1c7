//! Email Address

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref ADDRESS_BREAKING_SYMBOLS: Regex = Regex::new(r"[<>,]").unwrap();
    static ref NAME_BREAKING_SYMBOLS: Regex = Regex::new(r"[<>,@]").unwrap();
}

use std::fmt;

use thiserror::Error;

use EmailAddressError::*;

/// An error that can occur when creating an email address
#[derive(Debug, Error)]
pub enum EmailAddressError {
    /// The email address is empty
    #[error("email is empty")]
    EmptyEmailAddress,
}

/// An email address
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Create a new email address
    pub fn new(raw: &str) -> Result<Self, EmailAddressError> {
        let trimmed = raw.trim();

        if trimmed.is_empty() {
            return Err(EmptyEmailAddress);
        }

        Ok(Self(trimmed.to_string()))
    }

    /// Borrow the address as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<EmailAddress> for String {
    fn from(email: EmailAddress) -> Self {
        email.0
    }
}

/// Formats an address for the `to`, `from` and `h:Reply-To` fields.
///
/// Produces `Name <email>` when a non-empty name is given, otherwise the bare
/// address. `<`, `>` and `,` are removed from both parts, and `@` is also
/// removed from the name. A display name such as
/// `"no1@example.com, Not Okay <no2@example.com>, Sherbert"` would otherwise be
/// split by the provider into several addresses, exposing the other
/// recipients of the same `to` list.
pub fn format_email_string(email: &str, name: Option<&str>) -> String {
    let email = ADDRESS_BREAKING_SYMBOLS.replace_all(email, "");

    match name.filter(|name| !name.is_empty()) {
        Some(name) => format!("{} <{}>", NAME_BREAKING_SYMBOLS.replace_all(name, ""), email),
        None => email.into_owned(),
    }
}
