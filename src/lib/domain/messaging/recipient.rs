//! Recipient model

use serde_json::Value;

use super::{template::escape_variables, EmailAddress, EmailAddressError};

/// Recipient variables, keyed by name
pub type Variables = serde_json::Map<String, Value>;

/// A message recipient and the variables available to its templates
#[derive(Clone, Debug, PartialEq)]
pub struct Recipient {
    /// Recipient email address
    email: EmailAddress,

    /// Recipient variables, always including `email`
    variables: Variables,
}

impl Recipient {
    /// Creates a new recipient.
    ///
    /// `email` is stored as a variable after the given `variables`, so an
    /// `email` key passed by the caller is overwritten.
    pub fn new(email: &str, variables: Variables) -> Result<Self, EmailAddressError> {
        let email = EmailAddress::new(email)?;

        let mut variables = variables;
        variables.insert("email".to_string(), Value::String(email.to_string()));

        Ok(Self { email, variables })
    }

    /// Get the recipient's email address
    pub fn email(&self) -> &EmailAddress {
        &self.email
    }

    /// Get a single variable, if set
    pub fn variable(&self, key: &str) -> Option<&Value> {
        self.variables.get(key)
    }

    /// Set a variable, replacing any previous value.
    ///
    /// Overwriting `email` changes the variable only, never the address the
    /// recipient is keyed by.
    pub fn set_variable(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.variables.insert(key.into(), value.into());
        self
    }

    /// Returns a copy of the variables with every string HTML-escaped
    pub fn variables(&self) -> Variables {
        escape_variables(&self.variables)
    }

    /// Returns a copy of the variables as they were set
    pub fn unescaped_variables(&self) -> Variables {
        self.variables.clone()
    }

    /// The `name` variable, when it is a string
    pub(crate) fn name(&self) -> Option<&str> {
        self.variables.get("name").and_then(Value::as_str)
    }
}
