//! Provider payload

use std::collections::BTreeMap;

/// A single payload field value
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldValue {
    /// A text value
    Text(String),

    /// A list of values, sent as a repeated field
    List(Vec<String>),

    /// A yes/no option
    Flag(bool),
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(value: Vec<String>) -> Self {
        FieldValue::List(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Flag(value)
    }
}

/// The field mapping sent to the provider, keyed by the provider's form-field
/// names (`from`, `to`, `h:Reply-To`, `o:testmode`, ...)
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Payload {
    fields: BTreeMap<String, FieldValue>,
}

impl Payload {
    /// Create an empty payload
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, replacing any previous value
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> &mut Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Get a field
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Get a text field
    pub fn text(&self, name: &str) -> Option<&str> {
        match self.fields.get(name) {
            Some(FieldValue::Text(value)) => Some(value),
            _ => None,
        }
    }

    /// Whether the field is set
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the payload has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate over fields in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Flattens the payload into form pairs.
    ///
    /// Flags become `yes`/`no` and every list item becomes its own pair.
    pub fn form_fields(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::with_capacity(self.fields.len());

        for (name, value) in &self.fields {
            match value {
                FieldValue::Text(text) => pairs.push((name.clone(), text.clone())),
                FieldValue::Flag(flag) => {
                    pairs.push((name.clone(), if *flag { "yes" } else { "no" }.to_string()))
                }
                FieldValue::List(items) => {
                    pairs.extend(items.iter().map(|item| (name.clone(), item.clone())))
                }
            }
        }

        pairs
    }
}

impl<K, V> FromIterator<(K, V)> for Payload
where
    K: Into<String>,
    V: Into<FieldValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_fields() {
        let payload: Payload = [
            ("subject", FieldValue::from("Hello")),
            ("o:testmode", FieldValue::from(true)),
            ("o:require-tls", FieldValue::from(false)),
            (
                "o:tag",
                FieldValue::from(vec!["a".to_string(), "b".to_string()]),
            ),
        ]
        .into_iter()
        .collect();

        assert_eq!(
            payload.form_fields(),
            vec![
                ("o:require-tls".to_string(), "no".to_string()),
                ("o:tag".to_string(), "a".to_string()),
                ("o:tag".to_string(), "b".to_string()),
                ("o:testmode".to_string(), "yes".to_string()),
                ("subject".to_string(), "Hello".to_string()),
            ]
        );
    }

    #[test]
    fn test_insert_replaces_value() {
        let mut payload = Payload::new();

        payload.insert("subject", "One").insert("subject", "Two");

        assert_eq!(payload.len(), 1);
        assert_eq!(payload.text("subject"), Some("Two"));
        assert!(payload.contains("subject"));
        assert!(!payload.contains("to"));
    }

    #[test]
    fn test_text_ignores_other_kinds() {
        let mut payload = Payload::new();

        payload.insert("o:testmode", true);

        assert_eq!(payload.text("o:testmode"), None);
        assert_eq!(payload.get("o:testmode"), Some(&FieldValue::Flag(true)));
    }
}
