//! Recipient variable templating

use serde_json::Value;

use super::{MessageError, Variables};

/// Escapes `&`, `<`, `>`, `"` and `'` as HTML entities.
pub fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#039;")
}

/// Returns a copy of `value` with every string leaf HTML-escaped
pub(crate) fn escape_value(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(escape_html(s)),
        Value::Array(items) => Value::Array(items.iter().map(escape_value).collect()),
        Value::Object(map) => Value::Object(escape_variables(map)),
        other => other.clone(),
    }
}

pub(crate) fn escape_variables(variables: &Variables) -> Variables {
    variables
        .iter()
        .map(|(key, value)| (key.clone(), escape_value(value)))
        .collect()
}

/// Replaces every `%recipient.<key>%` in `body` with the value of `key`.
///
/// Replacement is literal. Strings are inserted as-is, numbers and booleans
/// in their JSON form and `null` as an empty string.
///
/// # Errors
/// [`MessageError::NestedRecipientVariable`] if any value is a map or a list.
pub fn replace_recipient_variables(
    body: &str,
    variables: &Variables,
) -> Result<String, MessageError> {
    if let Some((key, _)) = variables
        .iter()
        .find(|(_, value)| value.is_object() || value.is_array())
    {
        return Err(MessageError::NestedRecipientVariable(key.clone()));
    }

    let mut rendered = body.to_string();

    for (key, value) in variables {
        let text = match value {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        };

        rendered = rendered.replace(&format!("%recipient.{key}%"), &text);
    }

    Ok(rendered)
}
