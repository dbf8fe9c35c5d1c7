//! Batch message builder
//!
//! A [`BatchMessage`] sends one message to any number of recipients. With a
//! single recipient its variables are substituted into the bodies locally;
//! with several, the bodies are sent as templates together with a
//! `recipient-variables` field and the provider personalises each copy.
//!
//! A message is a plain owned value. It is not meant to be shared between
//! tasks; build one per logical message.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use tracing::{debug, info};

use super::{
    format_email_string, replace_recipient_variables, EmailAddressError, MessageError, Payload,
    Recipient, SendError, SendResponse, Sender, Variables,
};

const RFC2822_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %z";

/// An address with an optional display name
#[derive(Clone, Debug, PartialEq, Eq)]
struct Mailbox {
    email: String,
    name: Option<String>,
}

impl Mailbox {
    fn new(email: impl Into<String>, name: Option<&str>) -> Self {
        Self {
            email: email.into(),
            name: name.map(str::to_string),
        }
    }
}

/// Message builder for one or many recipients
#[derive(Clone, Debug)]
pub struct BatchMessage {
    domain: String,
    from: Option<Mailbox>,
    reply_to: Option<Mailbox>,
    subject: String,
    html: Option<String>,
    text: Option<String>,
    testmode: bool,
    require_tls: bool,
    skip_verification: bool,
    track_opens: Option<bool>,
    delivery_time: Option<String>,
    tags: Vec<String>,
    custom_headers: BTreeMap<String, String>,
    escape_html: bool,
    recipients: BTreeMap<String, Recipient>,
}

impl BatchMessage {
    /// Creates an empty message sent from `domain`
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            from: None,
            reply_to: None,
            subject: String::new(),
            html: None,
            text: None,
            testmode: false,
            require_tls: true,
            skip_verification: false,
            track_opens: None,
            delivery_time: None,
            tags: Vec::new(),
            custom_headers: BTreeMap::new(),
            escape_html: true,
            recipients: BTreeMap::new(),
        }
    }

    /// Sets the domain to send from
    pub fn set_domain(&mut self, domain: impl Into<String>) -> &mut Self {
        self.domain = domain.into();
        self
    }

    /// Gets the domain to send from
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Sets the sender address and optional display name
    pub fn set_from(&mut self, email: impl Into<String>, name: Option<&str>) -> &mut Self {
        self.from = Some(Mailbox::new(email, name));
        self
    }

    /// Gets the sender address, `postmaster@<domain>` unless one was set
    pub fn from_email(&self) -> String {
        match &self.from {
            Some(from) => from.email.clone(),
            None => format!("postmaster@{}", self.domain),
        }
    }

    /// Gets the sender display name
    pub fn from_name(&self) -> Option<&str> {
        self.from.as_ref().and_then(|from| from.name.as_deref())
    }

    /// Gets the formatted `from` field
    pub fn from_string(&self) -> String {
        format_email_string(&self.from_email(), self.from_name())
    }

    /// Sets the `Reply-To` address and optional display name
    pub fn set_reply_to(&mut self, email: impl Into<String>, name: Option<&str>) -> &mut Self {
        self.reply_to = Some(Mailbox::new(email, name));
        self
    }

    /// Gets the `Reply-To` address
    pub fn reply_to_email(&self) -> Option<&str> {
        self.reply_to
            .as_ref()
            .map(|reply_to| reply_to.email.as_str())
            .filter(|email| !email.is_empty())
    }

    /// Gets the `Reply-To` display name
    pub fn reply_to_name(&self) -> Option<&str> {
        self.reply_to
            .as_ref()
            .and_then(|reply_to| reply_to.name.as_deref())
    }

    /// Gets the formatted `Reply-To` header, if an address was set
    pub fn reply_to_string(&self) -> Option<String> {
        self.reply_to_email()
            .map(|email| format_email_string(email, self.reply_to_name()))
    }

    /// Sets the subject
    pub fn set_subject(&mut self, subject: impl Into<String>) -> &mut Self {
        self.subject = subject.into();
        self
    }

    /// Gets the subject
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Sets the HTML body
    pub fn set_html(&mut self, html: impl Into<String>) -> &mut Self {
        self.html = Some(html.into());
        self
    }

    /// Removes the HTML body
    pub fn clear_html(&mut self) -> &mut Self {
        self.html = None;
        self
    }

    /// Gets the HTML body; an empty body reads as unset
    pub fn html(&self) -> Option<&str> {
        self.html.as_deref().filter(|html| !html.is_empty())
    }

    /// Sets the text body
    pub fn set_text(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = Some(text.into());
        self
    }

    /// Removes the text body
    pub fn clear_text(&mut self) -> &mut Self {
        self.text = None;
        self
    }

    /// Gets the text body; an empty body reads as unset
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref().filter(|text| !text.is_empty())
    }

    /// Enables test mode: the provider accepts but does not deliver the message
    pub fn set_testmode(&mut self, testmode: bool) -> &mut Self {
        self.testmode = testmode;
        self
    }

    /// Whether test mode is enabled
    pub fn is_testmode(&self) -> bool {
        self.testmode
    }

    /// Whether delivery requires TLS (default `true`)
    pub fn set_require_tls(&mut self, require_tls: bool) -> &mut Self {
        self.require_tls = require_tls;
        self
    }

    /// Whether delivery requires TLS
    pub fn is_requiring_tls(&self) -> bool {
        self.require_tls
    }

    /// Whether to skip certificate verification when delivering
    pub fn set_skip_verification(&mut self, skip_verification: bool) -> &mut Self {
        self.skip_verification = skip_verification;
        self
    }

    /// Whether certificate verification is skipped
    pub fn is_skipping_verification(&self) -> bool {
        self.skip_verification
    }

    /// Enables or disables open tracking; unset leaves the domain default
    pub fn set_track_opens(&mut self, track_opens: bool) -> &mut Self {
        self.track_opens = Some(track_opens);
        self
    }

    /// Open tracking setting, if one was made
    pub fn tracking_opens(&self) -> Option<bool> {
        self.track_opens
    }

    /// Schedules delivery.
    ///
    /// The value is kept as given and parsed when read. Accepted forms are
    /// RFC 2822, RFC 3339, `YYYY-MM-DD HH:MM:SS` and `YYYY-MM-DD` (both UTC),
    /// unix seconds, and `now`.
    pub fn set_delivery_time(&mut self, timestamp: impl Into<String>) -> &mut Self {
        self.delivery_time = Some(timestamp.into());
        self
    }

    /// Removes the scheduled delivery time
    pub fn clear_delivery_time(&mut self) -> &mut Self {
        self.delivery_time = None;
        self
    }

    /// Gets the delivery time formatted as RFC 2822
    ///
    /// # Errors
    /// [`MessageError::InvalidDeliveryTime`] if the stored value cannot be parsed.
    pub fn delivery_time(&self) -> Result<Option<String>, MessageError> {
        match self.delivery_time.as_deref() {
            None | Some("") => Ok(None),
            Some(raw) => parse_delivery_time(raw)
                .map(|time| Some(time.format(RFC2822_FORMAT).to_string()))
                .ok_or_else(|| MessageError::InvalidDeliveryTime(raw.to_string())),
        }
    }

    /// Replaces the tags
    pub fn set_tags<I, T>(&mut self, tags: I) -> &mut Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Adds a tag
    pub fn add_tag(&mut self, tag: impl Into<String>) -> &mut Self {
        self.tags.push(tag.into());
        self
    }

    /// Gets the tags
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Adds a custom header, replacing one with the same name
    pub fn add_custom_header(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> &mut Self {
        self.custom_headers.insert(name.into(), value.into());
        self
    }

    /// Removes a custom header by name
    pub fn remove_custom_header(&mut self, name: &str) -> &mut Self {
        self.custom_headers.remove(name);
        self
    }

    /// Removes all custom headers
    pub fn remove_custom_headers(&mut self) -> &mut Self {
        self.custom_headers.clear();
        self
    }

    /// Gets a custom header by name
    pub fn custom_header(&self, name: &str) -> Option<&str> {
        self.custom_headers.get(name).map(String::as_str)
    }

    /// Gets all custom headers
    pub fn custom_headers(&self) -> &BTreeMap<String, String> {
        &self.custom_headers
    }

    /// Enables or disables HTML escaping of recipient variables (default on).
    ///
    /// When disabled, variables are inserted into the HTML body and the
    /// `recipient-variables` field verbatim.
    pub fn set_escape_html_in_recipient_variables(&mut self, escape: bool) -> &mut Self {
        self.escape_html = escape;
        self
    }

    /// Whether recipient variables are HTML-escaped
    pub fn is_escaping_html_in_recipient_variables(&self) -> bool {
        self.escape_html
    }

    /// Adds a recipient, replacing any recipient with the same email
    pub fn add_recipient(&mut self, recipient: Recipient) -> &mut Self {
        self.recipients
            .insert(recipient.email().to_string(), recipient);
        self
    }

    /// Builds a recipient from `email` and `variables` and adds it
    pub fn add_new_recipient(
        &mut self,
        email: &str,
        variables: Variables,
    ) -> Result<&mut Self, EmailAddressError> {
        let recipient = Recipient::new(email, variables)?;

        Ok(self.add_recipient(recipient))
    }

    /// Removes a recipient by email
    pub fn remove_recipient(&mut self, email: &str) -> &mut Self {
        self.recipients.remove(email.trim());
        self
    }

    /// Removes all recipients
    pub fn remove_all_recipients(&mut self) -> &mut Self {
        self.recipients.clear();
        self
    }

    /// Gets a recipient by email
    pub fn recipient(&self, email: &str) -> Option<&Recipient> {
        self.recipients.get(email.trim())
    }

    /// Iterates over the recipients
    pub fn recipients(&self) -> impl Iterator<Item = &Recipient> {
        self.recipients.values()
    }

    /// Number of recipients
    pub fn recipient_count(&self) -> usize {
        self.recipients.len()
    }

    fn html_variables(&self, recipient: &Recipient) -> Variables {
        if self.escape_html {
            recipient.variables()
        } else {
            recipient.unescaped_variables()
        }
    }

    /// Flattens the message into the provider's fields.
    ///
    /// # Errors
    /// - [`MessageError::NoBody`] if neither body is set.
    /// - [`MessageError::NoRecipients`] if there are no recipients.
    /// - [`MessageError::NestedRecipientVariable`] if a single recipient has a
    ///   nested variable.
    /// - [`MessageError::InvalidDeliveryTime`] if the delivery time cannot be parsed.
    pub fn assemble(&self) -> Result<Payload, MessageError> {
        let mut html = self.html().map(str::to_string);
        let mut text = self.text().map(str::to_string);

        if html.is_none() && text.is_none() {
            return Err(MessageError::NoBody);
        }

        let mut payload = Payload::new();

        match self.recipient_count() {
            0 => return Err(MessageError::NoRecipients),
            1 => {
                let recipient = self
                    .recipients
                    .values()
                    .next()
                    .ok_or(MessageError::NoRecipients)?;

                if let Some(body) = html.as_mut() {
                    *body = replace_recipient_variables(body, &self.html_variables(recipient))?;
                }

                if let Some(body) = text.as_mut() {
                    *body = replace_recipient_variables(body, &recipient.unescaped_variables())?;
                }
            }
            _ => {
                let variables: BTreeMap<&str, Variables> = self
                    .recipients
                    .iter()
                    .map(|(email, recipient)| (email.as_str(), self.html_variables(recipient)))
                    .collect();

                payload.insert("recipient-variables", serde_json::to_string(&variables)?);
            }
        }

        if let Some(html) = html {
            payload.insert("html", html);
        }

        if let Some(text) = text {
            payload.insert("text", text);
        }

        for (name, value) in &self.custom_headers {
            payload.insert(format!("h:{name}"), value.as_str());
        }

        payload
            .insert("o:testmode", self.testmode)
            .insert("o:require-tls", self.require_tls)
            .insert("o:skip-verification", self.skip_verification);

        if let Some(track_opens) = self.track_opens {
            payload.insert("o:tracking-opens", track_opens);
        }

        if let Some(delivery_time) = self.delivery_time()? {
            payload.insert("o:deliverytime", delivery_time);
        }

        if !self.tags.is_empty() {
            payload.insert("o:tag", self.tags.clone());
        }

        payload
            .insert("subject", self.subject.as_str())
            .insert("from", self.from_string());

        if let Some(reply_to) = self.reply_to_string() {
            payload.insert("h:Reply-To", reply_to);
        }

        let to = self
            .recipients
            .values()
            .map(|recipient| format_email_string(recipient.email().as_str(), recipient.name()))
            .collect::<Vec<_>>()
            .join(", ");

        payload.insert("to", to);

        debug!(
            recipients = self.recipient_count(),
            fields = payload.len(),
            "assembled message payload"
        );

        Ok(payload)
    }

    /// Sends the message through `sender`.
    ///
    /// `payload_override` replaces the assembled payload entirely; it is not
    /// merged with the message's own fields. An empty override is sent as-is
    /// and the message is not assembled. Nothing is retried.
    pub async fn send<S>(
        &self,
        sender: &S,
        payload_override: Option<Payload>,
    ) -> Result<SendResponse, SendError>
    where
        S: Sender + ?Sized,
    {
        let payload = match payload_override {
            Some(payload) => payload,
            None => self.assemble()?,
        };

        info!(domain = %self.domain, recipients = self.recipient_count(), "sending message");

        let response = sender.send(&self.domain, &payload).await?;

        debug!(id = %response.id, status = response.status_code, "message accepted");

        Ok(response)
    }
}

fn parse_delivery_time(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();

    if raw.eq_ignore_ascii_case("now") {
        return Some(Utc::now().fixed_offset());
    }

    if let Ok(time) = DateTime::parse_from_rfc2822(raw) {
        return Some(time);
    }

    if let Ok(time) = DateTime::parse_from_rfc3339(raw) {
        return Some(time);
    }

    if let Ok(time) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(time.and_utc().fixed_offset());
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .map(|time| time.and_utc().fixed_offset());
    }

    raw.parse::<i64>()
        .ok()
        .and_then(|seconds| DateTime::from_timestamp(seconds, 0))
        .map(|time| time.fixed_offset())
}
