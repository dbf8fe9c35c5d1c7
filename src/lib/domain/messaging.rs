//! Messaging module.

mod batch_message;
mod email_address;
mod errors;
mod payload;
mod recipient;
mod sender;
mod template;

pub use batch_message::BatchMessage;
pub use email_address::{format_email_string, EmailAddress, EmailAddressError};
pub use errors::{MessageError, SendError, TransportError};
pub use payload::{FieldValue, Payload};
pub use recipient::{Recipient, Variables};
pub use sender::{SendResponse, Sender};
pub use template::{escape_html, replace_recipient_variables};
