//! Infrastructure layer: concrete provider clients

pub mod mailgun;
