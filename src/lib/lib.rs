#![warn(
    missing_debug_implementations,
    rust_2018_idioms,
    missing_docs,
    rustdoc::broken_intra_doc_links,
    rustdoc::missing_crate_level_docs
)]

//! Batch message builder and webhook verification for the Mailgun API

pub mod domain;
pub mod infrastructure;
