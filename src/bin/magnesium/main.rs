#![warn(
    missing_debug_implementations,
    rust_2018_idioms,
    missing_docs,
    rustdoc::broken_intra_doc_links,
    rustdoc::missing_crate_level_docs
)]

//! Command-line client: send batch messages and verify webhook signatures

use std::{process::ExitCode, time::Duration};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use magnesium::{
    domain::{
        messaging::{BatchMessage, Variables},
        webhooks::WebhookValidator,
    },
    infrastructure::mailgun::{MailgunClient, MailgunConfig},
};
use serde_json::Value;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Command-line arguments / environment variables
#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Args {
    /// The command to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Send a message to one or more recipients
    Send(SendArgs),

    /// Check a webhook signature; exits with status 1 when it is invalid
    VerifyWebhook(VerifyWebhookArgs),
}

/// Arguments of the `send` command
#[derive(Debug, clap::Args)]
pub struct SendArgs {
    /// The Mailgun configuration
    #[clap(flatten)]
    pub mailgun: MailgunConfig,

    /// Sender address, `postmaster@<domain>` by default
    #[arg(long)]
    pub from: Option<String>,

    /// Sender display name
    #[arg(long)]
    pub from_name: Option<String>,

    /// Reply-To address
    #[arg(long)]
    pub reply_to: Option<String>,

    /// Reply-To display name
    #[arg(long)]
    pub reply_to_name: Option<String>,

    /// Subject
    #[arg(long, default_value = "")]
    pub subject: String,

    /// HTML body, may contain `%recipient.<key>%` placeholders
    #[arg(long)]
    pub html: Option<String>,

    /// Text body, may contain `%recipient.<key>%` placeholders
    #[arg(long)]
    pub text: Option<String>,

    /// Recipient address, repeat for several recipients
    #[arg(long = "to", required = true)]
    pub to: Vec<String>,

    /// JSON object mapping recipient addresses to their variables
    #[arg(long)]
    pub recipient_variables: Option<String>,

    /// Tag, repeat for several tags
    #[arg(long = "tag")]
    pub tags: Vec<String>,

    /// Custom header as `Name: value`, repeat for several headers
    #[arg(long = "header", value_parser = parse_header)]
    pub headers: Vec<(String, String)>,

    /// Accept the message without delivering it
    #[arg(long)]
    pub testmode: bool,

    /// Allow delivery without TLS
    #[arg(long)]
    pub no_require_tls: bool,

    /// Skip certificate verification on delivery
    #[arg(long)]
    pub skip_verification: bool,

    /// Enable or disable open tracking
    #[arg(long)]
    pub track_opens: Option<bool>,

    /// Scheduled delivery time (RFC 2822, RFC 3339, `YYYY-MM-DD HH:MM:SS`, unix seconds)
    #[arg(long)]
    pub deliverytime: Option<String>,
}

/// Arguments of the `verify-webhook` command
#[derive(Debug, clap::Args)]
pub struct VerifyWebhookArgs {
    /// The webhook signing key
    #[arg(long, env = "MAILGUN_WEBHOOK_SIGNING_KEY", hide_env_values = true)]
    pub signing_key: String,

    /// The webhook `timestamp` field
    #[arg(long)]
    pub timestamp: String,

    /// The webhook `token` field
    #[arg(long)]
    pub token: String,

    /// The webhook `signature` field
    #[arg(long)]
    pub signature: String,

    /// Reject webhooks older or newer than this many seconds
    #[arg(long)]
    pub max_age: Option<u64>,
}

fn parse_header(raw: &str) -> Result<(String, String)> {
    let Some((name, value)) = raw.split_once(':') else {
        bail!("header must look like `Name: value`");
    };

    let name = name.trim();

    if name.is_empty() {
        bail!("header name is empty");
    }

    Ok((name.to_string(), value.trim().to_string()))
}

fn build_message(domain: &str, args: &SendArgs) -> Result<BatchMessage> {
    let variables = match &args.recipient_variables {
        Some(raw) => serde_json::from_str::<Variables>(raw)
            .context("recipient variables must be a JSON object")?,
        None => Variables::new(),
    };

    let mut message = BatchMessage::new(domain);

    if let Some(from) = &args.from {
        message.set_from(from.as_str(), args.from_name.as_deref());
    }

    if let Some(reply_to) = &args.reply_to {
        message.set_reply_to(reply_to.as_str(), args.reply_to_name.as_deref());
    }

    if let Some(html) = &args.html {
        message.set_html(html.as_str());
    }

    if let Some(text) = &args.text {
        message.set_text(text.as_str());
    }

    if let Some(track_opens) = args.track_opens {
        message.set_track_opens(track_opens);
    }

    if let Some(deliverytime) = &args.deliverytime {
        message.set_delivery_time(deliverytime.as_str());
    }

    message
        .set_subject(args.subject.as_str())
        .set_tags(args.tags.iter().cloned())
        .set_testmode(args.testmode)
        .set_require_tls(!args.no_require_tls)
        .set_skip_verification(args.skip_verification);

    for (name, value) in &args.headers {
        message.add_custom_header(name.as_str(), value.as_str());
    }

    for email in &args.to {
        let recipient_variables = match variables.get(email.trim()) {
            Some(Value::Object(map)) => map.clone(),
            Some(_) => bail!("variables for {email} must be a JSON object"),
            None => Variables::new(),
        };

        message.add_new_recipient(email, recipient_variables)?;
    }

    Ok(message)
}

#[mutants::skip]
async fn send(args: SendArgs) -> Result<()> {
    let client = MailgunClient::new(args.mailgun.clone())?;
    let message = build_message(client.domain(), &args)?;

    let response = message.send(&client, None).await?;

    info!(id = %response.id, "message queued");
    println!("{}", serde_json::to_string_pretty(&response)?);

    Ok(())
}

fn verify_webhook(args: &VerifyWebhookArgs) -> bool {
    let mut validator = WebhookValidator::new(args.signing_key.as_str());

    if let Some(max_age) = args.max_age {
        validator = validator.with_max_age(Duration::from_secs(max_age));
    }

    validator.validate(&args.timestamp, &args.token, &args.signature)
}

#[mutants::skip]
#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    match args.command {
        Command::Send(args) => {
            send(args).await?;

            Ok(ExitCode::SUCCESS)
        }
        Command::VerifyWebhook(args) => {
            if verify_webhook(&args) {
                println!("valid");

                Ok(ExitCode::SUCCESS)
            } else {
                println!("invalid");

                Ok(ExitCode::FAILURE)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    fn send_args(extra: &[&str]) -> SendArgs {
        let mut argv = vec![
            "magnesium",
            "send",
            "--api-key",
            "key-test",
            "--domain",
            "mg.example.com",
        ];
        argv.extend_from_slice(extra);

        match Args::parse_from(argv).command {
            Command::Send(args) => args,
            Command::VerifyWebhook(_) => panic!("expected the send command"),
        }
    }

    #[test]
    fn test_parse_header() -> TestResult {
        assert_eq!(
            parse_header("X-Campaign: spring")?,
            ("X-Campaign".to_string(), "spring".to_string())
        );
        assert!(parse_header("no colon").is_err());
        assert!(parse_header(": value").is_err());

        Ok(())
    }

    #[test]
    fn test_build_message() -> TestResult {
        let args = send_args(&[
            "--from",
            "john.dee@example.com",
            "--from-name",
            "John Dee",
            "--subject",
            "Hello",
            "--text",
            "Hi %recipient.name%",
            "--to",
            "ann@example.com",
            "--to",
            "bob@example.com",
            "--recipient-variables",
            r#"{"ann@example.com": {"name": "Ann"}}"#,
            "--tag",
            "welcome",
            "--header",
            "X-Campaign: spring",
            "--testmode",
        ]);

        let message = build_message("mg.example.com", &args)?;

        assert_eq!(message.recipient_count(), 2);
        assert_eq!(message.from_string(), "John Dee <john.dee@example.com>");
        assert_eq!(message.tags(), ["welcome"]);
        assert_eq!(message.custom_header("X-Campaign"), Some("spring"));
        assert!(message.is_testmode());
        assert!(message.is_requiring_tls());

        let payload = message.assemble()?;

        assert_eq!(payload.text("text"), Some("Hi %recipient.name%"));
        assert_eq!(
            payload.text("to"),
            Some("Ann <ann@example.com>, bob@example.com")
        );

        Ok(())
    }

    #[test]
    fn test_build_message_rejects_non_object_variables() {
        let args = send_args(&[
            "--text",
            "Hi",
            "--to",
            "ann@example.com",
            "--recipient-variables",
            r#"{"ann@example.com": "Ann"}"#,
        ]);

        assert!(build_message("mg.example.com", &args).is_err());
    }

    #[test]
    fn test_verify_webhook() -> TestResult {
        let signature = WebhookValidator::new("key-test").sign("1403645220", "token")?;

        let args = VerifyWebhookArgs {
            signing_key: "key-test".to_string(),
            timestamp: "1403645220".to_string(),
            token: "token".to_string(),
            signature,
            max_age: None,
        };

        assert!(verify_webhook(&args));
        assert!(!verify_webhook(&VerifyWebhookArgs {
            max_age: Some(15),
            ..args
        }));

        Ok(())
    }
}
