use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use clap::Subcommand;
use ctxt_crypto::WorkerHandle;
use tracing::info;

use crate::config::Config;
use crate::output;

#[derive(Subcommand)]
pub enum Command {
    /// Generate this device's key pair, bound to its own phone number.
    Init { number: String },
    /// Show this device's number and key fingerprint.
    Whoami,
    /// List stored contacts.
    Contacts,
    /// Store a contact's public key from a SubjectPublicKeyInfo DER file.
    Add { number: String, key_file: PathBuf },
    /// Print this device's key share, base64.
    Export,
    /// Store the contact carried by a base64 key share.
    Import { share: String },
    /// Show the key fingerprint stored for a number.
    Fingerprint { number: String },
    /// Encrypt a message for a contact and print the SMS body.
    Seal { number: String, message: String },
    /// Decrypt an SMS body sealed for this device.
    Open { body: String },
}

const NO_KEY_HINT: &str = "no key pair on this device; run `ctxt init <number>` first";

pub async fn run(command: Command, handle: &WorkerHandle, config: &Config, json: bool) -> Result<()> {
    match command {
        Command::Init { number } => {
            handle
                .generate_key_pair_within(number, config.keygen_timeout)
                .recv()
                .await?;
            let record = handle.share_key().recv().await?.ok_or_else(|| anyhow!(NO_KEY_HINT))?;
            info!(number = %record.number, "Device key ready");
            output::print_record(&record, json);
        }
        Command::Whoami => {
            let record = handle.share_key().recv().await?.ok_or_else(|| anyhow!(NO_KEY_HINT))?;
            output::print_record(&record, json);
        }
        Command::Contacts => {
            let mut records = Vec::new();
            for number in handle.enumerate_keys().recv().await? {
                if let Some(record) = handle.fetch_key(number.as_str()).recv().await? {
                    records.push(record);
                }
            }
            output::print_records(&records, json);
        }
        Command::Add { number, key_file } => {
            let der = tokio::fs::read(&key_file)
                .await
                .with_context(|| format!("reading {}", key_file.display()))?;
            let record = handle.new_key(number, der).recv().await?;
            output::print_record(&record, json);
        }
        Command::Export => {
            let payload = handle.export_share().recv().await?.ok_or_else(|| anyhow!(NO_KEY_HINT))?;
            output::print_field("share", &STANDARD.encode(payload), json);
        }
        Command::Import { share } => {
            let payload = STANDARD
                .decode(share.trim())
                .context("share is not valid base64")?;
            let record = handle.import_share(payload).recv().await?;
            output::print_record(&record, json);
        }
        Command::Fingerprint { number } => {
            let record = handle
                .fetch_key(number.as_str())
                .recv()
                .await?
                .ok_or_else(|| anyhow!("no key stored for {number}"))?;
            output::print_record(&record, json);
        }
        Command::Seal { number, message } => {
            let body = handle.seal(number, message.into_bytes()).recv().await?;
            output::print_field("body", &body, json);
        }
        Command::Open { body } => {
            let plaintext = handle.open_message(body).recv().await?;
            output::print_field("plaintext", &String::from_utf8_lossy(&plaintext), json);
        }
    }
    Ok(())
}
