//! # Status Subcommand
//!
//! Queries the remote verification status for the configured token.

use std::io::Write;

use anyhow::{Context, Result};
use clap::Args;
use idv_core::{StatusReport, TokenProvider, VerificationError, VerificationGateway};

/// Arguments for `idv status`.
#[derive(Args, Debug, Default)]
pub struct StatusArgs {
    /// Print the status report as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Query and print the status. Unlike the workflow's own status check,
/// a missing token or failed query is an error here.
pub async fn run_status<G, T>(
    args: &StatusArgs,
    gateway: &G,
    tokens: &T,
    out: &mut impl Write,
) -> Result<u8>
where
    G: VerificationGateway,
    T: TokenProvider,
{
    let token = tokens
        .token()
        .await
        .ok_or(VerificationError::CredentialMissing)?;
    let report = gateway
        .query_status(&token)
        .await
        .context("verification status query failed")?;

    if args.json {
        serde_json::to_writer_pretty(&mut *out, &report)?;
        writeln!(out)?;
    } else {
        print_report(&report, out)?;
    }
    Ok(0)
}

fn print_report(report: &StatusReport, out: &mut impl Write) -> std::io::Result<()> {
    writeln!(out, "verified: {}", if report.verified { "yes" } else { "no" })?;
    if let Some(status) = &report.status {
        writeln!(out, "status:   {status}")?;
    }
    if let Some(message) = &report.message {
        writeln!(out, "message:  {message}")?;
    }
    if let Some(date) = &report.verification_date {
        writeln!(out, "date:     {date}")?;
    }
    Ok(())
}
