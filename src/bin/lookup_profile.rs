//! One-shot profile lookup from the command line.
//!
//! Usage: `lookup_profile <handle> [--report]`
//!
//! Prints the merged profile as JSON, or as the plain-text report with
//! `--report`. Uses the same environment configuration as the server.

use rust_kyc_api::config::Config;
use rust_kyc_api::enrichment::ProfileAggregator;
use rust_kyc_api::obs;
use rust_kyc_api::report::format_profile_report;
use std::env;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    obs::init_tracing("rust_kyc_api=info");

    let mut handle = None;
    let mut as_report = false;
    for arg in env::args().skip(1) {
        match arg.as_str() {
            "--report" => as_report = true,
            _ if handle.is_none() => handle = Some(arg),
            _ => anyhow::bail!("Unexpected argument: {}", arg),
        }
    }
    let handle = handle.ok_or_else(|| anyhow::anyhow!("Usage: lookup_profile <handle> [--report]"))?;

    let config = Config::from_env()?;
    let aggregator = ProfileAggregator::new(&config)?;
    let record = aggregator.fetch_client_profile(&handle).await?;

    if as_report {
        print!("{}", format_profile_report(&record));
    } else {
        println!("{}", serde_json::to_string_pretty(&record)?);
    }

    Ok(())
}
