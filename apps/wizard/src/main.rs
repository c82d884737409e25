use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Result;
use clap::Parser;
use onboarding::{
    catalog::split_catalog_response, CategoryMinimums, OnboardingSession, SponsorshipClient,
    SubmissionSink, SyncPolicy,
};
use shared::domain::CauseId;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod plan;

#[derive(Parser, Debug)]
struct Args {
    #[arg(long, default_value = "http://127.0.0.1:8443")]
    server_url: String,
    /// TOML file answering each wizard step.
    #[arg(long)]
    plan: PathBuf,
    /// Print the submission instead of sending it.
    #[arg(long)]
    dry_run: bool,
    #[arg(long, default_value_t = onboarding::config::DEFAULT_RESCALE_DEADBAND)]
    rescale_deadband: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let args = Args::parse();
    let plan = plan::load_plan(&args.plan)?;

    let client = SponsorshipClient::new(&args.server_url)?;
    let (catalog, defaults) = split_catalog_response(client.fetch_location_catalog().await?);
    info!(locations = catalog.len(), "location catalog loaded");

    let mut session = OnboardingSession::new(
        catalog,
        CategoryMinimums::from_defaults(&defaults),
        SyncPolicy {
            rescale_deadband: args.rescale_deadband,
        },
    );
    if let Some(cause_id) = plan.cause_id {
        session = session.with_cause(CauseId(cause_id));
        session.prefetch_cause(Arc::new(client.clone()));
    }

    plan::apply_plan(&mut session, &plan)?;

    for _ in 0..20 {
        if plan.cause_id.is_none() || session.poll_cause_prefetch() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    if let Some(cause) = session.cause() {
        println!(
            "Cause: {} ({} of {} totes sponsored)",
            cause.title, cause.sponsored_totes, cause.target_totes
        );
    }

    let submission = session.submission()?;
    println!(
        "{} totes, {} distribution points",
        submission.tote_quantity,
        submission.distribution_points.len()
    );

    if args.dry_run {
        println!("{}", serde_json::to_string_pretty(&submission)?);
        return Ok(());
    }

    let receipt = client.submit(&submission).await?;
    println!(
        "Submitted sponsorship_id={} status={}",
        receipt.sponsorship_id.0,
        receipt.status.as_str()
    );
    Ok(())
}
