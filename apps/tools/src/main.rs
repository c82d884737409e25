use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use server_api::{get_sponsorship, moderate_sponsorship, ApiContext};
use shared::domain::{LocationCategory, SponsorshipId, SponsorshipStatus};
use storage::Storage;
use tracing_subscriber::EnvFilter;

mod seed;

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value = "sqlite://./data/server.db")]
    database_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load category defaults, causes and locations from a TOML file.
    SeedCatalog {
        #[arg(long)]
        file: PathBuf,
    },
    CreateCause {
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        image_url: Option<String>,
        #[arg(long, default_value_t = 0)]
        target_totes: u32,
    },
    SetCategoryDefault {
        category: String,
        totes: u32,
    },
    ListSponsorships {
        #[arg(long)]
        status: Option<String>,
    },
    /// Print one sponsorship with its distribution points.
    ShowSponsorship {
        sponsorship_id: i64,
    },
    Moderate {
        sponsorship_id: i64,
        status: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let storage = Storage::new(&cli.database_url).await?;

    match cli.command {
        Command::SeedCatalog { file } => {
            let seed = seed::load_seed(&file)?;
            let report = seed::apply_seed(&storage, &seed).await?;
            println!(
                "seeded defaults={} causes={} locations={}",
                report.defaults, report.causes, report.locations
            );
        }
        Command::CreateCause {
            title,
            description,
            image_url,
            target_totes,
        } => {
            let cause_id = storage
                .create_cause(&title, &description, image_url.as_deref(), target_totes)
                .await?;
            println!("created cause_id={}", cause_id.0);
        }
        Command::SetCategoryDefault { category, totes } => {
            let category = category.parse::<LocationCategory>()?;
            storage.set_category_default(category, totes).await?;
            println!("set {category} default={totes}");
        }
        Command::ListSponsorships { status } => {
            let status = status
                .map(|raw| raw.parse::<SponsorshipStatus>())
                .transpose()?;
            for s in storage.list_sponsorships(status).await? {
                println!(
                    "{}\t{}\t{}\t{}\t{} totes\t{} points\t{}",
                    s.sponsorship_id.0,
                    s.status.as_str(),
                    s.organization_name,
                    s.distribution_type.as_str(),
                    s.tote_quantity,
                    s.point_count,
                    s.created_at.to_rfc3339()
                );
            }
        }
        Command::ShowSponsorship { sponsorship_id } => {
            let ctx = ApiContext {
                storage,
                rescale_deadband: 0,
            };
            let detail = get_sponsorship(&ctx, SponsorshipId(sponsorship_id)).await?;
            let s = &detail.sponsorship;
            println!(
                "{}\t{}\t{}\t{} totes",
                s.sponsorship_id.0,
                s.status.as_str(),
                s.organization_name,
                s.tote_quantity
            );
            for point in &detail.distribution_points {
                println!(
                    "  {}\t{}\t{}\t{}\t{} totes",
                    point.location, point.category, point.name, point.point_id, point.totes_count
                );
            }
        }
        Command::Moderate {
            sponsorship_id,
            status,
        } => {
            let status = status.parse::<SponsorshipStatus>()?;
            let ctx = ApiContext {
                storage,
                rescale_deadband: 0,
            };
            moderate_sponsorship(&ctx, SponsorshipId(sponsorship_id), status).await?;
            println!("sponsorship_id={sponsorship_id} is now {}", status.as_str());
        }
    }

    Ok(())
}
