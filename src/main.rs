//! Command-line entry point.
//!
//! ```bash
//! certificate-creator --config serverless.yml create
//! certificate-creator --config serverless.yml delete
//! certificate-creator --config serverless.yml summary --json
//! certificate-creator --config serverless.yml lookup CertificateArn
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use certificate_creator_lib::issuance::authority::AcmAuthority;
use certificate_creator_lib::issuance::dns_providers::Route53ZoneClient;
use certificate_creator_lib::storage::result_sink::select_sink;
use certificate_creator_lib::{
    CertificateConfig, Services, TeardownOutcome, ValidationTiming, create_certificate,
    delete_certificate, lookup_property, summarize,
};
use clap::{Parser, Subcommand};

/// Provision and tear down a DNS-validated ACM certificate
#[derive(Parser)]
#[command(name = "certificate-creator", version, long_about = None)]
struct Cli {
    /// YAML file holding the `customCertificate` section
    #[arg(short, long, global = true, default_value = "serverless.yml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the certificate or reuse the existing one
    Create,
    /// Delete the certificate and its validation records
    Delete,
    /// Show the current certificate
    Summary {
        /// Print the certificate as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print one certificate property, blank when unavailable
    Lookup {
        /// CertificateArn, DomainName, Status or SubjectAlternativeNames
        property: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = CertificateConfig::load(&cli.config)?
        .build()
        .with_context(|| format!("invalid configuration in {}", cli.config.display()))?;

    let authority = AcmAuthority::connect(&config.region, ValidationTiming::from_env()).await;

    match cli.command {
        Commands::Lookup { property } => {
            println!(
                "{}",
                lookup_property(&authority, &config.domain, &property).await
            );
        }
        Commands::Summary { json } => match summarize(&authority, &config).await? {
            Some(record) if json => println!("{}", serde_json::to_string_pretty(&record)?),
            Some(record) => println!("{record}"),
            None => println!("No certificate for {}", config.domain),
        },
        command @ (Commands::Create | Commands::Delete) => {
            let dns = Route53ZoneClient::connect().await;
            let sink = select_sink(&config);
            let services = Services {
                authority: &authority,
                dns: &dns,
                sink: sink.as_ref(),
            };

            if matches!(command, Commands::Create) {
                if let Some(record) = create_certificate(services, &config).await? {
                    println!("{record}");
                }
            } else {
                match delete_certificate(services, &config).await? {
                    TeardownOutcome::Deleted { arn } => println!("Deleted {arn}"),
                    TeardownOutcome::NotFound => println!("No certificate for {}", config.domain),
                    TeardownOutcome::Disabled => println!("Certificate handling disabled"),
                }
            }
        }
    }

    Ok(())
}
