//! EWBI Metastore Binary
//!
//! Operator tooling for the metastore: derive record names, check lifecycle
//! states, query the inventory for zone details and validate configuration.

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use ewbi_metastore::{
    config::ConfigOverrides, telemetry, Config, EntityKind, MetastoreService,
};
use tracing::{error, info};

fn cli() -> Command {
    Command::new("ewbi-metastore")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Federation metastore: record identity, state validation and zone enrichment")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .global(true)
                .help("Configuration file path"),
        )
        .arg(
            Arg::new("inventory-url")
                .long("inventory-url")
                .value_name("URL")
                .global(true)
                .help("Inventory API base URL (overrides config)"),
        )
        .arg(
            Arg::new("namespace")
                .short('n')
                .long("namespace")
                .value_name("NAMESPACE")
                .global(true)
                .help("Record namespace (overrides config)"),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .global(true)
                .help("Log level (overrides config)")
                .value_parser(["trace", "debug", "info", "warn", "error"]),
        )
        .subcommand_required(true)
        .subcommand(
            Command::new("derive-name")
                .about("Print the record name derived for an entity")
                .arg(kind_arg())
                .arg(
                    Arg::new("context")
                        .long("context")
                        .value_name("FEDERATION_CONTEXT_ID")
                        .required(true),
                )
                .arg(Arg::new("id").long("id").value_name("ENTITY_ID").required(true)),
        )
        .subcommand(
            Command::new("validate-state")
                .about("Check a lifecycle state against the allowed set")
                .arg(kind_arg())
                .arg(Arg::new("state").value_name("STATE").required(true)),
        )
        .subcommand(
            Command::new("zone-details")
                .about("Fetch zone details for one or more zones from the inventory")
                .arg(
                    Arg::new("zone")
                        .value_name("ZONE_ID")
                        .required(true)
                        .action(ArgAction::Append),
                )
                .arg(
                    Arg::new("concurrency")
                        .long("concurrency")
                        .value_name("N")
                        .value_parser(clap::value_parser!(usize)),
                ),
        )
        .subcommand(
            Command::new("validate-config")
                .about("Validate configuration and print the effective settings")
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .value_name("FILE")
                        .help("Write the effective configuration to FILE instead of stdout"),
                ),
        )
}

fn kind_arg() -> Arg {
    Arg::new("kind")
        .short('k')
        .long("kind")
        .value_name("KIND")
        .required(true)
        .value_parser(["appinst", "federation"])
}

async fn load_config(matches: &ArgMatches) -> Result<Config> {
    let config = match matches.get_one::<String>("config") {
        Some(path) => Config::from_file(path)
            .await
            .with_context(|| format!("Failed to load configuration from {}", path))?
            .with_env_overrides(|key| std::env::var(key).ok())?,
        None => Config::load().await?,
    };

    let concurrency = matches
        .subcommand_matches("zone-details")
        .and_then(|sub| sub.get_one::<usize>("concurrency").copied());

    config.merge_with_overrides(ConfigOverrides {
        inventory_base_url: matches.get_one::<String>("inventory-url").cloned(),
        namespace: matches.get_one::<String>("namespace").cloned(),
        log_level: matches.get_one::<String>("log-level").cloned(),
        max_concurrent_lookups: concurrency,
    })
}

fn parse_kind(matches: &ArgMatches) -> Result<EntityKind> {
    let raw = matches
        .get_one::<String>("kind")
        .context("entity kind is required")?;
    raw.parse::<EntityKind>().map_err(anyhow::Error::msg)
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    let config = load_config(&matches).await?;

    telemetry::init_tracing(&config.telemetry)?;

    match matches.subcommand() {
        Some(("derive-name", sub)) => {
            let kind = parse_kind(sub)?;
            let context = sub
                .get_one::<String>("context")
                .context("context is required")?;
            let id = sub.get_one::<String>("id").context("id is required")?;
            println!("{}", ewbi_metastore::derive(kind, context, id));
        }
        Some(("validate-state", sub)) => {
            let kind = parse_kind(sub)?;
            let state = sub
                .get_one::<String>("state")
                .context("state is required")?;
            if ewbi_metastore::is_valid(kind, state) {
                println!("{} is a valid {} state", state, kind);
            } else {
                anyhow::bail!(
                    "{} is not a valid {} state (allowed: {})",
                    state,
                    kind,
                    kind.allowed_states().join(", ")
                );
            }
        }
        Some(("zone-details", sub)) => {
            let zones: Vec<String> = sub
                .get_many::<String>("zone")
                .map(|values| values.cloned().collect())
                .unwrap_or_default();

            let service = MetastoreService::new(config)?;
            info!(zones = zones.len(), "Fetching zone details");

            match service.enricher.enrich_offered_zones(&zones).await {
                Ok(details) => println!("{}", serde_json::to_string_pretty(&details)?),
                Err(e) => {
                    error!(error = %e, code = e.error_code(), "Zone enrichment failed");
                    return Err(e.into());
                }
            }
        }
        Some(("validate-config", sub)) => {
            config.validate()?;
            println!("Configuration is valid");
            match sub.get_one::<String>("output") {
                Some(path) => {
                    config.save_to_file(path).await?;
                    info!(path = %path, "Wrote effective configuration");
                }
                None => println!("{}", serde_yaml::to_string(&config)?),
            }
        }
        _ => unreachable!("subcommand is required"),
    }

    Ok(())
}
