use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use catalog::{HttpMapStore, PersistedConfigLoader, ResolutionOutcome};
use clap::{Parser, Subcommand};
use explorer::{ConfigResolver, ExplorerSettings, Strategy};
use layers::{FeatureQuery, ProtocolDescriptor, cql};
use tracing::info;
use tracing_subscriber::EnvFilter;
use url::Url;
use viewstate::{LiveView, Location, StateSerializer, ViewConfig, Viewport, bookmark_url, codec};

#[derive(Parser, Debug)]
#[command(author, version, about = "Map view state resolution and bookmark tools")]
struct Args {
    /// Root of the map persistence service (overrides ATLAS_BASE_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// JSON view configuration used as the merge base (overrides ATLAS_DEFAULTS)
    #[arg(long, global = true)]
    defaults: Option<PathBuf>,

    /// Request timeout in seconds (overrides ATLAS_TIMEOUT_SECS)
    #[arg(long, global = true)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve the startup configuration for a viewer URL and print it
    Resolve {
        /// Full viewer URL, including query and fragment
        href: String,
    },

    /// Resolve a viewer URL and print the shareable bookmark for the result
    Bookmark {
        href: String,
    },

    /// Encode a JSON view configuration as a URL-safe blob
    Encode {
        /// JSON file, or `-` for stdin
        #[arg(default_value = "-")]
        input: String,
    },

    /// Decode a URL-safe blob back into JSON
    Decode {
        blob: String,
    },

    /// Parse a CQL filter and print its canonical form
    Cql {
        filter: String,

        /// Also print the WFS GetFeature URL at this endpoint
        #[arg(long)]
        wfs: Option<String>,

        /// Feature type for --wfs
        #[arg(long, default_value = "features")]
        feature_type: String,

        /// Geometry property for --wfs
        #[arg(long, default_value = "the_geom")]
        geometry: String,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    if let Err(e) = real_main(Args::parse()).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn real_main(args: Args) -> Result<(), String> {
    match &args.command {
        Command::Resolve { href } => {
            let config = resolve(&args, href).await?;
            print_json(&config)
        }
        Command::Bookmark { href } => {
            let config = resolve(&args, href).await?;
            let location = parse_href(href)?;
            let snapshot = StateSerializer::snapshot(&Resolved(config));
            println!("{}", bookmark_url(&location, &snapshot));
            Ok(())
        }
        Command::Encode { input } => {
            let text = read_input(input)?;
            let object = codec::parse_object(&text).map_err(|e| format!("{input}: {e}"))?;
            let config = ViewConfig::from_object(object).map_err(|e| format!("{input}: {e}"))?;
            println!("{}", codec::encode(&config));
            Ok(())
        }
        Command::Decode { blob } => {
            let config = codec::decode(blob.trim()).map_err(|e| e.to_string())?;
            print_json(&config)
        }
        Command::Cql {
            filter,
            wfs,
            feature_type,
            geometry,
        } => {
            let parsed = cql::parse(filter).map_err(|e| e.to_string())?;
            println!("{parsed}");
            if let Some(url) = wfs {
                let protocol = ProtocolDescriptor {
                    url: url.clone(),
                    version: "1.1.0".to_string(),
                    feature_type: feature_type.clone(),
                    geometry_name: geometry.clone(),
                    srs_name: None,
                };
                let request = FeatureQuery::geometry_only(protocol, parsed)
                    .request_url()
                    .map_err(|e| format!("invalid --wfs url: {e}"))?;
                println!("{request}");
            }
            Ok(())
        }
    }
}

fn settings(args: &Args) -> Result<ExplorerSettings, String> {
    let mut settings = ExplorerSettings::from_env().map_err(|e| e.to_string())?;
    if let Some(raw) = &args.base_url {
        settings.base_url = Url::parse(raw).map_err(|e| format!("invalid --base-url: {e}"))?;
    }
    if let Some(path) = &args.defaults {
        settings.defaults_path = Some(path.clone());
    }
    if let Some(secs) = args.timeout {
        settings.timeout = std::time::Duration::from_secs(secs);
    }
    Ok(settings)
}

async fn resolve(args: &Args, href: &str) -> Result<ViewConfig, String> {
    let settings = settings(args)?;
    let base = settings.load_defaults().map_err(|e| e.to_string())?;
    let store =
        HttpMapStore::new(settings.base_url.clone(), settings.timeout).map_err(|e| e.to_string())?;
    let resolver = ConfigResolver::new(PersistedConfigLoader::new(store));
    let location = parse_href(href)?;

    let resolution = resolver.resolve(&location, base);
    if let Strategy::AdHocFilter(_) = resolution.strategy {
        info!("zoom to filter waits for the first layer selection in a live viewer");
    }
    match resolution.outcome.settle().await {
        ResolutionOutcome::Immediate(config) => Ok(config),
        ResolutionOutcome::Failed { error, fallback } => {
            let notice = error.notice();
            eprintln!("{}: {}", notice.title, notice.message);
            Ok(fallback)
        }
        ResolutionOutcome::Pending(pending) => Err(format!("map {} still loading", pending.id())),
    }
}

/// Resolved configuration standing in for a live viewer.
struct Resolved(ViewConfig);

impl LiveView for Resolved {
    fn live_config(&self) -> &ViewConfig {
        &self.0
    }

    fn live_viewport(&self) -> Option<Viewport> {
        self.0.map.viewport()
    }
}

fn parse_href(href: &str) -> Result<Location, String> {
    Location::parse(href).map_err(|e| format!("invalid url {href:?}: {e}"))
}

fn read_input(input: &str) -> Result<String, String> {
    if input == "-" {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .map_err(|e| format!("read stdin: {e}"))?;
        Ok(text)
    } else {
        fs::read_to_string(input).map_err(|e| format!("read {input}: {e}"))
    }
}

fn print_json(config: &ViewConfig) -> Result<(), String> {
    let text = serde_json::to_string_pretty(config).map_err(|e| e.to_string())?;
    println!("{text}");
    Ok(())
}
