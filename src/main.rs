use clap::{Parser, Subcommand};
use photosub_indexer::catalog::HttpCatalog;
use photosub_indexer::config::{self, IndexerConfig, StorageBackend};
use photosub_indexer::event::{EventKind, ImageEvent};
use photosub_indexer::extract::EmbeddedExtractor;
use photosub_indexer::handler::{Indexer, Outcome};
use photosub_indexer::storage::{GcsStore, LocalStore, ObjectStore};
use photosub_indexer::{caption, logging, output, scan, server};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

type AppIndexer = Indexer<Box<dyn ObjectStore>, EmbeddedExtractor, HttpCatalog>;

#[derive(Parser)]
#[command(name = "photosub-indexer")]
#[command(version, about = "Index bucket images into the photo catalog")]
#[command(long_about = "\
Index bucket images into the photo catalog

Every image written to the bucket is downloaded, its embedded XMP (or IPTC)
title, description and keywords are read, and a searchable entry is POSTed to
the catalog. Deleted objects are removed from the catalog.

Object keys map to catalog identities:

  2014/misool/DSC_1378.jpg  ->  name = DSC_1378.jpg, path = 2014/misool

Configuration: stock defaults, then --config <file>, then the environment
(IMAGE_API_URL as the full image endpoint, APP_ENV, PORT, RUST_LOG).

Run 'photosub-indexer gen-config' to generate a documented config file.")]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

/// Identifies one object.
#[derive(clap::Args)]
struct ObjectArgs {
    #[arg(long)]
    bucket: String,
    /// Full object key, e.g. 2014/misool/DSC_1378.jpg
    #[arg(long)]
    key: String,
}

#[derive(Subcommand)]
enum Command {
    /// Receive push-delivered storage events over HTTP
    Serve {
        /// Listen address; overrides server.bind
        #[arg(long)]
        bind: Option<String>,
    },
    /// Handle one finalize event: download, extract, send to the catalog
    Finalize {
        #[command(flatten)]
        object: ObjectArgs,
        /// Declared content type of the object
        #[arg(long, default_value = "image/jpeg")]
        content_type: String,
    },
    /// Handle one delete event: remove the catalog entry
    Delete {
        #[command(flatten)]
        object: ObjectArgs,
    },
    /// Print the caption and tags derived from a title and description
    Analyze {
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Show the catalog item a local image would produce (nothing is sent)
    Inspect {
        file: PathBuf,
        /// Print the JSON body instead of the summary
        #[arg(long)]
        json: bool,
    },
    /// Preview the catalog items for every file under a directory (nothing is sent)
    Scan { dir: PathBuf },
    /// Print a stock config file with all options documented
    GenConfig,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn Error>> {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    match cli.command {
        Command::Serve { bind } => {
            let mut config = setup(config_path)?;
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            let addr = config.bind_addr()?;
            let indexer = Arc::new(build_indexer(&config)?);
            server::serve(server::router(indexer), addr).await?;
        }
        Command::Finalize {
            object,
            content_type,
        } => {
            let indexer = build_indexer(&setup(config_path)?)?;
            let event = ImageEvent {
                bucket: object.bucket,
                object_key: object.key,
                content_type: Some(content_type),
                kind: EventKind::Finalized,
            };
            return Ok(report(&event, indexer.handle(&event).await));
        }
        Command::Delete { object } => {
            let indexer = build_indexer(&setup(config_path)?)?;
            let event = ImageEvent {
                bucket: object.bucket,
                object_key: object.key,
                content_type: None,
                kind: EventKind::Deleted,
            };
            return Ok(report(&event, indexer.handle(&event).await));
        }
        Command::Analyze { title, description } => {
            let analysis = caption::analyze(&[title.as_deref(), description.as_deref()]);
            output::print_analysis(analysis.as_ref());
        }
        Command::Inspect { file, json } => {
            setup(config_path)?;
            let entry = scan::inspect(&file, &EmbeddedExtractor)?;
            match (&entry.preview, json) {
                (scan::Preview::Item(item), true) => {
                    println!("{}", output::format_item_json(item)?);
                }
                _ => output::print_scan_output(std::slice::from_ref(&entry)),
            }
        }
        Command::Scan { dir } => {
            setup(config_path)?;
            let entries = scan::scan(&dir, &EmbeddedExtractor)?;
            output::print_scan_output(&entries);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Load the effective configuration and install logging.
fn setup(config_path: Option<&Path>) -> Result<IndexerConfig, Box<dyn Error>> {
    let config = config::load_config(config_path)?;
    logging::init(&config.logging)?;
    Ok(config)
}

fn report(event: &ImageEvent, outcome: Outcome) -> ExitCode {
    println!("{}", output::format_outcome(&event.object_key, outcome));
    if outcome.is_failure() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// Wire the configured store and catalog to the embedded-metadata extractor.
fn build_indexer(config: &IndexerConfig) -> Result<AppIndexer, Box<dyn Error>> {
    let timeout = config.catalog.timeout();
    let store: Box<dyn ObjectStore> = match config.storage.backend {
        StorageBackend::Gcs => Box::new(GcsStore::new(
            &config.storage.endpoint,
            config.storage.access_token.clone(),
            timeout,
        )?),
        StorageBackend::Local => Box::new(LocalStore::new(config.storage.local_root.clone())),
    };
    let catalog = HttpCatalog::with_endpoint(config.catalog_endpoint()?, timeout)?;
    Ok(Indexer::new(store, EmbeddedExtractor, catalog))
}
