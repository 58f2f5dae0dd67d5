use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use apod_cache::{
    date::{resolve_date, today},
    desktop,
    ApodClient, ApodConfig, Error, IngestPipeline, CACHE_DIR_NAME,
};

#[derive(Parser)]
#[command(name = "apod-cache")]
#[command(
    version,
    about = "Fetches the NASA Astronomy Picture of the Day, caches it by content hash and sets it as your desktop wallpaper."
)]
pub struct Args {
    #[arg(help = "APOD date to fetch (YYYY-MM-DD), defaults to today")]
    date: Option<String>,
    #[arg(long, help = "Cache the image without changing the wallpaper")]
    no_wallpaper: bool,
    #[arg(
        long,
        help = "List the cached records and exit",
        conflicts_with_all = ["date", "orphans"]
    )]
    list: bool,
    #[arg(
        long,
        help = "List cached files that have no database record and exit",
        conflicts_with = "date"
    )]
    orphans: bool,
}

fn staged(e: Error) -> anyhow::Error {
    anyhow::anyhow!("ingest failed during {}: {}", e.stage(), e)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let date = resolve_date(args.date.as_deref(), today()).map_err(staged)?;
    let cache_root = std::env::current_dir()
        .context("Could not determine the working directory")?
        .join(CACHE_DIR_NAME);

    if args.list || args.orphans {
        let Some(pipeline) = IngestPipeline::open_existing(&cache_root).map_err(staged)? else {
            println!("No image cache in {}", cache_root.display());
            return Ok(());
        };

        if args.list {
            for record in pipeline.index().records().map_err(staged)? {
                println!(
                    "{:>4}  {}  {}  {}",
                    record.id,
                    &record.hash[..record.hash.len().min(12)],
                    record.title,
                    record.image_file.display()
                );
            }
        } else {
            let orphans = pipeline.orphan_blobs().map_err(staged)?;
            if orphans.is_empty() {
                println!("No orphaned files in {}", cache_root.display());
            }
            for orphan in orphans {
                println!("{}", orphan.display());
            }
        }
        return Ok(());
    }

    let config = ApodConfig::load_or_default()?;
    let pipeline = IngestPipeline::open(&cache_root).map_err(staged)?;

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let client = ApodClient::new(&config);
    let outcome = rt
        .block_on(pipeline.run(&client, date))
        .map_err(staged)?;

    if args.no_wallpaper || !config.set_wallpaper {
        return Ok(());
    }

    if let Err(e) = desktop::apply(&config, &outcome) {
        eprintln!(
            "Warning: could not set the desktop background ({}): {}",
            e.stage(),
            e
        );
    }

    Ok(())
}
