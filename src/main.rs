//! geosnip - Map-tile snippets for geographic annotations.
//!
//! This binary wires the store, tile source and snippet pipeline together.

use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use geosnip::{
    config::{Cli, Command, FetchConfig, InfoConfig, InitConfig},
    io::HttpTileSource,
    store::{Store, TilesetInfo},
    tile::{zoom_levels, PngEncoder, SnippetService, TileFetcher, TileRangeResolver},
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Fetch(config) => run_fetch(config).await,
        Command::Init(config) => run_init(config).await,
        Command::Info(config) => run_info(config).await,
    }
}

// =============================================================================
// Fetch Command
// =============================================================================

async fn run_fetch(config: FetchConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let store = match Store::open(&config.db) {
        Ok(store) => store,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let tileset = match store.tileset_info().await {
        Ok(info) => info,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let cache = match store.snippet_cache(config.clear).await {
        Ok(cache) => cache,
        Err(e) => {
            error!("Failed to prepare the snippet cache: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if config.clear {
        info!("Cleared cached snippets");
    }

    let annotations = match store.annotations().await {
        Ok(annotations) => annotations,
        Err(e) => {
            error!("Failed to read annotations: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let template = match config.tile_template() {
        Ok(template) => template,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let source = match HttpTileSource::new(template, config.timeout_duration()) {
        Ok(source) => source,
        Err(e) => {
            error!("Failed to create HTTP client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let max_size = config.effective_max_size(Some(tileset.max_size));
    let zooms = zoom_levels(config.zoom_from, config.zoom_to, tileset.max_zoom);

    info!("Configuration:");
    info!("  Store: {}", config.db.display());
    info!("  Tiles: {}", source.template().base_url());
    info!("  Annotations: {}", annotations.len());
    info!("  Zoom levels: {}-{}", zooms.start(), zooms.end());
    info!(
        "  Tile size: {} px, max snippet size: {} px, padding: {}%",
        tileset.tile_size,
        max_size,
        config.padding_fraction() * 100.0
    );
    if zooms.is_empty() {
        warn!(
            "No zoom levels to render (tileset max zoom is {})",
            tileset.max_zoom
        );
    }

    let fetcher = TileFetcher::new(Arc::new(source))
        .with_concurrency(config.concurrency)
        .with_timeout(config.timeout_duration());
    let resolver = TileRangeResolver::new(tileset.tile_size, max_size, config.padding_fraction());
    let service = SnippetService::new(
        fetcher,
        resolver,
        PngEncoder::new(config.compression),
        cache,
    );

    let summary = service.run(&annotations, zooms).await;
    if summary.missing_tiles > 0 {
        warn!(
            "{} tile(s) were unavailable and left blank",
            summary.missing_tiles
        );
    }

    ExitCode::SUCCESS
}

// =============================================================================
// Init Command
// =============================================================================

async fn run_init(config: InitConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let store = match Store::create(&config.db) {
        Ok(store) => store,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let info = TilesetInfo {
        tile_size: config.tile_size,
        max_size: config.max_size,
        ..TilesetInfo::geographic(config.max_zoom)
    };
    if let Err(e) = store.write_tileset_info(&info).await {
        error!("Failed to write tileset info: {}", e);
        return ExitCode::FAILURE;
    }
    if let Err(e) = store.snippet_cache(false).await {
        error!("Failed to create the snippet cache: {}", e);
        return ExitCode::FAILURE;
    }

    info!(
        "Initialised {} (max zoom {}, tile size {} px)",
        config.db.display(),
        info.max_zoom,
        info.tile_size
    );
    ExitCode::SUCCESS
}

// =============================================================================
// Info Command
// =============================================================================

async fn run_info(config: InfoConfig) -> ExitCode {
    init_logging(config.verbose);

    let store = match Store::open(&config.db) {
        Ok(store) => store,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let tileset = match store.tileset_info().await {
        Ok(info) => info,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let cached = match store.cached_snippet_count().await {
        Ok(count) => count,
        Err(e) => {
            error!("Failed to read the snippet cache: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let report = serde_json::json!({
        "tileset_info": tileset,
        "cached_snippets": cached,
    });
    match serde_json::to_string_pretty(&report) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Failed to serialize report: {}", e);
            ExitCode::FAILURE
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn init_logging(verbose: bool) {
    let env_filter = if verbose { "geosnip=debug" } else { "geosnip=info" };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
