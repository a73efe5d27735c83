//! Tracing subscriber setup
//!
//! stderr always gets a layer filtered by `RUST_LOG` (or the `-v` count when
//! unset). The optional debug and info files each get their own layer with a
//! fixed level so they keep a full record regardless of the console filter.

use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Layer, Registry};

use crate::config::LoggingSection;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Console level for a `-v` count
pub fn console_level(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

pub fn init(verbose: u8, config: &LoggingSection) -> Result<()> {
    let console_filter = EnvFilter::builder()
        .with_default_directive(console_level(verbose).into())
        .from_env_lossy();

    let mut layers: Vec<BoxedLayer> = vec![fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(console_filter)
        .boxed()];

    if let Some(path) = &config.debug_file {
        layers.push(file_layer(path, LevelFilter::DEBUG)?);
    }
    if let Some(path) = &config.info_file {
        layers.push(file_layer(path, LevelFilter::INFO)?);
    }

    tracing_subscriber::registry().with(layers).init();
    Ok(())
}

fn file_layer(path: &Path, level: LevelFilter) -> Result<BoxedLayer> {
    let file = open_log(path)?;
    Ok(fmt::layer()
        .with_writer(Arc::new(file))
        .with_ansi(false)
        .with_filter(level)
        .boxed())
}

fn open_log(path: &Path) -> Result<File> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create log directory {}", dir.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))
}
