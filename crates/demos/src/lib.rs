//! Demo applications built on arbor.

use std::{fs::File, path::PathBuf, sync::Mutex};

use anyhow::{Context, Result};
use arbor::style::{Color, Palette, Style};
use clap::Args;

/// List gym: a list box of mixed, editable items.
pub mod listgym;
/// Pager: a scrolling file viewer.
pub mod pager;

/// Flags shared by every demo.
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Load the palette from a JSON file.
    #[clap(long)]
    pub palette: Option<PathBuf>,

    /// Write logs to this file. The terminal is in use, so logging is off
    /// unless a file is given.
    #[clap(long)]
    pub log: Option<PathBuf>,

    /// Log level.
    #[clap(long, default_value = "info")]
    pub log_level: tracing::Level,
}

impl CommonArgs {
    /// Install the log subscriber, if a log file was requested.
    pub fn init_logging(&self) -> Result<()> {
        let Some(path) = &self.log else {
            return Ok(());
        };
        let file = File::create(path).with_context(|| format!("creating log file {}", path.display()))?;
        tracing_subscriber::fmt()
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .with_max_level(self.log_level)
            .init();
        tracing::info!("logging to {}", path.display());
        Ok(())
    }

    /// The palette from `--palette`, or the built-in one.
    pub fn palette(&self) -> Result<Palette> {
        match &self.palette {
            Some(path) => {
                Palette::load(path).with_context(|| format!("loading palette {}", path.display()))
            }
            None => Ok(default_palette()),
        }
    }
}

/// The palette the demos use unless told otherwise.
pub fn default_palette() -> Palette {
    Palette::new()
        .with("header", Style::new(Color::White, Color::DarkBlue).bold())
        .with("footer", Style::new(Color::Black, Color::Grey))
        .with("focus", Style::new(Color::Black, Color::Yellow))
        .with("edit", Style::new(Color::Yellow, Color::Reset))
        .with("dim", Style::new(Color::DarkGrey, Color::Reset))
}
