//! Launch the pager example.

use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use arbor::{
    backend::crossterm::CrosstermDisplay,
    error::Error,
    event::Event,
    main_loop::{MainLoop, MainLoopOptions},
};
use arbor_demos::{CommonArgs, pager::pager};
use clap::Parser;

/// CLI flags for the pager example.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// File to view.
    file: PathBuf,

    /// Wrap long lines instead of clipping them.
    #[clap(short, long)]
    wrap: bool,

    /// Shared flags.
    #[clap(flatten)]
    common: CommonArgs,
}

/// Run the pager example.
pub fn main() -> Result<()> {
    let args = Args::parse();
    args.common.init_logging()?;
    let contents =
        fs::read_to_string(&args.file).with_context(|| format!("reading {}", args.file.display()))?;
    let display = CrosstermDisplay::new(args.common.palette()?);
    let root = pager(&args.file.display().to_string(), &contents, args.wrap);
    let mut ml = MainLoop::with_options(root, Box::new(display), MainLoopOptions::with_panic_hook())?;
    ml.set_unhandled_input(|e| match e {
        Event::Key(k) if *k == 'q' => Err(Error::Exit),
        _ => Ok(false),
    });
    ml.run()?;
    Ok(())
}
