//! Launch the list gym example.

use anyhow::Result;
use arbor::{
    backend::crossterm::CrosstermDisplay,
    error::Error,
    event::{Event, key::KeyCode},
    main_loop::{MainLoop, MainLoopOptions},
    widget::boxed,
};
use arbor_demos::{CommonArgs, listgym::ListGym};
use clap::Parser;

/// CLI flags for the list gym example.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Number of items to generate.
    #[clap(short, long, default_value_t = 200)]
    items: usize,

    /// Random seed for item generation.
    #[clap(short, long, default_value_t = 0)]
    seed: u64,

    /// Shared flags.
    #[clap(flatten)]
    common: CommonArgs,
}

/// Run the list gym example.
pub fn main() -> Result<()> {
    let args = Args::parse();
    args.common.init_logging()?;
    let display = CrosstermDisplay::new(args.common.palette()?);
    let root = boxed(ListGym::new(args.items, args.seed));
    let mut ml = MainLoop::with_options(root, Box::new(display), MainLoopOptions::with_panic_hook())?;
    ml.set_unhandled_input(|e| match e {
        // Edits take 'q', so escape quits too.
        Event::Key(k) if *k == 'q' || *k == KeyCode::Esc => Err(Error::Exit),
        _ => Ok(false),
    });
    ml.run()?;
    Ok(())
}
