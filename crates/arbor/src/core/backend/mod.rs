//! Display backends paint canvases and deliver input.

/// Crossterm display backend.
pub mod crossterm;

use std::{sync::mpsc, time::Duration};

use crate::{
    canvas::CanvasRef,
    error::Result,
    event::Event,
    geom::Expanse,
    signals::Signals,
    style::Palette,
};

/// Signals emitted by a display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisplaySignal {
    /// A palette entry changed; the payload is the entry name.
    UpdatePaletteEntry,
    /// The display's input sources changed; the payload is empty.
    InputDescriptorsChanged,
}

/// A terminal display: somewhere to paint canvases and a source of input
/// events.
pub trait Display {
    /// Take over the terminal.
    fn start(&mut self) -> Result<()>;

    /// Release the terminal.
    fn stop(&mut self) -> Result<()>;

    /// Is the display started?
    fn started(&self) -> bool;

    /// The current screen size.
    fn cols_rows(&mut self) -> Result<Expanse>;

    /// Take the receiver of input events, for watching from an event loop.
    /// Returns `None` once taken.
    fn input_channel(&mut self) -> Option<mpsc::Receiver<Event>>;

    /// Wait up to `timeout` for input and return everything pending. With
    /// no timeout, block until at least one event arrives. Fails once the
    /// input channel has been taken.
    fn get_input(&mut self, timeout: Option<Duration>) -> Result<Vec<Event>>;

    /// Paint a canvas of `size`. The display keeps the canvas alive until
    /// the next call, which keeps its cache entries alive too.
    fn draw_screen(&mut self, size: Expanse, canvas: &CanvasRef) -> Result<()>;

    /// Forget what is on screen so the next draw repaints everything.
    fn clear(&mut self) -> Result<()>;

    /// Replace the palette used to resolve attributes.
    fn register_palette(&mut self, palette: Palette);

    /// Turn mouse reporting on or off.
    fn set_mouse_tracking(&mut self, _enable: bool) -> Result<()> {
        Ok(())
    }

    /// The display's signals.
    fn signals(&mut self) -> &mut Signals<DisplaySignal, String>;
}

/// Drain everything pending on a receiver after waiting up to `timeout`
/// for the first event.
pub(crate) fn drain_input(rx: &mpsc::Receiver<Event>, timeout: Option<Duration>) -> Result<Vec<Event>> {
    let first = match timeout {
        None => Some(rx.recv()?),
        Some(t) => match rx.recv_timeout(t) {
            Ok(e) => Some(e),
            Err(mpsc::RecvTimeoutError::Timeout) => None,
            Err(mpsc::RecvTimeoutError::Disconnected) => return Err(mpsc::RecvError.into()),
        },
    };
    let mut out: Vec<Event> = first.into_iter().collect();
    out.extend(rx.try_iter());
    Ok(out)
}
