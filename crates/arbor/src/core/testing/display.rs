//! An in-memory display for driving a main loop from tests.
use std::{cell::RefCell, rc::Rc, sync::mpsc, time::Duration};

use crate::{
    backend::{Display, DisplaySignal, drain_input},
    canvas::CanvasRef,
    error::{Error, Result},
    event::Event,
    geom::Expanse,
    signals::Signals,
    style::Palette,
};

/// Shared state, inspectable after the display has been handed to a
/// main loop.
#[derive(Default)]
struct State {
    /// Started flag.
    started: bool,
    /// Start calls.
    starts: usize,
    /// Screen size.
    size: Expanse,
    /// Painted frames as text.
    frames: Vec<Vec<String>>,
    /// The last painted canvas.
    last: Option<CanvasRef>,
    /// Clear calls.
    clears: usize,
    /// The current palette.
    palette: Palette,
}

/// A display that records what it paints. Clones share state, but each
/// clone has its own signal listeners.
pub struct TestDisplay {
    /// Shared state.
    state: Rc<RefCell<State>>,
    /// Input sender for scripting.
    tx: mpsc::Sender<Event>,
    /// Input receiver, until taken.
    rx: Rc<RefCell<Option<mpsc::Receiver<Event>>>>,
    /// Display signals.
    signals: Signals<DisplaySignal, String>,
}

impl Clone for TestDisplay {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            tx: self.tx.clone(),
            rx: self.rx.clone(),
            signals: Signals::new(),
        }
    }
}

impl TestDisplay {
    /// A display of the given size with no pending input.
    pub fn new(size: Expanse) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            state: Rc::new(RefCell::new(State {
                size,
                ..State::default()
            })),
            tx,
            rx: Rc::new(RefCell::new(Some(rx))),
            signals: Signals::new(),
        }
    }

    /// Queue input events.
    pub fn push_input(&self, events: impl IntoIterator<Item = Event>) -> Result<()> {
        for e in events {
            self.tx
                .send(e)
                .map_err(|e| Error::Backend(e.to_string()))?;
        }
        Ok(())
    }

    /// Change the reported screen size.
    pub fn set_size(&self, size: Expanse) {
        self.state.borrow_mut().size = size;
    }

    /// Every frame painted so far.
    pub fn frames(&self) -> Vec<Vec<String>> {
        self.state.borrow().frames.clone()
    }

    /// The last painted frame.
    pub fn last_frame(&self) -> Option<Vec<String>> {
        self.state.borrow().frames.last().cloned()
    }

    /// The last painted canvas.
    pub fn last_canvas(&self) -> Option<CanvasRef> {
        self.state.borrow().last.clone()
    }

    /// Drop the retained canvas, as a real display does when it paints
    /// something else.
    pub fn forget(&self) {
        self.state.borrow_mut().last = None;
    }

    /// Number of clear calls.
    pub fn clears(&self) -> usize {
        self.state.borrow().clears
    }

    /// Number of start calls.
    pub fn starts(&self) -> usize {
        self.state.borrow().starts
    }

    /// The registered palette.
    pub fn palette(&self) -> Palette {
        self.state.borrow().palette.clone()
    }
}

impl Display for TestDisplay {
    fn start(&mut self) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.started = true;
        s.starts += 1;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.state.borrow_mut().started = false;
        Ok(())
    }

    fn started(&self) -> bool {
        self.state.borrow().started
    }

    fn cols_rows(&mut self) -> Result<Expanse> {
        Ok(self.state.borrow().size)
    }

    fn input_channel(&mut self) -> Option<mpsc::Receiver<Event>> {
        self.rx.borrow_mut().take()
    }

    fn get_input(&mut self, timeout: Option<Duration>) -> Result<Vec<Event>> {
        let rx = self.rx.borrow();
        let rx = rx
            .as_ref()
            .ok_or_else(|| Error::Backend("input channel has been taken".into()))?;
        drain_input(rx, timeout)
    }

    fn draw_screen(&mut self, size: Expanse, canvas: &CanvasRef) -> Result<()> {
        let mut s = self.state.borrow_mut();
        if !s.started {
            return Err(Error::Backend("display not started".into()));
        }
        if canvas.size() != size {
            return Err(Error::Backend(format!(
                "canvas is {}x{} but the screen is {}x{}",
                canvas.cols(),
                canvas.rows(),
                size.w,
                size.h
            )));
        }
        s.frames.push(canvas.text_lines());
        s.last = Some(canvas.clone());
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.state.borrow_mut().clears += 1;
        Ok(())
    }

    fn register_palette(&mut self, palette: Palette) {
        let mut names: Vec<String> = palette.entries.keys().cloned().collect();
        names.sort();
        self.state.borrow_mut().palette = palette;
        for name in names {
            self.signals.emit(DisplaySignal::UpdatePaletteEntry, &name);
        }
    }

    fn signals(&mut self) -> &mut Signals<DisplaySignal, String> {
        &mut self.signals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{canvas::Canvas, event::key::Key};

    #[test]
    fn records_frames() -> Result<()> {
        let mut d = TestDisplay::new(Expanse::new(2, 1));
        let observer = d.clone();
        let c = Canvas::solid('x', None, Expanse::new(2, 1));
        assert!(d.draw_screen(Expanse::new(2, 1), &c).is_err());
        d.start()?;
        d.draw_screen(Expanse::new(2, 1), &c)?;
        assert!(d.draw_screen(Expanse::new(3, 1), &c).is_err());
        assert_eq!(observer.last_frame(), Some(vec!["xx".to_string()]));
        assert_eq!(observer.starts(), 1);

        observer.push_input([Event::Key(Key::from('a'))])?;
        assert_eq!(
            d.get_input(Some(Duration::ZERO))?,
            vec![Event::Key(Key::from('a'))]
        );
        assert!(d.input_channel().is_some());
        assert!(d.get_input(Some(Duration::ZERO)).is_err());
        Ok(())
    }

    #[test]
    fn palette_signals() {
        let mut d = TestDisplay::new(Expanse::new(1, 1));
        let seen = Rc::new(RefCell::new(vec![]));
        let log = seen.clone();
        d.signals()
            .connect(DisplaySignal::UpdatePaletteEntry, move |n| log.borrow_mut().push(n.clone()));
        d.register_palette(
            Palette::new()
                .with("b", crate::style::Style::default())
                .with("a", crate::style::Style::default()),
        );
        assert_eq!(*seen.borrow(), vec!["a".to_string(), "b".to_string()]);
    }
}
