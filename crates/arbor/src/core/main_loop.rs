//! The main loop ties a widget tree to a display and an event loop.
//!
//! Input is routed down the focus chain as it arrives; the screen is
//! redrawn only when the event loop goes idle, so a burst of queued input
//! costs one render.
use std::{cell::Cell, rc::Rc, time::Duration};

use crate::{
    backend::{Display, DisplaySignal, crossterm::panic_hook},
    command_map::{self, Command},
    error::{Error, Result},
    event::Event,
    event_loop::{EventLoop, Scheduler},
    geom::Expanse,
    id::{AlarmKey, WatchKey},
    sizing::RenderSize,
    widget::WidgetRef,
};

/// Rewrites each batch of input before it is routed.
type InputFilter = Box<dyn FnMut(Vec<Event>) -> Vec<Event>>;

/// Receives input no widget handled. Returns true if it handled the event.
type UnhandledInput = Box<dyn FnMut(&Event) -> Result<bool>>;

/// Main loop configuration.
#[derive(Debug, Clone)]
pub struct MainLoopOptions {
    /// Route mouse events to the widget tree and ask the display to report
    /// them.
    pub handle_mouse: bool,
    /// Install a panic hook that restores the terminal first.
    pub install_panic_hook: bool,
    /// Stop the display when the loop ends cleanly. The display is always
    /// stopped on error.
    pub pop_on_exit: bool,
}

impl MainLoopOptions {
    /// Options with the panic hook enabled.
    pub fn with_panic_hook() -> Self {
        Self {
            install_panic_hook: true,
            ..Self::default()
        }
    }

    /// Options that ignore the mouse.
    pub fn without_mouse() -> Self {
        Self {
            handle_mouse: false,
            ..Self::default()
        }
    }
}

impl Default for MainLoopOptions {
    fn default() -> Self {
        Self {
            handle_mouse: true,
            install_panic_hook: false,
            pop_on_exit: true,
        }
    }
}

/// Everything the loop's callbacks can reach. Alarm callbacks receive it
/// as `&mut MainState`.
pub struct MainState {
    /// The topmost widget.
    widget: WidgetRef,
    /// Where frames go.
    display: Box<dyn Display>,
    /// The last known screen size; refetched when unset.
    screen_size: Option<Expanse>,
    /// Route mouse events.
    handle_mouse: bool,
    /// Rewrites input batches.
    input_filter: Option<InputFilter>,
    /// Fallback for unhandled input.
    unhandled_input: Option<UnhandledInput>,
    /// Schedules work on the loop.
    scheduler: Scheduler<Self>,
    /// The watch on the display's input channel.
    input_watch: Option<WatchKey>,
    /// The display's palette changed; repaint everything next frame.
    repaint: Rc<Cell<bool>>,
    /// The display's input channel changed; rewatch it.
    rewatch: Rc<Cell<bool>>,
}

impl MainState {
    /// The topmost widget.
    pub fn widget(&self) -> WidgetRef {
        self.widget.clone()
    }

    /// Replace the topmost widget.
    pub fn set_widget(&mut self, widget: WidgetRef) {
        self.widget = widget;
    }

    /// The display.
    pub fn display(&mut self) -> &mut dyn Display {
        self.display.as_mut()
    }

    /// A handle for scheduling alarms from callbacks.
    pub fn scheduler(&self) -> Scheduler<Self> {
        self.scheduler.clone()
    }

    /// The screen size, fetched from the display if unknown.
    pub fn screen_size(&mut self) -> Result<Expanse> {
        match self.screen_size {
            Some(s) => Ok(s),
            None => {
                let s = self.display.cols_rows()?;
                self.screen_size = Some(s);
                Ok(s)
            }
        }
    }

    /// Route input to the widget tree, then to the unhandled input hook.
    /// Returns true if anything handled any of it.
    pub fn process_input(&mut self, events: Vec<Event>) -> Result<bool> {
        let events = match self.input_filter.as_mut() {
            Some(f) => f(events),
            None => events,
        };
        let mut handled = false;
        for event in events {
            tracing::debug!("input {:?}", event);
            let size = RenderSize::Box(self.screen_size()?);
            let unhandled = match event {
                Event::Resize(s) => {
                    self.screen_size = Some(s);
                    continue;
                }
                Event::Key(k) => {
                    let mut w = self.widget.borrow_mut();
                    if w.selectable() {
                        w.keypress(size, k)?.map(Event::Key)
                    } else {
                        Some(Event::Key(k))
                    }
                }
                Event::Mouse(m) if self.handle_mouse => {
                    if self.widget.borrow_mut().mouse_event(size, m, true)? {
                        None
                    } else {
                        Some(Event::Mouse(m))
                    }
                }
                other => Some(other),
            };
            match unhandled {
                None => handled = true,
                Some(Event::Key(k)) if command_map::lookup(&k) == Some(Command::RedrawScreen) => {
                    self.display.clear()?;
                    handled = true;
                }
                Some(e) => {
                    if let Some(f) = self.unhandled_input.as_mut() {
                        handled |= f(&e)?;
                    }
                }
            }
        }
        Ok(handled)
    }

    /// Render the topmost widget at the screen size and paint it.
    pub fn draw_screen(&mut self) -> Result<()> {
        let size = self.screen_size()?;
        if self.repaint.replace(false) {
            self.display.clear()?;
        }
        let canvas = self.widget.borrow_mut().render(RenderSize::Box(size), true)?;
        self.display.draw_screen(size, &canvas)
    }

    /// Watch the display's input channel, replacing any previous watch.
    fn watch_input(&mut self) -> Result<()> {
        let Some(rx) = self.display.input_channel() else {
            return Ok(());
        };
        if let Some(k) = self.input_watch.take() {
            self.scheduler.remove_watch(k);
        }
        let key = self.scheduler.watch_channel(rx, |s: &mut Self, e: Event| {
            s.process_input(vec![e]).map(|_| ())
        })?;
        self.input_watch = Some(key);
        Ok(())
    }

    /// Called each time the loop goes idle.
    fn entering_idle(&mut self) -> Result<()> {
        if self.rewatch.replace(false) {
            self.watch_input()?;
        }
        if self.display.started() {
            self.draw_screen()?;
        }
        Ok(())
    }
}

/// Owns the topmost widget, the display and the event loop.
pub struct MainLoop {
    /// Loop state, handed to callbacks.
    state: MainState,
    /// The event loop.
    event_loop: EventLoop<MainState>,
    /// Options.
    options: MainLoopOptions,
}

impl MainLoop {
    /// A main loop with default options.
    pub fn new(widget: WidgetRef, display: Box<dyn Display>) -> Result<Self> {
        Self::with_options(widget, display, MainLoopOptions::default())
    }

    /// A main loop with explicit options.
    pub fn with_options(widget: WidgetRef, mut display: Box<dyn Display>, options: MainLoopOptions) -> Result<Self> {
        let event_loop = EventLoop::new();
        let repaint = Rc::new(Cell::new(false));
        let rewatch = Rc::new(Cell::new(false));
        {
            let repaint = repaint.clone();
            display.signals().connect(DisplaySignal::UpdatePaletteEntry, move |_| {
                repaint.set(true);
            });
            let rewatch = rewatch.clone();
            display.signals().connect(DisplaySignal::InputDescriptorsChanged, move |_| {
                rewatch.set(true);
            });
        }
        event_loop.enter_idle(MainState::entering_idle)?;
        Ok(Self {
            state: MainState {
                widget,
                display,
                screen_size: None,
                handle_mouse: options.handle_mouse,
                input_filter: None,
                unhandled_input: None,
                scheduler: event_loop.scheduler(),
                input_watch: None,
                repaint,
                rewatch,
            },
            event_loop,
            options,
        })
    }

    /// Set the hook that rewrites each input batch before routing.
    pub fn set_input_filter(&mut self, f: impl FnMut(Vec<Event>) -> Vec<Event> + 'static) {
        self.state.input_filter = Some(Box::new(f));
    }

    /// Set the hook that receives input no widget handled. Returning
    /// `Err(Error::Exit)` ends the loop.
    pub fn set_unhandled_input(&mut self, f: impl FnMut(&Event) -> Result<bool> + 'static) {
        self.state.unhandled_input = Some(Box::new(f));
    }

    /// The loop state.
    pub fn state(&mut self) -> &mut MainState {
        &mut self.state
    }

    /// The topmost widget.
    pub fn widget(&self) -> WidgetRef {
        self.state.widget()
    }

    /// Replace the topmost widget.
    pub fn set_widget(&mut self, widget: WidgetRef) {
        self.state.set_widget(widget);
    }

    /// A handle for scheduling work on the loop.
    pub fn scheduler(&self) -> Scheduler<MainState> {
        self.event_loop.scheduler()
    }

    /// Call `f` once, `delay` from now.
    pub fn set_alarm_in(
        &self,
        delay: Duration,
        f: impl FnOnce(&mut MainState) -> Result<()> + 'static,
    ) -> Result<AlarmKey> {
        self.event_loop.alarm(delay, f)
    }

    /// Cancel an alarm. Returns false if it already fired.
    pub fn remove_alarm(&self, key: AlarmKey) -> bool {
        self.event_loop.remove_alarm(key)
    }

    /// See [`MainState::process_input`].
    pub fn process_input(&mut self, events: Vec<Event>) -> Result<bool> {
        self.state.process_input(events)
    }

    /// See [`MainState::draw_screen`].
    pub fn draw_screen(&mut self) -> Result<()> {
        self.state.draw_screen()
    }

    /// Start the display and run until a callback returns
    /// [`Error::Exit`]. Any other error stops the display before it is
    /// returned.
    pub fn run(&mut self) -> Result<()> {
        let _panic_hook = if self.options.install_panic_hook {
            Some(panic_hook())
        } else {
            None
        };
        let result = self.run_inner();
        let stopped = if (self.options.pop_on_exit || result.is_err()) && self.state.display.started() {
            self.state.display.stop()
        } else {
            Ok(())
        };
        match result {
            Ok(()) | Err(Error::Exit) => stopped,
            Err(e) => Err(e),
        }
    }

    /// Start the display, watch its input and run the event loop.
    fn run_inner(&mut self) -> Result<()> {
        self.state.display.set_mouse_tracking(self.options.handle_mouse)?;
        if !self.state.display.started() {
            self.state.display.start()?;
        }
        self.state.screen_size = None;
        self.state.watch_input()?;
        self.event_loop.run(&mut self.state)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::{
        event::key,
        testing::TestDisplay,
        widget::boxed,
        widgets::{filler::Filler, text::Text},
    };

    fn root(text: &str) -> WidgetRef {
        boxed(Filler::new(boxed(Text::new(text))))
    }

    #[test]
    fn draws_on_idle_and_exits() -> Result<()> {
        let display = TestDisplay::new(Expanse::new(5, 3));
        let mut ml = MainLoop::new(root("hi"), Box::new(display.clone()))?;
        let seen = Rc::new(RefCell::new(vec![]));
        let s = seen.clone();
        ml.set_unhandled_input(move |e| {
            s.borrow_mut().push(e.clone());
            match e {
                Event::Key(k) if *k == 'q' => Err(Error::Exit),
                _ => Ok(false),
            }
        });
        display.push_input([Event::Key('x'.into()), Event::Key('q'.into())])?;
        ml.run()?;
        assert_eq!(seen.borrow().len(), 2);
        assert_eq!(display.starts(), 1);
        assert!(!display.started());
        let frame = display.last_frame().unwrap_or_default();
        assert_eq!(frame[1].trim_end(), "hi");
        Ok(())
    }

    #[test]
    fn redraw_key_clears() -> Result<()> {
        let display = TestDisplay::new(Expanse::new(4, 2));
        let mut ml = MainLoop::new(root("x"), Box::new(display.clone()))?;
        let handled = ml.process_input(vec![Event::Key(key::Ctrl + 'l')])?;
        assert!(handled);
        assert_eq!(display.clears(), 1);
        Ok(())
    }

    #[test]
    fn resize_and_filter() -> Result<()> {
        let display = TestDisplay::new(Expanse::new(4, 2));
        let mut ml = MainLoop::new(root("x"), Box::new(display.clone()))?;
        ml.set_input_filter(|events| {
            events
                .into_iter()
                .filter(|e| !matches!(e, Event::Key(k) if *k == 'z'))
                .collect()
        });
        let calls = Rc::new(Cell::new(0));
        let c = calls.clone();
        ml.set_unhandled_input(move |_| {
            c.set(c.get() + 1);
            Ok(true)
        });
        ml.process_input(vec![Event::Resize(Expanse::new(6, 3)), Event::Key('z'.into())])?;
        assert_eq!(calls.get(), 0);
        assert_eq!(ml.state().screen_size()?, Expanse::new(6, 3));
        Ok(())
    }

    #[test]
    fn errors_stop_the_display() -> Result<()> {
        let display = TestDisplay::new(Expanse::new(4, 2));
        let mut ml = MainLoop::new(root("x"), Box::new(display.clone()))?;
        ml.set_alarm_in(Duration::ZERO, |_| Err(Error::Invalid("boom".into())))?;
        assert_eq!(ml.run(), Err(Error::Invalid("boom".into())));
        assert!(!display.started());
        Ok(())
    }

    #[test]
    fn alarms_reach_state() -> Result<()> {
        let display = TestDisplay::new(Expanse::new(6, 2));
        let mut ml = MainLoop::new(root("x"), Box::new(display.clone()))?;
        let key = ml.set_alarm_in(Duration::from_secs(60), |_| Ok(()))?;
        assert!(ml.remove_alarm(key));
        ml.set_alarm_in(Duration::from_millis(10), |s| {
            s.set_widget(root("later"));
            s.draw_screen()?;
            Err(Error::Exit)
        })?;
        ml.run()?;
        let frame = display.last_frame().unwrap_or_default();
        assert_eq!(frame[0].trim_end(), "later");
        Ok(())
    }
}
