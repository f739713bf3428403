use std::{
    io::{self, Stderr, Write},
    panic,
    sync::mpsc,
    thread,
    time::Duration,
};

use color_backtrace::{BacktracePrinter, default_output_stream};
use crossterm::{
    self, ExecutableCommand, QueueableCommand, cursor as ccursor, event as cevent, style, terminal,
};
use scopeguard::{ScopeGuard, guard};

use crate::{
    backend::{Display, DisplaySignal, drain_input},
    canvas::CanvasRef,
    error::{Error, Result},
    event::{Event, key, mouse},
    geom::{Expanse, Point},
    signals::Signals,
    style::{Attr, Color, Palette, Style},
};

/// Translate a color into a crossterm color.
fn translate_color(c: Color) -> style::Color {
    match c {
        Color::Reset => style::Color::Reset,
        Color::Black => style::Color::Black,
        Color::DarkGrey => style::Color::DarkGrey,
        Color::Red => style::Color::Red,
        Color::DarkRed => style::Color::DarkRed,
        Color::Green => style::Color::Green,
        Color::DarkGreen => style::Color::DarkGreen,
        Color::Yellow => style::Color::Yellow,
        Color::DarkYellow => style::Color::DarkYellow,
        Color::Blue => style::Color::Blue,
        Color::DarkBlue => style::Color::DarkBlue,
        Color::Magenta => style::Color::Magenta,
        Color::DarkMagenta => style::Color::DarkMagenta,
        Color::Cyan => style::Color::Cyan,
        Color::DarkCyan => style::Color::DarkCyan,
        Color::White => style::Color::White,
        Color::Grey => style::Color::Grey,
        Color::Rgb { r, g, b } => style::Color::Rgb { r, g, b },
        Color::AnsiValue(a) => style::Color::AnsiValue(a),
    }
}

/// Translate crossterm key modifiers.
fn translate_key_modifiers(mods: cevent::KeyModifiers) -> key::Mods {
    key::Mods {
        shift: mods.contains(cevent::KeyModifiers::SHIFT),
        ctrl: mods.contains(cevent::KeyModifiers::CONTROL),
        alt: mods.contains(cevent::KeyModifiers::ALT),
    }
}

/// Translate a crossterm mouse button.
fn translate_button(b: cevent::MouseButton) -> mouse::Button {
    match b {
        cevent::MouseButton::Left => mouse::Button::Left,
        cevent::MouseButton::Right => mouse::Button::Right,
        cevent::MouseButton::Middle => mouse::Button::Middle,
    }
}

/// Translate a crossterm key code. Keys we have no name for become `Null`.
fn translate_key_code(code: cevent::KeyCode) -> key::KeyCode {
    match code {
        cevent::KeyCode::Backspace => key::KeyCode::Backspace,
        cevent::KeyCode::Enter => key::KeyCode::Enter,
        cevent::KeyCode::Left => key::KeyCode::Left,
        cevent::KeyCode::Right => key::KeyCode::Right,
        cevent::KeyCode::Up => key::KeyCode::Up,
        cevent::KeyCode::Down => key::KeyCode::Down,
        cevent::KeyCode::Home => key::KeyCode::Home,
        cevent::KeyCode::End => key::KeyCode::End,
        cevent::KeyCode::PageUp => key::KeyCode::PageUp,
        cevent::KeyCode::PageDown => key::KeyCode::PageDown,
        cevent::KeyCode::Tab => key::KeyCode::Tab,
        cevent::KeyCode::BackTab => key::KeyCode::BackTab,
        cevent::KeyCode::Delete => key::KeyCode::Delete,
        cevent::KeyCode::Insert => key::KeyCode::Insert,
        cevent::KeyCode::F(x) => key::KeyCode::F(x),
        cevent::KeyCode::Char(c) => key::KeyCode::Char(c),
        cevent::KeyCode::Esc => key::KeyCode::Esc,
        _ => key::KeyCode::Null,
    }
}

/// Translate a crossterm event. Key releases and repeats reported by
/// enhanced keyboard protocols are dropped.
fn translate_event(e: cevent::Event) -> Option<Event> {
    Some(match e {
        cevent::Event::Key(k) => {
            if k.kind == cevent::KeyEventKind::Release {
                return None;
            }
            Event::Key(key::Key {
                mods: translate_key_modifiers(k.modifiers),
                key: translate_key_code(k.code),
            })
        }
        cevent::Event::Mouse(m) => {
            let mut button = mouse::Button::None;
            let action = match m.kind {
                cevent::MouseEventKind::Down(b) => {
                    button = translate_button(b);
                    mouse::Action::Down
                }
                cevent::MouseEventKind::Up(b) => {
                    button = translate_button(b);
                    mouse::Action::Up
                }
                cevent::MouseEventKind::Drag(b) => {
                    button = translate_button(b);
                    mouse::Action::Drag
                }
                cevent::MouseEventKind::Moved => mouse::Action::Moved,
                cevent::MouseEventKind::ScrollDown => mouse::Action::ScrollDown,
                cevent::MouseEventKind::ScrollUp => mouse::Action::ScrollUp,
                cevent::MouseEventKind::ScrollLeft => mouse::Action::ScrollLeft,
                cevent::MouseEventKind::ScrollRight => mouse::Action::ScrollRight,
            };
            Event::Mouse(mouse::MouseEvent {
                button,
                action,
                location: Point {
                    x: m.column.into(),
                    y: m.row.into(),
                },
                modifiers: translate_key_modifiers(m.modifiers),
            })
        }
        cevent::Event::Resize(x, y) => Event::Resize(Expanse::new(x.into(), y.into())),
        cevent::Event::FocusGained => Event::FocusGained,
        cevent::Event::FocusLost => Event::FocusLost,
        cevent::Event::Paste(s) => Event::Paste(s),
    })
}

/// Is this a mouse move?
fn is_move(e: &Event) -> bool {
    matches!(
        e,
        Event::Mouse(mouse::MouseEvent {
            action: mouse::Action::Moved,
            ..
        })
    )
}

/// Thread entry that forwards crossterm events into the channel. Bursts of
/// mouse moves are coalesced so clicks are not delayed behind them.
fn event_emitter(evt_tx: mpsc::Sender<Event>) {
    thread::spawn(move || {
        let mut pending: Option<Event> = None;
        loop {
            let event = match pending.take() {
                Some(e) => e,
                None => match cevent::read() {
                    Ok(evt) => match translate_event(evt) {
                        Some(e) => e,
                        None => continue,
                    },
                    Err(e) => {
                        tracing::error!("crossterm event read error: {}", e);
                        return;
                    }
                },
            };
            let mut event = event;
            while is_move(&event) && matches!(cevent::poll(Duration::ZERO), Ok(true)) {
                match cevent::read().ok().and_then(translate_event) {
                    Some(next) if is_move(&next) => event = next,
                    Some(next) => {
                        pending = Some(next);
                        break;
                    }
                    None => break,
                }
            }
            if evt_tx.send(event).is_err() {
                // The receiver is gone; the application is shutting down.
                return;
            }
        }
    });
}

/// A display on the controlling terminal, drawn through crossterm on
/// stderr.
pub struct CrosstermDisplay {
    /// Output handle.
    fp: Stderr,
    /// Is the terminal in raw mode on the alternate screen?
    started: bool,
    /// Report mouse events.
    mouse: bool,
    /// Attribute styles.
    palette: Palette,
    /// Display signals.
    signals: Signals<DisplaySignal, String>,
    /// Input sender, cloned into the emitter thread.
    tx: mpsc::Sender<Event>,
    /// Input receiver, until taken.
    rx: Option<mpsc::Receiver<Event>>,
    /// Has the emitter thread been started?
    emitting: bool,
    /// The last painted canvas, kept alive on purpose.
    last: Option<CanvasRef>,
    /// The last painted rows, for diffing.
    last_rows: Vec<Vec<(Option<Attr>, String)>>,
    /// The size of the last paint.
    last_size: Option<Expanse>,
}

impl Default for CrosstermDisplay {
    fn default() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            fp: io::stderr(),
            started: false,
            mouse: true,
            palette: Palette::default(),
            signals: Signals::new(),
            tx,
            rx: Some(rx),
            emitting: false,
            last: None,
            last_rows: vec![],
            last_size: None,
        }
    }
}

impl CrosstermDisplay {
    /// A display with the given palette.
    pub fn new(palette: Palette) -> Self {
        Self {
            palette,
            ..Self::default()
        }
    }

    /// Enter alternate screen and raw mode.
    fn enter(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        self.fp.execute(terminal::EnterAlternateScreen)?;
        if self.mouse {
            self.fp.execute(cevent::EnableMouseCapture)?;
        }
        self.fp.execute(ccursor::Hide)?;
        Ok(())
    }

    /// Leave alternate screen and restore terminal state.
    fn exit(&mut self) -> io::Result<()> {
        self.fp.execute(terminal::LeaveAlternateScreen)?;
        if self.mouse {
            self.fp.execute(cevent::DisableMouseCapture)?;
        }
        self.fp.execute(ccursor::Show)?;
        terminal::disable_raw_mode()?;
        Ok(())
    }

    /// Apply a style to subsequent output.
    fn apply_style(&mut self, s: &Style) -> io::Result<()> {
        // Reset clears colors too, so it has to come first.
        self.fp.queue(style::SetAttribute(style::Attribute::Reset))?;
        self.fp.queue(style::SetForegroundColor(translate_color(s.fg)))?;
        self.fp.queue(style::SetBackgroundColor(translate_color(s.bg)))?;
        let attrs = [
            (s.attrs.bold, style::Attribute::Bold),
            (s.attrs.dim, style::Attribute::Dim),
            (s.attrs.italic, style::Attribute::Italic),
            (s.attrs.underline, style::Attribute::Underlined),
            (s.attrs.reverse, style::Attribute::Reverse),
            (s.attrs.crossedout, style::Attribute::CrossedOut),
        ];
        for (on, attr) in attrs {
            if on {
                self.fp.queue(style::SetAttribute(attr))?;
            }
        }
        Ok(())
    }

    /// Paint the rows that changed since the last frame.
    fn paint(&mut self, size: Expanse, canvas: &CanvasRef) -> io::Result<()> {
        let rows = canvas.attr_runs();
        let full = self.last_size != Some(size);
        if full {
            self.fp.queue(terminal::Clear(terminal::ClearType::All))?;
        }
        for (y, row) in rows.iter().enumerate() {
            if !full && self.last_rows.get(y) == Some(row) {
                continue;
            }
            self.fp.queue(ccursor::MoveTo(0, y as u16))?;
            for (attr, text) in row {
                let s = self.palette.resolve(attr.as_ref());
                self.apply_style(&s)?;
                self.fp.queue(style::Print(text))?;
            }
        }
        self.fp.queue(style::SetAttribute(style::Attribute::Reset))?;
        match canvas.cursor() {
            Some(c) => {
                self.fp.queue(ccursor::MoveTo(c.x as u16, c.y as u16))?;
                self.fp.queue(ccursor::Show)?;
            }
            None => {
                self.fp.queue(ccursor::Hide)?;
            }
        }
        self.fp.flush()?;
        self.last_rows = rows;
        self.last_size = Some(size);
        Ok(())
    }
}

impl Display for CrosstermDisplay {
    fn start(&mut self) -> Result<()> {
        if self.started {
            return Ok(());
        }
        self.enter()?;
        self.started = true;
        self.last_size = None;
        if !self.emitting {
            event_emitter(self.tx.clone());
            self.emitting = true;
        }
        self.signals
            .emit(DisplaySignal::InputDescriptorsChanged, &String::new());
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        if !self.started {
            return Ok(());
        }
        self.started = false;
        self.exit()?;
        self.signals
            .emit(DisplaySignal::InputDescriptorsChanged, &String::new());
        Ok(())
    }

    fn started(&self) -> bool {
        self.started
    }

    fn cols_rows(&mut self) -> Result<Expanse> {
        let (w, h) = terminal::size()?;
        Ok(Expanse::new(w.into(), h.into()))
    }

    fn input_channel(&mut self) -> Option<mpsc::Receiver<Event>> {
        self.rx.take()
    }

    fn get_input(&mut self, timeout: Option<Duration>) -> Result<Vec<Event>> {
        let rx = self
            .rx
            .as_ref()
            .ok_or_else(|| Error::Backend("input channel has been taken".into()))?;
        drain_input(rx, timeout)
    }

    fn draw_screen(&mut self, size: Expanse, canvas: &CanvasRef) -> Result<()> {
        if !self.started {
            return Err(Error::Backend("display not started".into()));
        }
        self.paint(size, canvas)?;
        self.last = Some(canvas.clone());
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.last_size = None;
        self.last_rows.clear();
        Ok(())
    }

    fn register_palette(&mut self, palette: Palette) {
        let mut names: Vec<String> = palette.entries.keys().cloned().collect();
        names.sort();
        self.palette = palette;
        self.last_size = None;
        for name in names {
            self.signals.emit(DisplaySignal::UpdatePaletteEntry, &name);
        }
    }

    fn set_mouse_tracking(&mut self, enable: bool) -> Result<()> {
        if self.started && enable != self.mouse {
            if enable {
                self.fp.execute(cevent::EnableMouseCapture)?;
            } else {
                self.fp.execute(cevent::DisableMouseCapture)?;
            }
        }
        self.mouse = enable;
        Ok(())
    }

    fn signals(&mut self) -> &mut Signals<DisplaySignal, String> {
        &mut self.signals
    }
}

/// A boxed panic hook, as returned by [`panic::take_hook`].
type PanicHook = Box<dyn Fn(&panic::PanicHookInfo<'_>) + Sync + Send + 'static>;

/// Install a panic hook that puts the terminal back in order before
/// printing the panic. The previous hook is restored when the returned
/// guard drops.
pub fn panic_hook() -> ScopeGuard<PanicHook, impl FnOnce(PanicHook)> {
    let previous = panic::take_hook();
    panic::set_hook(Box::new(|pi| {
        let mut stderr = io::stderr();
        #[allow(unused_must_use)]
        {
            crossterm::execute!(
                stderr,
                terminal::LeaveAlternateScreen,
                cevent::DisableMouseCapture,
                ccursor::Show
            );
            terminal::disable_raw_mode();
            BacktracePrinter::new().print_panic_info(pi, &mut default_output_stream());
        }
    }));
    guard(previous, |hook| {
        panic::set_hook(hook);
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translate() {
        let k = cevent::KeyEvent::new(cevent::KeyCode::PageDown, cevent::KeyModifiers::CONTROL);
        assert_eq!(
            translate_event(cevent::Event::Key(k)),
            Some(Event::Key(key::Ctrl + key::KeyCode::PageDown))
        );
        assert_eq!(
            translate_event(cevent::Event::Resize(80, 24)),
            Some(Event::Resize(Expanse::new(80, 24)))
        );
        let m = cevent::MouseEvent {
            kind: cevent::MouseEventKind::Down(cevent::MouseButton::Left),
            column: 3,
            row: 4,
            modifiers: cevent::KeyModifiers::NONE,
        };
        assert_eq!(
            translate_event(cevent::Event::Mouse(m)),
            Some(Event::Mouse(mouse::MouseEvent::press(
                mouse::Button::Left,
                Point::new(3, 4)
            )))
        );
        assert_eq!(translate_color(Color::AnsiValue(7)), style::Color::AnsiValue(7));
    }
}
