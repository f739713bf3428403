use std::mem;

use unicode_segmentation::UnicodeSegmentation;

use crate::{
    cache,
    canvas::{Canvas, CanvasRef},
    command_map::{self, Command},
    error::Result,
    event::{
        key::{Key, KeyCode},
        mouse::{Button, MouseEvent},
    },
    geom::Point,
    id::WidgetId,
    signals::Signals,
    sizing::{RenderSize, Sizing},
    style::Attr,
    text::{self, Align, LineLayout, Wrap},
    widget::{PrefCol, Widget},
    widgets::text::{Markup, flatten, layout_rows},
};

/// Signals emitted by [`Edit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditSignal {
    /// The text is about to change; the payload is the new text.
    Change,
    /// The text has changed; the payload is the old text.
    PostChange,
}

/// A text editor with a caption. The cursor is shown when the editor is
/// rendered in focus.
pub struct Edit {
    /// Identity.
    id: WidgetId,
    /// Caption text, shown before the edit text.
    caption: String,
    /// Caption attribute runs.
    caption_attrs: Vec<(Option<Attr>, usize)>,
    /// The edit text.
    edit_text: String,
    /// Cursor byte offset into the edit text.
    edit_pos: usize,
    /// Line alignment.
    align: Align,
    /// Wrapping mode.
    wrap: Wrap,
    /// Enter inserts a newline.
    multiline: bool,
    /// Tab inserts spaces up to the next tab stop.
    allow_tab: bool,
    /// The column to hold during vertical moves, and the width it was
    /// set at.
    pref_col: Option<(PrefCol, u32)>,
    /// Change signals.
    signals: Signals<EditSignal, String>,
}

impl Edit {
    /// An editor with a plain caption and initial text. The cursor starts
    /// at the end of the text.
    pub fn new(caption: &str, text: impl Into<String>) -> Self {
        Self::with_caption(vec![(None, caption.to_string())], text)
    }

    /// An editor with an attributed caption.
    pub fn with_caption(caption: Markup, text: impl Into<String>) -> Self {
        let (caption, caption_attrs) = flatten(caption);
        let edit_text = text.into();
        Self {
            id: WidgetId::new(),
            caption,
            caption_attrs,
            edit_pos: edit_text.len(),
            edit_text,
            align: Align::Left,
            wrap: Wrap::Space,
            multiline: false,
            allow_tab: false,
            pref_col: None,
            signals: Signals::new(),
        }
    }

    /// Let enter insert newlines.
    pub fn multiline(mut self) -> Self {
        self.multiline = true;
        self
    }

    /// Let tab insert spaces.
    pub fn allow_tab(mut self) -> Self {
        self.allow_tab = true;
        self
    }

    /// Set the alignment.
    pub fn with_align(mut self, align: Align) -> Self {
        self.align = align;
        self
    }

    /// Set the wrapping mode.
    pub fn with_wrap(mut self, wrap: Wrap) -> Self {
        self.wrap = wrap;
        self
    }

    /// The caption.
    pub fn caption(&self) -> &str {
        &self.caption
    }

    /// The edit text.
    pub fn edit_text(&self) -> &str {
        &self.edit_text
    }

    /// The cursor offset in bytes.
    pub fn edit_pos(&self) -> usize {
        self.edit_pos
    }

    /// Change signals.
    pub fn signals(&mut self) -> &mut Signals<EditSignal, String> {
        &mut self.signals
    }

    /// Replace the edit text, keeping the cursor within it.
    pub fn set_edit_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.signals.emit(EditSignal::Change, &text);
        let old = mem::replace(&mut self.edit_text, text);
        if self.edit_pos > self.edit_text.len() || !self.edit_text.is_char_boundary(self.edit_pos) {
            self.edit_pos = self.edit_text.len();
        }
        cache::invalidate(self.id);
        self.signals.emit(EditSignal::PostChange, &old);
    }

    /// Move the cursor, clamped to the text. Forgets the preferred column.
    pub fn set_edit_pos(&mut self, pos: usize) {
        let mut pos = pos.min(self.edit_text.len());
        while !self.edit_text.is_char_boundary(pos) {
            pos -= 1;
        }
        self.edit_pos = pos;
        self.pref_col = None;
        cache::invalidate(self.id);
    }

    /// Insert text at the cursor and move the cursor past it.
    pub fn insert_text(&mut self, s: &str) {
        let mut t = self.edit_text.clone();
        t.insert_str(self.edit_pos, s);
        let pos = self.edit_pos + s.len();
        self.set_edit_text(t);
        self.set_edit_pos(pos);
    }

    /// Caption and edit text together.
    fn full_text(&self) -> String {
        let mut s = self.caption.clone();
        s.push_str(&self.edit_text);
        s
    }

    /// Layout of the caption and text at `cols` columns.
    fn layout(&self, cols: u32) -> (String, Vec<LineLayout>) {
        let full = self.full_text();
        let l = text::layout(&full, cols, self.align, self.wrap);
        (full, l)
    }

    /// Screen coordinates of an edit text offset.
    fn position_coords(&self, cols: u32, pos: usize) -> (u32, u32) {
        let (full, l) = self.layout(cols);
        text::pos_to_coords(&full, &l, self.caption.len() + pos)
    }

    /// Byte offset of the grapheme before the cursor.
    fn prev_pos(&self) -> Option<usize> {
        self.edit_text[..self.edit_pos]
            .graphemes(true)
            .next_back()
            .map(|g| self.edit_pos - g.len())
    }

    /// Byte offset of the grapheme after the cursor.
    fn next_pos(&self) -> Option<usize> {
        self.edit_text[self.edit_pos..]
            .graphemes(true)
            .next()
            .map(|g| self.edit_pos + g.len())
    }
}

impl Widget for Edit {
    fn id(&self) -> WidgetId {
        self.id
    }

    fn name(&self) -> &'static str {
        "edit"
    }

    fn sizing(&self) -> Sizing {
        Sizing::FLOW
    }

    fn selectable(&self) -> bool {
        true
    }

    fn rows(&mut self, cols: u32, _focus: bool) -> Result<u32> {
        Ok(self.layout(cols).1.len() as u32)
    }

    fn render(&mut self, size: RenderSize, focus: bool) -> Result<CanvasRef> {
        let cols = size.cols().unwrap_or(0);
        let (full, l) = self.layout(cols);
        let mut attrs = self.caption_attrs.clone();
        attrs.push((None, self.edit_text.len()));
        let rows = layout_rows(&full, &attrs, &l);
        let cursor = if focus { self.cursor_coords(size)? } else { None };
        Canvas::text(rows, Some(cols), cursor)
    }

    fn keypress(&mut self, size: RenderSize, key: Key) -> Result<Option<Key>> {
        let cols = size.cols().unwrap_or(0);
        if let Some(c) = key.printable() {
            self.insert_text(c.encode_utf8(&mut [0; 4]));
            return Ok(None);
        }
        if key == KeyCode::Tab && self.allow_tab {
            let (x, _) = self.position_coords(cols, self.edit_pos);
            self.insert_text(&" ".repeat(8 - (x as usize) % 8));
            return Ok(None);
        }
        if key == KeyCode::Enter && self.multiline {
            self.insert_text("\n");
            return Ok(None);
        }
        if key == KeyCode::Backspace {
            let Some(p) = self.prev_pos() else {
                return Ok(Some(key));
            };
            let mut t = self.edit_text.clone();
            t.replace_range(p..self.edit_pos, "");
            self.set_edit_text(t);
            self.set_edit_pos(p);
            return Ok(None);
        }
        if key == KeyCode::Delete {
            let Some(p) = self.next_pos() else {
                return Ok(Some(key));
            };
            let mut t = self.edit_text.clone();
            t.replace_range(self.edit_pos..p, "");
            self.pref_col = None;
            self.set_edit_text(t);
            return Ok(None);
        }
        match command_map::lookup(&key) {
            Some(Command::CursorLeft) => match self.prev_pos() {
                Some(p) => self.set_edit_pos(p),
                None => return Ok(Some(key)),
            },
            Some(Command::CursorRight) => match self.next_pos() {
                Some(p) => self.set_edit_pos(p),
                None => return Ok(Some(key)),
            },
            Some(cmd @ (Command::CursorUp | Command::CursorDown)) => {
                let (_, y) = self.position_coords(cols, self.edit_pos);
                let pref = self.pref_col(size)?.unwrap_or(PrefCol::Left);
                let y = match cmd {
                    Command::CursorUp if y == 0 => return Ok(Some(key)),
                    Command::CursorUp => y - 1,
                    _ => y + 1,
                };
                if !self.move_cursor_to_coords(size, pref, y)? {
                    return Ok(Some(key));
                }
            }
            Some(cmd @ (Command::CursorMaxLeft | Command::CursorMaxRight)) => {
                let (_, y) = self.position_coords(cols, self.edit_pos);
                let col = if cmd == Command::CursorMaxLeft {
                    PrefCol::Left
                } else {
                    PrefCol::Right
                };
                self.move_cursor_to_coords(size, col, y)?;
                self.pref_col = None;
            }
            _ => return Ok(Some(key)),
        }
        Ok(None)
    }

    fn mouse_event(&mut self, size: RenderSize, event: MouseEvent, _focus: bool) -> Result<bool> {
        if event.is_press() && event.button == Button::Left {
            let Point { x, y } = event.location;
            return self.move_cursor_to_coords(size, PrefCol::Col(x), y);
        }
        Ok(false)
    }

    fn cursor_coords(&mut self, size: RenderSize) -> Result<Option<Point>> {
        let cols = size.cols().unwrap_or(0);
        if cols == 0 {
            return Ok(None);
        }
        let (x, y) = self.position_coords(cols, self.edit_pos);
        Ok(Some(Point::new(x.min(cols - 1), y)))
    }

    fn pref_col(&mut self, size: RenderSize) -> Result<Option<PrefCol>> {
        let cols = size.cols().unwrap_or(0);
        match self.pref_col {
            Some((p, at)) if at == cols => Ok(Some(p)),
            _ => Ok(self.cursor_coords(size)?.map(|c| PrefCol::Col(c.x))),
        }
    }

    fn move_cursor_to_coords(&mut self, size: RenderSize, col: PrefCol, row: u32) -> Result<bool> {
        let cols = size.cols().unwrap_or(0);
        let (full, l) = self.layout(cols);
        let (_, top) = text::pos_to_coords(&full, &l, self.caption.len());
        if row < top || row as usize >= l.len() {
            return Ok(false);
        }
        let x = match col {
            PrefCol::Left => 0,
            PrefCol::Right => u32::MAX,
            PrefCol::Col(c) => c,
        };
        let pos = text::coords_to_pos(&full, &l, x, row);
        self.edit_pos = pos.saturating_sub(self.caption.len()).min(self.edit_text.len());
        self.pref_col = Some((col, cols));
        cache::invalidate(self.id);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use super::*;
    use crate::{event::key, widget::cached};

    #[test]
    fn typing_and_cursor() -> Result<()> {
        let e = cached(Edit::new("? ", "ab"));
        let size = RenderSize::Flow(10);
        e.borrow_mut().keypress(size, 'c'.into())?;
        assert_eq!(e.borrow().edit_text(), "abc");
        let c = e.borrow_mut().render(size, true)?;
        assert_eq!(c.cursor(), Some(Point::new(5, 0)));
        assert_eq!(c.text_lines(), vec!["? abc     "]);

        e.borrow_mut().keypress(size, KeyCode::Left.into())?;
        e.borrow_mut().keypress(size, KeyCode::Backspace.into())?;
        assert_eq!(e.borrow().edit_text(), "ac");
        assert_eq!(e.borrow().edit_pos(), 1);

        e.borrow_mut().keypress(size, KeyCode::Home.into())?;
        assert_eq!(e.borrow().edit_pos(), 0);
        assert_eq!(
            e.borrow_mut().keypress(size, KeyCode::Left.into())?,
            Some(KeyCode::Left.into())
        );
        e.borrow_mut().keypress(size, KeyCode::Delete.into())?;
        assert_eq!(e.borrow().edit_text(), "c");

        // Unfocused renders carry no cursor.
        let c = e.borrow_mut().render(size, false)?;
        assert_eq!(c.cursor(), None);
        Ok(())
    }

    #[test]
    fn vertical_moves_keep_column() -> Result<()> {
        let e = cached(Edit::new("", "abcdef\nab\nabcdef").multiline());
        let size = RenderSize::Flow(10);
        e.borrow_mut().set_edit_pos(5);
        e.borrow_mut().keypress(size, KeyCode::Down.into())?;
        assert_eq!(e.borrow_mut().cursor_coords(size)?, Some(Point::new(2, 1)));
        e.borrow_mut().keypress(size, KeyCode::Down.into())?;
        assert_eq!(e.borrow_mut().cursor_coords(size)?, Some(Point::new(5, 2)));
        assert_eq!(
            e.borrow_mut().keypress(size, KeyCode::Down.into())?,
            Some(KeyCode::Down.into())
        );
        e.borrow_mut().keypress(size, key::Ctrl + 'x')?;
        assert_eq!(e.borrow_mut().pref_col(size)?, Some(PrefCol::Col(5)));
        Ok(())
    }

    #[test]
    fn change_signals() -> Result<()> {
        let mut e = Edit::new("", "");
        let seen = Rc::new(RefCell::new(vec![]));
        let s = seen.clone();
        e.signals().connect(EditSignal::Change, move |t| s.borrow_mut().push(t.clone()));
        e.keypress(RenderSize::Flow(5), 'x'.into())?;
        e.keypress(RenderSize::Flow(5), 'y'.into())?;
        assert_eq!(*seen.borrow(), vec!["x".to_string(), "xy".to_string()]);
        Ok(())
    }

    #[test]
    fn mouse_moves_cursor() -> Result<()> {
        let mut e = Edit::new("> ", "hello");
        let size = RenderSize::Flow(10);
        assert!(e.mouse_event(size, MouseEvent::press(Button::Left, Point::new(4, 0)), true)?);
        assert_eq!(e.edit_pos(), 2);
        assert!(e.mouse_event(size, MouseEvent::press(Button::Left, Point::new(0, 0)), true)?);
        assert_eq!(e.edit_pos(), 0);
        Ok(())
    }
}
