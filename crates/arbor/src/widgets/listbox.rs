//! A scrolling list of flow widgets.
//!
//! The list box keeps only the focus position's screen placement: either
//! an offset (rows between the top edge and the focus item) or an inset
//! (the fraction of the focus item hidden above the top edge). Everything
//! else is recomputed from the walker each time it is needed, by walking
//! outward from the focus item until the box is full.
use std::{cell::RefCell, iter, rc::Rc};

use crate::{
    cache,
    canvas::{self, Canvas, CanvasRef},
    command_map::{self, Command},
    error::{Error, Result},
    event::{
        key::Key,
        mouse::{Button, MouseEvent},
    },
    geom::{Expanse, Point},
    id::WidgetId,
    signals::Subscription,
    sizing::{Dimension, RenderSize, Sizing, Valign, calculate_top_bottom_filler},
    widget::{PrefCol, Widget, WidgetRef},
    widgets::{
        container::Container,
        walker::{ListWalker, WalkerSignal},
    },
};

/// Which side a new focus is being approached from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComingFrom {
    /// The old focus is above the new one.
    Above,
    /// The old focus is below the new one.
    Below,
}

/// Where [`ListBox::set_focus_valign`] puts the focus item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusValign {
    /// Aligned within the box.
    Align(Valign),
    /// This many rows below the top edge.
    FixedTop(u32),
    /// This many rows above the bottom edge.
    FixedBottom(u32),
}

impl From<Valign> for FocusValign {
    fn from(v: Valign) -> Self {
        Self::Align(v)
    }
}

/// Focus work deferred until a size is known.
#[derive(Debug, Clone)]
enum Pending<P> {
    /// Move to the first visible selectable item at or below the focus.
    FirstSelectable,
    /// Focus moved away from `old`; keep it in view if possible.
    Moved {
        /// Direction hint from the caller.
        coming_from: Option<ComingFrom>,
        /// The focus position before the move.
        old: P,
    },
}

/// An item laid out by [`ListBox::calculate_visible`].
#[derive(Clone)]
pub struct VisibleItem<P> {
    /// The item.
    pub widget: WidgetRef,
    /// Its walker position.
    pub position: P,
    /// Rows it takes at the box width.
    pub rows: u32,
}

/// The visible portion of a list box at one size.
pub struct Visible<P> {
    /// Screen row of the focus item's top edge; negative when it is cut
    /// off above.
    pub offset: i64,
    /// The focus item.
    pub focus: VisibleItem<P>,
    /// The focus item's cursor, relative to the item.
    pub cursor: Option<Point>,
    /// Rows cut off the topmost item.
    pub trim_top: u32,
    /// Items above the focus, nearest first.
    pub above: Vec<VisibleItem<P>>,
    /// Rows cut off the bottommost item.
    pub trim_bottom: u32,
    /// Items below the focus, nearest first.
    pub below: Vec<VisibleItem<P>>,
}

/// Which ends of the list are on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Ends {
    /// The first item's top row is visible.
    pub top: bool,
    /// The last item's bottom row is visible.
    pub bottom: bool,
}

/// A candidate focus during paging.
struct Candidate<P> {
    /// Screen row of its top edge.
    offset: i64,
    /// The item.
    widget: WidgetRef,
    /// Its position.
    position: P,
    /// Its height.
    rows: i64,
}

/// Rows for an item at the box width.
fn item_rows(w: &WidgetRef, cols: u32, focus: bool) -> Result<i64> {
    Ok(i64::from(w.borrow_mut().rows(cols, focus)?))
}

/// A box widget showing a vertical list of flow widgets from a
/// [`ListWalker`].
pub struct ListBox<W: ListWalker> {
    /// Identity.
    id: WidgetId,
    /// The walker, shared with the application.
    body: Rc<RefCell<W>>,
    /// Our subscription to the walker's modified signal.
    subscription: Option<Subscription>,
    /// Rows above the focus item; only meaningful when the inset is zero.
    offset_rows: u32,
    /// Fraction of the focus item hidden above the top edge.
    inset_fraction: (u32, u32),
    /// Column to aim for when focus moves between items.
    pref_col: PrefCol,
    /// Deferred focus placement.
    pending: Option<Pending<W::Position>>,
    /// Deferred focus alignment.
    pending_valign: Option<FocusValign>,
}

impl<W: ListWalker> ListBox<W> {
    /// A list box over a walker it owns.
    pub fn new(walker: W) -> Self {
        Self::with_body(Rc::new(RefCell::new(walker)))
    }

    /// A list box over a shared walker. The list box redraws whenever the
    /// walker reports a modification.
    pub fn with_body(body: Rc<RefCell<W>>) -> Self {
        let id = WidgetId::new();
        let subscription = body
            .borrow_mut()
            .signals()
            .map(|s| s.connect(WalkerSignal::Modified, move |_| cache::invalidate(id)));
        Self {
            id,
            body,
            subscription,
            offset_rows: 0,
            inset_fraction: (0, 1),
            pref_col: PrefCol::Left,
            pending: Some(Pending::FirstSelectable),
            pending_valign: None,
        }
    }

    /// The walker.
    pub fn body(&self) -> Rc<RefCell<W>> {
        self.body.clone()
    }

    /// The remembered preferred column.
    pub fn remembered_pref_col(&self) -> PrefCol {
        self.pref_col
    }

    /// The walker's focus.
    fn walker_focus(&self) -> Option<(WidgetRef, W::Position)> {
        self.body.borrow().focus()
    }

    /// The walker item after `pos`.
    fn walker_next(&self, pos: &W::Position) -> Option<(WidgetRef, W::Position)> {
        self.body.borrow().next(pos)
    }

    /// The walker item before `pos`.
    fn walker_prev(&self, pos: &W::Position) -> Option<(WidgetRef, W::Position)> {
        self.body.borrow().prev(pos)
    }

    /// Move the walker's focus.
    fn walker_set_focus(&self, pos: W::Position) -> Result<()> {
        self.body.borrow_mut().set_focus(pos)
    }

    /// Fail unless rendered as a box.
    fn expect_box(&self, size: RenderSize) -> Result<Expanse> {
        match size {
            RenderSize::Box(e) => Ok(e),
            other => Err(Error::Sizing(format!("list box rendered at {other}"))),
        }
    }

    /// Move focus to `position`. Placement is worked out at the next call
    /// that knows the size: if the old focus is still visible the view
    /// stays put, otherwise the new focus goes to the bottom edge when
    /// coming from above, the top edge when coming from below, or the
    /// middle.
    pub fn set_focus(&mut self, position: W::Position, coming_from: Option<ComingFrom>) -> Result<()> {
        let Some((_, old)) = self.walker_focus() else {
            return Err(Error::OutOfRange("can't set focus, list box is empty".into()));
        };
        self.walker_set_focus(position)?;
        self.pending = Some(Pending::Moved { coming_from, old });
        cache::invalidate(self.id);
        Ok(())
    }

    /// Place the focus item at an explicit alignment on the next render.
    pub fn set_focus_valign(&mut self, valign: impl Into<FocusValign>) {
        self.pending_valign = Some(valign.into());
        cache::invalidate(self.id);
    }

    /// Finish any deferred focus work now that the size is known.
    fn complete_pending(&mut self, size: Expanse, focus: bool) -> Result<()> {
        cache::invalidate(self.id);
        let pending = self.pending.take();
        let valign = self.pending_valign.take();
        if matches!(pending, Some(Pending::FirstSelectable)) {
            return self.focus_first_selectable(size, focus);
        }
        if let Some(v) = valign {
            return self.complete_valign(size, focus, v);
        }
        let Some(Pending::Moved { coming_from, old }) = pending else {
            return Ok(());
        };
        let Some((_, position)) = self.walker_focus() else {
            return Ok(());
        };
        if position == old {
            return Ok(());
        }

        // Lay out around the old focus to see if the new one is on screen.
        self.walker_set_focus(old)?;
        let Some(vis) = self.calculate_visible(size, focus)? else {
            return Ok(());
        };
        let mut offset = vis.offset;
        for item in &vis.above {
            offset -= i64::from(item.rows);
            if item.position == position {
                return self.change_focus(size, position, offset, Some(ComingFrom::Below), None, None);
            }
        }
        offset = vis.offset + i64::from(vis.focus.rows);
        for item in &vis.below {
            if item.position == position {
                return self.change_focus(size, position, offset, Some(ComingFrom::Above), None, None);
            }
            offset += i64::from(item.rows);
        }

        self.walker_set_focus(position)?;
        let Some((w, _)) = self.walker_focus() else {
            return Ok(());
        };
        let rows = item_rows(&w, size.w, focus)?;
        let maxrow = i64::from(size.h);
        let offset = match coming_from {
            Some(ComingFrom::Below) => 0,
            Some(ComingFrom::Above) => maxrow - rows,
            None => (maxrow - rows).div_euclid(2),
        };
        self.shift_focus(size, offset)
    }

    /// Apply a deferred alignment.
    fn complete_valign(&mut self, size: Expanse, focus: bool, valign: FocusValign) -> Result<()> {
        let Some((w, _)) = self.walker_focus() else {
            return Ok(());
        };
        let rows = w.borrow_mut().rows(size.w, focus)?;
        let (valign, top, bottom) = match valign {
            FocusValign::Align(v) => (v, 0, 0),
            FocusValign::FixedTop(n) => (Valign::Top, n, 0),
            FocusValign::FixedBottom(n) => (Valign::Bottom, 0, n),
        };
        let (rtop, _) = calculate_top_bottom_filler(size.h, valign, Dimension::Given(rows), rows, None, top, bottom);
        let rtop = rtop.min(size.h.saturating_sub(1));
        self.shift_focus(size, i64::from(rtop))
    }

    /// Move focus to the first selectable item that is fully visible at or
    /// below the current focus.
    fn focus_first_selectable(&mut self, size: Expanse, focus: bool) -> Result<()> {
        let Some(vis) = self.calculate_visible(size, focus)? else {
            return Ok(());
        };
        if vis.focus.widget.borrow().selectable() {
            return Ok(());
        }
        let mut below = vis.below;
        if vis.trim_bottom > 0 {
            below.pop();
        }
        let mut offset = vis.offset + i64::from(vis.focus.rows);
        for item in below {
            if item.widget.borrow().selectable() {
                self.walker_set_focus(item.position)?;
                return self.shift_focus(size, offset);
            }
            offset += i64::from(item.rows);
        }
        Ok(())
    }

    /// The focus item's `(offset, inset)` rows at `size`.
    pub fn focus_offset_inset(&self, size: Expanse) -> Result<(i64, i64)> {
        let Some((w, _)) = self.walker_focus() else {
            return Ok((i64::from(self.offset_rows), 0));
        };
        let focus_rows = item_rows(&w, size.w, true)?;
        let offset = i64::from(self.offset_rows);
        if offset != 0 {
            return Ok((offset, 0));
        }
        let (inum, iden) = self.inset_fraction;
        if inum >= iden {
            return Err(Error::ListBox(format!("invalid inset fraction {inum}/{iden}")));
        }
        let inset = focus_rows * i64::from(inum) / i64::from(iden);
        if inset != 0 && inset >= focus_rows {
            return Err(Error::ListBox(format!(
                "inset of {inset} rows hides all {focus_rows} rows of the focus"
            )));
        }
        Ok((0, inset))
    }

    /// Lay out the visible items around the focus. Returns `None` when the
    /// walker is empty.
    pub fn calculate_visible(&mut self, size: Expanse, focus: bool) -> Result<Option<Visible<W::Position>>> {
        let (maxcol, maxrow) = (size.w, i64::from(size.h));
        if maxrow > 0 && (self.pending.is_some() || self.pending_valign.is_some()) {
            self.complete_pending(size, focus)?;
        }
        let Some((focus_widget, focus_pos)) = self.walker_focus() else {
            return Ok(None);
        };
        let (mut offset_rows, mut inset_rows) = self.focus_offset_inset(size)?;
        // At least one row of the focus stays on screen.
        if maxrow > 0 && offset_rows >= maxrow {
            offset_rows = maxrow - 1;
        }

        let mut cursor = None;
        if maxrow > 0 && focus && focus_widget.borrow().selectable() {
            cursor = focus_widget.borrow_mut().cursor_coords(RenderSize::Flow(maxcol))?;
        }
        if let Some(c) = cursor {
            let cy = i64::from(c.y);
            let effective = cy + offset_rows - inset_rows;
            if effective < 0 {
                inset_rows = cy;
            } else if effective >= maxrow {
                offset_rows = maxrow - cy - 1;
                if offset_rows < 0 {
                    inset_rows = -offset_rows;
                    offset_rows = 0;
                }
            }
        }

        let mut trim_top = inset_rows;
        let focus_rows = item_rows(&focus_widget, maxcol, true)?;

        // Items above, until the offset is filled.
        let mut pos = focus_pos.clone();
        let mut fill = offset_rows;
        let mut above = vec![];
        let mut top_pos = pos.clone();
        while fill > 0 {
            let Some((prev, p)) = self.walker_prev(&pos) else {
                offset_rows -= fill;
                break;
            };
            pos = p;
            top_pos = pos.clone();
            let rows = item_rows(&prev, maxcol, false)?;
            if rows > 0 {
                above.push(VisibleItem {
                    widget: prev,
                    position: pos.clone(),
                    rows: rows as u32,
                });
            }
            if rows > fill {
                trim_top = rows - fill;
                break;
            }
            fill -= rows;
        }

        let mut trim_bottom = (focus_rows + offset_rows - inset_rows - maxrow).max(0);

        // Items below, until the bottom edge.
        let mut pos = focus_pos.clone();
        let mut fill = maxrow - focus_rows - offset_rows + inset_rows;
        let mut below = vec![];
        while fill > 0 {
            let Some((next, p)) = self.walker_next(&pos) else {
                break;
            };
            pos = p;
            let rows = item_rows(&next, maxcol, false)?;
            if rows > 0 {
                below.push(VisibleItem {
                    widget: next,
                    position: pos.clone(),
                    rows: rows as u32,
                });
            }
            if rows > fill {
                trim_bottom = rows - fill;
                fill -= rows;
                break;
            }
            fill -= rows;
        }

        // Space left at the bottom: reveal more at the top.
        let mut fill = fill.max(0);
        if fill > 0 && trim_top > 0 {
            let n = fill.min(trim_top);
            trim_top -= n;
            offset_rows += n;
            fill -= n;
        }
        let mut pos = top_pos;
        while fill > 0 {
            let Some((prev, p)) = self.walker_prev(&pos) else {
                break;
            };
            pos = p;
            let rows = item_rows(&prev, maxcol, false)?;
            if rows > 0 {
                above.push(VisibleItem {
                    widget: prev,
                    position: pos.clone(),
                    rows: rows as u32,
                });
            }
            if rows > fill {
                trim_top = rows - fill;
                offset_rows += fill;
                break;
            }
            fill -= rows;
            offset_rows += rows;
        }

        Ok(Some(Visible {
            offset: offset_rows - inset_rows,
            focus: VisibleItem {
                widget: focus_widget,
                position: focus_pos,
                rows: focus_rows as u32,
            },
            cursor,
            trim_top: trim_top as u32,
            above,
            trim_bottom: trim_bottom as u32,
            below,
        }))
    }

    /// Render one item and check it against its calculated rows.
    fn render_item(&self, item: &VisibleItem<W::Position>, cols: u32, focus: bool) -> Result<CanvasRef> {
        let c = item.widget.borrow_mut().render(RenderSize::Flow(cols), focus)?;
        if c.rows() != item.rows {
            return Err(Error::ListBox(format!(
                "widget at position {:?} calculated {} rows but rendered {}",
                item.position,
                item.rows,
                c.rows()
            )));
        }
        Ok(c)
    }

    /// Move the focus item relative to the top edge: a positive value is
    /// the rows above it, a negative one the rows of it hidden above the
    /// edge.
    pub fn shift_focus(&mut self, size: Expanse, offset_inset: i64) -> Result<()> {
        let maxrow = i64::from(size.h);
        if offset_inset >= 0 {
            if offset_inset >= maxrow {
                return Err(Error::ListBox(format!(
                    "invalid offset {offset_inset}, only {maxrow} rows in list box"
                )));
            }
            self.offset_rows = offset_inset as u32;
            self.inset_fraction = (0, 1);
        } else {
            let Some((target, _)) = self.walker_focus() else {
                return Ok(());
            };
            let tgt_rows = item_rows(&target, size.w, true)?;
            if offset_inset + tgt_rows <= 0 {
                return Err(Error::ListBox(format!(
                    "invalid inset {offset_inset}, only {tgt_rows} rows in target"
                )));
            }
            self.offset_rows = 0;
            self.inset_fraction = ((-offset_inset) as u32, tgt_rows as u32);
        }
        cache::invalidate(self.id);
        Ok(())
    }

    /// Remember the focus item's preferred column.
    fn update_pref_col_from_focus(&mut self, size: Expanse) -> Result<()> {
        let Some((w, _)) = self.walker_focus() else {
            return Ok(());
        };
        let flow = RenderSize::Flow(size.w);
        let mut pref = w.borrow_mut().pref_col(flow)?;
        if pref.is_none() {
            pref = w.borrow_mut().cursor_coords(flow)?.map(|c| PrefCol::Col(c.x));
        }
        if let Some(p) = pref {
            self.pref_col = p;
        }
        Ok(())
    }

    /// Focus `position` and place it at `offset_inset` (see
    /// [`shift_focus`](Self::shift_focus)).
    ///
    /// A selectable target approached from above or below is snapped fully
    /// into view, scrolling at most `snap_rows` extra rows (default: one
    /// less than the height). The cursor is then placed at `cursor`, or at
    /// the remembered column on the row nearest the edge it came from.
    pub fn change_focus(
        &mut self,
        size: Expanse,
        position: W::Position,
        mut offset_inset: i64,
        coming_from: Option<ComingFrom>,
        cursor: Option<(PrefCol, u32)>,
        snap_rows: Option<i64>,
    ) -> Result<()> {
        let (maxcol, maxrow) = (size.w, i64::from(size.h));
        match cursor {
            Some((col, _)) => self.pref_col = col,
            None => self.update_pref_col_from_focus(size)?,
        }
        cache::invalidate(self.id);
        tracing::debug!(?position, offset_inset, ?coming_from, "list box focus change");
        self.walker_set_focus(position)?;
        let Some((target, _)) = self.walker_focus() else {
            return Ok(());
        };
        let tgt_rows = item_rows(&target, maxcol, true)?;
        let snap_rows = snap_rows.unwrap_or(maxrow - 1);
        let selectable = target.borrow().selectable();

        let align_top = 0;
        let align_bottom = maxrow - tgt_rows;
        if coming_from == Some(ComingFrom::Above) && selectable && offset_inset > align_bottom {
            if snap_rows >= offset_inset - align_bottom {
                offset_inset = align_bottom;
            } else if snap_rows >= offset_inset - align_top {
                offset_inset = align_top;
            } else {
                offset_inset -= snap_rows;
            }
        }
        if coming_from == Some(ComingFrom::Below) && selectable && offset_inset < align_top {
            if snap_rows >= align_top - offset_inset {
                offset_inset = align_top;
            } else if snap_rows >= align_bottom - offset_inset {
                offset_inset = align_bottom;
            } else {
                offset_inset += snap_rows;
            }
        }

        if offset_inset >= 0 {
            self.offset_rows = offset_inset as u32;
            self.inset_fraction = (0, 1);
        } else {
            if offset_inset + tgt_rows <= 0 {
                return Err(Error::ListBox(format!(
                    "invalid inset {offset_inset}, only {tgt_rows} rows in target"
                )));
            }
            self.offset_rows = 0;
            self.inset_fraction = ((-offset_inset) as u32, tgt_rows as u32);
        }

        let tgt_rows = tgt_rows as u32;
        let (col, attempts): (PrefCol, Vec<u32>) = match (cursor, coming_from) {
            (None, None) => return Ok(()),
            (None, Some(ComingFrom::Above)) => (self.pref_col, (0..tgt_rows).collect()),
            (None, Some(ComingFrom::Below)) => (self.pref_col, (0..tgt_rows).rev().collect()),
            (Some((col, row)), from) => {
                if row >= tgt_rows {
                    return Err(Error::ListBox(format!(
                        "cursor row {row} outside target of {tgt_rows} rows"
                    )));
                }
                let rows = match from {
                    Some(ComingFrom::Above) => (0..=row).rev().collect(),
                    Some(ComingFrom::Below) => (row..tgt_rows).collect(),
                    None => vec![row],
                };
                (col, rows)
            }
        };
        for row in attempts {
            if target.borrow_mut().move_cursor_to_coords(RenderSize::Flow(maxcol), col, row)? {
                break;
            }
        }
        Ok(())
    }

    /// Shift the focus item so its cursor is on screen.
    pub fn make_cursor_visible(&mut self, size: Expanse) -> Result<()> {
        let Some((w, _)) = self.walker_focus() else {
            return Ok(());
        };
        if !w.borrow().selectable() {
            return Ok(());
        }
        let Some(c) = w.borrow_mut().cursor_coords(RenderSize::Flow(size.w))? else {
            return Ok(());
        };
        let cy = i64::from(c.y);
        let (offset, inset) = self.focus_offset_inset(size)?;
        if cy < inset {
            return self.shift_focus(size, -cy);
        }
        if offset - inset + cy >= i64::from(size.h) {
            return self.shift_focus(size, i64::from(size.h) - cy - 1);
        }
        Ok(())
    }

    /// Which ends of the list are visible at `size`.
    pub fn ends_visible(&mut self, size: Expanse, focus: bool) -> Result<Ends> {
        let Some(vis) = self.calculate_visible(size, focus)? else {
            return Ok(Ends { top: true, bottom: true });
        };
        let mut ends = Ends::default();
        if vis.trim_bottom == 0 {
            let mut row = vis.offset + i64::from(vis.focus.rows);
            let mut pos = &vis.focus.position;
            for item in &vis.below {
                row += i64::from(item.rows);
                pos = &item.position;
            }
            ends.bottom = row < i64::from(size.h) || self.walker_next(pos).is_none();
        }
        if vis.trim_top == 0 {
            let pos = vis.above.last().map_or(&vis.focus.position, |i| &i.position);
            ends.top = self.walker_prev(pos).is_none();
        }
        Ok(ends)
    }

    /// Every position in the walker: in order when the walker can list
    /// them, otherwise from the focus down and then upward from above it.
    pub fn positions(&self, reverse: bool) -> Vec<W::Position> {
        if let Some(v) = self.body.borrow().positions(reverse) {
            return v;
        }
        let Some((_, focus)) = self.walker_focus() else {
            return vec![];
        };
        let mut down = vec![focus.clone()];
        let mut pos = focus.clone();
        while let Some((_, p)) = self.walker_next(&pos) {
            down.push(p.clone());
            pos = p;
        }
        let mut up = vec![];
        pos = focus;
        while let Some((_, p)) = self.walker_prev(&pos) {
            up.push(p.clone());
            pos = p;
        }
        if reverse {
            up.extend(down);
            up
        } else {
            down.extend(up);
            down
        }
    }

    /// Move up one row, or to the nearest selectable item above. Returns
    /// false if the key was not used.
    fn keypress_up(&mut self, size: Expanse) -> Result<bool> {
        let (maxcol, maxrow) = (size.w, i64::from(size.h));
        let Some(vis) = self.calculate_visible(size, true)? else {
            return Ok(false);
        };
        let focus_row_offset = vis.offset;
        let focus_selectable = vis.focus.widget.borrow().selectable();
        let mut row_offset = focus_row_offset;
        let mut pos = vis.focus.position.clone();
        let mut widget = None;
        let mut rows = 0;

        for item in &vis.above {
            rows = i64::from(item.rows);
            row_offset -= rows;
            pos = item.position.clone();
            widget = Some(item.widget.clone());
            if rows > 0 && item.widget.borrow().selectable() {
                self.change_focus(size, pos, row_offset, Some(ComingFrom::Below), None, None)?;
                return Ok(true);
            }
        }

        // Scroll, bringing in a new item if needed.
        row_offset += 1;
        cache::invalidate(self.id);
        while row_offset > 0 {
            let Some((w, p)) = self.walker_prev(&pos) else {
                return Ok(false);
            };
            pos = p;
            rows = item_rows(&w, maxcol, true)?;
            row_offset -= rows;
            let selectable = w.borrow().selectable();
            widget = Some(w);
            if rows > 0 && selectable {
                self.change_focus(size, pos, row_offset, Some(ComingFrom::Below), None, None)?;
                return Ok(true);
            }
        }

        if !focus_selectable || focus_row_offset + 1 >= maxrow {
            // Take the top item when the focus isn't selectable or has
            // moved off screen.
            match widget {
                None => self.shift_focus(size, row_offset)?,
                Some(_) => self.change_focus(size, pos, row_offset, Some(ComingFrom::Below), None, None)?,
            }
            return Ok(true);
        }

        if let Some(c) = vis.cursor
            && i64::from(c.y) + focus_row_offset + 1 >= maxrow
        {
            // The cursor would scroll off the bottom; move focus instead.
            if widget.is_none() {
                let Some((w, p)) = self.walker_prev(&pos) else {
                    return Ok(true);
                };
                pos = p;
                rows = item_rows(&w, maxcol, true)?;
                row_offset -= rows;
            }
            if -row_offset >= rows {
                row_offset = -(rows - 1);
            }
            self.change_focus(size, pos, row_offset, Some(ComingFrom::Below), None, None)?;
            return Ok(true);
        }

        self.shift_focus(size, focus_row_offset + 1)?;
        Ok(true)
    }

    /// Move down one row, or to the nearest selectable item below. Returns
    /// false if the key was not used.
    fn keypress_down(&mut self, size: Expanse) -> Result<bool> {
        let (maxcol, maxrow) = (size.w, i64::from(size.h));
        let Some(vis) = self.calculate_visible(size, true)? else {
            return Ok(false);
        };
        let focus_row_offset = vis.offset;
        let focus_rows = i64::from(vis.focus.rows);
        let focus_selectable = vis.focus.widget.borrow().selectable();
        let mut row_offset = focus_row_offset + focus_rows;
        let mut rows = focus_rows;
        let mut pos = vis.focus.position.clone();
        let mut widget = None;

        for item in &vis.below {
            rows = i64::from(item.rows);
            pos = item.position.clone();
            widget = Some(item.widget.clone());
            if rows > 0 && item.widget.borrow().selectable() {
                self.change_focus(size, pos, row_offset, Some(ComingFrom::Above), None, None)?;
                return Ok(true);
            }
            row_offset += rows;
        }

        // Scroll, bringing in a new item if needed.
        row_offset -= 1;
        cache::invalidate(self.id);
        while row_offset < maxrow {
            let Some((w, p)) = self.walker_next(&pos) else {
                return Ok(false);
            };
            pos = p;
            rows = item_rows(&w, maxcol, false)?;
            let selectable = w.borrow().selectable();
            widget = Some(w);
            if rows > 0 && selectable {
                self.change_focus(size, pos, row_offset, Some(ComingFrom::Above), None, None)?;
                return Ok(true);
            }
            row_offset += rows;
        }

        if !focus_selectable || focus_row_offset + focus_rows - 1 <= 0 {
            // Take the bottom item when the focus isn't selectable or has
            // moved off screen.
            match widget {
                None => self.shift_focus(size, row_offset - rows)?,
                Some(_) => {
                    self.change_focus(size, pos, row_offset - rows, Some(ComingFrom::Above), None, None)?
                }
            }
            return Ok(true);
        }

        if let Some(c) = vis.cursor
            && i64::from(c.y) + focus_row_offset - 1 < 0
        {
            // The cursor would scroll off the top; move focus instead.
            if widget.is_none() {
                let Some((_, p)) = self.walker_next(&pos) else {
                    return Ok(true);
                };
                pos = p;
            } else {
                row_offset -= rows;
            }
            if row_offset >= maxrow {
                row_offset = maxrow - 1;
            }
            self.change_focus(size, pos, row_offset, Some(ComingFrom::Above), None, None)?;
            return Ok(true);
        }

        self.shift_focus(size, focus_row_offset - 1)?;
        Ok(true)
    }

    /// The focus row offset after a change, for judging a paging move.
    fn actual_offset(&mut self, size: Expanse) -> Result<Option<i64>> {
        Ok(self.calculate_visible(size, true)?.map(|v| v.offset))
    }

    /// Search order for paging: the newly revealed items, then the visible
    /// ones from the far edge back.
    fn search_order(snap_region_start: usize, len: usize) -> Vec<usize> {
        (snap_region_start..len).chain((0..snap_region_start).rev()).collect()
    }

    /// Move up one page.
    fn keypress_page_up(&mut self, size: Expanse) -> Result<bool> {
        let (maxcol, maxrow) = (size.w, i64::from(size.h));
        let Some(vis) = self.calculate_visible(size, true)? else {
            return Ok(false);
        };
        let focus_pos = vis.focus.position.clone();
        let focus_selectable = vis.focus.widget.borrow().selectable();
        let topmost_visible = vis.offset;

        // Scroll from the top row if the focus isn't selectable, the
        // cursor row if it has a cursor, otherwise its top row when
        // visible.
        let scroll_from_row = if !focus_selectable {
            topmost_visible
        } else if let Some(c) = vis.cursor {
            -i64::from(c.y)
        } else if vis.offset >= 0 {
            0
        } else {
            topmost_visible
        };
        let snap_rows = topmost_visible - scroll_from_row;
        let mut row_offset = scroll_from_row + maxrow;

        let mut t = vec![Candidate {
            offset: row_offset,
            widget: vis.focus.widget.clone(),
            position: focus_pos.clone(),
            rows: i64::from(vis.focus.rows),
        }];
        let mut pos = focus_pos.clone();
        for item in &vis.above {
            row_offset -= i64::from(item.rows);
            pos = item.position.clone();
            t.push(Candidate {
                offset: row_offset,
                widget: item.widget.clone(),
                position: item.position.clone(),
                rows: i64::from(item.rows),
            });
        }
        let mut snap_region_start = t.len();
        while row_offset > -snap_rows {
            let Some((w, p)) = self.walker_prev(&pos) else {
                break;
            };
            pos = p;
            let rows = item_rows(&w, maxcol, false)?;
            row_offset -= rows;
            if row_offset > 0 {
                snap_region_start += 1;
            }
            t.push(Candidate {
                offset: row_offset,
                widget: w,
                position: pos.clone(),
                rows,
            });
        }

        // Can't fill the top: shift everything up.
        if let Some(last) = t.last()
            && last.offset > 0
        {
            let adjust = last.offset;
            for c in &mut t {
                c.offset -= adjust;
            }
        }
        // Drop the old focus if it is now below the bottom edge.
        if t.first().is_some_and(|c| c.offset >= maxrow) {
            t.remove(0);
            snap_region_start = snap_region_start.saturating_sub(1);
        }

        self.update_pref_col_from_focus(size)?;

        let order = Self::search_order(snap_region_start, t.len());
        let mut bad = vec![];
        let mut cut_off_selectable = false;
        for &i in &order {
            let c = &t[i];
            if !c.widget.borrow().selectable() || c.rows == 0 {
                continue;
            }
            let pref_row = (-c.offset).max(0);
            if c.rows + c.offset <= 0 {
                // Entirely within the snap region.
                self.change_focus(
                    size,
                    c.position.clone(),
                    -(c.rows - 1),
                    Some(ComingFrom::Below),
                    Some((self.pref_col, (c.rows - 1) as u32)),
                    Some(snap_rows - ((-c.offset) - (c.rows - 1))),
                )?;
            } else {
                self.change_focus(
                    size,
                    c.position.clone(),
                    c.offset,
                    Some(ComingFrom::Below),
                    Some((self.pref_col, pref_row as u32)),
                    Some(snap_rows),
                )?;
            }

            let Some(act) = self.actual_offset(size)? else {
                return Ok(true);
            };
            // A fixed cursor that would cut the scroll short is a last
            // resort; so is landing cut off at the top.
            if act > c.offset + snap_rows || act < c.offset {
                bad.push(i);
                continue;
            }
            if act < 0 {
                bad.push(i);
                cut_off_selectable = true;
                continue;
            }
            return Ok(true);
        }
        if cut_off_selectable {
            return Ok(true);
        }

        // Nothing selectable: take the topmost item.
        let good = order.iter().copied().filter(|j| !bad.contains(j));
        for i in good.chain(order.iter().copied()) {
            let c = &t[i];
            if c.position == focus_pos || c.rows == 0 {
                continue;
            }
            let (mut offset, mut snap) = (c.offset, snap_rows);
            if c.rows + offset <= 0 {
                snap -= (-offset) - (c.rows - 1);
                offset = -(c.rows - 1);
            }
            self.change_focus(size, c.position.clone(), offset, Some(ComingFrom::Below), None, Some(snap))?;
            return Ok(true);
        }

        // No choices: shift the current focus.
        let row_offset = order.last().map_or(row_offset, |&i| t[i].offset);
        let cur_rows = match self.walker_focus() {
            Some((w, _)) => item_rows(&w, maxcol, true)?,
            None => return Ok(true),
        };
        self.shift_focus(size, row_offset.min(maxrow - 1).max(1 - cur_rows))?;

        // If that fell short, bring in one row of the item above.
        let Some(act) = self.actual_offset(size)? else {
            return Ok(true);
        };
        if act >= row_offset {
            return Ok(true);
        }
        let Some(last) = t.last() else {
            return Ok(true);
        };
        let Some((w, p)) = self.walker_prev(&last.position) else {
            return Ok(true);
        };
        let rows = item_rows(&w, maxcol, true)?;
        if rows == 0 {
            return Ok(true);
        }
        let pref = self.pref_col;
        self.change_focus(
            size,
            p,
            -(rows - 1),
            Some(ComingFrom::Below),
            Some((pref, (rows - 1) as u32)),
            Some(0),
        )?;
        Ok(true)
    }

    /// Move down one page.
    fn keypress_page_down(&mut self, size: Expanse) -> Result<bool> {
        let (maxcol, maxrow) = (size.w, i64::from(size.h));
        let Some(vis) = self.calculate_visible(size, true)? else {
            return Ok(false);
        };
        let focus_pos = vis.focus.position.clone();
        let focus_rows = i64::from(vis.focus.rows);
        let focus_selectable = vis.focus.widget.borrow().selectable();
        let bottom_edge = maxrow - vis.offset;

        // Scroll from the bottom edge if the focus isn't selectable, the
        // row below the cursor if it has one, otherwise its bottom edge
        // when visible.
        let scroll_from_row = if !focus_selectable {
            bottom_edge
        } else if let Some(c) = vis.cursor {
            i64::from(c.y) + 1
        } else if bottom_edge >= focus_rows {
            focus_rows
        } else {
            bottom_edge
        };
        let snap_rows = bottom_edge - scroll_from_row;
        let mut row_offset = -scroll_from_row;

        let mut t = vec![Candidate {
            offset: row_offset,
            widget: vis.focus.widget.clone(),
            position: focus_pos.clone(),
            rows: focus_rows,
        }];
        let mut pos = focus_pos.clone();
        row_offset += focus_rows;
        for item in &vis.below {
            t.push(Candidate {
                offset: row_offset,
                widget: item.widget.clone(),
                position: item.position.clone(),
                rows: i64::from(item.rows),
            });
            pos = item.position.clone();
            row_offset += i64::from(item.rows);
        }
        let mut snap_region_start = t.len();
        while row_offset < maxrow + snap_rows {
            let Some((w, p)) = self.walker_next(&pos) else {
                break;
            };
            pos = p;
            let rows = item_rows(&w, maxcol, false)?;
            t.push(Candidate {
                offset: row_offset,
                widget: w,
                position: pos.clone(),
                rows,
            });
            row_offset += rows;
            if row_offset < maxrow {
                snap_region_start += 1;
            }
        }

        // Can't fill the bottom: shift everything down.
        if let Some(last) = t.last()
            && last.offset + last.rows < maxrow
        {
            let adjust = maxrow - (last.offset + last.rows);
            for c in &mut t {
                c.offset += adjust;
            }
        }
        // Drop the old focus if it is now above the top edge.
        if t.first().is_some_and(|c| c.offset + c.rows <= 0) {
            t.remove(0);
            snap_region_start = snap_region_start.saturating_sub(1);
        }

        self.update_pref_col_from_focus(size)?;

        let order = Self::search_order(snap_region_start, t.len());
        let mut bad = vec![];
        let mut cut_off_selectable = false;
        for &i in &order {
            let c = &t[i];
            if !c.widget.borrow().selectable() || c.rows == 0 {
                continue;
            }
            let pref_row = (maxrow - c.offset - 1).min(c.rows - 1);
            if c.offset >= maxrow {
                // Entirely within the snap region.
                self.change_focus(
                    size,
                    c.position.clone(),
                    maxrow - 1,
                    Some(ComingFrom::Above),
                    Some((self.pref_col, 0)),
                    Some(snap_rows + maxrow - c.offset - 1),
                )?;
            } else {
                self.change_focus(
                    size,
                    c.position.clone(),
                    c.offset,
                    Some(ComingFrom::Above),
                    Some((self.pref_col, pref_row as u32)),
                    Some(snap_rows),
                )?;
            }

            let Some(act) = self.actual_offset(size)? else {
                return Ok(true);
            };
            if act < c.offset - snap_rows || act > c.offset {
                bad.push(i);
                continue;
            }
            if act + c.rows > maxrow {
                bad.push(i);
                cut_off_selectable = true;
                continue;
            }
            return Ok(true);
        }
        if cut_off_selectable {
            return Ok(true);
        }

        // Nothing selectable: take the bottommost item.
        let good = order.iter().copied().filter(|j| !bad.contains(j));
        for i in good.chain(order.iter().copied()) {
            let c = &t[i];
            if c.position == focus_pos || c.rows == 0 {
                continue;
            }
            let (mut offset, mut snap) = (c.offset, snap_rows);
            if offset >= maxrow {
                snap -= snap + maxrow - offset - 1;
                offset = maxrow - 1;
            }
            self.change_focus(size, c.position.clone(), offset, Some(ComingFrom::Above), None, Some(snap))?;
            return Ok(true);
        }

        // No choices: shift the current focus.
        let row_offset = order.last().map_or(row_offset, |&i| t[i].offset);
        self.shift_focus(size, row_offset.max(1 - focus_rows).min(maxrow - 1))?;

        // If that fell short, bring in one row of the item below.
        let Some(act) = self.actual_offset(size)? else {
            return Ok(true);
        };
        if act <= row_offset {
            return Ok(true);
        }
        let Some(last) = t.last() else {
            return Ok(true);
        };
        let Some((_, p)) = self.walker_next(&last.position) else {
            return Ok(true);
        };
        let pref = self.pref_col;
        self.change_focus(size, p, maxrow - 1, Some(ComingFrom::Above), Some((pref, 0)), Some(0))?;
        Ok(true)
    }

    /// Focus the first or last item.
    fn keypress_max(&mut self, size: Expanse, last: bool) -> Result<bool> {
        let listed = self.body.borrow().positions(last);
        let target = match listed {
            Some(v) => v.into_iter().next(),
            None => {
                let Some((_, mut pos)) = self.walker_focus() else {
                    return Ok(false);
                };
                loop {
                    let step = if last {
                        self.walker_next(&pos)
                    } else {
                        self.walker_prev(&pos)
                    };
                    match step {
                        Some((_, p)) => pos = p,
                        None => break,
                    }
                }
                Some(pos)
            }
        };
        let Some(target) = target else {
            return Ok(false);
        };
        self.walker_set_focus(target)?;
        self.pending = None;
        self.pending_valign = Some(FocusValign::Align(if last { Valign::Bottom } else { Valign::Top }));
        self.complete_pending(size, true)?;
        Ok(true)
    }
}

impl<W: ListWalker> Container for ListBox<W> {
    type Position = W::Position;

    fn focus(&self) -> Option<WidgetRef> {
        self.walker_focus().map(|(w, _)| w)
    }

    fn focus_position(&self) -> Result<W::Position> {
        self.walker_focus()
            .map(|(_, p)| p)
            .ok_or_else(|| Error::OutOfRange("list box is empty".into()))
    }

    fn set_focus_position(&mut self, position: W::Position) -> Result<()> {
        self.set_focus(position, None)
    }
}

impl<W: ListWalker> Widget for ListBox<W> {
    fn id(&self) -> WidgetId {
        self.id
    }

    fn name(&self) -> &'static str {
        "list box"
    }

    fn sizing(&self) -> Sizing {
        Sizing::BOX
    }

    fn selectable(&self) -> bool {
        true
    }

    fn cacheable(&self) -> bool {
        self.subscription.is_some()
    }

    fn render(&mut self, size: RenderSize, focus: bool) -> Result<CanvasRef> {
        let size = self.expect_box(size)?;
        if size.w == 0 || size.h == 0 {
            return Ok(Canvas::blank(size));
        }
        let Some(vis) = self.calculate_visible(size, focus)? else {
            return Ok(Canvas::blank(size));
        };
        let maxrow = size.h;

        let mut parts = Vec::with_capacity(vis.above.len() + vis.below.len() + 1);
        let mut rows = 0;
        for item in vis.above.iter().rev() {
            parts.push((self.render_item(item, size.w, false)?, false));
            rows += item.rows;
        }
        let focus_canvas = self.render_item(&vis.focus, size.w, focus)?;
        if focus_canvas.cursor() != vis.cursor {
            return Err(Error::ListBox(format!(
                "focus widget at position {:?} calculated cursor {:?} but rendered {:?}",
                vis.focus.position,
                vis.cursor,
                focus_canvas.cursor()
            )));
        }
        parts.push((focus_canvas, true));
        rows += vis.focus.rows;
        for item in &vis.below {
            parts.push((self.render_item(item, size.w, false)?, false));
            rows += item.rows;
        }

        let mut out = canvas::combine(parts)?;
        if vis.trim_top > 0 {
            out = canvas::trim(out, vis.trim_top, None)?;
            rows -= vis.trim_top;
        }
        if vis.trim_bottom > 0 {
            out = canvas::trim_end(out, vis.trim_bottom)?;
            rows -= vis.trim_bottom;
        }
        if rows > maxrow {
            return Err(Error::ListBox(format!("contents too long: {rows} rows in {maxrow}")));
        }
        if rows < maxrow {
            let bottom = vis.below.last().map_or(&vis.focus.position, |i| &i.position);
            if vis.trim_bottom != 0 || self.walker_next(bottom).is_some() {
                return Err(Error::ListBox(format!("contents too short: {rows} rows in {maxrow}")));
            }
            out = canvas::pad_trim_top_bottom(out, 0, (maxrow - rows) as i32)?;
        }
        Ok(out)
    }

    fn keypress(&mut self, size: RenderSize, key: Key) -> Result<Option<Key>> {
        let size = self.expect_box(size)?;
        if size.w == 0 || size.h == 0 {
            return Ok(Some(key));
        }
        if self.pending.is_some() || self.pending_valign.is_some() {
            self.complete_pending(size, true)?;
        }
        let Some((w, _)) = self.walker_focus() else {
            return Ok(Some(key));
        };
        let mut key = key;
        if w.borrow().selectable() {
            let unhandled = w.borrow_mut().keypress(RenderSize::Flow(size.w), key)?;
            match unhandled {
                None => {
                    self.make_cursor_visible(size)?;
                    return Ok(None);
                }
                Some(k) => key = k,
            }
        }
        let handled = match command_map::lookup(&key) {
            Some(Command::CursorUp) => self.keypress_up(size)?,
            Some(Command::CursorDown) => self.keypress_down(size)?,
            Some(Command::CursorPageUp) => self.keypress_page_up(size)?,
            Some(Command::CursorPageDown) => self.keypress_page_down(size)?,
            Some(Command::CursorMaxLeft) => self.keypress_max(size, false)?,
            Some(Command::CursorMaxRight) => self.keypress_max(size, true)?,
            _ => false,
        };
        Ok(if handled { None } else { Some(key) })
    }

    fn mouse_event(&mut self, size: RenderSize, event: MouseEvent, focus: bool) -> Result<bool> {
        let size = self.expect_box(size)?;
        if size.w == 0 || size.h == 0 {
            return Ok(false);
        }
        let Some(vis) = self.calculate_visible(size, true)? else {
            return Ok(false);
        };
        let row = i64::from(event.location.y);
        let items = vis.above.iter().rev().chain(iter::once(&vis.focus)).chain(vis.below.iter());
        let mut wrow = -i64::from(vis.trim_top);
        let mut hit = None;
        for item in items {
            if wrow + i64::from(item.rows) > row {
                hit = Some(item.clone());
                break;
            }
            wrow += i64::from(item.rows);
        }
        let Some(item) = hit else {
            return Ok(false);
        };
        let item_focus = focus && Rc::ptr_eq(&item.widget, &vis.focus.widget);
        if event.is_press() && event.button == Button::Left && item.widget.borrow().selectable() {
            self.change_focus(size, item.position.clone(), wrow, None, None, None)?;
        }
        let ev = event.at(Point::new(event.location.x, (row - wrow) as u32));
        item.widget.borrow_mut().mouse_event(RenderSize::Flow(size.w), ev, item_focus)
    }

    fn cursor_coords(&mut self, size: RenderSize) -> Result<Option<Point>> {
        let size = self.expect_box(size)?;
        if size.w == 0 || size.h == 0 {
            return Ok(None);
        }
        let Some(vis) = self.calculate_visible(size, true)? else {
            return Ok(None);
        };
        let Some(c) = vis.cursor else {
            return Ok(None);
        };
        let y = i64::from(c.y) + vis.offset;
        if y < 0 || y >= i64::from(size.h) {
            return Ok(None);
        }
        Ok(Some(Point::new(c.x, y as u32)))
    }
}

impl<W: ListWalker> Drop for ListBox<W> {
    fn drop(&mut self) {
        if let Some(sub) = self.subscription.take()
            && let Ok(mut body) = self.body.try_borrow_mut()
            && let Some(s) = body.signals()
        {
            s.disconnect(sub);
        }
    }
}
