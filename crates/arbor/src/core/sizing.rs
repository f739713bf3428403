//! The box/flow/fixed sizing protocol.
use std::{fmt, ops::BitOr};

use crate::{geom::Expanse, text::Align};

/// The set of sizing modes a widget supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Sizing(u8);

impl Sizing {
    /// Rendered at an exact caller-given width and height.
    pub const BOX: Self = Self(1);
    /// Rendered at a given width, computing its own height.
    pub const FLOW: Self = Self(2);
    /// Knows its own width and height.
    pub const FIXED: Self = Self(4);

    /// The empty set.
    pub fn empty() -> Self {
        Self(0)
    }

    /// Does this set include every mode in `other`?
    pub fn contains(&self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Does this set permit rendering at `size`?
    pub fn permits(&self, size: RenderSize) -> bool {
        self.contains(size.mode())
    }
}

impl BitOr for Sizing {
    type Output = Self;

    fn bitor(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl fmt::Display for Sizing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = vec![];
        if self.contains(Self::BOX) {
            names.push("box");
        }
        if self.contains(Self::FLOW) {
            names.push("flow");
        }
        if self.contains(Self::FIXED) {
            names.push("fixed");
        }
        write!(f, "{{{}}}", names.join(", "))
    }
}

/// The size argument passed to `render` and friends. The variant encodes
/// the sizing mode the caller has chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderSize {
    /// `(maxcol, maxrow)`.
    Box(Expanse),
    /// `(maxcol,)`.
    Flow(u32),
    /// `()`.
    Fixed,
}

impl RenderSize {
    /// Shorthand for a box size.
    pub fn boxed(cols: u32, rows: u32) -> Self {
        Self::Box(Expanse::new(cols, rows))
    }

    /// The sizing mode this argument selects.
    pub fn mode(&self) -> Sizing {
        match self {
            Self::Box(_) => Sizing::BOX,
            Self::Flow(_) => Sizing::FLOW,
            Self::Fixed => Sizing::FIXED,
        }
    }

    /// Columns, if the caller supplied them.
    pub fn cols(&self) -> Option<u32> {
        match self {
            Self::Box(e) => Some(e.w),
            Self::Flow(c) => Some(*c),
            Self::Fixed => None,
        }
    }

    /// Rows, if the caller supplied them.
    pub fn rows(&self) -> Option<u32> {
        match self {
            Self::Box(e) => Some(e.h),
            _ => None,
        }
    }

    /// The same mode with a different column count. Fixed stays fixed.
    pub fn with_cols(&self, cols: u32) -> Self {
        match self {
            Self::Box(e) => Self::Box(Expanse::new(cols, e.h)),
            Self::Flow(_) => Self::Flow(cols),
            Self::Fixed => Self::Fixed,
        }
    }
}

impl fmt::Display for RenderSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Box(e) => write!(f, "({}, {})", e.w, e.h),
            Self::Flow(c) => write!(f, "({c},)"),
            Self::Fixed => write!(f, "()"),
        }
    }
}

/// Vertical alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Valign {
    /// Flush top.
    Top,
    /// Centered.
    #[default]
    Middle,
    /// Flush bottom.
    Bottom,
    /// A percentage of the free space above.
    Relative(u32),
}

impl Valign {
    /// Free space above, as a percentage.
    pub fn percent(&self) -> i64 {
        match self {
            Self::Top => 0,
            Self::Middle => 50,
            Self::Bottom => 100,
            Self::Relative(p) => i64::from(*p),
        }
    }
}

/// Free space to the left, as a percentage.
fn align_percent(align: Align) -> i64 {
    match align {
        Align::Left => 0,
        Align::Center => 50,
        Align::Right => 100,
        Align::Relative(p) => i64::from(p),
    }
}

/// How a decoration sizes the widget it wraps along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    /// An exact number of cells.
    Given(u32),
    /// A percentage of the available cells.
    Relative(u32),
    /// The child's natural size.
    Pack,
    /// The child's fixed natural size, clipped if it doesn't fit.
    Clip,
}

/// Scale `val` in `[0, val_range - 1]` to `[0, out_range - 1]`, rounding
/// half up.
pub fn int_scale(val: i64, val_range: i64, out_range: i64) -> i64 {
    let num = val * (out_range - 1) * 2 + (val_range - 1);
    let dem = (val_range - 1) * 2;
    num.div_euclid(dem)
}

/// Blank rows `(top, bottom)` around content in `maxrow` rows.
///
/// `natural` is the content height used for `Pack` and `Clip`. Results are
/// never negative: content taller than the space is shifted to keep as
/// much of its top visible as the alignment allows, and the excess is
/// left for the caller to trim.
pub fn calculate_top_bottom_filler(
    maxrow: u32,
    valign: Valign,
    height: Dimension,
    natural: u32,
    min_height: Option<u32>,
    top: u32,
    bottom: u32,
) -> (u32, u32) {
    let (maxrow, mut top, mut bottom) = (i64::from(maxrow), i64::from(top), i64::from(bottom));
    let height = match height {
        Dimension::Relative(p) => {
            let h = int_scale(i64::from(p), 101, (maxrow - top - bottom).max(0) + 1);
            h.max(min_height.map_or(0, i64::from))
        }
        Dimension::Given(h) => i64::from(h),
        Dimension::Pack | Dimension::Clip => i64::from(natural),
    };
    let filler = maxrow - height - top - bottom;
    bottom += int_scale(100 - valign.percent(), 101, filler + 1);
    top = maxrow - height - bottom;
    if bottom < 0 && top > 0 {
        let p = top.min(-bottom);
        top -= p;
        bottom += p;
    } else if top < 0 && bottom > 0 {
        let p = bottom.min(-top);
        top += p;
        bottom -= p;
    }
    (top.max(0) as u32, bottom.max(0) as u32)
}

/// Padding columns `(left, right)` around content in `maxcol` columns.
///
/// `natural` is the content width used for `Pack` and `Clip`. Only `Clip`
/// may return negative values, meaning that many columns of the content
/// are cut off on that side.
pub fn calculate_left_right_padding(
    maxcol: u32,
    align: Align,
    width: Dimension,
    natural: u32,
    min_width: Option<u32>,
    left: u32,
    right: u32,
) -> (i32, i32) {
    let (maxcol, mut left, mut right) = (i64::from(maxcol), i64::from(left), i64::from(right));
    let clip = width == Dimension::Clip;
    let width = match width {
        Dimension::Relative(p) => {
            let w = int_scale(i64::from(p), 101, (maxcol - left - right).max(0) + 1);
            w.max(min_width.map_or(0, i64::from))
        }
        Dimension::Given(w) => i64::from(w),
        Dimension::Pack | Dimension::Clip => i64::from(natural),
    };
    let padding = maxcol - width - left - right;
    right += int_scale(100 - align_percent(align), 101, padding + 1);
    left = maxcol - width - right;
    if right < 0 && left > 0 {
        let s = left.min(-right);
        left -= s;
        right += s;
    } else if left < 0 && right > 0 {
        let s = right.min(-left);
        left += s;
        right -= s;
    }
    if !clip && (left < 0 || right < 0) {
        left = left.max(0);
        right = right.max(0);
    }
    (left as i32, right as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modes() {
        let s = Sizing::FLOW | Sizing::FIXED;
        assert!(s.permits(RenderSize::Flow(3)));
        assert!(s.permits(RenderSize::Fixed));
        assert!(!s.permits(RenderSize::boxed(3, 3)));
        assert_eq!(s.to_string(), "{flow, fixed}");
        assert_eq!(RenderSize::boxed(4, 2).with_cols(7), RenderSize::boxed(7, 2));
        assert_eq!(RenderSize::Flow(4).rows(), None);
    }

    #[test]
    fn scaling() {
        assert_eq!(int_scale(2, 6, 101), 40);
        assert_eq!(int_scale(1, 3, 4), 2);
        assert_eq!(int_scale(0x5f, 0x100, 0x10), 6);
    }

    #[test]
    fn fillers() {
        // Pack content of 3 rows centered in 10.
        assert_eq!(
            calculate_top_bottom_filler(10, Valign::Middle, Dimension::Pack, 3, None, 0, 0),
            (3, 4)
        );
        assert_eq!(
            calculate_top_bottom_filler(10, Valign::Top, Dimension::Given(4), 0, None, 1, 1),
            (1, 5)
        );
        assert_eq!(
            calculate_top_bottom_filler(10, Valign::Bottom, Dimension::Relative(50), 0, None, 0, 0),
            (5, 0)
        );
        // Too tall: never negative.
        assert_eq!(
            calculate_top_bottom_filler(3, Valign::Bottom, Dimension::Given(5), 0, None, 0, 0),
            (0, 0)
        );
    }

    #[test]
    fn paddings() {
        assert_eq!(
            calculate_left_right_padding(20, Align::Center, Dimension::Given(10), 0, None, 0, 0),
            (5, 5)
        );
        assert_eq!(
            calculate_left_right_padding(10, Align::Left, Dimension::Relative(50), 0, Some(7), 0, 0),
            (0, 3)
        );
        // Clipping keeps negative padding.
        assert_eq!(
            calculate_left_right_padding(4, Align::Right, Dimension::Clip, 6, None, 0, 0),
            (-2, 0)
        );
        assert_eq!(
            calculate_left_right_padding(4, Align::Right, Dimension::Given(6), 0, None, 0, 0),
            (0, 0)
        );
    }
}
