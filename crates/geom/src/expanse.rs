use super::{Point, Rect};

/// An `Expanse` is a width and a height with no location. Canvas and
/// widget sizes are expressed as expanses.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Default)]
pub struct Expanse {
    /// Width in columns.
    pub w: u32,
    /// Height in rows.
    pub h: u32,
}

impl Expanse {
    /// Construct an expanse.
    pub fn new(w: u32, h: u32) -> Self {
        Self { w, h }
    }

    /// The number of cells covered.
    pub fn area(&self) -> u32 {
        self.w * self.h
    }

    /// True if either dimension is zero.
    pub fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }

    /// A `Rect` with these dimensions located at the origin.
    pub fn rect(&self) -> Rect {
        Rect::new(0, 0, self.w, self.h)
    }

    /// Does a point fall inside an expanse anchored at the origin?
    pub fn contains_point(&self, p: Point) -> bool {
        p.x < self.w && p.y < self.h
    }
}

impl From<Rect> for Expanse {
    fn from(r: Rect) -> Self {
        Self { w: r.w, h: r.h }
    }
}

impl From<(u32, u32)> for Expanse {
    fn from(v: (u32, u32)) -> Self {
        Self { w: v.0, h: v.1 }
    }
}
