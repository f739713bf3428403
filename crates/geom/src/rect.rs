use super::{Error, Expanse, Point, Result};

/// A located rectangle.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Default)]
pub struct Rect {
    /// Top-left corner.
    pub tl: Point,
    /// Width.
    pub w: u32,
    /// Height.
    pub h: u32,
}

impl Rect {
    /// Construct a rectangle.
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self {
            tl: Point { x, y },
            w,
            h,
        }
    }

    /// The size of this rectangle.
    pub fn expanse(&self) -> Expanse {
        Expanse::new(self.w, self.h)
    }

    /// Exclusive right edge.
    pub fn right(&self) -> u32 {
        self.tl.x + self.w
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> u32 {
        self.tl.y + self.h
    }

    /// Does this rectangle contain the point?
    pub fn contains_point(&self, p: Point) -> bool {
        p.x >= self.tl.x && p.x < self.right() && p.y >= self.tl.y && p.y < self.bottom()
    }

    /// Does this rectangle wholly enclose `other`?
    pub fn contains_rect(&self, other: &Self) -> bool {
        other.tl.x >= self.tl.x
            && other.tl.y >= self.tl.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// The overlapping region of two rectangles, or `None` if they don't
    /// overlap.
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        let x = self.tl.x.max(other.tl.x);
        let y = self.tl.y.max(other.tl.y);
        let r = self.right().min(other.right());
        let b = self.bottom().min(other.bottom());
        if x >= r || y >= b {
            return None;
        }
        Some(Self::new(x, y, r - x, b - y))
    }

    /// Carve a sub-rectangle given in coordinates relative to this one.
    pub fn subrect(&self, x: u32, y: u32, w: u32, h: u32) -> Result<Self> {
        if x + w > self.w || y + h > self.h {
            return Err(Error::Geometry(format!(
                "subrect {x},{y} {w}x{h} outside {}x{}",
                self.w, self.h
            )));
        }
        Ok(Self::new(self.tl.x + x, self.tl.y + y, w, h))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intersect() -> Result<()> {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(5, 5, 10, 10);
        assert_eq!(a.intersect(&b), Some(Rect::new(5, 5, 5, 5)));
        assert_eq!(a.intersect(&Rect::new(10, 0, 2, 2)), None);
        assert!(a.contains_rect(&Rect::new(2, 2, 8, 8)));
        assert!(!a.contains_rect(&b));
        assert_eq!(a.subrect(1, 2, 3, 4)?, Rect::new(1, 2, 3, 4));
        assert!(a.subrect(8, 0, 3, 1).is_err());
        Ok(())
    }
}
