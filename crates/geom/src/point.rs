use std::ops::Add;

/// A cell location, column first.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Default)]
pub struct Point {
    /// Column.
    pub x: u32,
    /// Row.
    pub y: u32,
}

impl Point {
    /// Construct a point.
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// The origin.
    pub fn zero() -> Self {
        Self { x: 0, y: 0 }
    }

    /// Shift the point by a signed offset. Returns `None` if either axis
    /// would go negative.
    pub fn offset(&self, dx: i32, dy: i32) -> Option<Self> {
        let x = i64::from(self.x) + i64::from(dx);
        let y = i64::from(self.y) + i64::from(dy);
        if x < 0 || y < 0 {
            return None;
        }
        Some(Self {
            x: u32::try_from(x).ok()?,
            y: u32::try_from(y).ok()?,
        })
    }
}

impl Add for Point {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }
}

impl From<(u32, u32)> for Point {
    fn from(v: (u32, u32)) -> Self {
        Self { x: v.0, y: v.1 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset() {
        let p = Point::new(2, 3);
        assert_eq!(p.offset(1, -3), Some(Point::new(3, 0)));
        assert_eq!(p.offset(-3, 0), None);
        assert_eq!(p + Point::new(1, 1), Point::new(3, 4));
    }
}
