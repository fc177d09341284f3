//! Points and lines in the key/position plane, used to maintain the error
//! cone of the greedy segmentation.

use crate::error::{PlrError, Result};

/// A `(key, position)` observation, or a shifted copy of one.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// The point shifted up by `gamma`.
    pub fn upper_bound(self, gamma: f64) -> Self {
        Self::new(self.x, self.y + gamma)
    }

    /// The point shifted down by `gamma`.
    pub fn lower_bound(self, gamma: f64) -> Self {
        Self::new(self.x, self.y - gamma)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self::new(x, y)
    }
}

/// The line `y = slope * x + intercept`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Line {
    pub slope: f64,
    pub intercept: f64,
}

impl Line {
    pub fn new(slope: f64, intercept: f64) -> Self {
        Self { slope, intercept }
    }

    /// The line through `a` and `b`. Fails if both share the same x, since the
    /// slope would be undefined.
    pub fn from_points(a: Point, b: Point) -> Result<Self> {
        if a.x == b.x {
            return Err(PlrError::DegenerateLine { x: a.x });
        }

        let slope = (b.y - a.y) / (b.x - a.x);
        let intercept = b.y - slope * b.x;
        Ok(Self { slope, intercept })
    }

    pub fn eval(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }

    /// The unique point where both lines meet. Lines with exactly equal
    /// slopes are either parallel or coincident and are rejected.
    pub fn intersection(&self, other: &Line) -> Result<Point> {
        if self.slope == other.slope {
            return Err(PlrError::ParallelLines { slope: self.slope });
        }

        let denom = self.slope - other.slope;
        Ok(Point::new(
            (other.intercept - self.intercept) / denom,
            (self.slope * other.intercept - other.slope * self.intercept) / denom,
        ))
    }

    /// Whether `p` lies strictly above the line.
    pub fn is_above(&self, p: Point) -> bool {
        p.y > self.eval(p.x)
    }

    /// Whether `p` lies strictly below the line.
    pub fn is_below(&self, p: Point) -> bool {
        p.y < self.eval(p.x)
    }
}
