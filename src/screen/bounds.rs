// src/screen/bounds.rs - Screen regions and tap targets
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use super::ScreenError;

static INTEGER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("static regex"));

/// A point on the device screen, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

/// Rectangle reported by uiautomator as `[x1,y1][x2,y2]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bounds {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Bounds {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self { left, top, right, bottom }
    }

    /// Parse the first four integers found in a bounds attribute.
    pub fn parse(raw: &str) -> Result<Self, ScreenError> {
        let mut numbers = INTEGER.find_iter(raw).map(|m| m.as_str().parse::<i32>());
        let mut next = || match numbers.next() {
            Some(Ok(n)) => Ok(n),
            _ => Err(ScreenError::InvalidBounds(raw.to_string())),
        };
        Ok(Self {
            left: next()?,
            top: next()?,
            right: next()?,
            bottom: next()?,
        })
    }

    /// Center of the rectangle; this is where every tap and swipe lands.
    pub fn center(&self) -> Point {
        Point {
            x: midpoint(self.left, self.right),
            y: midpoint(self.top, self.bottom),
        }
    }
}

// Widened so coordinates near i32::MAX cannot overflow
fn midpoint(a: i32, b: i32) -> i32 {
    ((i64::from(a) + i64::from(b)) / 2) as i32
}

impl FromStr for Bounds {
    type Err = ScreenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{}][{},{}]", self.left, self.top, self.right, self.bottom)
    }
}
