// src/screen/mod.rs - uiautomator dump parsing
pub mod bounds;
pub mod snapshot;

use thiserror::Error;

pub use bounds::{Bounds, Point};
pub use snapshot::{ParseMode, ScreenKey, Snapshot, find_by_desc, parse_snapshot};

#[derive(Debug, Error)]
pub enum ScreenError {
    #[error("Malformed UI dump: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error("Invalid bounds: {0:?}")]
    InvalidBounds(String),
}
