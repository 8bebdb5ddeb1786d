// src/device/mod.rs - Android device access
//!
//! The reconciler only ever needs four things from the phone: a UI dump, a tap, a swipe
//! and the back key. `DeviceDriver` is that seam; `AdbDevice` drives a real handset.

pub mod adb;

use async_trait::async_trait;
use thiserror::Error;

use crate::screen::Point;

pub use adb::AdbDevice;

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("adb binary unavailable: {0}")]
    Unavailable(std::io::Error),
    #[error("`{command}` failed ({status}): {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("UI dump is not valid UTF-8")]
    Encoding,
}

impl DeviceError {
    /// Whether the device can no longer be driven at all.
    pub fn is_fatal(&self) -> bool {
        matches!(self, DeviceError::Unavailable(_))
    }
}

#[async_trait]
pub trait DeviceDriver: Send + Sync {
    /// Raw uiautomator XML for the current foreground screen.
    async fn dump_screen(&self) -> Result<String, DeviceError>;
    async fn tap(&self, at: Point) -> Result<(), DeviceError>;
    async fn swipe(&self, from: Point, to: Point) -> Result<(), DeviceError>;
    async fn press_back(&self) -> Result<(), DeviceError>;
}
