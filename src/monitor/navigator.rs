// src/monitor/navigator.rs - Fixed navigation paths through the companion app
use crate::device::DeviceDriver;
use crate::screen::{self, Bounds, ParseMode, Snapshot};

use super::MonitorError;

pub const BACK: &str = "Back";
pub const ME_TAB: &str = "Me";
pub const PRINTING_HISTORY: &str = "Printing History";
pub const DEVICES_TAB: &str = "Devices";
pub const BRAND_LOGO: &str = "brand_logo";

/// Screen reads and taps expressed in terms of what is on screen.
pub struct Navigator<D> {
    device: D,
}

impl<D: DeviceDriver> Navigator<D> {
    pub fn new(device: D) -> Self {
        Self { device }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub async fn snapshot(&self, mode: ParseMode) -> Result<Snapshot, MonitorError> {
        let xml = self.device.dump_screen().await?;
        Ok(screen::parse_snapshot(&xml, mode)?)
    }

    pub async fn find_by_desc(&self, desc: &str) -> Result<Option<Bounds>, MonitorError> {
        let xml = self.device.dump_screen().await?;
        Ok(screen::find_by_desc(&xml, desc)?)
    }

    /// Tap the element described as `desc`. A missing element is logged and skipped.
    pub async fn tap_by_desc(&self, desc: &str) -> Result<bool, MonitorError> {
        match self.find_by_desc(desc).await? {
            Some(bounds) => {
                self.tap_bounds(bounds).await?;
                Ok(true)
            }
            None => {
                tracing::warn!("Element '{}' not found", desc);
                Ok(false)
            }
        }
    }

    pub async fn tap_bounds(&self, bounds: Bounds) -> Result<(), MonitorError> {
        self.device.tap(bounds.center()).await?;
        Ok(())
    }

    /// Drag the list downwards to reveal newer entries. Returns `false` if the snapshot
    /// has too few entries to swipe between.
    pub async fn scroll_up(&self, snapshot: &Snapshot) -> Result<bool, MonitorError> {
        let Some((upper, lower)) = snapshot.scroll_anchors() else {
            return Ok(false);
        };
        self.device.swipe(upper, lower).await?;
        Ok(true)
    }

    /// Drag the list upwards to reveal older entries.
    pub async fn scroll_down(&self, snapshot: &Snapshot) -> Result<bool, MonitorError> {
        let Some((upper, lower)) = snapshot.scroll_anchors() else {
            return Ok(false);
        };
        self.device.swipe(lower, upper).await?;
        Ok(true)
    }

    pub async fn go_to_printing_history(&self) -> Result<(), MonitorError> {
        self.device.press_back().await?;
        self.tap_by_desc(ME_TAB).await?;
        self.tap_by_desc(PRINTING_HISTORY).await?;
        Ok(())
    }

    /// Walk from the printing history to `machine`'s page. Returns `false`, stopping at
    /// the first step, when something along the way is not on screen.
    pub async fn go_to_device_page(&self, machine: &str) -> Result<bool, MonitorError> {
        for desc in [BACK, DEVICES_TAB, BRAND_LOGO, machine] {
            if !self.tap_by_desc(desc).await? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
