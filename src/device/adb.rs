// src/device/adb.rs - DeviceDriver backed by the adb command line
use std::io::ErrorKind;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use super::{DeviceDriver, DeviceError};
use crate::config::DeviceConfig;
use crate::screen::Point;

#[derive(Debug, Clone)]
pub struct AdbDevice {
    adb_path: String,
    serial: Option<String>,
    remote_dump_path: String,
    settle_delay: Duration,
}

impl AdbDevice {
    pub fn new(config: &DeviceConfig) -> Self {
        Self {
            adb_path: config.adb_path.clone(),
            serial: config.serial.clone(),
            remote_dump_path: config.remote_dump_path.clone(),
            settle_delay: Duration::from_millis(config.settle_delay_ms),
        }
    }

    /// Run `adb [-s serial] <args>` and return its stdout.
    async fn run(&self, args: &[&str]) -> Result<Vec<u8>, DeviceError> {
        let mut command = Command::new(&self.adb_path);
        if let Some(serial) = &self.serial {
            command.args(["-s", serial.as_str()]);
        }
        command.args(args);

        let output = command.output().await.map_err(|e| match e.kind() {
            ErrorKind::NotFound | ErrorKind::PermissionDenied => DeviceError::Unavailable(e),
            _ => DeviceError::Io(e),
        })?;

        if !output.status.success() {
            return Err(DeviceError::CommandFailed {
                command: format!("adb {}", args.join(" ")),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output.stdout)
    }

    async fn input(&self, args: &[&str]) -> Result<(), DeviceError> {
        tokio::time::sleep(self.settle_delay).await;
        let mut full = vec!["shell", "input"];
        full.extend_from_slice(args);
        self.run(&full).await?;
        tokio::time::sleep(self.settle_delay).await;
        Ok(())
    }
}

#[async_trait]
impl DeviceDriver for AdbDevice {
    async fn dump_screen(&self) -> Result<String, DeviceError> {
        self.run(&["shell", "uiautomator", "dump", self.remote_dump_path.as_str()])
            .await?;
        let raw = self.run(&["exec-out", "cat", self.remote_dump_path.as_str()]).await?;
        String::from_utf8(raw).map_err(|_| DeviceError::Encoding)
    }

    async fn tap(&self, at: Point) -> Result<(), DeviceError> {
        let (x, y) = (at.x.to_string(), at.y.to_string());
        self.input(&["tap", x.as_str(), y.as_str()]).await?;
        tracing::debug!("Tapped at {}", at);
        Ok(())
    }

    async fn swipe(&self, from: Point, to: Point) -> Result<(), DeviceError> {
        let coords = [from.x, from.y, to.x, to.y].map(|n| n.to_string());
        let mut args = vec!["swipe"];
        args.extend(coords.iter().map(String::as_str));
        self.input(&args).await?;
        tracing::debug!("Swiped from {} to {}", from, to);
        Ok(())
    }

    async fn press_back(&self) -> Result<(), DeviceError> {
        self.input(&["keyevent", "KEYCODE_BACK"]).await
    }
}
