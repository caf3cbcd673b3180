use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of the emulator/device instance a trajectory owns exclusively,
/// e.g. `emulator-5554`. Opaque to the core.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceBinding(String);

impl DeviceBinding {
    pub fn new(serial: impl Into<String>) -> Self {
        Self(serial.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Screen state reported back after every device operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Base64-encoded screen raster, when the collaborator captured one.
    pub pixels: Option<String>,
    /// UI node descriptors in dump order.
    #[serde(default)]
    pub ui_elements: Vec<UiElement>,
    pub current_activity: Option<String>,
    pub screen_size: ScreenSize,
    pub orientation: Orientation,
}

/// One node from the UI hierarchy dump.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiElement {
    /// `[x1, y1, x2, y2]` in screen coordinates.
    pub bounds: [u32; 4],
    pub text: String,
    pub resource_id: String,
    pub class_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenSize {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Portrait,
    Landscape,
}
