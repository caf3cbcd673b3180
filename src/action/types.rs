use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::action::errors::ParseError;

/// Default swipe duration when the caller doesn't give one.
pub const DEFAULT_SWIPE_MS: u64 = 300;

/// The single internal representation every accepted action encoding
/// reduces to. Coordinates are shape-checked (non-negative integers);
/// semantic bounds against the live screen are the session's problem.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    Click { x: u32, y: u32 },
    DoubleTap { x: u32, y: u32 },
    LongPress { x: u32, y: u32, duration_ms: Option<u64> },
    Swipe { x1: u32, y1: u32, x2: u32, y2: u32, duration_ms: u64 },
    Text { value: String },
    Key { name: Key },
    Screenshot,
    Scroll { direction: ScrollDirection },
    OpenApp { package: String },
    Wait { duration_ms: u64 },
}

/// Hardware/navigation keys the device collaborator understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Key {
    Back,
    Home,
    Enter,
    Power,
    Menu,
    Delete,
    Recents,
    VolumeUp,
    VolumeDown,
}

impl Key {
    /// Android keycode name for this key.
    pub fn keycode(&self) -> &'static str {
        match self {
            Key::Back => "KEYCODE_BACK",
            Key::Home => "KEYCODE_HOME",
            Key::Enter => "KEYCODE_ENTER",
            Key::Power => "KEYCODE_POWER",
            Key::Menu => "KEYCODE_MENU",
            Key::Delete => "KEYCODE_DEL",
            Key::Recents => "KEYCODE_APP_SWITCH",
            Key::VolumeUp => "KEYCODE_VOLUME_UP",
            Key::VolumeDown => "KEYCODE_VOLUME_DOWN",
        }
    }
}

impl FromStr for Key {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "back" => Ok(Key::Back),
            "home" => Ok(Key::Home),
            "enter" => Ok(Key::Enter),
            "power" => Ok(Key::Power),
            "menu" => Ok(Key::Menu),
            "delete" => Ok(Key::Delete),
            "recents" => Ok(Key::Recents),
            "volume_up" => Ok(Key::VolumeUp),
            "volume_down" => Ok(Key::VolumeDown),
            other => Err(ParseError::UnknownKey(other.to_string())),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Key::Back => "back",
            Key::Home => "home",
            Key::Enter => "enter",
            Key::Power => "power",
            Key::Menu => "menu",
            Key::Delete => "delete",
            Key::Recents => "recents",
            Key::VolumeUp => "volume_up",
            Key::VolumeDown => "volume_down",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollDirection {
    Up,
    Down,
    Left,
    Right,
}

impl FromStr for ScrollDirection {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "up" => Ok(ScrollDirection::Up),
            "down" => Ok(ScrollDirection::Down),
            "left" => Ok(ScrollDirection::Left),
            "right" => Ok(ScrollDirection::Right),
            other => Err(ParseError::Dsl {
                input: other.to_string(),
                reason: "expected one of up/down/left/right".to_string(),
            }),
        }
    }
}
