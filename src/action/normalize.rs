//! Action normalization: two accepted wire encodings (a structured record
//! with an `action_type` tag, and a compact textual DSL) funnel into the one
//! internal [`Action`] representation.
//!
//! Dispatch order: structured records are attempted first because they are
//! strictly typed and fail fast; the DSL is the fallback for plain strings.
//! If both fail, the error names the original input.

use serde::Deserialize;
use serde_json::Value;

use crate::action::errors::ParseError;
use crate::action::types::{Action, Key, ScrollDirection, DEFAULT_SWIPE_MS};

/// Converts a raw wire value (mapping or string) into one [`Action`].
pub fn normalize(raw: &Value) -> Result<Action, ParseError> {
    match raw {
        Value::Object(_) => parse_record(raw),
        Value::String(s) => normalize_str(s),
        other => Err(ParseError::UnsupportedPayload(other.to_string())),
    }
}

/// Converts a raw string into one [`Action`]. Strings that look like a JSON
/// object go through record parsing first, everything else through the DSL.
pub fn normalize_str(raw: &str) -> Result<Action, ParseError> {
    let trimmed = raw.trim();
    if trimmed.starts_with('{') && trimmed.ends_with('}') {
        let record_err = match serde_json::from_str::<Value>(trimmed) {
            Ok(value @ Value::Object(_)) => match parse_record(&value) {
                Ok(action) => return Ok(action),
                Err(e) => e,
            },
            Ok(_) | Err(_) => ParseError::Record {
                input: trimmed.to_string(),
                reason: "not a valid JSON mapping".to_string(),
            },
        };
        // A brace-wrapped string is never valid DSL, but the contract says
        // try both before giving up.
        return parse_dsl(trimmed).map_err(|_| record_err);
    }
    parse_dsl(trimmed)
}

/// Structured record encoding, tagged by `action_type`. Field names follow
/// the device-agent wire vocabulary (`input_text`, `navigate_back`, ...).
#[derive(Debug, Deserialize)]
#[serde(tag = "action_type", rename_all = "snake_case")]
enum RawRecord {
    Click {
        x: u32,
        y: u32,
    },
    DoubleTap {
        x: u32,
        y: u32,
    },
    LongPress {
        x: u32,
        y: u32,
        #[serde(default, alias = "duration")]
        duration_ms: Option<u64>,
    },
    Swipe {
        x1: u32,
        y1: u32,
        x2: u32,
        y2: u32,
        #[serde(default = "default_swipe_ms", alias = "duration")]
        duration_ms: u64,
    },
    InputText {
        text: String,
    },
    Keypress {
        #[serde(alias = "keycode")]
        key: String,
    },
    NavigateBack,
    NavigateHome,
    KeyboardEnter,
    Screenshot,
    Scroll {
        direction: ScrollDirection,
    },
    OpenApp {
        #[serde(alias = "app_name")]
        package: String,
    },
    Wait {
        #[serde(alias = "duration")]
        duration_ms: u64,
    },
}

fn default_swipe_ms() -> u64 {
    DEFAULT_SWIPE_MS
}

fn parse_record(raw: &Value) -> Result<Action, ParseError> {
    let record: RawRecord =
        serde_json::from_value(raw.clone()).map_err(|e| ParseError::Record {
            input: raw.to_string(),
            reason: e.to_string(),
        })?;

    let action = match record {
        RawRecord::Click { x, y } => Action::Click { x, y },
        RawRecord::DoubleTap { x, y } => Action::DoubleTap { x, y },
        RawRecord::LongPress { x, y, duration_ms } => Action::LongPress { x, y, duration_ms },
        RawRecord::Swipe {
            x1,
            y1,
            x2,
            y2,
            duration_ms,
        } => Action::Swipe {
            x1,
            y1,
            x2,
            y2,
            duration_ms,
        },
        RawRecord::InputText { text } => Action::Text { value: text },
        RawRecord::Keypress { key } => Action::Key { name: key.parse()? },
        RawRecord::NavigateBack => Action::Key { name: Key::Back },
        RawRecord::NavigateHome => Action::Key { name: Key::Home },
        RawRecord::KeyboardEnter => Action::Key { name: Key::Enter },
        RawRecord::Screenshot => Action::Screenshot,
        RawRecord::Scroll { direction } => Action::Scroll { direction },
        RawRecord::OpenApp { package } => Action::OpenApp { package },
        RawRecord::Wait { duration_ms } => Action::Wait { duration_ms },
    };
    Ok(action)
}

fn parse_dsl(cmd: &str) -> Result<Action, ParseError> {
    let dsl_err = |reason: &str| ParseError::Dsl {
        input: cmd.to_string(),
        reason: reason.to_string(),
    };

    let parts: Vec<&str> = cmd.split_whitespace().collect();
    let Some((&head, rest)) = parts.split_first() else {
        return Err(dsl_err("empty command"));
    };

    let coord = |tok: &str| -> Result<u32, ParseError> {
        tok.parse::<u32>()
            .map_err(|_| dsl_err(&format!("invalid coordinate `{tok}`")))
    };

    match head.to_ascii_lowercase().as_str() {
        "click" => match rest {
            [x, y] => Ok(Action::Click {
                x: coord(x)?,
                y: coord(y)?,
            }),
            _ => Err(dsl_err("expected `click <x> <y>`")),
        },
        "swipe" => match rest {
            [x1, y1, x2, y2] => Ok(Action::Swipe {
                x1: coord(x1)?,
                y1: coord(y1)?,
                x2: coord(x2)?,
                y2: coord(y2)?,
                duration_ms: DEFAULT_SWIPE_MS,
            }),
            [x1, y1, x2, y2, dur] => Ok(Action::Swipe {
                x1: coord(x1)?,
                y1: coord(y1)?,
                x2: coord(x2)?,
                y2: coord(y2)?,
                duration_ms: dur
                    .parse::<u64>()
                    .map_err(|_| dsl_err(&format!("invalid duration `{dur}`")))?,
            }),
            _ => Err(dsl_err(
                "expected `swipe <x1> <y1> <x2> <y2> [duration_ms]`",
            )),
        },
        "text" => {
            if rest.is_empty() {
                return Err(dsl_err("expected `text \"<string>\"`"));
            }
            let mut value = rest.join(" ");
            if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
                value = value[1..value.len() - 1].to_string();
            }
            Ok(Action::Text { value })
        }
        "key" => match rest {
            [name] => Ok(Action::Key {
                name: name.parse()?,
            }),
            _ => Err(dsl_err("expected `key <name>`")),
        },
        "screenshot" => match rest {
            [] => Ok(Action::Screenshot),
            _ => Err(dsl_err("`screenshot` takes no arguments")),
        },
        "scroll" => match rest {
            [dir] => Ok(Action::Scroll {
                direction: dir.parse()?,
            }),
            _ => Err(dsl_err("expected `scroll <up|down|left|right>`")),
        },
        "open_app" => match rest {
            [package] => Ok(Action::OpenApp {
                package: (*package).to_string(),
            }),
            _ => Err(dsl_err("expected `open_app <package>`")),
        },
        "wait" => match rest {
            [ms] => Ok(Action::Wait {
                duration_ms: ms
                    .parse::<u64>()
                    .map_err(|_| dsl_err(&format!("invalid duration `{ms}`")))?,
            }),
            _ => Err(dsl_err("expected `wait <duration_ms>`")),
        },
        other => Err(dsl_err(&format!("unknown command `{other}`"))),
    }
}
