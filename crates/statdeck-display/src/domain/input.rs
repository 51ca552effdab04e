//! Touch input events fed to the frontend's gesture emitter.
//!
//! The touchscreen UI reports raw press/release/cancel per tile.  The binary
//! also accepts them as text lines (`press cpu`, `release cpu`,
//! `cancel cpu`) on stdin, which is how the events are parsed here.

use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    Press { tile_id: String },
    Release { tile_id: String },
    /// The pointer left the tile; the gesture is abandoned.
    Cancel { tile_id: String },
}

impl InputEvent {
    pub fn tile_id(&self) -> &str {
        match self {
            InputEvent::Press { tile_id }
            | InputEvent::Release { tile_id }
            | InputEvent::Cancel { tile_id } => tile_id,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseInputError {
    #[error("expected `<press|release|cancel> <tile_id>`, got {0:?}")]
    Malformed(String),
    #[error("unknown input event {0:?}")]
    UnknownEvent(String),
}

impl FromStr for InputEvent {
    type Err = ParseInputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let (event, tile_id) = match (parts.next(), parts.next(), parts.next()) {
            (Some(event), Some(tile_id), None) => (event, tile_id.to_string()),
            _ => return Err(ParseInputError::Malformed(s.to_string())),
        };
        match event {
            "press" => Ok(InputEvent::Press { tile_id }),
            "release" => Ok(InputEvent::Release { tile_id }),
            "cancel" => Ok(InputEvent::Cancel { tile_id }),
            other => Err(ParseInputError::UnknownEvent(other.to_string())),
        }
    }
}
