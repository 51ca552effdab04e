//! Tile actions: what a tap or long press on a tile should do on the PC.
//!
//! The layout stores them per tile, keyed by gesture:
//!
//! ```json
//! {"id":"steam","type":"button",
//!  "actions":{"tap":{"type":"launch_app","path":"C:/Games/Steam/steam.exe"},
//!             "long_press":{"type":"open_folder","path":"C:/Games"}}}
//! ```
//!
//! Only `type` is interpreted here.  The rest of the object is handed to the
//! [`ActionRunner`](crate::application::ActionRunner) unchanged.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;
use statdeck_core::{ActionType, LayoutDocument};
use thiserror::Error;

/// The kinds of PC-side action a tile can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    LaunchApp,
    Hotkey,
    RunScript,
    OpenUrl,
    OpenFolder,
}

impl ActionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::LaunchApp => "launch_app",
            ActionKind::Hotkey => "hotkey",
            ActionKind::RunScript => "run_script",
            ActionKind::OpenUrl => "open_url",
            ActionKind::OpenFolder => "open_folder",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = ResolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "launch_app" => Ok(ActionKind::LaunchApp),
            "hotkey" => Ok(ActionKind::Hotkey),
            "run_script" => Ok(ActionKind::RunScript),
            "open_url" => Ok(ActionKind::OpenUrl),
            "open_folder" => Ok(ActionKind::OpenFolder),
            other => Err(ResolveError::UnknownKind(other.to_string())),
        }
    }
}

/// A resolved action, ready for the runner.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionRequest {
    pub tile_id: String,
    pub trigger: ActionType,
    pub kind: ActionKind,
    /// The tile's action object, verbatim (including `type`).
    pub config: Value,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("tile {0:?} is not in the current layout")]
    UnknownTile(String),

    #[error("tile {tile_id:?} has no {trigger} action")]
    NoAction { tile_id: String, trigger: ActionType },

    #[error("unknown action type {0:?}")]
    UnknownKind(String),
}

/// Looks up the action configured for `trigger` on `tile_id`.
///
/// # Errors
///
/// - [`ResolveError::UnknownTile`] if no tile has that id.
/// - [`ResolveError::NoAction`] if the tile has nothing for this gesture.
/// - [`ResolveError::UnknownKind`] if the action's `type` is missing or not
///   one of the [`ActionKind`]s.
pub fn resolve_action(
    layout: &LayoutDocument,
    tile_id: &str,
    trigger: ActionType,
) -> Result<ActionRequest, ResolveError> {
    let mut tile = layout
        .find_tile(tile_id)
        .ok_or_else(|| ResolveError::UnknownTile(tile_id.to_string()))?;

    let config = tile
        .get_mut("actions")
        .and_then(|actions| actions.get_mut(trigger.as_str()))
        .filter(|action| !action.is_null())
        .map(Value::take)
        .ok_or_else(|| ResolveError::NoAction {
            tile_id: tile_id.to_string(),
            trigger,
        })?;

    let kind = config
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .parse()?;

    Ok(ActionRequest {
        tile_id: tile_id.to_string(),
        trigger,
        kind,
        config,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
