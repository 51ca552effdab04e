//! Action dispatch: turns an inbound `action` into a PC-side effect.
//!
//! Launching programs, sending hotkeys and the like are done by an
//! [`ActionRunner`] supplied by the host application.

use std::sync::Arc;

use statdeck_core::{LayoutDocument, TileAction};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::domain::{resolve_action, ActionRequest, ResolveError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct RunError(pub String);

/// Executes resolved actions.
pub trait ActionRunner: Send + Sync {
    fn run(&self, request: &ActionRequest) -> Result<(), RunError>;
}

pub struct ActionDispatcher {
    runner: Arc<dyn ActionRunner>,
}

impl ActionDispatcher {
    pub fn new(runner: Arc<dyn ActionRunner>) -> Self {
        Self { runner }
    }

    /// Resolves `action` against `layout` and runs it.
    ///
    /// Returns `true` if the runner was called.  Every failure is logged and
    /// otherwise ignored.
    pub fn dispatch(&self, layout: Option<&LayoutDocument>, action: &TileAction) -> bool {
        let Some(layout) = layout else {
            warn!("{} on {:?} ignored: no layout known yet", action.action_type, action.tile_id);
            return false;
        };
        let request = match resolve_action(layout, &action.tile_id, action.action_type) {
            Ok(request) => request,
            Err(e @ ResolveError::NoAction { .. }) => {
                debug!("{e}");
                return false;
            }
            Err(e) => {
                warn!("{e}");
                return false;
            }
        };

        info!(
            "executing {} for {}.{}",
            request.kind, request.tile_id, request.trigger
        );
        if let Err(e) = self.runner.run(&request) {
            error!("{} for {:?} failed: {e}", request.kind, request.tile_id);
        }
        true
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
