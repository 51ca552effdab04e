//! Layout document domain entity.
//!
//! A layout is an ordered list of pages, each with a grid descriptor and a
//! list of tile descriptors:
//!
//! ```json
//! {"pages":[{"grid":{"cols":4,"rows":3},"tiles":[{"id":"cpu","type":"gauge"}]}]}
//! ```
//!
//! Older single-page documents put `tiles` at the top level instead of
//! `pages`; both shapes are accepted.
//!
//! The document is owned by the designer UI.  This module only checks the
//! skeleton (pages, tiles, unique string ids) and otherwise treats the text
//! as opaque.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::value::RawValue;
use serde_json::Value;
use thiserror::Error;

use crate::protocol::messages::Payload;

/// Errors reported by [`LayoutDocument::validate`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LayoutError {
    /// The text is not valid JSON.
    #[error("layout is not valid JSON: {0}")]
    InvalidJson(String),

    /// The top-level value is not a JSON object.
    #[error("layout must be a JSON object")]
    NotAnObject,

    /// `pages` or `tiles` has the wrong shape.
    #[error("layout structure is malformed: {0}")]
    Malformed(String),

    /// Neither `pages` nor a flat `tiles` list is present.
    #[error("layout has neither \"pages\" nor \"tiles\"")]
    MissingTiles,

    /// A tile has no string `id`.
    #[error("tile {index} on page {page} has no string id")]
    MissingTileId { page: usize, index: usize },

    /// Two tiles share an id.  Ids are unique across all pages.
    #[error("duplicate tile id: {0:?}")]
    DuplicateTileId(String),
}

/// Counts produced by a successful [`LayoutDocument::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutSummary {
    pub pages: usize,
    pub tiles: usize,
}

/// An opaque layout payload.
///
/// Serializes to exactly the JSON text it was created from.  The result of
/// [`validate`](Self::validate) is computed once per document and shared by
/// its clones.
#[derive(Clone)]
pub struct LayoutDocument {
    payload: Payload,
    summary: Arc<OnceLock<Result<LayoutSummary, LayoutError>>>,
}

impl LayoutDocument {
    /// Wraps layout text.  Only JSON syntax is checked here; call
    /// [`validate`](Self::validate) for the structural rules.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::InvalidJson`] if `text` is not valid JSON.
    pub fn from_json(text: impl Into<String>) -> Result<Self, LayoutError> {
        Payload::from_json(text)
            .map(Self::wrap)
            .map_err(|e| LayoutError::InvalidJson(e.to_string()))
    }

    /// A document with no pages, `{"pages":[]}`.
    pub fn empty() -> Self {
        Self::wrap(Payload::from_static(r#"{"pages":[]}"#))
    }

    pub(crate) fn from_raw(raw: Box<RawValue>) -> Self {
        Self::wrap(Payload::from_raw(raw))
    }

    fn wrap(payload: Payload) -> Self {
        Self {
            payload,
            summary: Arc::new(OnceLock::new()),
        }
    }

    /// The layout text exactly as it travels on the wire.
    pub fn as_json(&self) -> &str {
        self.payload.as_json()
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Checks the page/tile skeleton and tile id uniqueness.
    ///
    /// Tile contents beyond `id` are not interpreted.
    ///
    /// # Errors
    ///
    /// Returns the first [`LayoutError`] found.
    pub fn validate(&self) -> Result<LayoutSummary, LayoutError> {
        self.summary.get_or_init(|| self.check_skeleton()).clone()
    }

    fn check_skeleton(&self) -> Result<LayoutSummary, LayoutError> {
        let json = self.as_json();
        if json.trim_start().as_bytes().first() != Some(&b'{') {
            return Err(LayoutError::NotAnObject);
        }
        let skeleton: Skeleton =
            serde_json::from_str(json).map_err(|e| LayoutError::Malformed(e.to_string()))?;

        let pages = match (skeleton.pages, skeleton.tiles) {
            (Some(pages), _) => pages,
            (None, Some(tiles)) => vec![PageSkeleton { tiles }],
            (None, None) => return Err(LayoutError::MissingTiles),
        };

        let mut seen = HashSet::new();
        for (page_index, page) in pages.iter().enumerate() {
            for (tile_index, tile) in page.tiles.iter().enumerate() {
                let id = match &tile.id {
                    Some(Value::String(id)) => id,
                    _ => {
                        return Err(LayoutError::MissingTileId {
                            page: page_index,
                            index: tile_index,
                        })
                    }
                };
                if !seen.insert(id.as_str()) {
                    return Err(LayoutError::DuplicateTileId(id.clone()));
                }
            }
        }

        Ok(LayoutSummary {
            pages: pages.len(),
            tiles: seen.len(),
        })
    }

    /// Number of tiles across all pages, or 0 if the document is invalid.
    pub fn tile_count(&self) -> usize {
        self.validate().map(|s| s.tiles).unwrap_or(0)
    }

    /// Returns the full descriptor of the tile with `tile_id`.
    ///
    /// Multi-page documents are searched first, then the flat `tiles` list.
    pub fn find_tile(&self, tile_id: &str) -> Option<Value> {
        let mut root: Value = serde_json::from_str(self.as_json()).ok()?;
        let matches = |tile: &Value| tile.get("id").and_then(Value::as_str) == Some(tile_id);

        if let Some(pages) = root.get_mut("pages").and_then(Value::as_array_mut) {
            for page in pages.iter_mut() {
                if let Some(tiles) = page.get_mut("tiles").and_then(Value::as_array_mut) {
                    if let Some(pos) = tiles.iter().position(matches) {
                        return Some(tiles.swap_remove(pos));
                    }
                }
            }
        }
        let tiles = root.get_mut("tiles").and_then(Value::as_array_mut)?;
        let pos = tiles.iter().position(matches)?;
        Some(tiles.swap_remove(pos))
    }
}

impl PartialEq for LayoutDocument {
    fn eq(&self, other: &Self) -> bool {
        self.payload == other.payload
    }
}

impl Eq for LayoutDocument {}

impl fmt::Debug for LayoutDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LayoutDocument").field(&self.payload).finish()
    }
}

impl Default for LayoutDocument {
    fn default() -> Self {
        Self::empty()
    }
}

impl Serialize for LayoutDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.payload.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for LayoutDocument {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Payload::deserialize(deserializer).map(Self::wrap)
    }
}

// ── Skeleton used for validation ─────────────────────────────────────────────

#[derive(Deserialize)]
struct Skeleton {
    pages: Option<Vec<PageSkeleton>>,
    tiles: Option<Vec<TileSkeleton>>,
}

#[derive(Deserialize)]
struct PageSkeleton {
    #[serde(default)]
    tiles: Vec<TileSkeleton>,
}

#[derive(Deserialize)]
struct TileSkeleton {
    // Other tile fields are skipped without being materialized.
    id: Option<Value>,
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(json: &str) -> LayoutDocument {
        LayoutDocument::from_json(json).unwrap()
    }

    #[test]
    fn test_empty_document_is_valid_with_zero_tiles() {
        let empty = LayoutDocument::empty();
        assert_eq!(empty.as_json(), r#"{"pages":[]}"#);
        assert_eq!(
            empty.validate(),
            Ok(LayoutSummary { pages: 0, tiles: 0 })
        );
    }

    #[test]
    fn test_multi_page_counts() {
        let layout = doc(
            r#"{"pages":[
                {"grid":{"cols":4},"tiles":[{"id":"a"},{"id":"b","actions":{"tap":{"type":"hotkey"}}}]},
                {"grid":{"cols":2},"tiles":[{"id":"c"}]}
            ]}"#,
        );
        assert_eq!(layout.validate(), Ok(LayoutSummary { pages: 2, tiles: 3 }));
        assert_eq!(layout.tile_count(), 3);
    }

    #[test]
    fn test_flat_tiles_layout_is_accepted() {
        let layout = doc(r#"{"grid":{"cols":3},"tiles":[{"id":"x"},{"id":"y"}]}"#);
        assert_eq!(layout.validate(), Ok(LayoutSummary { pages: 1, tiles: 2 }));
    }

    #[test]
    fn test_page_without_tiles_is_empty() {
        let layout = doc(r#"{"pages":[{"grid":{}}]}"#);
        assert_eq!(layout.validate(), Ok(LayoutSummary { pages: 1, tiles: 0 }));
    }

    #[test]
    fn test_duplicate_ids_across_pages_are_rejected() {
        let layout = doc(r#"{"pages":[{"tiles":[{"id":"a"}]},{"tiles":[{"id":"a"}]}]}"#);
        assert_eq!(
            layout.validate(),
            Err(LayoutError::DuplicateTileId("a".to_string()))
        );
    }

    #[test]
    fn test_tile_without_string_id_is_rejected() {
        let layout = doc(r#"{"pages":[{"tiles":[{"id":"a"},{"id":7}]}]}"#);
        assert_eq!(
            layout.validate(),
            Err(LayoutError::MissingTileId { page: 0, index: 1 })
        );
    }

    #[test]
    fn test_non_object_and_missing_tiles() {
        assert_eq!(doc("[1,2]").validate(), Err(LayoutError::NotAnObject));
        assert_eq!(
            doc(r#"{"theme":"dark"}"#).validate(),
            Err(LayoutError::MissingTiles)
        );
        assert!(matches!(
            doc(r#"{"pages":{"a":1}}"#).validate(),
            Err(LayoutError::Malformed(_))
        ));
    }

    #[test]
    fn test_invalid_json_is_rejected_on_construction() {
        assert!(matches!(
            LayoutDocument::from_json("{\"pages\":["),
            Err(LayoutError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_tile_count_is_zero_for_invalid_layout() {
        assert_eq!(doc(r#"{"pages":[{"tiles":[{}]}]}"#).tile_count(), 0);
    }

    #[test]
    fn test_validation_result_is_shared_by_clones() {
        // Arrange
        let layout = doc(r#"{"pages":[{"tiles":[{"id":"a"},{"id":"b"}]}]}"#);
        let copy = layout.clone();

        // Act
        let first = layout.validate();

        // Assert: the clone sees the cached result without computing it
        assert!(Arc::ptr_eq(&layout.summary, &copy.summary));
        assert_eq!(copy.summary.get(), Some(&first));
        assert_eq!(copy.tile_count(), 2);
    }

    #[test]
    fn test_cached_error_is_returned_every_time() {
        let layout = doc(r#"{"pages":[{"tiles":[{"id":"a"},{"id":"a"}]}]}"#);
        assert_eq!(layout.validate(), layout.validate());
        assert_eq!(layout.tile_count(), 0);
    }

    #[test]
    fn test_find_tile_prefers_pages_then_flat_list() {
        // Arrange
        let layout = doc(
            r#"{"pages":[{"tiles":[{"id":"a","label":"paged"}]}],
                "tiles":[{"id":"a","label":"flat"},{"id":"b","label":"flat-only"}]}"#,
        );

        // Act / Assert
        let a = layout.find_tile("a").unwrap();
        assert_eq!(a["label"], "paged");
        let b = layout.find_tile("b").unwrap();
        assert_eq!(b["label"], "flat-only");
        assert!(layout.find_tile("zzz").is_none());
    }
}
