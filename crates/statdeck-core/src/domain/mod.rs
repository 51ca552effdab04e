//! Domain entities for StatDeck.
//!
//! The only domain object the link layer knows about is the layout document.
//! Everything inside a tile (its renderer, theme, action table) belongs to
//! the designer and display applications and is carried here as opaque JSON.
//!
//! # Why so little? (for beginners)
//!
//! The link layer must forward a layout byte-for-byte.  If it parsed the
//! layout into rich Rust structs and serialized them again, any field it did
//! not model would be silently dropped and float formatting could change.
//! Keeping the document as raw text and validating only its skeleton avoids
//! both problems.

/// Layout document payload and its structural validation.
///
/// See [`layout::LayoutDocument`] for the main type.
pub mod layout;
