//! Text shaping and run segmentation for terminal grid rows.
//!
//! This crate turns one row of terminal cells into positioned glyph
//! references: it groups cells into maximal runs sharing a resolved font
//! (splitting at style changes, selection edges, the cursor, and font
//! fallback boundaries), shapes each run through a pluggable backend
//! (HarfBuzz-style full shaping, direct grapheme mapping, or passthrough),
//! and lays the glyphs back onto the column grid with padding cells where
//! ligatures or wide glyphs swallowed columns. Shaped runs are memoized
//! by content hash across frames.
//!
//! It contains no rasterization, font discovery, or platform code: font
//! data ownership stays behind the [`FontSource`] trait, and the output
//! is plain [`ShapedCell`]s for a renderer to consume.

#![deny(unsafe_code)]

pub mod cell;
pub mod config;
pub mod font;
pub mod row;
pub mod shaper;

pub use cell::{Cell, CellExtra, CellFlags, Rgb};
pub use config::{BackendKind, ShaperConfig};
pub use font::{
    CoverageCollection, FaceDef, FaceIdx, FontIndex, FontSource, Presentation, SharedFonts,
    Sprite, Style,
};
pub use row::Row;
pub use shaper::{
    Codepoint, DEFAULT_CACHE_CAPACITY, DirectBackend, Glyph, HarfbuzzBackend, NoopBackend,
    RunBuffer, RunIterator, RunOptions, ShapeCache, ShapeError, ShapedCell, Shaper,
    ShapingBackend, TextRun, parse_features,
};
