//! Font identity, style mapping, and the resolution interface consumed by
//! run segmentation.
//!
//! The crate never loads or parses font files. It resolves codepoints to
//! opaque [`FontIndex`] values through the [`FontSource`] trait and leaves
//! face data ownership to the embedder. [`CoverageCollection`] is the
//! built-in implementation, driven by codepoint coverage ranges.

mod collection;

pub use collection::{CoverageCollection, FaceDef};

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::cell::CellFlags;

/// Font style variant selected by cell attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Style {
    Regular = 0,
    Bold = 1,
    Italic = 2,
    BoldItalic = 3,
}

impl Style {
    /// Map cell flags to the appropriate font style.
    pub fn from_flags(flags: CellFlags) -> Self {
        match (
            flags.contains(CellFlags::BOLD),
            flags.contains(CellFlags::ITALIC),
        ) {
            (true, true) => Self::BoldItalic,
            (true, false) => Self::Bold,
            (false, true) => Self::Italic,
            (false, false) => Self::Regular,
        }
    }
}

/// Rendering preference forced by a variation selector following the base
/// codepoint: U+FE0E forces text presentation, U+FE0F forces emoji.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Presentation {
    Text,
    Emoji,
}

/// Compact face index within a font collection.
///
/// 0–3 = primary styles (Regular/Bold/Italic/BoldItalic).
/// 4+ = fallback fonts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FaceIdx(pub u16);

impl FaceIdx {
    /// Returns the `Style` if this is a primary face (0–3).
    pub fn style(self) -> Option<Style> {
        match self.0 {
            0 => Some(Style::Regular),
            1 => Some(Style::Bold),
            2 => Some(Style::Italic),
            3 => Some(Style::BoldItalic),
            _ => None,
        }
    }

    /// Whether this face index refers to a fallback font (not primary).
    pub fn is_fallback(self) -> bool {
        self.0 >= 4
    }
}

/// Synthetic glyph classes drawn geometrically instead of from a font.
/// For these, the glyph index is the codepoint itself and shaping is
/// skipped entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sprite {
    /// Box Drawing (U+2500–U+257F).
    BoxDrawing,
    /// Block Elements (U+2580–U+259F).
    BlockElement,
    /// Braille Patterns (U+2800–U+28FF).
    Braille,
    /// Powerline and Powerline Extra glyphs (U+E0A0–U+E0A3, U+E0B0–U+E0D4).
    Powerline,
}

impl Sprite {
    /// Classifies a codepoint into a sprite class, if it has one.
    pub fn classify(cp: u32) -> Option<Self> {
        match cp {
            0x2500..=0x257F => Some(Self::BoxDrawing),
            0x2580..=0x259F => Some(Self::BlockElement),
            0x2800..=0x28FF => Some(Self::Braille),
            0xE0A0..=0xE0A3 | 0xE0B0..=0xE0D4 => Some(Self::Powerline),
            _ => None,
        }
    }

    /// True if the sprite class covers the given codepoint.
    pub fn covers(self, cp: u32) -> bool {
        Self::classify(cp) == Some(self)
    }
}

/// Opaque identity of the font a run resolved to.
///
/// The `Special` variant marks sprite glyphs that bypass shaping, making
/// that short-circuit a checked branch rather than a magic index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontIndex {
    /// A real face within the collection.
    Face(FaceIdx),
    /// A synthetic sprite class; codepoint == glyph index.
    Special(Sprite),
}

impl FontIndex {
    /// True if shaping is skipped for runs assigned this index.
    pub fn is_special(self) -> bool {
        matches!(self, Self::Special(_))
    }
}

/// Font resolution interface consumed by the shaper.
///
/// Implementations own the face data; the shaper only asks which face
/// covers which codepoint. All methods take `&self`: the shaper expects
/// the caller to hold any synchronization (see [`SharedFonts`]) for the
/// duration of one row's segment/shape pass, so resolution cannot race
/// with a collection reload.
pub trait FontSource {
    /// Resolves the face that should render `cp` in the given style,
    /// honoring a forced presentation if one is set. Returns `None` when
    /// no face in the collection covers the codepoint.
    fn resolve(
        &self,
        cp: u32,
        style: Style,
        presentation: Option<Presentation>,
    ) -> Option<FontIndex>;

    /// True if the given font can render `cp` under the given presentation.
    fn supports(&self, font: FontIndex, cp: u32, presentation: Option<Presentation>) -> bool;

    /// Transient shaping face for full-shaping backends, borrowing the
    /// collection's font bytes. `None` if no raw data is attached.
    fn shaping_face(&self, face: FaceIdx) -> Option<rustybuzz::Face<'_>>;

    /// Direct codepoint→glyph mapping for direct-mapping backends.
    /// `None` if the face does not cover the codepoint.
    fn glyph_index(&self, face: FaceIdx, cp: u32) -> Option<u32>;

    /// Reserves (or returns the existing) synthetic glyph index for a
    /// multi-codepoint cluster on the given face. Direct-mapping backends
    /// use this for clusters a plain charmap lookup cannot express.
    fn grapheme_glyph(&self, face: FaceIdx, cluster: &str) -> u32;
}

/// Shared handle to a font source behind a reader/writer lock.
///
/// A renderer thread takes one read guard per row shaping pass; a config
/// reload takes the write guard to swap the collection. The shaping core
/// itself never locks.
#[derive(Debug, Default)]
pub struct SharedFonts<F> {
    inner: RwLock<F>,
}

impl<F: FontSource> SharedFonts<F> {
    /// Wraps a font source.
    pub fn new(fonts: F) -> Self {
        Self {
            inner: RwLock::new(fonts),
        }
    }

    /// Read access for the duration of one row's segment/shape pass.
    pub fn read(&self) -> RwLockReadGuard<'_, F> {
        self.inner.read()
    }

    /// Exclusive access for collection mutation (e.g. a config reload).
    pub fn write(&self) -> RwLockWriteGuard<'_, F> {
        self.inner.write()
    }
}
