//! In-memory font collection — coverage-driven resolution over primary
//! style variants and a prioritized fallback chain.

use std::collections::HashMap;
use std::ops::RangeInclusive;
use std::sync::Arc;

use parking_lot::Mutex;

use super::{FaceIdx, FontIndex, FontSource, Presentation, Sprite, Style};

/// Base for synthetic grapheme glyph indices, above any real glyph ID
/// (OpenType glyph IDs are 16-bit).
const GRAPHEME_GLYPH_BASE: u32 = 0x0001_0000;

/// One face in the collection: which codepoints it covers, whether it
/// provides emoji presentation, and optionally the raw font bytes backing
/// a real shaping face.
#[derive(Debug, Clone, Default)]
pub struct FaceDef {
    coverage: Vec<RangeInclusive<u32>>,
    emoji: bool,
    data: Option<Arc<Vec<u8>>>,
}

impl FaceDef {
    /// A text-presentation face covering the given codepoint ranges.
    pub fn new(coverage: Vec<RangeInclusive<u32>>) -> Self {
        Self {
            coverage,
            emoji: false,
            data: None,
        }
    }

    /// An emoji-presentation face covering the given codepoint ranges.
    pub fn emoji(coverage: Vec<RangeInclusive<u32>>) -> Self {
        Self {
            coverage,
            emoji: true,
            data: None,
        }
    }

    /// Attaches raw font bytes so the face can back a real shaping face
    /// and charmap lookups. Without data, glyph lookups use the identity
    /// mapping (glyph index == codepoint).
    #[must_use]
    pub fn with_data(mut self, data: Vec<u8>) -> Self {
        self.data = Some(Arc::new(data));
        self
    }

    fn covers(&self, cp: u32) -> bool {
        self.coverage.iter().any(|r| r.contains(&cp))
    }

    fn presentation_ok(&self, presentation: Option<Presentation>) -> bool {
        match presentation {
            None => true,
            Some(Presentation::Emoji) => self.emoji,
            Some(Presentation::Text) => !self.emoji,
        }
    }
}

/// Font collection resolving codepoints by coverage.
///
/// Resolution order matches the on-disk collections this stands in for:
/// requested style variant, then Regular, then fallbacks in priority
/// order. Sprite codepoint ranges (box drawing, block elements, braille,
/// Powerline) resolve to [`FontIndex::Special`] before any face is
/// consulted, unless disabled.
///
/// A usable collection must cover U+FFFD or U+0020 in its Regular face;
/// run segmentation treats a collection without either as misconfigured
/// and panics.
#[derive(Debug, Default)]
pub struct CoverageCollection {
    /// Primary faces (Regular/Bold/Italic/BoldItalic). Regular is index 0.
    primary: [Option<FaceDef>; 4],
    /// Fallback faces, in priority order, at indices 4+.
    fallbacks: Vec<FaceDef>,
    /// Whether sprite ranges bypass the faces entirely.
    sprites: bool,
    /// Synthetic glyph reservations for multi-codepoint clusters.
    grapheme_ids: Mutex<HashMap<(u16, String), u32>>,
}

impl CoverageCollection {
    /// Creates a collection with the given Regular face and sprite
    /// resolution enabled.
    pub fn new(regular: FaceDef) -> Self {
        Self {
            primary: [Some(regular), None, None, None],
            fallbacks: Vec::new(),
            sprites: true,
            grapheme_ids: Mutex::new(HashMap::new()),
        }
    }

    /// Sets a primary style variant face.
    pub fn set_style(&mut self, style: Style, face: FaceDef) {
        self.primary[style as usize] = Some(face);
    }

    /// Appends a fallback face, returning its index.
    pub fn add_fallback(&mut self, face: FaceDef) -> FaceIdx {
        self.fallbacks.push(face);
        FaceIdx((4 + self.fallbacks.len() - 1) as u16)
    }

    /// Enables or disables sprite resolution for the built-in glyph ranges.
    pub fn set_sprites(&mut self, enabled: bool) {
        self.sprites = enabled;
    }

    /// Access a face by index (0–3 = primary, 4+ = fallback).
    fn face(&self, idx: FaceIdx) -> Option<&FaceDef> {
        let i = idx.0 as usize;
        if i < 4 {
            self.primary[i].as_ref()
        } else {
            self.fallbacks.get(i - 4)
        }
    }

    /// Candidate face indices in resolution priority order for a style.
    fn candidates(&self, style: Style) -> impl Iterator<Item = FaceIdx> + '_ {
        let styled = style as u16;
        std::iter::once(styled)
            .chain((styled != 0).then_some(0))
            .chain((0..self.fallbacks.len() as u16).map(|i| 4 + i))
            .map(FaceIdx)
    }
}

impl FontSource for CoverageCollection {
    fn resolve(
        &self,
        cp: u32,
        style: Style,
        presentation: Option<Presentation>,
    ) -> Option<FontIndex> {
        if self.sprites && let Some(sprite) = Sprite::classify(cp) {
            return Some(FontIndex::Special(sprite));
        }

        for idx in self.candidates(style) {
            if let Some(face) = self.face(idx)
                && face.covers(cp)
                && face.presentation_ok(presentation)
            {
                return Some(FontIndex::Face(idx));
            }
        }

        // A forced presentation nothing satisfies: settle for any face
        // covering the codepoint rather than dropping to replacement.
        if presentation.is_some() {
            for idx in self.candidates(style) {
                if let Some(face) = self.face(idx)
                    && face.covers(cp)
                {
                    log::debug!(
                        "no {presentation:?} face for U+{cp:04X}, using face {}",
                        idx.0
                    );
                    return Some(FontIndex::Face(idx));
                }
            }
        }

        None
    }

    fn supports(&self, font: FontIndex, cp: u32, presentation: Option<Presentation>) -> bool {
        match font {
            FontIndex::Special(sprite) => sprite.covers(cp),
            FontIndex::Face(idx) => self
                .face(idx)
                .is_some_and(|f| f.covers(cp) && f.presentation_ok(presentation)),
        }
    }

    fn shaping_face(&self, face: FaceIdx) -> Option<rustybuzz::Face<'_>> {
        let data = self.face(face)?.data.as_ref()?;
        rustybuzz::Face::from_slice(data, 0)
    }

    fn glyph_index(&self, face: FaceIdx, cp: u32) -> Option<u32> {
        let f = self.face(face)?;
        if !f.covers(cp) {
            return None;
        }
        match &f.data {
            Some(data) => {
                let hb = rustybuzz::Face::from_slice(data, 0)?;
                let ch = char::from_u32(cp)?;
                hb.glyph_index(ch).map(|id| u32::from(id.0))
            }
            // Coverage-only faces map glyphs by identity.
            None => Some(cp),
        }
    }

    fn grapheme_glyph(&self, face: FaceIdx, cluster: &str) -> u32 {
        let mut ids = self.grapheme_ids.lock();
        let next = GRAPHEME_GLYPH_BASE + ids.len() as u32;
        *ids.entry((face.0, cluster.to_string())).or_insert(next)
    }
}
