//! Direct-mapping backend: manual grapheme clustering plus charmap
//! lookups, for hosts without a shaping library.

use unicode_segmentation::UnicodeSegmentation;

use crate::font::{FaceIdx, FontSource};

use super::{Glyph, RunBuffer, ShapeError, ShapingBackend};

/// Shapes by segmenting the accumulated codepoints into extended grapheme
/// clusters. Single-codepoint clusters map straight through the face's
/// charmap; longer clusters get a synthetic glyph reserved per cluster,
/// since a charmap cannot express them.
///
/// No ligature substitution happens in this mode.
#[derive(Debug, Default)]
pub struct DirectBackend {
    /// Reassembled run text, reused across runs.
    text: String,
    /// Column tag for every byte of `text`.
    byte_clusters: Vec<u32>,
    glyphs: Vec<Glyph>,
}

impl ShapingBackend for DirectBackend {
    fn shape_run<'a>(
        &'a mut self,
        face: FaceIdx,
        fonts: &dyn FontSource,
        buf: &RunBuffer,
    ) -> Result<&'a [Glyph], ShapeError> {
        self.text.clear();
        self.byte_clusters.clear();
        self.glyphs.clear();

        for cp in buf.codepoints() {
            let ch = char::from_u32(cp.value).unwrap_or(char::REPLACEMENT_CHARACTER);
            self.text.push(ch);
            for _ in 0..ch.len_utf8() {
                self.byte_clusters.push(cp.cluster);
            }
        }

        for (offset, grapheme) in self.text.grapheme_indices(true) {
            let cluster = self.byte_clusters[offset];
            let mut chars = grapheme.chars();
            let first = chars.next().expect("graphemes are never empty");
            let id = if chars.next().is_none() {
                // Missing glyphs map to .notdef.
                fonts.glyph_index(face, first as u32).unwrap_or(0)
            } else {
                fonts.grapheme_glyph(face, grapheme)
            };
            self.glyphs.push(Glyph {
                id,
                cluster,
                ..Glyph::default()
            });
        }

        Ok(&self.glyphs)
    }
}
