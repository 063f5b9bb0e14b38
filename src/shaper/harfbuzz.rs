//! Full shaping via `rustybuzz`: ligatures, mark attachment, kerning.

use crate::font::{FaceIdx, FontSource};

use super::{Glyph, RunBuffer, ShapeError, ShapingBackend};

/// Parse feature strings into rustybuzz features.
///
/// Each string is a 4-char OpenType tag, optionally prefixed with `-` to
/// disable. Examples: `"calt"` (enable), `"-dlig"` (disable). Invalid
/// tags are logged and skipped.
pub fn parse_features(strings: &[String]) -> Vec<rustybuzz::Feature> {
    strings
        .iter()
        .filter_map(|s| {
            let (tag_str, value) = if let Some(rest) = s.strip_prefix('-') {
                (rest, 0)
            } else {
                (s.as_str(), 1)
            };
            let bytes = tag_str.as_bytes();
            if bytes.len() != 4 {
                log::warn!("ignoring invalid feature tag: {s}");
                return None;
            }
            let tag =
                rustybuzz::ttf_parser::Tag::from_bytes(bytes.try_into().expect("checked length"));
            Some(rustybuzz::Feature::new(tag, value, ..))
        })
        .collect()
}

/// HarfBuzz-equivalent backend.
///
/// Feeds the accumulated codepoints (cluster values carry the source
/// columns) to `rustybuzz` and converts the resulting glyph buffer back
/// into [`Glyph`]s. The Unicode buffer allocation is recycled across
/// runs.
#[derive(Debug)]
pub struct HarfbuzzBackend {
    /// OpenType features applied to every run.
    features: Vec<rustybuzz::Feature>,
    /// Recycled input buffer; `None` only while a shape call is running.
    unicode_buf: Option<rustybuzz::UnicodeBuffer>,
    glyphs: Vec<Glyph>,
}

impl HarfbuzzBackend {
    /// Backend with the default feature set (contextual alternates +
    /// standard ligatures).
    pub fn new() -> Self {
        Self::with_features(vec![
            rustybuzz::Feature::new(rustybuzz::ttf_parser::Tag::from_bytes(b"calt"), 1, ..),
            rustybuzz::Feature::new(rustybuzz::ttf_parser::Tag::from_bytes(b"liga"), 1, ..),
        ])
    }

    /// Backend with an explicit feature set (see [`parse_features`]).
    pub fn with_features(features: Vec<rustybuzz::Feature>) -> Self {
        Self {
            features,
            unicode_buf: None,
            glyphs: Vec::new(),
        }
    }
}

impl Default for HarfbuzzBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ShapingBackend for HarfbuzzBackend {
    fn shape_run<'a>(
        &'a mut self,
        face: FaceIdx,
        fonts: &dyn FontSource,
        buf: &RunBuffer,
    ) -> Result<&'a [Glyph], ShapeError> {
        let hb_face = fonts
            .shaping_face(face)
            .ok_or(ShapeError::FaceUnavailable(face.0))?;

        let mut unicode_buf = self
            .unicode_buf
            .take()
            .unwrap_or_else(rustybuzz::UnicodeBuffer::new);
        for cp in buf.codepoints() {
            let ch = char::from_u32(cp.value).unwrap_or(char::REPLACEMENT_CHARACTER);
            unicode_buf.add(ch, cp.cluster);
        }
        // Writing direction is always left-to-right; RTL is unsupported.
        unicode_buf.set_direction(rustybuzz::Direction::LeftToRight);

        let glyph_buf = rustybuzz::shape(&hb_face, &self.features, unicode_buf);

        self.glyphs.clear();
        for (info, pos) in glyph_buf
            .glyph_infos()
            .iter()
            .zip(glyph_buf.glyph_positions())
        {
            self.glyphs.push(Glyph {
                id: info.glyph_id,
                cluster: info.cluster,
                x_advance: pos.x_advance,
                y_advance: pos.y_advance,
                x_offset: pos.x_offset,
                y_offset: pos.y_offset,
            });
        }

        self.unicode_buf = Some(glyph_buf.clear());
        Ok(&self.glyphs)
    }
}
