//! Passthrough backend: glyph index equals codepoint.

use crate::font::{FaceIdx, FontSource};

use super::{Glyph, RunBuffer, ShapeError, ShapingBackend};

/// No-op shaping — one glyph per accumulated codepoint, glyph index equal
/// to the codepoint, cluster preserved, zero metrics. For tests and hosts
/// that render codepoints directly.
#[derive(Debug, Default)]
pub struct NoopBackend {
    glyphs: Vec<Glyph>,
}

impl ShapingBackend for NoopBackend {
    fn shape_run<'a>(
        &'a mut self,
        _face: FaceIdx,
        _fonts: &dyn FontSource,
        buf: &RunBuffer,
    ) -> Result<&'a [Glyph], ShapeError> {
        self.glyphs.clear();
        for cp in buf.codepoints() {
            self.glyphs.push(Glyph {
                id: cp.value,
                cluster: cp.cluster,
                ..Glyph::default()
            });
        }
        Ok(&self.glyphs)
    }
}
