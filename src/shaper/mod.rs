//! Row shaping — segments grid rows into font-homogeneous runs, shapes
//! each run through a pluggable backend, and lays the resulting glyphs
//! back onto the column grid.
//!
//! [`Shaper`] owns all per-run state: the codepoint accumulation buffer
//! the run iterator fills, the backend's scratch, and the reusable output
//! buffer. One engine instance serves one rendering thread; runs must be
//! shaped in the order the iterator yields them, since iterator and
//! engine share that state.

mod backend;
mod cache;
mod direct;
mod harfbuzz;
mod noop;
mod run;

pub use backend::{Codepoint, Glyph, RunBuffer, ShapingBackend};
pub use cache::{DEFAULT_CACHE_CAPACITY, ShapeCache};
pub use direct::DirectBackend;
pub use harfbuzz::{HarfbuzzBackend, parse_features};
pub use noop::NoopBackend;
pub use run::{RunIterator, RunOptions, TextRun};

use thiserror::Error;

use crate::font::{FontIndex, FontSource};
use crate::row::Row;

/// One positioned glyph reference in shaped output.
///
/// `glyph` is `None` for a padding cell: a column visually consumed by a
/// wider glyph or ligature that still needs its own background drawn.
/// Offsets are in unscaled font units relative to the column's natural
/// origin; scaling to pixels is the renderer's concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShapedCell {
    /// Terminal column this glyph's cluster starts at.
    pub col: usize,
    /// Glyph index within the run's font, or `None` for padding.
    pub glyph: Option<u32>,
    pub x_offset: i32,
    pub y_offset: i32,
}

impl ShapedCell {
    /// A glyphless cell covering a column swallowed by a wider glyph.
    pub fn padding(col: usize) -> Self {
        Self {
            col,
            glyph: None,
            x_offset: 0,
            y_offset: 0,
        }
    }
}

/// Errors surfaced by a row shaping pass.
///
/// All failures are local to one run; engine buffers are cleared at the
/// start of every run, so a failed pass never corrupts the next.
#[derive(Debug, Error)]
pub enum ShapeError {
    /// No shaping face is loaded for the resolved font.
    #[error("no shaping face loaded for face index {0}")]
    FaceUnavailable(u16),
    /// The underlying shaping library failed to produce glyphs.
    #[error("shaping backend failed: {0}")]
    Backend(String),
    /// A fixed-capacity output buffer cannot hold the shaped run.
    #[error("shaped output of {needed} cells exceeds buffer capacity {capacity}")]
    BufferExceeded { needed: usize, capacity: usize },
}

/// The shaping engine: a backend plus the reusable per-run buffers.
pub struct Shaper<B> {
    backend: B,
    buf: RunBuffer,
    cells: Vec<ShapedCell>,
    cache: Option<ShapeCache>,
}

impl<B: ShapingBackend> Shaper<B> {
    /// Creates an engine without result caching.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            buf: RunBuffer::default(),
            cells: Vec::new(),
            cache: None,
        }
    }

    /// Creates an engine that memoizes shaped runs by content hash.
    /// A capacity of zero disables caching.
    pub fn with_cache(backend: B, capacity: usize) -> Self {
        Self {
            cache: ShapeCache::with_capacity(capacity),
            ..Self::new(backend)
        }
    }

    /// The shape result cache, if caching is enabled.
    pub fn cache(&self) -> Option<&ShapeCache> {
        self.cache.as_ref()
    }

    /// Starts segmenting one row into runs.
    ///
    /// The iterator shares the engine's accumulation buffer: consume each
    /// run (via [`RunIterator::shape`]) before asking for the next one.
    pub fn run_iterator<'s, F: FontSource>(
        &'s mut self,
        fonts: &'s F,
        row: &'s Row,
        opts: RunOptions,
    ) -> RunIterator<'s, B, F> {
        RunIterator::new(self, fonts, row, opts)
    }

    /// Segments, shapes, and caches one row in a single pass, returning
    /// owned cells for the frame renderer.
    pub fn shape_row<F: FontSource>(
        &mut self,
        fonts: &F,
        row: &Row,
        opts: RunOptions,
    ) -> Result<Vec<ShapedCell>, ShapeError> {
        let mut out = Vec::new();
        let mut cache = self.cache.take();
        let mut result = Ok(());
        {
            let mut runs = self.run_iterator(fonts, row, opts);
            while let Some(run) = runs.next() {
                if let Some(hit) = cache.as_mut().and_then(|c| c.get(run.content_hash)) {
                    out.extend_from_slice(hit);
                    continue;
                }
                match runs.shape(&run) {
                    Ok(cells) => {
                        out.extend_from_slice(cells);
                        if let Some(c) = cache.as_mut() {
                            c.put(run.content_hash, cells);
                        }
                    }
                    Err(e) => {
                        result = Err(e);
                        break;
                    }
                }
            }
        }
        self.cache = cache;
        result.map(|()| out)
    }

    // Accumulation hooks used by the run iterator.

    pub(crate) fn begin_run(&mut self) {
        self.buf.clear();
    }

    pub(crate) fn push_codepoint(&mut self, value: u32, cluster: u32) {
        self.buf.push(value, cluster);
    }

    /// Shapes the currently accumulated run. The result borrows the
    /// engine's output buffer and is valid until the next shape call.
    pub(crate) fn shape_accumulated(
        &mut self,
        fonts: &dyn FontSource,
        run: &TextRun,
    ) -> Result<&[ShapedCell], ShapeError> {
        self.cells.clear();
        if self.buf.is_empty() {
            return Ok(&self.cells);
        }

        match run.font {
            // Sprite glyphs skip shaping: codepoint == glyph index.
            FontIndex::Special(_) => {
                let end = run.offset + run.cell_count;
                let mut next_col = run.offset;
                for cp in self.buf.codepoints() {
                    let col = cp.cluster as usize;
                    for pad in next_col..col {
                        self.cells.push(ShapedCell::padding(pad));
                    }
                    self.cells.push(ShapedCell {
                        col,
                        glyph: Some(cp.value),
                        x_offset: 0,
                        y_offset: 0,
                    });
                    next_col = next_col.max(col + 1);
                }
                for pad in next_col..end {
                    self.cells.push(ShapedCell::padding(pad));
                }
            }
            FontIndex::Face(face) => {
                let glyphs = self.backend.shape_run(face, fonts, &self.buf)?;
                layout_cells(&mut self.cells, run, glyphs);
            }
        }

        Ok(&self.cells)
    }
}

/// Lays backend glyphs onto the column grid.
///
/// Each glyph lands at its cluster's starting column. Columns a cluster
/// consumed beyond its first (ligatures, wide glyphs) become padding
/// cells, as do columns skipped when a cluster starts past the expected
/// column (right-attached ligature glyphs). Within one cluster, each
/// glyph's advance shifts the offsets of the glyphs that follow it.
/// Every column in the run's range ends up covered.
fn layout_cells(cells: &mut Vec<ShapedCell>, run: &TextRun, glyphs: &[Glyph]) {
    let end = run.offset + run.cell_count;
    let mut next_col = run.offset;
    let mut prev_cluster = None;
    let mut advance_x = 0i32;
    let mut advance_y = 0i32;

    for glyph in glyphs {
        let col = glyph.cluster as usize;
        if prev_cluster != Some(col) {
            advance_x = 0;
            advance_y = 0;
            for pad in next_col..col {
                cells.push(ShapedCell::padding(pad));
            }
        }
        cells.push(ShapedCell {
            col,
            glyph: Some(glyph.id),
            x_offset: advance_x + glyph.x_offset,
            y_offset: advance_y + glyph.y_offset,
        });
        advance_x += glyph.x_advance;
        advance_y += glyph.y_advance;
        next_col = next_col.max(col + 1);
        prev_cluster = Some(col);
    }

    for pad in next_col..end {
        cells.push(ShapedCell::padding(pad));
    }
}
