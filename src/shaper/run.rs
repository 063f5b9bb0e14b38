//! Run segmentation — walks one row left to right, grouping cells into
//! maximal spans that share a resolved font, splitting at style changes,
//! selection edges, the cursor, and font fallback boundaries.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::cell::Cell;
use crate::font::{FontIndex, FontSource, Presentation, Style};
use crate::row::Row;

use super::{ShapeError, ShapedCell, Shaper, ShapingBackend};

/// A maximal span of cells on one terminal row sharing a single resolved
/// font.
///
/// Runs are yielded in strict left-to-right order and never span rows.
/// A run shares the engine's accumulation buffer: shape it before asking
/// the iterator for the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextRun {
    /// Starting column.
    pub offset: usize,
    /// Number of columns the run covers (not the number of codepoints).
    pub cell_count: usize,
    /// The font every cell in this run resolved to.
    pub font: FontIndex,
    /// Stable hash over the run's codepoints, cluster columns, and font.
    /// The shape cache key.
    pub content_hash: u64,
}

/// Per-row segmentation inputs: selection range and cursor column.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Selected columns, inclusive on both ends, in either order.
    pub selection: Option<(usize, usize)>,
    /// Cursor column, if the cursor is on this row.
    pub cursor: Option<usize>,
}

/// Segments one row into text runs.
///
/// Created by [`Shaper::run_iterator`]; holds the engine mutably so each
/// accepted cell's codepoints land in the shared accumulation buffer.
pub struct RunIterator<'s, B, F> {
    shaper: &'s mut Shaper<B>,
    fonts: &'s F,
    row: &'s Row,
    /// Selection normalized to forward order.
    selection: Option<(usize, usize)>,
    /// Cursor normalized off spacer tails.
    cursor: Option<usize>,
    /// Trimmed content length: trailing blank cells are never scanned.
    limit: usize,
    col: usize,
}

impl<'s, B: ShapingBackend, F: FontSource> RunIterator<'s, B, F> {
    pub(crate) fn new(
        shaper: &'s mut Shaper<B>,
        fonts: &'s F,
        row: &'s Row,
        opts: RunOptions,
    ) -> Self {
        let selection = opts.selection.map(|(a, b)| (a.min(b), a.max(b)));
        // A cursor on a spacer tail belongs to its wide glyph.
        let cursor = opts.cursor.map(|c| {
            if row.get(c).is_some_and(Cell::is_wide_spacer) {
                c.saturating_sub(1)
            } else {
                c
            }
        });
        Self {
            shaper,
            fonts,
            row,
            selection,
            cursor,
            limit: row.content_len(),
            col: 0,
        }
    }

    /// Shapes the most recently yielded run. The result borrows the
    /// engine's output buffer and is valid until the next shape call.
    pub fn shape(&mut self, run: &TextRun) -> Result<&[ShapedCell], ShapeError> {
        self.shaper.shape_accumulated(self.fonts, run)
    }

    /// Feeds one codepoint to the engine and the content hash.
    fn push(&mut self, value: u32, cluster: u32, hasher: &mut DefaultHasher) {
        value.hash(hasher);
        cluster.hash(hasher);
        self.shaper.push_codepoint(value, cluster);
    }
}

impl<B: ShapingBackend, F: FontSource> Iterator for RunIterator<'_, B, F> {
    type Item = TextRun;

    fn next(&mut self) -> Option<TextRun> {
        // A spacer tail whose wide glyph went into the previous run does
        // not start a new one.
        while self.col < self.limit && self.row[self.col].is_wide_spacer() {
            self.col += 1;
        }
        if self.col >= self.limit {
            return None;
        }

        let start = self.col;
        self.shaper.begin_run();
        let mut hasher = DefaultHasher::new();
        let mut run_font: Option<FontIndex> = None;
        let mut run_style: Option<Style> = None;

        while self.col < self.limit {
            let col = self.col;
            let cell = &self.row[col];

            // Wide glyph tails ride along inside the run unshaped.
            if cell.is_wide_spacer() {
                self.col += 1;
                continue;
            }

            let style = Style::from_flags(cell.flags);
            if run_style.is_some_and(|s| s != style) {
                break;
            }

            // Selection edges split the run, but never inside a grapheme.
            if let Some((sel_start, sel_end)) = self.selection
                && col > start
                && (col == sel_start || col == sel_end + 1)
                && self.row.grapheme_break(col)
            {
                break;
            }

            // The cursor cell is isolated into its own run, unless it
            // holds cluster extensions (a modified emoji under the cursor
            // must not fragment).
            if let Some(cur) = self.cursor
                && self.row.get(cur).is_some_and(|c| !c.has_grapheme())
            {
                if col == cur && col > start {
                    break;
                }
                if start == cur && col > cur {
                    break;
                }
            }

            // Variation selector directly after the base forces the
            // cluster's presentation.
            let presentation = match cell.zerowidth().first() {
                Some('\u{FE0E}') => Some(Presentation::Text),
                Some('\u{FE0F}') => Some(Presentation::Emoji),
                _ => None,
            };

            let (font, fallback) = resolve_cluster(self.fonts, cell, style, presentation);
            match run_font {
                None => run_font = Some(font),
                // Font fallback boundary: the cell starts the next run.
                Some(f) if f != font => break,
                Some(_) => {}
            }
            run_style = Some(style);

            if let Some(fb) = fallback {
                self.push(fb as u32, col as u32, &mut hasher);
            } else {
                self.push(cell.c as u32, col as u32, &mut hasher);
                for &zw in cell.zerowidth() {
                    if !is_variation_selector(zw as u32) {
                        self.push(zw as u32, col as u32, &mut hasher);
                    }
                }
            }

            self.col += 1;
        }

        let font = run_font.expect("a run accepts at least its first cell");
        font.hash(&mut hasher);
        Some(TextRun {
            offset: start,
            cell_count: self.col - start,
            font,
            content_hash: hasher.finish(),
        })
    }
}

/// Resolves the font for one cell's full cluster.
///
/// Every codepoint of the cluster (variation selectors excluded) must be
/// covered by a single face; partial coverage across faces is rejected
/// wholesale. When nothing covers the cluster, it is replaced by U+FFFD,
/// then U+0020. Returns the resolved font and the substituted fallback
/// character, if any.
///
/// Panics if the collection covers neither fallback — such a collection
/// is misconfigured, not a recoverable state.
fn resolve_cluster<F: FontSource>(
    fonts: &F,
    cell: &Cell,
    style: Style,
    presentation: Option<Presentation>,
) -> (FontIndex, Option<char>) {
    let primary = cell.c as u32;
    let has_ext = cell
        .zerowidth()
        .iter()
        .any(|&z| !is_variation_selector(z as u32));

    if has_ext {
        let cps: Vec<u32> = std::iter::once(primary)
            .chain(cell.zerowidth().iter().map(|&z| z as u32))
            .filter(|&cp| !is_variation_selector(cp))
            .collect();
        // Each codepoint nominates a candidate; the first candidate
        // supporting the entire cluster wins.
        for &cp in &cps {
            let Some(font) = fonts.resolve(cp, style, presentation) else {
                continue;
            };
            if cps.iter().all(|&c| fonts.supports(font, c, presentation)) {
                return (font, None);
            }
        }
    } else if let Some(font) = fonts.resolve(primary, style, presentation) {
        return (font, None);
    }

    for fb in [char::REPLACEMENT_CHARACTER, ' '] {
        if let Some(font) = fonts.resolve(fb as u32, style, None) {
            log::debug!(
                "no font covers cluster starting U+{primary:04X}, substituting U+{:04X}",
                fb as u32
            );
            return (font, Some(fb));
        }
    }
    unreachable!("font collection covers neither U+FFFD nor U+0020")
}

fn is_variation_selector(cp: u32) -> bool {
    cp == 0xFE0E || cp == 0xFE0F
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::CellFlags;
    use crate::font::{CoverageCollection, FaceDef, FaceIdx};
    use crate::shaper::NoopBackend;

    /// Regular ASCII (plus combining marks and fallbacks), a bold
    /// variant, a CJK fallback, an emoji fallback, a text-symbol
    /// fallback.
    fn test_fonts() -> CoverageCollection {
        let mut fonts = CoverageCollection::new(FaceDef::new(vec![
            0x20..=0x7E,
            0x300..=0x36F,
            0xFFFD..=0xFFFD,
        ]));
        fonts.set_style(Style::Bold, FaceDef::new(vec![0x20..=0x7E]));
        fonts.add_fallback(FaceDef::new(vec![0x4E00..=0x9FFF]));
        fonts.add_fallback(FaceDef::emoji(vec![0x1F000..=0x1FAFF, 0x2600..=0x27BF]));
        fonts.add_fallback(FaceDef::new(vec![0x2600..=0x27BF]));
        fonts
    }

    const REGULAR: FontIndex = FontIndex::Face(FaceIdx(0));
    const BOLD: FontIndex = FontIndex::Face(FaceIdx(1));
    const CJK: FontIndex = FontIndex::Face(FaceIdx(4));
    const EMOJI: FontIndex = FontIndex::Face(FaceIdx(5));
    const SYMBOL_TEXT: FontIndex = FontIndex::Face(FaceIdx(6));

    fn runs_of(row: &Row, opts: RunOptions) -> Vec<TextRun> {
        let fonts = test_fonts();
        let mut shaper = Shaper::new(NoopBackend::default());
        shaper.run_iterator(&fonts, row, opts).collect()
    }

    fn spans(runs: &[TextRun]) -> Vec<(usize, usize)> {
        runs.iter().map(|r| (r.offset, r.cell_count)).collect()
    }

    #[test]
    fn empty_row_yields_nothing() {
        let row = Row::new(80);
        assert!(runs_of(&row, RunOptions::default()).is_empty());
    }

    #[test]
    fn uniform_row_is_one_run() {
        let row = Row::from_text("hello");
        let runs = runs_of(&row, RunOptions::default());
        assert_eq!(spans(&runs), vec![(0, 5)]);
        assert_eq!(runs[0].font, REGULAR);
    }

    #[test]
    fn trailing_blanks_are_trimmed() {
        let mut row = Row::from_text("ab");
        row.cells_mut()
            .extend(std::iter::repeat_n(Cell::default(), 78));
        let runs = runs_of(&row, RunOptions::default());
        assert_eq!(spans(&runs), vec![(0, 2)]);
    }

    #[test]
    fn style_change_splits_per_cell() {
        let mut row = Row::default();
        row.push_str("A", CellFlags::BOLD);
        row.push_str("B", CellFlags::empty());
        row.push_str("C", CellFlags::BOLD);
        let runs = runs_of(&row, RunOptions::default());
        assert_eq!(spans(&runs), vec![(0, 1), (1, 1), (2, 1)]);
        assert_eq!(runs[0].font, BOLD);
        assert_eq!(runs[1].font, REGULAR);
        assert_eq!(runs[2].font, BOLD);
    }

    #[test]
    fn font_fallback_splits() {
        let row = Row::from_text("ab好c");
        let runs = runs_of(&row, RunOptions::default());
        assert_eq!(spans(&runs), vec![(0, 2), (2, 2), (4, 1)]);
        assert_eq!(runs[1].font, CJK);
    }

    #[test]
    fn selection_splits_at_both_edges() {
        let row = Row::from_text("a1b2c3d4e5");
        let opts = RunOptions {
            selection: Some((2, 8)),
            cursor: None,
        };
        let runs = runs_of(&row, opts);
        assert_eq!(spans(&runs), vec![(0, 2), (2, 7), (9, 1)]);

        // Unordered selection normalizes to the same split.
        let swapped = RunOptions {
            selection: Some((8, 2)),
            cursor: None,
        };
        assert_eq!(spans(&runs_of(&row, swapped)), vec![(0, 2), (2, 7), (9, 1)]);
    }

    #[test]
    fn selection_edge_inside_grapheme_does_not_split() {
        // A combining mark forced into its own cell: columns 0..=1 form
        // one grapheme. A selection starting at column 1 may not split it.
        let mut row = Row::from_text("e");
        row.cells_mut()
            .push(Cell::new('\u{0301}', CellFlags::empty()));
        row.push_str("x", CellFlags::empty());
        let opts = RunOptions {
            selection: Some((1, 2)),
            cursor: None,
        };
        let runs = runs_of(&row, opts);
        assert_eq!(spans(&runs), vec![(0, 3)]);
    }

    #[test]
    fn cursor_isolates_its_cell() {
        let row = Row::from_text("0123456789");
        let opts = RunOptions {
            selection: None,
            cursor: Some(5),
        };
        assert_eq!(
            spans(&runs_of(&row, opts)),
            vec![(0, 5), (5, 1), (6, 4)],
        );
    }

    #[test]
    fn cursor_at_row_edges_yields_two_runs() {
        let row = Row::from_text("0123456789");
        let at_start = RunOptions {
            selection: None,
            cursor: Some(0),
        };
        assert_eq!(spans(&runs_of(&row, at_start)), vec![(0, 1), (1, 9)]);

        let at_end = RunOptions {
            selection: None,
            cursor: Some(9),
        };
        assert_eq!(spans(&runs_of(&row, at_end)), vec![(0, 9), (9, 1)]);
    }

    #[test]
    fn cursor_on_wide_cell_keeps_both_columns() {
        let row = Row::from_text("a好b");
        let opts = RunOptions {
            selection: None,
            cursor: Some(1),
        };
        assert_eq!(spans(&runs_of(&row, opts)), vec![(0, 1), (1, 2), (3, 1)]);

        // Pointing at the spacer tail is the same as pointing at the base.
        let on_tail = RunOptions {
            selection: None,
            cursor: Some(2),
        };
        assert_eq!(
            spans(&runs_of(&row, on_tail)),
            vec![(0, 1), (1, 2), (3, 1)],
        );
    }

    #[test]
    fn cursor_on_modified_emoji_does_not_fragment() {
        // Waving hand + skin tone at column 1; cursor hovering it.
        let row = Row::from_text("a\u{1F44B}\u{1F3FD}b");
        let opts = RunOptions {
            selection: None,
            cursor: Some(1),
        };
        let runs = runs_of(&row, opts);
        // Split only at the font boundaries, not around the cursor.
        assert_eq!(spans(&runs), vec![(0, 1), (1, 2), (3, 1)]);
        assert_eq!(runs[1].font, EMOJI);

        // Same shape entirely without a cursor.
        assert_eq!(
            spans(&runs_of(&row, RunOptions::default())),
            vec![(0, 1), (1, 2), (3, 1)],
        );
    }

    #[test]
    fn modified_emoji_stays_in_one_run() {
        let row = Row::from_text("\u{1F44B}\u{1F3FD}");
        let runs = runs_of(&row, RunOptions::default());
        assert_eq!(spans(&runs), vec![(0, 2)]);
        assert_eq!(runs[0].font, EMOJI);
    }

    #[test]
    fn variation_selector_picks_presentation_face() {
        // U+2764 heart: emoji face with VS16, text symbol face with VS15.
        let mut emoji_row = Row::default();
        let mut heart = Cell::new('\u{2764}', CellFlags::empty());
        heart.push_zerowidth('\u{FE0F}');
        emoji_row.cells_mut().push(heart);

        let runs = runs_of(&emoji_row, RunOptions::default());
        assert_eq!(runs[0].font, EMOJI);

        let mut text_row = Row::default();
        let mut heart = Cell::new('\u{2764}', CellFlags::empty());
        heart.push_zerowidth('\u{FE0E}');
        text_row.cells_mut().push(heart);

        let runs = runs_of(&text_row, RunOptions::default());
        assert_eq!(runs[0].font, SYMBOL_TEXT);
    }

    #[test]
    fn variation_selectors_are_not_fed_to_the_backend() {
        let mut row = Row::default();
        let mut heart = Cell::new('\u{2764}', CellFlags::empty());
        heart.push_zerowidth('\u{FE0F}');
        row.cells_mut().push(heart);

        let fonts = test_fonts();
        let mut shaper = Shaper::new(NoopBackend::default());
        let mut it = shaper.run_iterator(&fonts, &row, RunOptions::default());
        let run = it.next().unwrap();
        let cells = it.shape(&run).unwrap();
        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0].glyph, Some(0x2764));
    }

    #[test]
    fn unresolvable_cluster_substitutes_replacement() {
        // U+0500 is covered by no face in the test collection.
        let row = Row::from_text("\u{0500}");
        let fonts = test_fonts();
        let mut shaper = Shaper::new(NoopBackend::default());
        let mut it = shaper.run_iterator(&fonts, &row, RunOptions::default());
        let run = it.next().unwrap();
        assert_eq!(run.font, REGULAR);
        let cells = it.shape(&run).unwrap();
        assert_eq!(cells[0].glyph, Some(0xFFFD));
    }

    #[test]
    fn partially_covered_cluster_falls_back_wholesale() {
        // Base covered by the emoji face, extension covered by nothing:
        // no single face takes the whole cluster.
        let mut row = Row::default();
        let mut cell = Cell::new('\u{1F44B}', CellFlags::empty());
        cell.push_zerowidth('\u{0500}');
        row.cells_mut().push(cell);

        let runs = runs_of(&row, RunOptions::default());
        assert_eq!(runs[0].font, REGULAR);
    }

    #[test]
    fn sprite_cells_form_special_runs() {
        let row = Row::from_text("a\u{2502}\u{2500}b");
        let runs = runs_of(&row, RunOptions::default());
        assert_eq!(spans(&runs), vec![(0, 1), (1, 2), (3, 1)]);
        assert!(runs[1].font.is_special());
    }

    #[test]
    fn runs_are_monotone_and_contiguous() {
        let row = Row::from_text("ab好cd\u{1F44B}\u{1F3FD}ef");
        let runs = runs_of(&row, RunOptions::default());
        for pair in runs.windows(2) {
            assert!(pair[1].offset > pair[0].offset);
            assert_eq!(pair[0].offset + pair[0].cell_count, pair[1].offset);
        }
        let total: usize = runs.iter().map(|r| r.cell_count).sum();
        assert_eq!(total, row.content_len());
    }

    #[test]
    fn content_hash_tracks_content_and_font() {
        let hash_of = |text: &str, flags: CellFlags| {
            let mut row = Row::default();
            row.push_str(text, flags);
            runs_of(&row, RunOptions::default())[0].content_hash
        };

        assert_eq!(
            hash_of("ab", CellFlags::empty()),
            hash_of("ab", CellFlags::empty())
        );
        assert_ne!(
            hash_of("ab", CellFlags::empty()),
            hash_of("ac", CellFlags::empty())
        );
        // Same codepoints, different resolved font.
        assert_ne!(
            hash_of("ab", CellFlags::empty()),
            hash_of("ab", CellFlags::BOLD)
        );
    }
}
