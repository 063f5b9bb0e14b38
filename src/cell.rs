//! Terminal grid cell representation with the attributes that drive shaping.

use std::sync::Arc;

use bitflags::bitflags;

bitflags! {
    /// Bitflags for cell text attributes and layout hints.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CellFlags: u8 {
        const BOLD             = 0b0000_0001;
        const ITALIC           = 0b0000_0010;
        const WIDE_CHAR        = 0b0000_0100;
        const WIDE_CHAR_SPACER = 0b0000_1000;
    }
}

/// A 24-bit RGB color. Only the presence of a background matters to the
/// shaper (trailing-empty trimming); the value is carried for the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Extended cell data stored out-of-line (combining marks).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CellExtra {
    pub zerowidth: Vec<char>,
}

/// A single grid cell with character, style flags, optional background,
/// and optional extended data.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub c: char,
    pub bg: Option<Rgb>,
    pub flags: CellFlags,
    pub extra: Option<Arc<CellExtra>>,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            c: ' ',
            bg: None,
            flags: CellFlags::empty(),
            extra: None,
        }
    }
}

impl Cell {
    /// Creates a cell holding the given character with the given flags.
    pub fn new(c: char, flags: CellFlags) -> Self {
        Self {
            c,
            bg: None,
            flags,
            extra: None,
        }
    }

    // Accessors

    /// Returns the zero-width combining characters for this cell.
    pub fn zerowidth(&self) -> &[char] {
        match &self.extra {
            Some(extra) => &extra.zerowidth,
            None => &[],
        }
    }

    /// True if this cell carries combining extension codepoints (its content
    /// is a multi-codepoint grapheme cluster).
    pub fn has_grapheme(&self) -> bool {
        !self.zerowidth().is_empty()
    }

    /// True if this cell is the trailing half of a double-width glyph.
    pub fn is_wide_spacer(&self) -> bool {
        self.flags.contains(CellFlags::WIDE_CHAR_SPACER)
    }

    /// True if this cell has no character and no background. Trailing blank
    /// cells are excluded from run segmentation.
    pub fn is_blank(&self) -> bool {
        (self.c == ' ' || self.c == '\0')
            && self.bg.is_none()
            && !self.has_grapheme()
            && !self
                .flags
                .intersects(CellFlags::WIDE_CHAR | CellFlags::WIDE_CHAR_SPACER)
    }

    // Operations

    /// Adds a zero-width combining character to this cell.
    pub fn push_zerowidth(&mut self, c: char) {
        let extra = self
            .extra
            .get_or_insert_with(|| Arc::new(CellExtra::default()));
        Arc::make_mut(extra).zerowidth.push(c);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_default() {
        let cell = Cell::default();
        assert_eq!(cell.c, ' ');
        assert!(cell.bg.is_none());
        assert!(cell.flags.is_empty());
        assert!(cell.extra.is_none());
        assert!(cell.is_blank());
    }

    #[test]
    fn cell_zerowidth() {
        let mut cell = Cell::default();
        assert!(cell.zerowidth().is_empty());
        assert!(!cell.has_grapheme());
        cell.push_zerowidth('\u{0300}'); // combining grave accent
        assert_eq!(cell.zerowidth(), &['\u{0300}']);
        assert!(cell.has_grapheme());
    }

    #[test]
    fn blank_classification() {
        let mut cell = Cell::default();
        assert!(cell.is_blank());

        // A space with an explicit background is content, not trailing blank.
        cell.bg = Some(Rgb { r: 32, g: 32, b: 32 });
        assert!(!cell.is_blank());

        let spacer = Cell::new(' ', CellFlags::WIDE_CHAR_SPACER);
        assert!(!spacer.is_blank());
        assert!(spacer.is_wide_spacer());
    }
}
