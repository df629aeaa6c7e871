//! Terminal cell: the fundamental unit of the grid.
//!
//! Each cell stores a character, its SGR attributes, and a display width
//! class. Width 2 marks the leading half of a CJK/emoji pair; width 0 marks
//! the trailing continuation cell, whose content is a placeholder and is
//! omitted from rendered output.

use bitflags::bitflags;
use unicode_width::UnicodeWidthChar;

bitflags! {
    /// SGR text attribute flags.
    ///
    /// Maps directly to the ECMA-48 / VT100 SGR parameter values.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SgrFlags: u8 {
        const BOLD          = 1 << 0;
        const ITALIC        = 1 << 1;
        const UNDERLINE     = 1 << 2;
        const STRIKETHROUGH = 1 << 3;
        const REVERSE       = 1 << 4;
        const BLINK         = 1 << 5;
    }
}

/// Color representation for terminal cells.
///
/// The model stops at the 256-color palette: 24-bit SGR parameters are
/// accepted on the wire but collapsed to the nearest palette index via
/// [`Color::from_rgb`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Color {
    /// Terminal default (SGR 39 / SGR 49).
    #[default]
    Default,
    /// Named color index (0-7): black, red, green, brown, blue, magenta,
    /// cyan, white.
    Named(u8),
    /// 256-color palette index (0-255).
    Indexed(u8),
}

impl Color {
    /// Collapse a 24-bit RGB triple to the nearest xterm-256 palette index.
    ///
    /// Candidates are the 6x6x6 color cube (indices 16-231, channel levels
    /// 0, 95, 135, 175, 215, 255) and the 24-step grayscale ramp (indices
    /// 232-255, values 8, 18, ... 238); the candidate with the smaller
    /// squared RGB distance wins, the cube on ties.
    #[must_use]
    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        const LEVELS: [u8; 6] = [0, 95, 135, 175, 215, 255];

        fn cube_index(v: u8) -> u8 {
            if v < 48 {
                0
            } else if v < 115 {
                1
            } else {
                (v - 35) / 40
            }
        }

        fn dist2(a: (u8, u8, u8), b: (u8, u8, u8)) -> u32 {
            let dr = i32::from(a.0) - i32::from(b.0);
            let dg = i32::from(a.1) - i32::from(b.1);
            let db = i32::from(a.2) - i32::from(b.2);
            (dr * dr + dg * dg + db * db) as u32
        }

        let (ci_r, ci_g, ci_b) = (cube_index(r), cube_index(g), cube_index(b));
        let cube = (
            LEVELS[ci_r as usize],
            LEVELS[ci_g as usize],
            LEVELS[ci_b as usize],
        );

        // Grayscale candidate: average the channels onto the 8..=238 ramp.
        let avg = (u16::from(r) + u16::from(g) + u16::from(b)) / 3;
        let gray_idx = if avg > 238 {
            23u8
        } else {
            (avg.saturating_sub(3) / 10) as u8
        };
        let gray_value = 8 + 10 * gray_idx;
        let gray = (gray_value, gray_value, gray_value);

        let target = (r, g, b);
        if dist2(target, gray) < dist2(target, cube) {
            Color::Indexed(232 + gray_idx)
        } else {
            Color::Indexed(16 + 36 * ci_r + 6 * ci_g + ci_b)
        }
    }
}

/// SGR attributes for a cell: flags + foreground/background colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SgrAttrs {
    pub flags: SgrFlags,
    pub fg: Color,
    pub bg: Color,
}

impl SgrAttrs {
    /// Reset all attributes to default (SGR 0).
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// A single cell in the terminal grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    /// The character content. A space for empty/erased cells and for the
    /// continuation half of a wide pair.
    content: char,
    /// Display width class: 0 = continuation, 1 = normal, 2 = wide leading.
    width: u8,
    /// SGR text attributes in effect when the cell was written.
    pub attrs: SgrAttrs,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            content: ' ',
            width: 1,
            attrs: SgrAttrs::default(),
        }
    }
}

impl Cell {
    /// Create a new width-1 cell with the given character and default attrs.
    pub fn new(ch: char) -> Self {
        Self {
            content: ch,
            width: 1,
            attrs: SgrAttrs::default(),
        }
    }

    /// Create a new cell with the given character, width class, and attrs.
    pub fn with_attrs(ch: char, width: u8, attrs: SgrAttrs) -> Self {
        Self {
            content: ch,
            width,
            attrs,
        }
    }

    /// Create a wide (2-column) character cell.
    ///
    /// Returns the `(leading, continuation)` pair. The leading cell holds
    /// the character; the continuation cell is a placeholder carrying the
    /// same attributes.
    pub fn wide(ch: char, attrs: SgrAttrs) -> (Self, Self) {
        let leading = Self {
            content: ch,
            width: 2,
            attrs,
        };
        let continuation = Self {
            content: ' ',
            width: 0,
            attrs,
        };
        (leading, continuation)
    }

    /// The character content of this cell.
    pub fn content(&self) -> char {
        self.content
    }

    /// The display width class (0, 1, or 2).
    pub fn width(&self) -> u8 {
        self.width
    }

    /// Whether this cell is the leading half of a wide character.
    pub fn is_wide(&self) -> bool {
        self.width == 2
    }

    /// Whether this cell is the continuation (trailing half) of a wide pair.
    pub fn is_continuation(&self) -> bool {
        self.width == 0
    }

    /// Reset this cell to a blank space with default attributes.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Display width of a scalar in terminal columns: 0, 1, or 2.
    ///
    /// Uses the East-Asian-Width + emoji tables via `unicode-width`, the
    /// same classification common terminals apply. Control characters
    /// (which never reach the draw path) report 0.
    #[must_use]
    pub fn display_width(ch: char) -> u8 {
        UnicodeWidthChar::width(ch).unwrap_or(0).min(2) as u8
    }
}
