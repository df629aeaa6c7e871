//! Cursor state: position, drawing attributes, visibility.

use crate::cell::SgrAttrs;

/// Terminal cursor.
///
/// Position is 0-indexed into the visible grid. Between operations the
/// cursor always rests inside the grid; a write into the last column sets
/// `pending_wrap` instead of moving past the edge, and the next printable
/// character resolves the wrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    /// Column (x), 0-indexed.
    pub col: u16,
    /// Row (y), 0-indexed.
    pub row: u16,
    /// Attributes applied to subsequently drawn characters.
    pub attrs: SgrAttrs,
    /// Whether the cursor is hidden (DECTCEM off, or a history view).
    pub hidden: bool,
    /// Deferred autowrap: the last column was just written and the next
    /// printable wraps before drawing. Cleared by any explicit motion.
    pub pending_wrap: bool,
}

impl Cursor {
    /// Cursor at the origin with default attributes, visible.
    #[must_use]
    pub fn home() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::{Color, SgrFlags};

    #[test]
    fn default_is_visible_origin() {
        let c = Cursor::default();
        assert_eq!((c.col, c.row), (0, 0));
        assert!(!c.hidden);
        assert!(!c.pending_wrap);
        assert_eq!(c.attrs, SgrAttrs::default());
    }

    #[test]
    fn copy_preserves_attrs() {
        let mut c = Cursor::home();
        c.attrs.flags = SgrFlags::BOLD;
        c.attrs.fg = Color::Named(1);
        let saved = c;
        c.attrs.reset();
        assert_eq!(saved.attrs.fg, Color::Named(1));
    }
}
