//! Terminal modes: the DEC private and ANSI standard modes the screen
//! actually honors, plus the mode numbers it recognizes for dispatch.

/// DECAWM: autowrap mode (private).
pub const DECAWM: u16 = 7;
/// DECTCEM: text cursor enable mode (private).
pub const DECTCEM: u16 = 25;
/// LNM: line feed / newline mode (standard).
pub const LNM: u16 = 20;

/// Alternate screen buffer, xterm style with cursor save (private).
pub const ALT_SCREEN_1049: u16 = 1049;
/// Alternate screen buffer (private).
pub const ALT_SCREEN_1047: u16 = 1047;
/// Alternate screen buffer, legacy (private).
pub const ALT_SCREEN_47: u16 = 47;
/// Save/restore cursor without switching buffers (private).
pub const SAVE_CURSOR_1048: u16 = 1048;

/// Mode switches honored by the screen.
///
/// Everything else arriving via SM/RM or DECSET/DECRST is absorbed without
/// effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Modes {
    /// DECAWM: writing past the right edge advances to the next row.
    pub auto_wrap: bool,
    /// LNM: a line feed also performs a carriage return. Defaults on, the
    /// conventional Unix producer behavior.
    pub newline: bool,
}

impl Default for Modes {
    fn default() -> Self {
        Self {
            auto_wrap: true,
            newline: true,
        }
    }
}
