#![forbid(unsafe_code)]

//! Host-agnostic VT100/VT220 terminal screen emulator.
//!
//! `vtscreen` is a pure in-memory terminal model: it consumes the raw output
//! of a producer (escape sequences, control characters, UTF-8 text) and
//! maintains a rectangular grid of styled cells with a cursor, scrollback
//! history, an alternate screen buffer, and correct handling of multi-column
//! (CJK/emoji) characters. Hosts drive a read loop (typically from a
//! pseudo-terminal), feed bytes in, and query the rendered grid to draw a UI,
//! assert in tests, or log output.
//!
//! # Primary responsibilities
//!
//! - **Grid**: 2D cell matrix representing the visible viewport.
//! - **Cell**: character content + SGR attributes + display width class.
//! - **Screen**: cursor positioning, modes, erasure, line/char editing,
//!   scrollback capture and navigation, alternate-buffer switching.
//! - **Parser**: VT/ANSI state machine decoding bytes into semantic actions.
//! - **Stream**: binds a parser to a screen and applies actions in order.
//!
//! # Design principles
//!
//! - **No I/O**: all types are pure data + logic; the host supplies bytes.
//! - **Total**: the core never fails. Malformed input is absorbed, cursor
//!   motion clamps, history overflow evicts, unknown sequences are discarded.
//! - **Deterministic**: identical byte sequences always produce identical
//!   state; back-to-back feeds compose as if the streams were concatenated.
//! - **Single-threaded**: no locks, no timers, no reentrancy. Callers that
//!   need cross-thread access wrap the screen in their own mutex.
//!
//! # Example
//!
//! ```
//! use vtscreen::{Screen, Stream};
//!
//! let mut stream = Stream::new(Screen::new(80, 24, 1000), false);
//! stream.feed("\x1b[31mhello\x1b[0m world\r\n");
//! assert!(stream.screen().display()[0].starts_with("hello world"));
//! ```

pub mod cell;
pub mod cursor;
pub mod grid;
pub mod history;
pub mod modes;
pub mod parser;
pub mod screen;
pub mod stream;
pub mod tabs;

pub use cell::{Cell, Color, SgrAttrs, SgrFlags};
pub use cursor::Cursor;
pub use grid::Grid;
pub use history::{History, HistoryLine};
pub use modes::Modes;
pub use parser::{Action, CsiParams, Parser};
pub use screen::Screen;
pub use stream::Stream;
pub use tabs::TabStops;
