//! VT/ANSI stream parser.
//!
//! A deterministic state machine that converts a producer's output byte
//! stream into semantic [`Action`]s for the screen. It covers:
//!
//! - printable characters (ASCII + full UTF-8) -> [`Action::Print`]
//! - C0 controls -> dedicated actions
//! - CSI sequences (cursor, erase, editing, SGR, mode set/reset)
//! - OSC sequences (title / icon name)
//! - ESC-level sequences (save/restore, index, tab stops, reset, DECALN,
//!   charset designation)
//!
//! Anything unrecognized or malformed is absorbed: the machine drops the
//! sequence and returns to ground. The parser itself emits no output and
//! never fails.

use smallvec::SmallVec;

/// Inline capacity for CSI parameter lists.
///
/// Most sequences carry <= 4 parameters; this avoids a heap allocation for
/// the common case while remaining transparent to consumers via
/// `Deref<Target = [u16]>`.
pub type CsiParams = SmallVec<[u16; 4]>;

/// Maximum number of CSI parameters retained; the tail of longer lists is
/// silently dropped.
const MAX_PARAMS: usize = 16;

const ESC: u8 = 0x1b;
const CAN: u8 = 0x18;
const SUB: u8 = 0x1a;
const BEL: u8 = 0x07;

/// Parser output actions, mirroring the screen's operation set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// A printable character (ASCII or decoded multi-byte UTF-8).
    Print(char),
    /// BEL.
    Bell,
    /// BS.
    Backspace,
    /// HT.
    Tab,
    /// LF, VT, or FF.
    Linefeed,
    /// CR.
    CarriageReturn,
    /// SO: shift to G1 (recognized, inert downstream).
    ShiftOut,
    /// SI: shift to G0 (recognized, inert downstream).
    ShiftIn,
    /// IND (`ESC D`): move down one row, scrolling at the bottom.
    Index,
    /// RI (`ESC M`): move up one row, scrolling at the top.
    ReverseIndex,
    /// NEL (`ESC E`): carriage return + line feed.
    NextLine,
    /// DECSC (`ESC 7`) / SCOSC (`CSI s`).
    SaveCursor,
    /// DECRC (`ESC 8`) / SCORC (`CSI u`).
    RestoreCursor,
    /// HTS (`ESC H`): set a tab stop at the cursor column.
    SetTabStop,
    /// TBC (`CSI Ps g`): 0 = at cursor, 3 = all.
    ClearTabStop(u16),
    /// CBT (`CSI Ps Z`): move back `n` tab stops.
    BackTab(u16),
    /// RIS (`ESC c`): full reset.
    Reset,
    /// DECALN (`ESC # 8`): flood the grid with `E`.
    AlignmentDisplay,
    /// Charset designation (`ESC (` = slot 0, `ESC )` = slot 1).
    DefineCharset { slot: u8, code: u8 },
    /// OSC 0/2: window title.
    SetTitle(String),
    /// OSC 0/1: icon name.
    SetIconName(String),
    /// CUU (`CSI Ps A`).
    CursorUp(u16),
    /// CUD (`CSI Ps B`).
    CursorDown(u16),
    /// CUF (`CSI Ps C`).
    CursorForward(u16),
    /// CUB (`CSI Ps D`).
    CursorBack(u16),
    /// CNL (`CSI Ps E`): down and to column 0.
    CursorDown1(u16),
    /// CPL (`CSI Ps F`): up and to column 0.
    CursorUp1(u16),
    /// CHA (`CSI Ps G` / `CSI Ps `` ` ``): absolute column, 1-based.
    CursorToColumn(u16),
    /// VPA (`CSI Ps d`): absolute line, 1-based.
    CursorToLine(u16),
    /// CUP/HVP (`CSI Pl ; Pc H/f`): absolute position, 1-based.
    CursorPosition { line: u16, column: u16 },
    /// ED (`CSI Ps J`).
    EraseInDisplay(u16),
    /// EL (`CSI Ps K`).
    EraseInLine(u16),
    /// IL (`CSI Ps L`).
    InsertLines(u16),
    /// DL (`CSI Ps M`).
    DeleteLines(u16),
    /// ICH (`CSI Ps @`).
    InsertCharacters(u16),
    /// DCH (`CSI Ps P`).
    DeleteCharacters(u16),
    /// ECH (`CSI Ps X`).
    EraseCharacters(u16),
    /// SGR (`CSI ... m`): raw parameters, interpreted by the screen.
    SelectGraphicRendition(CsiParams),
    /// SM (`CSI Pm h`) / DECSET (`CSI ? Pm h`).
    SetMode { modes: CsiParams, private: bool },
    /// RM (`CSI Pm l`) / DECRST (`CSI ? Pm l`).
    ResetMode { modes: CsiParams, private: bool },
    /// DECSTBM (`CSI Pt ; Pb r`): recognized, inert downstream.
    SetMargins { top: u16, bottom: u16 },
    /// DA (`CSI Ps c`): recognized, inert downstream.
    ReportDeviceAttributes(u16),
    /// DSR (`CSI Ps n`): recognized, inert downstream.
    ReportDeviceStatus(u16),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Ground,
    Escape,
    EscapeIntermediate,
    CsiEntry,
    CsiParam,
    CsiIntermediate,
    CsiIgnore,
    OscString,
    /// `ESC (` or `ESC )` seen; the next byte designates the charset.
    Charset { slot: u8 },
    /// Assembling a multi-byte UTF-8 character; counts continuation bytes
    /// still expected.
    Utf8 { remaining: u8 },
}

/// VT/ANSI parser state machine.
///
/// Drive it with [`Parser::feed`] (or byte-at-a-time via
/// [`Parser::advance`]); actions come out in input order. The `strict`
/// construction flag is accepted for forward compatibility and currently
/// changes nothing: every recovery path is the permissive one.
#[derive(Debug, Clone)]
pub struct Parser {
    state: State,
    params: CsiParams,
    current_param: u32,
    /// A parameter is open: digits were seen, or a separator started one.
    param_pending: bool,
    private: bool,
    /// Last intermediate byte of an `ESC`-level sequence (e.g. `#`).
    intermediate: u8,
    osc: Vec<u8>,
    /// An ESC inside an OSC string, possibly starting an ST terminator.
    osc_esc: bool,
    utf8_buf: [u8; 4],
    utf8_len: u8,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    /// Create a new parser in ground state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: State::Ground,
            params: CsiParams::new(),
            current_param: 0,
            param_pending: false,
            private: false,
            intermediate: 0,
            osc: Vec::new(),
            osc_esc: false,
            utf8_buf: [0; 4],
            utf8_len: 0,
        }
    }

    /// Feed a chunk of bytes, appending parsed actions to `out`.
    ///
    /// Callers on hot paths can reuse the same output buffer across reads,
    /// calling `out.clear()` before each invocation to retain capacity.
    pub fn feed(&mut self, bytes: &[u8], out: &mut Vec<Action>) {
        for &b in bytes {
            self.advance(b, out);
        }
    }

    /// Advance the parser by one byte, appending any completed actions.
    pub fn advance(&mut self, byte: u8, out: &mut Vec<Action>) {
        match self.state {
            State::Ground => self.advance_ground(byte, out),
            State::Escape => self.advance_escape(byte, out),
            State::EscapeIntermediate => self.advance_escape_intermediate(byte, out),
            State::CsiEntry | State::CsiParam => self.advance_csi(byte, out),
            State::CsiIntermediate => self.advance_csi_intermediate(byte, out),
            State::CsiIgnore => self.advance_csi_ignore(byte),
            State::OscString => self.advance_osc(byte, out),
            State::Charset { slot } => self.advance_charset(byte, slot, out),
            State::Utf8 { remaining } => self.advance_utf8(byte, remaining, out),
        }
    }

    // ── Ground ──────────────────────────────────────────────────────

    fn advance_ground(&mut self, byte: u8, out: &mut Vec<Action>) {
        match byte {
            BEL => out.push(Action::Bell),
            0x08 => out.push(Action::Backspace),
            0x09 => out.push(Action::Tab),
            // LF, VT, and FF all advance a line.
            0x0A | 0x0B | 0x0C => out.push(Action::Linefeed),
            0x0D => out.push(Action::CarriageReturn),
            0x0E => out.push(Action::ShiftOut),
            0x0F => out.push(Action::ShiftIn),
            ESC => self.state = State::Escape,
            0x20..=0x7E => out.push(Action::Print(byte as char)),
            // UTF-8 leading bytes. 0xC0/0xC1 overlong and 0xF5+ out of
            // range are ignored like any other stray byte.
            0xC2..=0xDF => self.start_utf8(byte, 1),
            0xE0..=0xEF => self.start_utf8(byte, 2),
            0xF0..=0xF4 => self.start_utf8(byte, 3),
            _ => {}
        }
    }

    fn start_utf8(&mut self, byte: u8, continuations: u8) {
        self.utf8_buf[0] = byte;
        self.utf8_len = 1;
        self.state = State::Utf8 {
            remaining: continuations,
        };
    }

    fn advance_utf8(&mut self, byte: u8, remaining: u8, out: &mut Vec<Action>) {
        if (0x80..=0xBF).contains(&byte) {
            let idx = self.utf8_len as usize;
            if idx < 4 {
                self.utf8_buf[idx] = byte;
                self.utf8_len += 1;
            }
            if remaining == 1 {
                self.state = State::Ground;
                let len = self.utf8_len as usize;
                self.utf8_len = 0;
                if let Some(ch) = core::str::from_utf8(&self.utf8_buf[..len])
                    .ok()
                    .and_then(|s| s.chars().next())
                {
                    out.push(Action::Print(ch));
                }
            } else {
                self.state = State::Utf8 {
                    remaining: remaining - 1,
                };
            }
        } else {
            // Invalid continuation: drop the partial character and
            // reprocess this byte in ground state.
            self.state = State::Ground;
            self.utf8_len = 0;
            self.advance_ground(byte, out);
        }
    }

    // ── Escape ──────────────────────────────────────────────────────

    fn advance_escape(&mut self, byte: u8, out: &mut Vec<Action>) {
        match byte {
            b'[' => {
                self.params.clear();
                self.current_param = 0;
                self.param_pending = false;
                self.private = false;
                self.state = State::CsiEntry;
            }
            b']' => {
                self.osc.clear();
                self.osc_esc = false;
                self.state = State::OscString;
            }
            b'(' => self.state = State::Charset { slot: 0 },
            b')' => self.state = State::Charset { slot: 1 },
            0x20..=0x2F => {
                self.intermediate = byte;
                self.state = State::EscapeIntermediate;
            }
            b'D' => self.finish(Action::Index, out),
            b'M' => self.finish(Action::ReverseIndex, out),
            b'E' => self.finish(Action::NextLine, out),
            b'7' => self.finish(Action::SaveCursor, out),
            b'8' => self.finish(Action::RestoreCursor, out),
            b'H' => self.finish(Action::SetTabStop, out),
            b'c' => self.finish(Action::Reset, out),
            CAN | SUB => self.state = State::Ground,
            ESC => {}
            _ => {
                #[cfg(feature = "tracing")]
                tracing::trace!(byte, "discarding unrecognized escape sequence");
                self.state = State::Ground;
            }
        }
    }

    fn advance_escape_intermediate(&mut self, byte: u8, out: &mut Vec<Action>) {
        match byte {
            0x20..=0x2F => self.intermediate = byte,
            CAN | SUB => self.state = State::Ground,
            ESC => self.state = State::Escape,
            _ => {
                if self.intermediate == b'#' && byte == b'8' {
                    self.finish(Action::AlignmentDisplay, out);
                } else {
                    #[cfg(feature = "tracing")]
                    tracing::trace!(
                        intermediate = self.intermediate,
                        byte,
                        "discarding unrecognized escape sequence"
                    );
                    self.state = State::Ground;
                }
            }
        }
    }

    fn advance_charset(&mut self, byte: u8, slot: u8, out: &mut Vec<Action>) {
        match byte {
            CAN | SUB => self.state = State::Ground,
            ESC => self.state = State::Escape,
            _ => self.finish(Action::DefineCharset { slot, code: byte }, out),
        }
    }

    // ── CSI ─────────────────────────────────────────────────────────

    fn advance_csi(&mut self, byte: u8, out: &mut Vec<Action>) {
        match byte {
            b'0'..=b'9' => {
                self.current_param = self
                    .current_param
                    .saturating_mul(10)
                    .saturating_add(u32::from(byte - b'0'));
                self.param_pending = true;
                self.state = State::CsiParam;
            }
            b';' => {
                self.push_param();
                self.param_pending = true;
                self.state = State::CsiParam;
            }
            b'?' if self.state == State::CsiEntry => {
                self.private = true;
                self.state = State::CsiParam;
            }
            // Other private markers and the colon sub-parameter syntax are
            // not modeled; swallow the rest of the sequence.
            b':' | b'<' | b'=' | b'>' | b'?' => self.state = State::CsiIgnore,
            0x20..=0x2F => self.state = State::CsiIntermediate,
            0x40..=0x7E => {
                if self.param_pending {
                    self.push_param();
                }
                self.dispatch_csi(byte, out);
            }
            CAN | SUB => self.state = State::Ground,
            ESC => self.state = State::Escape,
            _ => {}
        }
    }

    fn advance_csi_intermediate(&mut self, byte: u8, _out: &mut Vec<Action>) {
        match byte {
            0x20..=0x2F => {}
            0x40..=0x7E => {
                // No CSI sequence with intermediate bytes is recognized.
                #[cfg(feature = "tracing")]
                tracing::trace!(final_byte = byte, "discarding CSI with intermediates");
                self.state = State::Ground;
            }
            0x30..=0x3F => self.state = State::CsiIgnore,
            CAN | SUB => self.state = State::Ground,
            ESC => self.state = State::Escape,
            _ => {}
        }
    }

    fn advance_csi_ignore(&mut self, byte: u8) {
        match byte {
            0x40..=0x7E | CAN | SUB => self.state = State::Ground,
            ESC => self.state = State::Escape,
            _ => {}
        }
    }

    fn push_param(&mut self) {
        if self.params.len() < MAX_PARAMS {
            self.params.push(self.current_param.min(u32::from(u16::MAX)) as u16);
        }
        self.current_param = 0;
    }

    fn dispatch_csi(&mut self, final_byte: u8, out: &mut Vec<Action>) {
        self.state = State::Ground;
        let params = std::mem::take(&mut self.params);
        self.param_pending = false;

        let first = params.first().copied();
        let second = params.get(1).copied();
        // Count-style parameters: missing and 0 both mean 1.
        let count0 = first.unwrap_or(1).max(1);
        let count1 = second.unwrap_or(1).max(1);

        if self.private {
            match final_byte {
                b'h' => out.push(Action::SetMode {
                    modes: params,
                    private: true,
                }),
                b'l' => out.push(Action::ResetMode {
                    modes: params,
                    private: true,
                }),
                _ => {
                    #[cfg(feature = "tracing")]
                    tracing::trace!(final_byte, "discarding unrecognized private CSI");
                }
            }
            return;
        }

        match final_byte {
            b'A' => out.push(Action::CursorUp(count0)),
            b'B' => out.push(Action::CursorDown(count0)),
            b'C' => out.push(Action::CursorForward(count0)),
            b'D' => out.push(Action::CursorBack(count0)),
            b'E' => out.push(Action::CursorDown1(count0)),
            b'F' => out.push(Action::CursorUp1(count0)),
            b'G' | b'`' => out.push(Action::CursorToColumn(count0)),
            b'd' => out.push(Action::CursorToLine(count0)),
            b'H' | b'f' => out.push(Action::CursorPosition {
                line: count0,
                column: count1,
            }),
            b'J' => out.push(Action::EraseInDisplay(first.unwrap_or(0))),
            b'K' => out.push(Action::EraseInLine(first.unwrap_or(0))),
            b'L' => out.push(Action::InsertLines(count0)),
            b'M' => out.push(Action::DeleteLines(count0)),
            b'@' => out.push(Action::InsertCharacters(count0)),
            b'P' => out.push(Action::DeleteCharacters(count0)),
            b'X' => out.push(Action::EraseCharacters(count0)),
            b'Z' => out.push(Action::BackTab(count0)),
            b'm' => out.push(Action::SelectGraphicRendition(params)),
            b'h' => out.push(Action::SetMode {
                modes: params,
                private: false,
            }),
            b'l' => out.push(Action::ResetMode {
                modes: params,
                private: false,
            }),
            b'r' => out.push(Action::SetMargins {
                top: count0,
                bottom: second.unwrap_or(0),
            }),
            b'g' => out.push(Action::ClearTabStop(first.unwrap_or(0))),
            b'c' => out.push(Action::ReportDeviceAttributes(first.unwrap_or(0))),
            b'n' => out.push(Action::ReportDeviceStatus(first.unwrap_or(0))),
            // SCOSC/SCORC share the DECSC/DECRC save slot. With parameters
            // these finals mean something else (DECSLRM); discard.
            b's' if params.is_empty() => out.push(Action::SaveCursor),
            b'u' if params.is_empty() => out.push(Action::RestoreCursor),
            _ => {
                #[cfg(feature = "tracing")]
                tracing::trace!(final_byte, "discarding unrecognized CSI sequence");
            }
        }
    }

    // ── OSC ─────────────────────────────────────────────────────────

    fn advance_osc(&mut self, byte: u8, out: &mut Vec<Action>) {
        if self.osc_esc {
            self.osc_esc = false;
            if byte == b'\\' {
                self.finish_osc(out);
                return;
            }
            // A lone ESC inside the string is kept verbatim.
            self.osc.push(ESC);
        }
        match byte {
            BEL => self.finish_osc(out),
            ESC => self.osc_esc = true,
            CAN | SUB => self.state = State::Ground,
            _ => self.osc.push(byte),
        }
    }

    fn finish_osc(&mut self, out: &mut Vec<Action>) {
        self.state = State::Ground;
        let content = std::mem::take(&mut self.osc);
        let Some(semi) = content.iter().position(|&b| b == b';') else {
            #[cfg(feature = "tracing")]
            tracing::trace!("discarding OSC without a parameter separator");
            return;
        };
        let Ok(ps) = core::str::from_utf8(&content[..semi])
            .map_err(drop)
            .and_then(|s| s.parse::<u16>().map_err(drop))
        else {
            return;
        };
        let text = String::from_utf8_lossy(&content[semi + 1..]).into_owned();
        match ps {
            0 => {
                out.push(Action::SetIconName(text.clone()));
                out.push(Action::SetTitle(text));
            }
            1 => out.push(Action::SetIconName(text)),
            2 => out.push(Action::SetTitle(text)),
            _ => {
                #[cfg(feature = "tracing")]
                tracing::trace!(ps, "discarding unrecognized OSC command");
            }
        }
    }

    fn finish(&mut self, action: Action, out: &mut Vec<Action>) {
        self.state = State::Ground;
        out.push(action);
    }
}
