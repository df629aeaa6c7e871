//! Stream: a parser bound to a screen.
//!
//! [`Stream`] owns both halves of the pipeline: bytes go in through
//! [`Stream::feed`], the parser turns them into actions, and each action is
//! applied to the screen in emission order before `feed` returns. Print
//! runs are coalesced so a line of text reaches the screen as one draw
//! call rather than one per character.

use crate::parser::{Action, Parser};
use crate::screen::Screen;

/// A VT/ANSI interpreter driving a [`Screen`].
#[derive(Debug)]
pub struct Stream {
    parser: Parser,
    screen: Screen,
    strict: bool,
    /// Reused action buffer, cleared on every feed.
    actions: Vec<Action>,
    /// Pending run of printable characters awaiting a single draw call.
    pending_text: String,
}

impl Stream {
    /// Bind a parser to `screen`.
    ///
    /// The `strict` flag is reserved for validating front-ends; the core
    /// recognizes it and currently ignores it; every recovery path stays
    /// permissive.
    #[must_use]
    pub fn new(screen: Screen, strict: bool) -> Self {
        Self {
            parser: Parser::new(),
            screen,
            strict,
            actions: Vec::new(),
            pending_text: String::new(),
        }
    }

    /// Whether the stream was constructed in strict mode.
    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// The screen this stream drives.
    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    /// Mutable access to the screen, e.g. for resize or view scrolling.
    pub fn screen_mut(&mut self) -> &mut Screen {
        &mut self.screen
    }

    /// Consume the stream, returning the screen.
    #[must_use]
    pub fn into_screen(self) -> Screen {
        self.screen
    }

    /// Feed a chunk of text.
    ///
    /// Returns once every byte has been consumed and every resulting
    /// screen operation has completed. Back-to-back feeds behave exactly
    /// like one feed of the concatenated input, so escape sequences and
    /// multi-byte characters may be split across calls arbitrarily.
    pub fn feed(&mut self, input: &str) {
        self.feed_bytes(input.as_bytes());
    }

    /// Feed a chunk of raw bytes, e.g. straight from a PTY read.
    pub fn feed_bytes(&mut self, bytes: &[u8]) {
        let mut actions = std::mem::take(&mut self.actions);
        actions.clear();
        self.parser.feed(bytes, &mut actions);
        for action in actions.drain(..) {
            self.apply(action);
        }
        self.flush_text();
        self.actions = actions;
    }

    fn apply(&mut self, action: Action) {
        if let Action::Print(ch) = action {
            self.pending_text.push(ch);
            return;
        }
        self.flush_text();
        match action {
            Action::Print(_) => {}
            Action::Bell => self.screen.bell(),
            Action::Backspace => self.screen.backspace(),
            Action::Tab => self.screen.tab(),
            Action::Linefeed => self.screen.linefeed(),
            Action::CarriageReturn => self.screen.carriage_return(),
            Action::ShiftOut => self.screen.shift_out(),
            Action::ShiftIn => self.screen.shift_in(),
            Action::Index => self.screen.index(),
            Action::ReverseIndex => self.screen.reverse_index(),
            Action::NextLine => {
                self.screen.carriage_return();
                self.screen.linefeed();
            }
            Action::SaveCursor => self.screen.save_cursor(),
            Action::RestoreCursor => self.screen.restore_cursor(),
            Action::SetTabStop => self.screen.set_tab_stop(),
            Action::ClearTabStop(how) => self.screen.clear_tab_stop(how),
            Action::BackTab(n) => self.screen.back_tab(n),
            Action::Reset => self.screen.reset(),
            Action::AlignmentDisplay => self.screen.alignment_display(),
            Action::DefineCharset { slot, code } => self.screen.define_charset(slot, code),
            Action::SetTitle(title) => self.screen.set_title(&title),
            Action::SetIconName(name) => self.screen.set_icon_name(&name),
            Action::CursorUp(n) => self.screen.cursor_up(n),
            Action::CursorDown(n) => self.screen.cursor_down(n),
            Action::CursorForward(n) => self.screen.cursor_forward(n),
            Action::CursorBack(n) => self.screen.cursor_back(n),
            Action::CursorDown1(n) => self.screen.cursor_down1(n),
            Action::CursorUp1(n) => self.screen.cursor_up1(n),
            Action::CursorToColumn(n) => self.screen.cursor_to_column(n),
            Action::CursorToLine(n) => self.screen.cursor_to_line(n),
            Action::CursorPosition { line, column } => self.screen.cursor_position(line, column),
            Action::EraseInDisplay(how) => self.screen.erase_in_display(how),
            Action::EraseInLine(how) => self.screen.erase_in_line(how),
            Action::InsertLines(n) => self.screen.insert_lines(n),
            Action::DeleteLines(n) => self.screen.delete_lines(n),
            Action::InsertCharacters(n) => self.screen.insert_characters(n),
            Action::DeleteCharacters(n) => self.screen.delete_characters(n),
            Action::EraseCharacters(n) => self.screen.erase_characters(n),
            Action::SelectGraphicRendition(params) => {
                self.screen.select_graphic_rendition(&params);
            }
            Action::SetMode { modes, private } => self.screen.set_mode(&modes, private),
            Action::ResetMode { modes, private } => self.screen.reset_mode(&modes, private),
            Action::SetMargins { top, bottom } => self.screen.set_margins(top, bottom),
            Action::ReportDeviceAttributes(mode) => self.screen.report_device_attributes(mode),
            Action::ReportDeviceStatus(mode) => self.screen.report_device_status(mode),
        }
    }

    fn flush_text(&mut self) {
        if self.pending_text.is_empty() {
            return;
        }
        let text = std::mem::take(&mut self.pending_text);
        self.screen.draw(&text);
        self.pending_text = text;
        self.pending_text.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream(cols: u16, lines: u16, history: usize) -> Stream {
        Stream::new(Screen::new(cols, lines, history), false)
    }

    fn trimmed(s: &Stream) -> Vec<String> {
        s.screen()
            .display()
            .iter()
            .map(|l| l.trim_end().to_string())
            .collect()
    }

    #[test]
    fn plain_text_is_drawn() {
        let mut s = stream(10, 2, 0);
        s.feed("hello");
        assert_eq!(trimmed(&s)[0], "hello");
        assert_eq!(s.screen().cursor(), (5, 0));
    }

    #[test]
    fn crlf_moves_to_next_row() {
        let mut s = stream(10, 3, 0);
        s.feed("one\r\ntwo");
        assert_eq!(trimmed(&s), vec!["one", "two", ""]);
    }

    #[test]
    fn sgr_colors_apply_to_cells() {
        let mut s = stream(10, 2, 0);
        s.feed("\x1b[31mA\x1b[0mB");
        let screen = s.screen();
        assert_eq!(
            screen.grid().cell(0, 0).unwrap().attrs.fg,
            crate::cell::Color::Named(1)
        );
        assert_eq!(
            screen.grid().cell(0, 1).unwrap().attrs.fg,
            crate::cell::Color::Default
        );
        assert_eq!(screen.cursor(), (2, 0));
    }

    #[test]
    fn cursor_addressing_and_erase() {
        let mut s = stream(10, 3, 0);
        s.feed("aaaaa\x1b[1;3H\x1b[K");
        assert_eq!(trimmed(&s)[0], "aa");
    }

    #[test]
    fn nel_is_cr_plus_lf() {
        let mut s = stream(10, 3, 0);
        s.feed("ab\x1bEcd");
        assert_eq!(trimmed(&s), vec!["ab", "cd", ""]);
    }

    #[test]
    fn title_and_icon_via_osc() {
        let mut s = stream(10, 2, 0);
        s.feed("\x1b]0;both\x07");
        assert_eq!(s.screen().title(), "both");
        assert_eq!(s.screen().icon_name(), "both");
        s.feed("\x1b]2;only title\x1b\\");
        assert_eq!(s.screen().title(), "only title");
        assert_eq!(s.screen().icon_name(), "both");
    }

    #[test]
    fn alternate_screen_via_modes() {
        let mut s = stream(10, 3, 10);
        s.feed("main\r\n");
        s.feed("\x1b[?1049h");
        assert!(s.screen().is_using_alternate());
        s.feed("alt content");
        s.feed("\x1b[?1049l");
        assert!(!s.screen().is_using_alternate());
        assert_eq!(trimmed(&s)[0], "main");
    }

    #[test]
    fn full_reset_via_esc_c() {
        let mut s = stream(10, 3, 10);
        s.feed("junk\r\njunk\r\n\x1b[31m");
        s.feed("\x1bc");
        assert_eq!(trimmed(&s), vec!["", "", ""]);
        assert_eq!(s.screen().cursor(), (0, 0));
        assert_eq!(s.screen().history_size(), 0);
    }

    #[test]
    fn malformed_sequences_are_absorbed() {
        let mut s = stream(10, 2, 0);
        s.feed("\x1b[999;999;999;y");
        s.feed("\x1b]bogus\x07");
        s.feed("ok");
        assert_eq!(trimmed(&s)[0], "ok");
    }

    #[test]
    fn split_escape_sequences_compose() {
        let mut s = stream(10, 2, 0);
        s.feed("\x1b[3");
        s.feed("1mA");
        assert_eq!(
            s.screen().grid().cell(0, 0).unwrap().attrs.fg,
            crate::cell::Color::Named(1)
        );
    }

    #[test]
    fn strict_flag_is_recognized_and_inert() {
        let mut strict = Stream::new(Screen::new(5, 2, 0), true);
        let mut lax = Stream::new(Screen::new(5, 2, 0), false);
        assert!(strict.is_strict());
        strict.feed("\x1b[?9999h ok");
        lax.feed("\x1b[?9999h ok");
        assert_eq!(strict.screen().display(), lax.screen().display());
    }

    #[test]
    fn into_screen_returns_final_state() {
        let mut s = stream(6, 2, 0);
        s.feed("done");
        let screen = s.into_screen();
        assert_eq!(screen.display()[0], "done  ");
    }
}
