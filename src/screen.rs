//! The terminal screen model.
//!
//! [`Screen`] owns the visible grid, cursor, modes, tab stops, scrollback
//! history, and the dormant alternate buffer, and exposes the full operation
//! set the parser dispatches. Layering (base behavior, history capture,
//! alternate-buffer semantics, wide-character handling) is resolved here by
//! explicit dispatch on `using_alternate` and the history-view state rather
//! than through an inheritance chain: every operation knows which variant of
//! itself applies.
//!
//! The screen never fails. Out-of-range motion clamps, malformed requests
//! are absorbed, history overflow evicts the oldest line.

use std::mem;

use crate::cell::{Cell, Color, SgrFlags};
use crate::cursor::Cursor;
use crate::grid::Grid;
use crate::history::History;
use crate::modes::{self, Modes};
use crate::tabs::TabStops;

/// Dormant state of one half (main or alternate) of the screen.
///
/// Exactly one half is live at a time; the other half's grid, cursor, and
/// tab stops rest here. The slot cursor doubles as the save register for
/// private mode 1048.
#[derive(Debug, Clone)]
struct BufferSlot {
    grid: Grid,
    cursor: Cursor,
    tabs: TabStops,
    history: History,
}

/// Snapshot of the live screen, taken when the user first scrolls into
/// history and restored on return-to-live.
#[derive(Debug, Clone)]
struct SavedLive {
    grid: Grid,
    cursor: Cursor,
}

/// In-memory terminal screen with scrollback, alternate buffer, and
/// wide-character support.
#[derive(Debug, Clone)]
pub struct Screen {
    grid: Grid,
    cursor: Cursor,
    saved_cursor: Option<Cursor>,
    tabs: TabStops,
    modes: Modes,
    title: String,
    icon_name: String,
    /// G0/G1 charset designations (ESC ( / ESC )). Stored, never applied:
    /// content stays raw UTF-8.
    charsets: [u8; 2],

    history: History,
    /// Lines scrolled back into history; 0 when live.
    view_offset: usize,
    saved_live: Option<SavedLive>,

    main_slot: BufferSlot,
    alt_slot: BufferSlot,
    using_alternate: bool,
}

impl Screen {
    /// Create a screen of `columns` x `lines` cells keeping at most
    /// `max_history` scrollback lines.
    ///
    /// Zero dimensions are bumped to 1; a degenerate grid has no useful
    /// interpretation and every internal invariant assumes at least one
    /// cell.
    #[must_use]
    pub fn new(columns: u16, lines: u16, max_history: usize) -> Self {
        let columns = columns.max(1);
        let lines = lines.max(1);
        Self {
            grid: Grid::new(columns, lines),
            cursor: Cursor::home(),
            saved_cursor: None,
            tabs: TabStops::new(columns),
            modes: Modes::default(),
            title: String::new(),
            icon_name: String::new(),
            charsets: [b'B', b'B'],
            history: History::new(max_history),
            view_offset: 0,
            saved_live: None,
            main_slot: BufferSlot {
                grid: Grid::new(columns, lines),
                cursor: Cursor::home(),
                tabs: TabStops::new(columns),
                history: History::new(max_history),
            },
            alt_slot: BufferSlot {
                grid: Grid::new(columns, lines),
                cursor: Cursor::home(),
                tabs: TabStops::new(columns),
                history: History::new(max_history),
            },
            using_alternate: false,
        }
    }

    // ── Queries ─────────────────────────────────────────────────────

    /// Number of columns.
    pub fn columns(&self) -> u16 {
        self.grid.cols()
    }

    /// Number of lines.
    pub fn lines(&self) -> u16 {
        self.grid.rows()
    }

    /// The rendered display, one string per row. Continuation cells are
    /// omitted so each string's display width equals the screen width;
    /// trailing blanks are retained.
    #[must_use]
    pub fn display(&self) -> Vec<String> {
        (0..self.grid.rows()).map(|r| self.grid.row_text(r)).collect()
    }

    /// Cursor position as `(x, y)` = `(col, row)`.
    pub fn cursor(&self) -> (u16, u16) {
        (self.cursor.col, self.cursor.row)
    }

    /// Whether the cursor is currently hidden (DECTCEM off or scrolled
    /// into history).
    pub fn cursor_hidden(&self) -> bool {
        self.cursor.hidden
    }

    /// Number of lines currently held in scrollback.
    pub fn history_size(&self) -> usize {
        self.history.len()
    }

    /// Whether the view is scrolled back into history.
    pub fn is_viewing_history(&self) -> bool {
        self.saved_live.is_some()
    }

    /// Whether the alternate buffer is active.
    pub fn is_using_alternate(&self) -> bool {
        self.using_alternate
    }

    /// The window title last set via OSC 0/2.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// The icon name last set via OSC 0/1.
    pub fn icon_name(&self) -> &str {
        &self.icon_name
    }

    /// The designation byte stored for charset slot G0 (0) or G1 (1).
    pub fn charset(&self, slot: usize) -> Option<u8> {
        self.charsets.get(slot).copied()
    }

    /// Direct access to the visible grid.
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Direct access to the scrollback history.
    pub fn history(&self) -> &History {
        &self.history
    }

    // ── Drawing ─────────────────────────────────────────────────────

    /// Write a run of characters at the cursor, advancing and wrapping.
    ///
    /// On the main buffer a scrolled-back view snaps to live first; the
    /// user is never left viewing history over a mutated buffer.
    pub fn draw(&mut self, text: &str) {
        if !self.using_alternate && self.is_viewing_history() {
            self.scroll_to_bottom();
        }
        for ch in text.chars() {
            self.draw_char(ch);
        }
    }

    fn draw_char(&mut self, ch: char) {
        match Cell::display_width(ch) {
            0 => {
                // Combining marks logically attach to the preceding base
                // cell; only the base character is stored, so a trailing
                // combiner leaves no visible trace. A mark with no
                // preceding cell is dropped outright.
            }
            1 => self.draw_narrow(ch),
            _ => self.draw_wide(ch),
        }
    }

    fn draw_narrow(&mut self, ch: char) {
        let cols = self.grid.cols();
        if self.cursor.pending_wrap {
            if self.modes.auto_wrap {
                self.cursor.col = 0;
                self.advance_row();
            }
            self.cursor.pending_wrap = false;
        }
        self.grid
            .write_char(self.cursor.row, self.cursor.col, ch, self.cursor.attrs);
        if self.cursor.col + 1 >= cols {
            // Hold at the last column; the next printable resolves the wrap.
            self.cursor.pending_wrap = true;
        } else {
            self.cursor.col += 1;
        }
    }

    fn draw_wide(&mut self, ch: char) {
        let cols = self.grid.cols();
        if self.cursor.pending_wrap || self.cursor.col + 2 >= cols {
            if !self.modes.auto_wrap {
                // The pair cannot straddle the edge and cannot be split.
                return;
            }
            self.cursor.col = 0;
            self.cursor.pending_wrap = false;
            self.advance_row();
        }
        if self.cursor.col + 2 >= cols {
            // Narrower than the pair itself.
            return;
        }
        self.grid
            .write_wide_char(self.cursor.row, self.cursor.col, ch, self.cursor.attrs);
        self.cursor.col += 2;
    }

    /// Move the cursor down one row, scrolling at the bottom. On the main
    /// buffer the departing top row is captured into history first.
    fn advance_row(&mut self) {
        if self.cursor.row + 1 >= self.grid.rows() {
            self.scroll_screen_up();
        } else {
            self.cursor.row += 1;
        }
    }

    fn scroll_screen_up(&mut self) {
        if !self.using_alternate {
            if let Some(row) = self.grid.row_cells(0) {
                self.history.push_row(row);
            }
        }
        self.grid.scroll_up(0, self.grid.rows(), 1);
    }

    // ── C0 controls ─────────────────────────────────────────────────

    /// BEL: no-op for a headless screen.
    pub fn bell(&mut self) {}

    /// BS: move left one column, stopping at the margin.
    pub fn backspace(&mut self) {
        self.cursor.pending_wrap = false;
        if self.cursor.col > 0 {
            self.cursor.col -= 1;
        }
    }

    /// HT: advance to the next tab stop, or the rightmost column.
    pub fn tab(&mut self) {
        self.cursor.pending_wrap = false;
        let last = self.grid.cols() - 1;
        self.cursor.col = self
            .tabs
            .next_after(self.cursor.col)
            .unwrap_or(last)
            .min(last);
    }

    /// LF/VT/FF: advance a row, scrolling at the bottom; in newline mode
    /// also return to column 0.
    pub fn linefeed(&mut self) {
        self.cursor.pending_wrap = false;
        self.advance_row();
        if self.modes.newline {
            self.cursor.col = 0;
        }
    }

    /// CR: return to column 0.
    pub fn carriage_return(&mut self) {
        self.cursor.pending_wrap = false;
        self.cursor.col = 0;
    }

    /// SO: G1 charset shift. Recognized, inert; no translation tables.
    pub fn shift_out(&mut self) {}

    /// SI: G0 charset shift. Recognized, inert.
    pub fn shift_in(&mut self) {}

    // ── Index / reverse index ───────────────────────────────────────

    /// IND: advance a row like a line feed, never touching the column.
    pub fn index(&mut self) {
        self.cursor.pending_wrap = false;
        self.advance_row();
    }

    /// RI: move up a row; at the top the screen scrolls down instead.
    pub fn reverse_index(&mut self) {
        self.cursor.pending_wrap = false;
        if self.cursor.row == 0 {
            self.grid.scroll_down(0, self.grid.rows(), 1);
        } else {
            self.cursor.row -= 1;
        }
    }

    // ── Cursor movement ─────────────────────────────────────────────

    /// CUU: move up `count` rows, clamped at the top.
    pub fn cursor_up(&mut self, count: u16) {
        self.cursor.pending_wrap = false;
        self.cursor.row = self.cursor.row.saturating_sub(count);
    }

    /// CUD: move down `count` rows, clamped at the bottom.
    pub fn cursor_down(&mut self, count: u16) {
        self.cursor.pending_wrap = false;
        self.cursor.row = self
            .cursor
            .row
            .saturating_add(count)
            .min(self.grid.rows() - 1);
    }

    /// CUF: move right `count` visible cells, jumping wide pairs whole.
    pub fn cursor_forward(&mut self, count: u16) {
        self.cursor.pending_wrap = false;
        let last = self.grid.cols() - 1;
        for _ in 0..count {
            if self.cursor.col >= last {
                break;
            }
            let on_wide = self
                .grid
                .cell(self.cursor.row, self.cursor.col)
                .is_some_and(Cell::is_wide);
            let step = if on_wide { 2 } else { 1 };
            self.cursor.col = (self.cursor.col + step).min(last);
        }
    }

    /// CUB: move left `count` visible cells, landing on pair heads.
    pub fn cursor_back(&mut self, count: u16) {
        self.cursor.pending_wrap = false;
        for _ in 0..count {
            if self.cursor.col == 0 {
                break;
            }
            self.cursor.col -= 1;
            while self.cursor.col > 0
                && self
                    .grid
                    .cell(self.cursor.row, self.cursor.col)
                    .is_some_and(Cell::is_continuation)
            {
                self.cursor.col -= 1;
            }
        }
    }

    /// CPL: move up `count` rows and to column 0.
    pub fn cursor_up1(&mut self, count: u16) {
        self.cursor_up(count);
        self.cursor.col = 0;
    }

    /// CNL: move down `count` rows and to column 0.
    pub fn cursor_down1(&mut self, count: u16) {
        self.cursor_down(count);
        self.cursor.col = 0;
    }

    /// CUP/HVP: absolute position, 1-based, clamped into the grid.
    pub fn cursor_position(&mut self, line: u16, column: u16) {
        self.cursor.pending_wrap = false;
        self.cursor.row = line.saturating_sub(1).min(self.grid.rows() - 1);
        self.cursor.col = column.saturating_sub(1).min(self.grid.cols() - 1);
    }

    /// CHA: absolute column, 1-based, clamped.
    pub fn cursor_to_column(&mut self, column: u16) {
        self.cursor.pending_wrap = false;
        self.cursor.col = column.saturating_sub(1).min(self.grid.cols() - 1);
    }

    /// VPA: absolute line, 1-based, clamped.
    pub fn cursor_to_line(&mut self, line: u16) {
        self.cursor.pending_wrap = false;
        self.cursor.row = line.saturating_sub(1).min(self.grid.rows() - 1);
    }

    /// DECSC / CSI s: save the cursor, including drawing attributes.
    pub fn save_cursor(&mut self) {
        self.saved_cursor = Some(self.cursor);
    }

    /// DECRC / CSI u: restore the saved cursor; without a save this is a
    /// no-op. The restored position is clamped in case the screen shrank.
    pub fn restore_cursor(&mut self) {
        if let Some(saved) = self.saved_cursor {
            self.cursor = saved;
            self.clamp_cursor();
        }
    }

    // ── Line and character editing ──────────────────────────────────

    /// IL: insert `count` blank lines at the cursor row.
    pub fn insert_lines(&mut self, count: u16) {
        self.grid
            .scroll_down(self.cursor.row, self.grid.rows(), count);
    }

    /// DL: delete `count` lines at the cursor row.
    pub fn delete_lines(&mut self, count: u16) {
        self.grid.scroll_up(self.cursor.row, self.grid.rows(), count);
    }

    /// ICH: insert `count` blank cells at the cursor.
    pub fn insert_characters(&mut self, count: u16) {
        self.grid
            .insert_chars(self.cursor.row, self.cursor.col, count);
    }

    /// DCH: delete `count` cells at the cursor.
    pub fn delete_characters(&mut self, count: u16) {
        self.grid
            .delete_chars(self.cursor.row, self.cursor.col, count);
    }

    /// ECH: blank `count` logical positions rightward from the cursor.
    /// Crossing a wide pair consumes both of its columns in one step.
    pub fn erase_characters(&mut self, count: u16) {
        let cols = self.grid.cols();
        let mut col = self.cursor.col;
        for _ in 0..count {
            if col >= cols {
                break;
            }
            let step = if self
                .grid
                .cell(self.cursor.row, col)
                .is_some_and(Cell::is_wide)
            {
                2
            } else {
                1
            };
            self.grid.clear_cell_at(self.cursor.row, col);
            col += step;
        }
    }

    /// EL: erase within the cursor row. 0 = cursor to end, 1 = start
    /// through cursor, 2 = whole row. Other values are absorbed.
    pub fn erase_in_line(&mut self, how: u16) {
        match how {
            0 => self.grid.erase_line_right(self.cursor.row, self.cursor.col),
            1 => self.grid.erase_line_left(self.cursor.row, self.cursor.col),
            2 => self.grid.erase_line(self.cursor.row),
            _ => {}
        }
    }

    /// ED: erase within the display. 0 = cursor to end, 1 = start through
    /// cursor, 2 and 3 = everything; 2 and 3 also drop the scrollback.
    /// A scrolled-back view snaps to live first.
    pub fn erase_in_display(&mut self, how: u16) {
        if !self.using_alternate && self.is_viewing_history() {
            self.scroll_to_bottom();
        }
        match how {
            0 => self.grid.erase_below(self.cursor.row, self.cursor.col),
            1 => self.grid.erase_above(self.cursor.row, self.cursor.col),
            2 | 3 => self.grid.erase_all(),
            _ => return,
        }
        if how == 2 || how == 3 {
            self.history.clear();
        }
    }

    // ── Tab stops ───────────────────────────────────────────────────

    /// HTS: set a tab stop at the cursor column.
    pub fn set_tab_stop(&mut self) {
        self.tabs.set(self.cursor.col);
    }

    /// TBC: clear the stop at the cursor (0) or all stops (3).
    pub fn clear_tab_stop(&mut self, how: u16) {
        match how {
            0 => self.tabs.clear(self.cursor.col),
            3 => self.tabs.clear_all(),
            _ => {}
        }
    }

    /// CBT: move back `count` tab stops, stopping at column 0.
    pub fn back_tab(&mut self, count: u16) {
        self.cursor.pending_wrap = false;
        for _ in 0..count {
            if self.cursor.col == 0 {
                break;
            }
            self.cursor.col = self.tabs.prev_before(self.cursor.col).unwrap_or(0);
        }
    }

    // ── Attributes ──────────────────────────────────────────────────

    /// SGR: apply graphic rendition parameters to the cursor attributes.
    /// An empty list is a reset. Unknown codes are ignored.
    pub fn select_graphic_rendition(&mut self, params: &[u16]) {
        if params.is_empty() {
            self.cursor.attrs.reset();
            return;
        }
        let mut i = 0;
        while i < params.len() {
            match params[i] {
                0 => self.cursor.attrs.reset(),
                1 => self.cursor.attrs.flags.insert(SgrFlags::BOLD),
                3 => self.cursor.attrs.flags.insert(SgrFlags::ITALIC),
                4 => self.cursor.attrs.flags.insert(SgrFlags::UNDERLINE),
                5 => self.cursor.attrs.flags.insert(SgrFlags::BLINK),
                7 => self.cursor.attrs.flags.insert(SgrFlags::REVERSE),
                9 => self.cursor.attrs.flags.insert(SgrFlags::STRIKETHROUGH),
                22 => self.cursor.attrs.flags.remove(SgrFlags::BOLD),
                23 => self.cursor.attrs.flags.remove(SgrFlags::ITALIC),
                24 => self.cursor.attrs.flags.remove(SgrFlags::UNDERLINE),
                25 => self.cursor.attrs.flags.remove(SgrFlags::BLINK),
                27 => self.cursor.attrs.flags.remove(SgrFlags::REVERSE),
                29 => self.cursor.attrs.flags.remove(SgrFlags::STRIKETHROUGH),
                p @ 30..=37 => self.cursor.attrs.fg = Color::Named((p - 30) as u8),
                39 => self.cursor.attrs.fg = Color::Default,
                p @ 40..=47 => self.cursor.attrs.bg = Color::Named((p - 40) as u8),
                49 => self.cursor.attrs.bg = Color::Default,
                p @ (38 | 48) => {
                    if let Some((color, consumed)) = Self::extended_color(&params[i + 1..]) {
                        if p == 38 {
                            self.cursor.attrs.fg = color;
                        } else {
                            self.cursor.attrs.bg = color;
                        }
                        i += consumed;
                    }
                }
                _ => {
                    #[cfg(feature = "tracing")]
                    tracing::trace!(code = params[i], "ignoring unknown SGR parameter");
                }
            }
            i += 1;
        }
    }

    /// Decode the tail of a `38`/`48` extended-color parameter sequence.
    ///
    /// `5;N` selects a palette index; `2;r;g;b` is collapsed to the nearest
    /// palette index; the model does not retain 24-bit color.
    fn extended_color(rest: &[u16]) -> Option<(Color, usize)> {
        match rest.first().copied() {
            Some(5) => {
                let n = *rest.get(1)?;
                Some((Color::Indexed(n.min(255) as u8), 2))
            }
            Some(2) => {
                let r = *rest.get(1)?;
                let g = *rest.get(2)?;
                let b = *rest.get(3)?;
                Some((
                    Color::from_rgb(r.min(255) as u8, g.min(255) as u8, b.min(255) as u8),
                    4,
                ))
            }
            _ => None,
        }
    }

    // ── Modes ───────────────────────────────────────────────────────

    /// SM / DECSET: set the listed modes. Unrecognized modes are absorbed.
    pub fn set_mode(&mut self, mode_list: &[u16], private: bool) {
        for &mode in mode_list {
            if private {
                match mode {
                    modes::DECAWM => self.modes.auto_wrap = true,
                    modes::DECTCEM => self.cursor.hidden = false,
                    modes::ALT_SCREEN_1049 | modes::ALT_SCREEN_1047 | modes::ALT_SCREEN_47 => {
                        self.enter_alternate();
                    }
                    modes::SAVE_CURSOR_1048 => {
                        if self.using_alternate {
                            self.alt_slot.cursor = self.cursor;
                        } else {
                            self.main_slot.cursor = self.cursor;
                        }
                    }
                    _ => {
                        #[cfg(feature = "tracing")]
                        tracing::trace!(mode, "ignoring unknown private mode set");
                    }
                }
            } else if mode == modes::LNM {
                self.modes.newline = true;
            }
        }
    }

    /// RM / DECRST: reset the listed modes. Unrecognized modes are absorbed.
    pub fn reset_mode(&mut self, mode_list: &[u16], private: bool) {
        for &mode in mode_list {
            if private {
                match mode {
                    modes::DECAWM => self.modes.auto_wrap = false,
                    modes::DECTCEM => self.cursor.hidden = true,
                    modes::ALT_SCREEN_1049 | modes::ALT_SCREEN_1047 | modes::ALT_SCREEN_47 => {
                        self.exit_alternate();
                    }
                    modes::SAVE_CURSOR_1048 => {
                        self.cursor = if self.using_alternate {
                            self.alt_slot.cursor
                        } else {
                            self.main_slot.cursor
                        };
                        self.clamp_cursor();
                    }
                    _ => {
                        #[cfg(feature = "tracing")]
                        tracing::trace!(mode, "ignoring unknown private mode reset");
                    }
                }
            } else if mode == modes::LNM {
                self.modes.newline = false;
            }
        }
    }

    // ── Alternate buffer ────────────────────────────────────────────

    /// Switch to the alternate buffer: stash the main half, install a
    /// blanked grid with an origin cursor, fresh tab stops, and no history.
    /// Re-entering while already alternate is a no-op.
    fn enter_alternate(&mut self) {
        if self.using_alternate {
            return;
        }
        if self.is_viewing_history() {
            self.scroll_to_bottom();
        }
        self.main_slot.cursor = self.cursor;
        mem::swap(&mut self.main_slot.grid, &mut self.grid);
        mem::swap(&mut self.main_slot.tabs, &mut self.tabs);
        mem::swap(&mut self.main_slot.history, &mut self.history);

        mem::swap(&mut self.grid, &mut self.alt_slot.grid);
        self.grid.erase_all();
        self.cursor = Cursor::home();
        self.tabs = TabStops::new(self.grid.cols());
        self.history.clear();
        self.using_alternate = true;
    }

    /// Switch back to the main buffer, stashing the alternate live state
    /// into its slot and restoring the main grid, cursor, tabs, history.
    fn exit_alternate(&mut self) {
        if !self.using_alternate {
            return;
        }
        self.alt_slot.cursor = self.cursor;
        mem::swap(&mut self.grid, &mut self.alt_slot.grid);
        mem::swap(&mut self.tabs, &mut self.alt_slot.tabs);
        mem::swap(&mut self.grid, &mut self.main_slot.grid);
        mem::swap(&mut self.tabs, &mut self.main_slot.tabs);
        mem::swap(&mut self.history, &mut self.main_slot.history);
        self.cursor = self.main_slot.cursor;
        self.clamp_cursor();
        self.using_alternate = false;
    }

    // ── Scroll-view navigation ──────────────────────────────────────

    /// Scroll the view `count` lines back into history, saving the live
    /// screen on the first step. Clamped to the oldest line; a no-op on
    /// the alternate buffer or with nothing to show.
    pub fn scroll_up(&mut self, count: usize) {
        if self.using_alternate {
            return;
        }
        let available = self.history.len().saturating_sub(self.view_offset);
        let count = count.min(available);
        if count == 0 {
            return;
        }
        if self.saved_live.is_none() {
            self.saved_live = Some(SavedLive {
                grid: self.grid.clone(),
                cursor: self.cursor,
            });
        }
        self.view_offset += count;
        self.render_history_view();
    }

    /// Scroll the view `count` lines toward live; reaching offset 0
    /// restores the saved screen. A no-op when already live.
    pub fn scroll_down(&mut self, count: usize) {
        if self.using_alternate || self.saved_live.is_none() {
            return;
        }
        self.view_offset = self.view_offset.saturating_sub(count);
        if self.view_offset == 0 {
            self.return_to_live();
        } else {
            self.render_history_view();
        }
    }

    /// Force the view back to the live screen.
    pub fn scroll_to_bottom(&mut self) {
        if self.using_alternate {
            return;
        }
        self.view_offset = 0;
        self.return_to_live();
    }

    fn return_to_live(&mut self) {
        if let Some(saved) = self.saved_live.take() {
            self.grid = saved.grid;
            self.cursor = saved.cursor;
            self.cursor.hidden = false;
        }
    }

    /// Rewrite the visible grid for the current view offset: the tail of
    /// history first, then the top of the saved live screen, blank below.
    fn render_history_view(&mut self) {
        self.grid.erase_all();
        let rows = self.grid.rows();
        let start = self.history.len() - self.view_offset;
        let mut dest: u16 = 0;
        for i in start..self.history.len() {
            if dest >= rows {
                break;
            }
            if let Some(line) = self.history.get(i) {
                self.grid.copy_row_from(dest, &line.cells);
            }
            dest += 1;
        }
        if let Some(saved) = &self.saved_live {
            let mut src: u16 = 0;
            while dest < rows && src < saved.grid.rows() {
                if let Some(cells) = saved.grid.row_cells(src) {
                    self.grid.copy_row_from(dest, cells);
                }
                dest += 1;
                src += 1;
            }
        }
        self.cursor.hidden = true;
    }

    // ── Whole-screen operations ─────────────────────────────────────

    /// DECALN: flood the grid with `E` for alignment checks.
    pub fn alignment_display(&mut self) {
        self.grid.fill_all('E');
    }

    /// RIS: return to the initial state. An active alternate buffer is
    /// exited first; the grid, cursor, modes, tab stops, saved cursor,
    /// history, and the alternate slot are all reinitialized. The title
    /// and icon name survive.
    pub fn reset(&mut self) {
        if self.using_alternate {
            self.exit_alternate();
        }
        self.view_offset = 0;
        self.saved_live = None;
        let columns = self.grid.cols();
        self.grid.erase_all();
        self.cursor = Cursor::home();
        self.saved_cursor = None;
        self.modes = Modes::default();
        self.tabs = TabStops::new(columns);
        self.history.clear();
        self.charsets = [b'B', b'B'];

        self.alt_slot.grid.erase_all();
        self.alt_slot.cursor = Cursor::home();
        self.alt_slot.tabs = TabStops::new(columns);
        self.main_slot.cursor = Cursor::home();
    }

    /// Resize the screen to `columns` x `lines`.
    ///
    /// A scrolled-back view returns to live first. On the main buffer,
    /// rows cut from the bottom are captured into history before the grid
    /// shrinks. Both buffer halves are resized so a later switch sees a
    /// well-formed grid, and every stored cursor is clamped into the new
    /// bounds. Zero dimensions are ignored.
    pub fn resize(&mut self, columns: u16, lines: u16) {
        if columns == 0 || lines == 0 {
            return;
        }
        if self.is_viewing_history() {
            self.scroll_to_bottom();
        }
        if columns == self.grid.cols() && lines == self.grid.rows() {
            return;
        }
        if !self.using_alternate && lines < self.grid.rows() {
            for r in lines..self.grid.rows() {
                if let Some(row) = self.grid.row_cells(r) {
                    self.history.push_row(row);
                }
            }
        }
        self.grid.resize(columns, lines);
        self.main_slot.grid.resize(columns, lines);
        self.alt_slot.grid.resize(columns, lines);

        self.clamp_cursor();
        self.main_slot.cursor.col = self.main_slot.cursor.col.min(columns - 1);
        self.main_slot.cursor.row = self.main_slot.cursor.row.min(lines - 1);
        self.alt_slot.cursor.col = self.alt_slot.cursor.col.min(columns - 1);
        self.alt_slot.cursor.row = self.alt_slot.cursor.row.min(lines - 1);
        if let Some(saved) = self.saved_cursor.as_mut() {
            saved.col = saved.col.min(columns - 1);
            saved.row = saved.row.min(lines - 1);
        }
    }

    // ── Recognized-but-inert operations ─────────────────────────────

    /// Store a charset designation (ESC ( / ESC )). No translation table
    /// is applied; content remains raw UTF-8.
    pub fn define_charset(&mut self, slot: u8, code: u8) {
        if let Some(entry) = self.charsets.get_mut(slot as usize) {
            *entry = code;
        }
    }

    /// DECSTBM: recognized and discarded; margin-aware scrolling is not
    /// modeled.
    pub fn set_margins(&mut self, _top: u16, _bottom: u16) {
        #[cfg(feature = "tracing")]
        tracing::trace!(top = _top, bottom = _bottom, "ignoring scroll margins");
    }

    /// DA: recognized; this screen has no reply channel.
    pub fn report_device_attributes(&mut self, _mode: u16) {}

    /// DSR: recognized; this screen has no reply channel.
    pub fn report_device_status(&mut self, _mode: u16) {}

    /// Back-channel writes are not modeled; the data is dropped.
    pub fn write_process_input(&mut self, _data: &str) {}

    /// Host debug hook.
    pub fn debug(&mut self, _message: &str) {
        #[cfg(feature = "tracing")]
        tracing::debug!(message = _message, "screen debug");
    }

    /// OSC 0/2: store the window title.
    pub fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
    }

    /// OSC 0/1: store the icon name.
    pub fn set_icon_name(&mut self, name: &str) {
        self.icon_name = name.to_string();
    }

    fn clamp_cursor(&mut self) {
        self.cursor.col = self.cursor.col.min(self.grid.cols() - 1);
        self.cursor.row = self.cursor.row.min(self.grid.rows() - 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::SgrAttrs;

    fn trimmed(screen: &Screen) -> Vec<String> {
        screen
            .display()
            .iter()
            .map(|l| l.trim_end().to_string())
            .collect()
    }

    #[test]
    fn draw_advances_cursor() {
        let mut s = Screen::new(10, 3, 0);
        s.draw("hi");
        assert_eq!(trimmed(&s)[0], "hi");
        assert_eq!(s.cursor(), (2, 0));
    }

    #[test]
    fn autowrap_fills_next_row() {
        let mut s = Screen::new(4, 2, 0);
        s.draw("ABCDE");
        assert_eq!(trimmed(&s), vec!["ABCD", "E"]);
        assert_eq!(s.cursor(), (1, 1));
    }

    #[test]
    fn autowrap_off_overwrites_last_column() {
        let mut s = Screen::new(4, 2, 0);
        s.reset_mode(&[modes::DECAWM], true);
        s.draw("ABCDE");
        assert_eq!(trimmed(&s), vec!["ABCE", ""]);
        assert_eq!(s.cursor(), (3, 0));
    }

    #[test]
    fn cursor_rests_inside_grid_after_full_row() {
        let mut s = Screen::new(4, 2, 0);
        s.draw("ABCD");
        assert_eq!(s.cursor(), (3, 0));
        s.backspace();
        assert_eq!(s.cursor(), (2, 0));
    }

    #[test]
    fn linefeed_scrolls_and_captures_history() {
        let mut s = Screen::new(3, 2, 10);
        s.draw("a");
        s.carriage_return();
        s.linefeed();
        s.draw("b");
        s.carriage_return();
        s.linefeed();
        s.draw("c");
        s.carriage_return();
        s.linefeed();
        assert_eq!(s.history_size(), 2);
        assert_eq!(s.history().get(0).unwrap().text().trim_end(), "a");
        assert_eq!(s.history().get(1).unwrap().text().trim_end(), "b");
        assert_eq!(trimmed(&s), vec!["c", ""]);
        assert_eq!(s.cursor(), (0, 1));
    }

    #[test]
    fn tab_moves_to_stops_then_margin() {
        let mut s = Screen::new(20, 2, 0);
        s.tab();
        assert_eq!(s.cursor(), (8, 0));
        s.tab();
        assert_eq!(s.cursor(), (16, 0));
        s.tab();
        assert_eq!(s.cursor(), (19, 0));
    }

    #[test]
    fn custom_tab_stops_and_back_tab() {
        let mut s = Screen::new(20, 2, 0);
        s.cursor_to_column(5);
        s.set_tab_stop();
        s.carriage_return();
        s.tab();
        assert_eq!(s.cursor(), (4, 0));
        s.back_tab(1);
        assert_eq!(s.cursor(), (0, 0));
        s.clear_tab_stop(3);
        s.tab();
        assert_eq!(s.cursor(), (19, 0));
    }

    #[test]
    fn cursor_position_is_one_based_and_clamped() {
        let mut s = Screen::new(10, 5, 0);
        s.cursor_position(3, 4);
        assert_eq!(s.cursor(), (3, 2));
        s.cursor_position(0, 0);
        assert_eq!(s.cursor(), (0, 0));
        s.cursor_position(99, 99);
        assert_eq!(s.cursor(), (9, 4));
    }

    #[test]
    fn save_restore_cursor_round_trips_attrs() {
        let mut s = Screen::new(10, 5, 0);
        s.select_graphic_rendition(&[1, 31]);
        s.cursor_position(2, 3);
        s.save_cursor();
        s.select_graphic_rendition(&[0]);
        s.cursor_position(5, 5);
        s.restore_cursor();
        assert_eq!(s.cursor(), (2, 1));
        s.draw("x");
        let cell = s.grid().cell(1, 2).unwrap();
        assert!(cell.attrs.flags.contains(SgrFlags::BOLD));
        assert_eq!(cell.attrs.fg, Color::Named(1));
    }

    #[test]
    fn restore_without_save_is_noop() {
        let mut s = Screen::new(10, 5, 0);
        s.cursor_position(3, 3);
        s.restore_cursor();
        assert_eq!(s.cursor(), (2, 2));
    }

    #[test]
    fn sgr_reset_and_colors() {
        let mut s = Screen::new(10, 2, 0);
        s.select_graphic_rendition(&[31]);
        s.draw("A");
        s.select_graphic_rendition(&[0]);
        s.draw("B");
        assert_eq!(s.grid().cell(0, 0).unwrap().attrs.fg, Color::Named(1));
        assert_eq!(s.grid().cell(0, 1).unwrap().attrs.fg, Color::Default);
        assert_eq!(s.cursor(), (2, 0));
    }

    #[test]
    fn sgr_indexed_and_rgb_colors() {
        let mut s = Screen::new(10, 2, 0);
        s.select_graphic_rendition(&[38, 5, 123]);
        s.select_graphic_rendition(&[48, 2, 255, 0, 0]);
        s.draw("x");
        let cell = s.grid().cell(0, 0).unwrap();
        assert_eq!(cell.attrs.fg, Color::Indexed(123));
        assert_eq!(cell.attrs.bg, Color::Indexed(196));
    }

    #[test]
    fn sgr_params_after_extended_color_still_apply() {
        let mut s = Screen::new(10, 2, 0);
        s.select_graphic_rendition(&[38, 5, 10, 1]);
        s.draw("x");
        let cell = s.grid().cell(0, 0).unwrap();
        assert_eq!(cell.attrs.fg, Color::Indexed(10));
        assert!(cell.attrs.flags.contains(SgrFlags::BOLD));
    }

    #[test]
    fn empty_sgr_resets() {
        let mut s = Screen::new(10, 2, 0);
        s.select_graphic_rendition(&[1, 4, 35]);
        s.select_graphic_rendition(&[]);
        s.draw("x");
        assert_eq!(s.grid().cell(0, 0).unwrap().attrs, SgrAttrs::default());
    }

    #[test]
    fn insert_and_delete_lines_at_cursor() {
        let mut s = Screen::new(3, 4, 0);
        for text in ["aa", "bb", "cc", "dd"] {
            s.draw(text);
            s.carriage_return();
            if text != "dd" {
                s.linefeed();
            }
        }
        s.cursor_position(2, 1);
        s.insert_lines(1);
        assert_eq!(trimmed(&s), vec!["aa", "", "bb", "cc"]);
        s.delete_lines(1);
        assert_eq!(trimmed(&s), vec!["aa", "bb", "cc", ""]);
    }

    #[test]
    fn erase_in_line_variants() {
        let mut s = Screen::new(5, 1, 0);
        s.draw("ABCDE");
        s.cursor_to_column(3);
        s.erase_in_line(0);
        assert_eq!(s.display()[0], "AB   ");
        s.draw("cde");
        s.cursor_to_column(3);
        s.erase_in_line(1);
        assert_eq!(s.display()[0], "   de");
        s.erase_in_line(2);
        assert_eq!(s.display()[0], "     ");
    }

    #[test]
    fn erase_in_display_clears_history_on_2_and_3() {
        let mut s = Screen::new(3, 2, 10);
        s.draw("a");
        for _ in 0..4 {
            s.linefeed();
        }
        assert!(s.history_size() > 0);
        s.erase_in_display(2);
        assert_eq!(s.history_size(), 0);
        assert_eq!(trimmed(&s), vec!["", ""]);
    }

    #[test]
    fn alignment_display_floods_with_e() {
        let mut s = Screen::new(3, 2, 0);
        s.alignment_display();
        assert_eq!(s.display(), vec!["EEE", "EEE"]);
    }

    // ── Wide characters ─────────────────────────────────────────────

    #[test]
    fn wide_char_occupies_two_columns() {
        let mut s = Screen::new(6, 1, 0);
        s.draw("a世b");
        assert_eq!(s.display()[0], "a世b  ");
        assert_eq!(s.cursor(), (4, 0));
        assert!(s.grid().cell(0, 1).unwrap().is_wide());
        assert!(s.grid().cell(0, 2).unwrap().is_continuation());
    }

    #[test]
    fn wide_char_wraps_at_row_edge() {
        let mut s = Screen::new(4, 2, 0);
        s.draw("ab世");
        assert_eq!(s.display()[0], "ab  ");
        assert_eq!(s.display()[1], "世  ");
        assert_eq!(s.cursor(), (2, 1));
    }

    #[test]
    fn wide_char_dropped_without_autowrap() {
        let mut s = Screen::new(4, 2, 0);
        s.reset_mode(&[modes::DECAWM], true);
        s.draw("abc世");
        assert_eq!(s.display()[0], "abc ");
        assert_eq!(s.cursor(), (3, 0));
    }

    #[test]
    fn combining_mark_is_dropped() {
        let mut s = Screen::new(5, 1, 0);
        s.draw("e\u{0301}x");
        assert_eq!(s.display()[0], "ex   ");
        assert_eq!(s.cursor(), (2, 0));
    }

    #[test]
    fn overwriting_wide_pair_halves_blanks_both() {
        let mut s = Screen::new(6, 1, 0);
        s.draw("世");
        s.cursor_to_column(2);
        s.draw("x");
        assert_eq!(s.display()[0], " x    ");
    }

    #[test]
    fn cursor_motion_steps_over_pairs() {
        let mut s = Screen::new(8, 1, 0);
        s.draw("a世b");
        s.cursor_position(1, 1);
        s.cursor_forward(2);
        // One step onto the pair head, one step over the pair.
        assert_eq!(s.cursor(), (3, 0));
        s.cursor_back(1);
        assert_eq!(s.cursor(), (1, 0));
    }

    #[test]
    fn erase_characters_consumes_pairs_whole() {
        let mut s = Screen::new(8, 1, 0);
        s.draw("a世b");
        s.cursor_position(1, 2);
        s.erase_characters(2);
        // Two logical positions: the pair (both columns) and the 'b'.
        assert_eq!(s.display()[0], "a       ");
    }

    // ── History view ────────────────────────────────────────────────

    fn feed_lines(s: &mut Screen, n: usize) {
        for i in 0..n {
            s.draw(&format!("line{i}"));
            s.carriage_return();
            s.linefeed();
        }
    }

    #[test]
    fn scroll_view_shows_history_tail() {
        let mut s = Screen::new(8, 3, 100);
        feed_lines(&mut s, 10);
        s.draw("LIVE");
        let before = s.display();
        s.scroll_up(2);
        assert!(s.is_viewing_history());
        assert!(s.cursor_hidden());
        let view = trimmed(&s);
        assert_eq!(view[0], "line6");
        assert_eq!(view[1], "line7");
        assert_eq!(view[2], "line8");
        s.scroll_down(2);
        assert!(!s.is_viewing_history());
        assert!(!s.cursor_hidden());
        assert_eq!(s.display(), before);
    }

    #[test]
    fn scroll_up_clamps_at_oldest() {
        let mut s = Screen::new(8, 2, 5);
        feed_lines(&mut s, 3);
        s.scroll_up(100);
        assert!(s.is_viewing_history());
        let view = trimmed(&s);
        assert_eq!(view[0], "line0");
        s.scroll_to_bottom();
        assert!(!s.is_viewing_history());
    }

    #[test]
    fn scroll_with_empty_history_stays_live() {
        let mut s = Screen::new(8, 2, 5);
        s.draw("x");
        s.scroll_up(3);
        assert!(!s.is_viewing_history());
        s.scroll_down(3);
        assert!(!s.is_viewing_history());
    }

    #[test]
    fn draw_interrupts_history_view() {
        let mut s = Screen::new(8, 2, 10);
        feed_lines(&mut s, 5);
        s.scroll_up(3);
        assert!(s.is_viewing_history());
        s.draw("z");
        assert!(!s.is_viewing_history());
        // The write landed on the live grid, not the history rendering.
        assert_eq!(trimmed(&s)[1], "z");
    }

    #[test]
    fn resize_exits_history_view() {
        let mut s = Screen::new(8, 2, 10);
        feed_lines(&mut s, 5);
        s.scroll_up(2);
        s.resize(10, 3);
        assert!(!s.is_viewing_history());
        assert_eq!(s.columns(), 10);
        assert_eq!(s.lines(), 3);
    }

    // ── Alternate buffer ────────────────────────────────────────────

    #[test]
    fn alternate_round_trip_restores_main() {
        let mut s = Screen::new(10, 3, 50);
        s.draw("main");
        s.carriage_return();
        s.linefeed();
        let saved_display = s.display();
        let saved_cursor = s.cursor();
        let saved_history = s.history_size();

        s.set_mode(&[modes::ALT_SCREEN_1049], true);
        assert!(s.is_using_alternate());
        assert_eq!(trimmed(&s), vec!["", "", ""]);
        assert_eq!(s.cursor(), (0, 0));
        s.draw("fullscreen app");
        for _ in 0..30 {
            s.linefeed();
        }
        assert_eq!(s.history_size(), 0);

        s.reset_mode(&[modes::ALT_SCREEN_1049], true);
        assert!(!s.is_using_alternate());
        assert_eq!(s.display(), saved_display);
        assert_eq!(s.cursor(), saved_cursor);
        assert_eq!(s.history_size(), saved_history);
    }

    #[test]
    fn entering_alternate_twice_is_one_entry() {
        let mut s = Screen::new(10, 3, 0);
        s.draw("main");
        s.set_mode(&[modes::ALT_SCREEN_47], true);
        s.draw("alt");
        s.set_mode(&[modes::ALT_SCREEN_1049], true);
        // Still the same alternate content; a second entry must not
        // re-blank or re-stash.
        assert_eq!(trimmed(&s)[0], "alt");
        s.reset_mode(&[modes::ALT_SCREEN_47], true);
        assert_eq!(trimmed(&s)[0], "main");
    }

    #[test]
    fn alternate_view_scrolling_is_inert() {
        let mut s = Screen::new(8, 2, 10);
        feed_lines(&mut s, 5);
        s.set_mode(&[modes::ALT_SCREEN_1049], true);
        s.scroll_up(2);
        assert!(!s.is_viewing_history());
        s.scroll_down(2);
        s.scroll_to_bottom();
        assert!(s.is_using_alternate());
    }

    #[test]
    fn entering_alternate_exits_history_view() {
        let mut s = Screen::new(8, 2, 10);
        feed_lines(&mut s, 5);
        s.scroll_up(2);
        s.set_mode(&[modes::ALT_SCREEN_1049], true);
        assert!(!s.is_viewing_history());
        s.reset_mode(&[modes::ALT_SCREEN_1049], true);
        assert!(!s.is_viewing_history());
    }

    #[test]
    fn mode_1048_saves_and_restores_per_half() {
        let mut s = Screen::new(10, 5, 0);
        s.cursor_position(3, 4);
        s.set_mode(&[modes::SAVE_CURSOR_1048], true);
        s.cursor_position(1, 1);
        s.reset_mode(&[modes::SAVE_CURSOR_1048], true);
        assert_eq!(s.cursor(), (3, 2));
    }

    #[test]
    fn reset_in_alternate_returns_to_fresh_main() {
        let mut s = Screen::new(6, 2, 10);
        s.draw("main");
        s.set_mode(&[modes::ALT_SCREEN_1049], true);
        s.draw("alt");
        s.reset();
        assert!(!s.is_using_alternate());
        assert_eq!(trimmed(&s), vec!["", ""]);
        assert_eq!(s.cursor(), (0, 0));
        assert_eq!(s.history_size(), 0);
    }

    // ── Modes ───────────────────────────────────────────────────────

    #[test]
    fn newline_mode_off_keeps_column() {
        let mut s = Screen::new(10, 3, 0);
        s.reset_mode(&[modes::LNM], false);
        s.draw("ab");
        s.linefeed();
        assert_eq!(s.cursor(), (2, 1));
        s.set_mode(&[modes::LNM], false);
        s.linefeed();
        assert_eq!(s.cursor(), (0, 2));
    }

    #[test]
    fn dectcem_toggles_cursor_visibility() {
        let mut s = Screen::new(10, 2, 0);
        assert!(!s.cursor_hidden());
        s.reset_mode(&[modes::DECTCEM], true);
        assert!(s.cursor_hidden());
        s.set_mode(&[modes::DECTCEM], true);
        assert!(!s.cursor_hidden());
    }

    #[test]
    fn unknown_modes_are_absorbed() {
        let mut s = Screen::new(10, 2, 0);
        s.set_mode(&[1002, 2004, 9999], true);
        s.reset_mode(&[4, 12], false);
        s.draw("ok");
        assert_eq!(trimmed(&s)[0], "ok");
    }

    // ── Reset / resize ──────────────────────────────────────────────

    #[test]
    fn reset_is_idempotent() {
        let mut s = Screen::new(6, 3, 10);
        feed_lines(&mut s, 5);
        s.select_graphic_rendition(&[1, 31]);
        s.reset();
        let once = (s.display(), s.cursor(), s.history_size());
        s.reset();
        assert_eq!((s.display(), s.cursor(), s.history_size()), once);
        assert_eq!(s.cursor(), (0, 0));
        assert_eq!(s.history_size(), 0);
    }

    #[test]
    fn resize_pads_and_truncates() {
        let mut s = Screen::new(4, 2, 10);
        s.draw("abcd");
        s.resize(6, 3);
        assert_eq!(s.columns(), 6);
        assert_eq!(s.lines(), 3);
        assert_eq!(trimmed(&s), vec!["abcd", "", ""]);
        s.resize(2, 1);
        assert_eq!(trimmed(&s), vec!["ab"]);
    }

    #[test]
    fn shrinking_rows_captures_bottom_into_history() {
        let mut s = Screen::new(4, 3, 10);
        s.draw("aa");
        s.carriage_return();
        s.linefeed();
        s.draw("bb");
        s.carriage_return();
        s.linefeed();
        s.draw("cc");
        s.resize(4, 2);
        assert_eq!(s.history_size(), 1);
        assert_eq!(s.history().get(0).unwrap().text().trim_end(), "cc");
        assert_eq!(s.cursor().1, 1);
    }

    #[test]
    fn resize_ignores_zero_dimensions() {
        let mut s = Screen::new(4, 2, 0);
        s.draw("hi");
        s.resize(0, 7);
        s.resize(7, 0);
        assert_eq!(s.columns(), 4);
        assert_eq!(s.lines(), 2);
    }

    #[test]
    fn resize_keeps_alternate_slot_well_formed() {
        let mut s = Screen::new(6, 3, 0);
        s.resize(3, 2);
        s.set_mode(&[modes::ALT_SCREEN_1049], true);
        assert_eq!(s.columns(), 3);
        assert_eq!(s.lines(), 2);
        s.draw("xyz");
        assert_eq!(s.display()[0], "xyz");
    }

    // ── Title / charset bookkeeping ─────────────────────────────────

    #[test]
    fn title_and_icon_name_are_stored() {
        let mut s = Screen::new(4, 2, 0);
        s.set_title("session");
        s.set_icon_name("icon");
        assert_eq!(s.title(), "session");
        assert_eq!(s.icon_name(), "icon");
        s.reset();
        assert_eq!(s.title(), "session");
    }

    #[test]
    fn charset_designation_is_stored_not_applied() {
        let mut s = Screen::new(4, 2, 0);
        s.define_charset(0, b'0');
        assert_eq!(s.charset(0), Some(b'0'));
        assert_eq!(s.charset(1), Some(b'B'));
        s.draw("é");
        assert_eq!(trimmed(&s)[0], "é");
    }

    #[test]
    fn inert_operations_do_not_disturb_state() {
        let mut s = Screen::new(4, 2, 0);
        s.draw("ok");
        s.bell();
        s.shift_out();
        s.shift_in();
        s.set_margins(1, 2);
        s.report_device_attributes(0);
        s.report_device_status(5);
        s.write_process_input("ignored");
        s.debug("probe");
        assert_eq!(trimmed(&s)[0], "ok");
        assert_eq!(s.cursor(), (2, 0));
    }
}
