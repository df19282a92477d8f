//! The terminal cell grid and its control operations.
//!
//! `Term` is the state machine the escape parser drives: a `cols × rows` grid
//! of styled cells, a cursor, a scroll region, and the current SGR attributes.
//! The parser owns none of this; it calls into the operations here and lends
//! `Term` a writer for the few sequences that demand a reply on the PTY
//! (cursor position report, status report, device attributes).
//!
//! Geometry invariants maintained by every operation:
//!   - `0 <= cursor_x <= cols`, where `cursor_x == cols` is the pending-wrap
//!     frontier that only `put_char` may create (and must resolve first).
//!   - `0 <= cursor_y < rows`.
//!   - `0 <= scroll_top <= scroll_bottom < rows`.

use std::io::Write;

use crate::palette::{DEFAULT_BG, DEFAULT_FG, PALETTE};

pub const MIN_COLS: usize = 40;
pub const MAX_COLS: usize = 500;
pub const MIN_ROWS: usize = 10;
pub const MAX_ROWS: usize = 200;

/// Pixel margin left unused at the right/bottom framebuffer edges.
const EDGE_MARGIN_PX: usize = 4;

/// One character cell.
///
/// `bold` is recorded from SGR 1/22 but the renderer does not act on it: the
/// cell width is derived from the regular face, so a bold face would bleed
/// into the neighbouring cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub codepoint: char,
    pub fg_color: u32,
    pub bg_color: u32,
    pub bold: bool,
}

/// Compute the grid dimensions for a framebuffer of `px_width × px_height`
/// pixels and the given cell size, clamped into the supported range.
pub fn grid_size(
    px_width: usize,
    px_height: usize,
    cell_width: usize,
    cell_height: usize,
) -> (usize, usize) {
    let cols = px_width.saturating_sub(EDGE_MARGIN_PX) / cell_width.max(1);
    let rows = px_height.saturating_sub(EDGE_MARGIN_PX) / cell_height.max(1);
    (cols.clamp(MIN_COLS, MAX_COLS), rows.clamp(MIN_ROWS, MAX_ROWS))
}

pub struct Term {
    cols: usize,
    rows: usize,
    cells: Vec<Cell>,

    /// May equal `cols` after a write in the last column (pending wrap).
    pub cursor_x: usize,
    pub cursor_y: usize,
    /// DECTCEM state. Tracked, not painted; see the renderer.
    pub cursor_visible: bool,

    // Current SGR attributes, stamped into cells at write time.
    fg_color: u32,
    bg_color: u32,
    bold: bool,

    scroll_top: usize,
    scroll_bottom: usize,
}

impl Term {
    pub fn new(cols: usize, rows: usize) -> Self {
        assert!(cols >= 2 && rows >= 2, "degenerate grid {cols}x{rows}");
        let blank = Cell {
            codepoint: ' ',
            fg_color: DEFAULT_FG,
            bg_color: DEFAULT_BG,
            bold: false,
        };
        Self {
            cols,
            rows,
            cells: vec![blank; cols * rows],
            cursor_x: 0,
            cursor_y: 0,
            cursor_visible: true,
            fg_color: DEFAULT_FG,
            bg_color: DEFAULT_BG,
            bold: false,
            scroll_top: 0,
            scroll_bottom: rows - 1,
        }
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cell(&self, x: usize, y: usize) -> Cell {
        self.cells[y * self.cols + x]
    }

    pub fn scroll_region(&self) -> (usize, usize) {
        (self.scroll_top, self.scroll_bottom)
    }

    /// A blank cell in the current SGR colors. Erase and scroll operations
    /// paint with this, so a colored background survives a clear.
    fn blank(&self) -> Cell {
        Cell {
            codepoint: ' ',
            fg_color: self.fg_color,
            bg_color: self.bg_color,
            bold: false,
        }
    }

    fn clear_cells(&mut self, y: usize, x0: usize, x1: usize) {
        let blank = self.blank();
        let base = y * self.cols;
        self.cells[base + x0..base + x1].fill(blank);
    }

    fn clear_rows(&mut self, y0: usize, y1: usize) {
        let blank = self.blank();
        self.cells[y0 * self.cols..y1 * self.cols].fill(blank);
    }

    fn copy_row(&mut self, from: usize, to: usize) {
        let cols = self.cols;
        self.cells.copy_within(from * cols..(from + 1) * cols, to * cols);
    }

    // --- Scrolling ----------------------------------------------------------

    /// Shift the scroll region up one row; the region's top row is lost and
    /// its bottom row comes back blank.
    pub fn scroll_up(&mut self) {
        for y in self.scroll_top..self.scroll_bottom {
            self.copy_row(y + 1, y);
        }
        self.clear_cells(self.scroll_bottom, 0, self.cols);
    }

    /// Shift the scroll region down one row; the bottom row is lost.
    pub fn scroll_down(&mut self) {
        for y in (self.scroll_top + 1..=self.scroll_bottom).rev() {
            self.copy_row(y - 1, y);
        }
        self.clear_cells(self.scroll_top, 0, self.cols);
    }

    // --- C0 controls --------------------------------------------------------

    pub fn newline(&mut self) {
        self.cursor_y += 1;
        if self.cursor_y > self.scroll_bottom {
            self.cursor_y = self.scroll_bottom;
            self.scroll_up();
        }
    }

    pub fn carriage_return(&mut self) {
        self.cursor_x = 0;
    }

    pub fn backspace(&mut self) {
        self.cursor_x = self.cursor_x.saturating_sub(1);
    }

    /// Advance to the next multiple-of-8 tab stop; a stop at or past the
    /// right edge wraps to the start of the next line instead.
    pub fn tab(&mut self) {
        self.cursor_x = (self.cursor_x + 8) & !7;
        if self.cursor_x >= self.cols {
            self.carriage_return();
            self.newline();
        }
    }

    /// Write one codepoint at the cursor in the current SGR attributes.
    ///
    /// A cursor parked at the pending-wrap frontier (`cursor_x == cols`) is
    /// resolved with CR+NL before the cell is written.
    pub fn put_char(&mut self, codepoint: char) {
        if self.cursor_x >= self.cols {
            self.carriage_return();
            self.newline();
        }
        let idx = self.cursor_y * self.cols + self.cursor_x;
        self.cells[idx] = Cell {
            codepoint,
            fg_color: self.fg_color,
            bg_color: self.bg_color,
            bold: self.bold,
        };
        self.cursor_x += 1;
    }

    // --- CSI dispatch -------------------------------------------------------

    /// Execute one control sequence. `params` is the (possibly empty) slice
    /// of collected parameters; `reply` receives any answer the sequence
    /// requires on the PTY. Write failures are swallowed: a report to a gone
    /// shell is a no-op.
    pub(crate) fn csi_dispatch(
        &mut self,
        final_byte: u8,
        params: &[u16],
        private_mode: bool,
        reply: &mut dyn Write,
    ) {
        match final_byte {
            b'H' | b'f' => {
                self.cursor_y = (param_or(params, 0, 1) - 1).min(self.rows - 1);
                self.cursor_x = (param_or(params, 1, 1) - 1).min(self.cols - 1);
            }
            b'A' => {
                self.cursor_y = self.cursor_y.saturating_sub(param_or(params, 0, 1));
            }
            b'B' => {
                self.cursor_y = (self.cursor_y + param_or(params, 0, 1)).min(self.rows - 1);
            }
            b'C' => {
                self.cursor_x = (self.cursor_x + param_or(params, 0, 1)).min(self.cols - 1);
            }
            b'D' => {
                self.cursor_x = self
                    .cursor_x
                    .saturating_sub(param_or(params, 0, 1))
                    .min(self.cols - 1);
            }
            b'G' => {
                self.cursor_x = (param_or(params, 0, 1) - 1).min(self.cols - 1);
            }
            b'd' => {
                self.cursor_y = (param_or(params, 0, 1) - 1).min(self.rows - 1);
            }
            b'J' => self.erase_display(param(params, 0)),
            b'K' => self.erase_line(param(params, 0)),
            b'X' => self.erase_chars(param_or(params, 0, 1)),
            b'P' => self.delete_chars(param_or(params, 0, 1)),
            b'@' => self.insert_chars(param_or(params, 0, 1)),
            b'L' => self.insert_lines(param_or(params, 0, 1)),
            b'M' => self.delete_lines(param_or(params, 0, 1)),
            b'S' => {
                for _ in 0..param_or(params, 0, 1) {
                    self.scroll_up();
                }
            }
            b'T' => {
                for _ in 0..param_or(params, 0, 1) {
                    self.scroll_down();
                }
            }
            b'r' => self.set_scroll_region(params),
            b'm' => self.select_graphic_rendition(params),
            b'h' => self.set_modes(params, private_mode, true),
            b'l' => self.set_modes(params, private_mode, false),
            b'n' => self.device_status_report(param(params, 0), reply),
            b'c' => {
                // Identify as a VT100 with advanced video option.
                let _ = reply.write_all(b"\x1b[?1;2c");
            }
            _ => {
                tracing::trace!("unhandled CSI final {:?}", final_byte as char);
            }
        }
    }

    fn erase_display(&mut self, mode: usize) {
        let cx = self.cursor_x.min(self.cols - 1);
        match mode {
            0 => {
                self.clear_cells(self.cursor_y, cx, self.cols);
                self.clear_rows(self.cursor_y + 1, self.rows);
            }
            1 => {
                self.clear_rows(0, self.cursor_y);
                self.clear_cells(self.cursor_y, 0, cx + 1);
            }
            // 3 also covers scrollback in xterm; there is none here.
            2 | 3 => self.clear_rows(0, self.rows),
            _ => {}
        }
    }

    fn erase_line(&mut self, mode: usize) {
        let cx = self.cursor_x.min(self.cols - 1);
        match mode {
            0 => self.clear_cells(self.cursor_y, cx, self.cols),
            1 => self.clear_cells(self.cursor_y, 0, cx + 1),
            2 => self.clear_cells(self.cursor_y, 0, self.cols),
            _ => {}
        }
    }

    /// ECH: blank `count` cells from the cursor without moving anything.
    fn erase_chars(&mut self, count: usize) {
        let x0 = self.cursor_x.min(self.cols);
        let x1 = (x0 + count).min(self.cols);
        self.clear_cells(self.cursor_y, x0, x1);
    }

    /// DCH: close up `count` cells at the cursor, padding the row tail.
    fn delete_chars(&mut self, count: usize) {
        let x = self.cursor_x.min(self.cols);
        let k = count.min(self.cols - x);
        if k == 0 {
            return;
        }
        let base = self.cursor_y * self.cols;
        self.cells.copy_within(base + x + k..base + self.cols, base + x);
        self.clear_cells(self.cursor_y, self.cols - k, self.cols);
    }

    /// ICH: open up `count` blank cells at the cursor; the row tail falls off.
    fn insert_chars(&mut self, count: usize) {
        let x = self.cursor_x.min(self.cols);
        let k = count.min(self.cols - x);
        if k == 0 {
            return;
        }
        let base = self.cursor_y * self.cols;
        self.cells.copy_within(base + x..base + self.cols - k, base + x + k);
        self.clear_cells(self.cursor_y, x, x + k);
    }

    /// IL: push rows `[cursor_y, scroll_bottom]` down, blanking at the cursor.
    fn insert_lines(&mut self, count: usize) {
        for _ in 0..count {
            for y in (self.cursor_y + 1..=self.scroll_bottom).rev() {
                self.copy_row(y - 1, y);
            }
            self.clear_cells(self.cursor_y, 0, self.cols);
        }
    }

    /// DL: pull rows up over the cursor row, blanking at the region bottom.
    fn delete_lines(&mut self, count: usize) {
        for _ in 0..count {
            for y in self.cursor_y..self.scroll_bottom {
                self.copy_row(y + 1, y);
            }
            self.clear_cells(self.scroll_bottom, 0, self.cols);
        }
    }

    /// DECSTBM. A region whose top would land past its bottom cannot be
    /// represented and is ignored, keeping the previous region.
    fn set_scroll_region(&mut self, params: &[u16]) {
        let top = (param_or(params, 0, 1) - 1).min(self.rows - 1);
        let bottom = (param_or(params, 1, self.rows) - 1).min(self.rows - 1);
        if top <= bottom {
            self.scroll_top = top;
            self.scroll_bottom = bottom;
        }
    }

    fn select_graphic_rendition(&mut self, params: &[u16]) {
        if params.is_empty() {
            self.sgr_reset();
            return;
        }
        for &p in params {
            match p {
                0 => self.sgr_reset(),
                1 => self.bold = true,
                22 => self.bold = false,
                30..=37 => self.fg_color = PALETTE[(p - 30) as usize],
                39 => self.fg_color = DEFAULT_FG,
                40..=47 => self.bg_color = PALETTE[(p - 40) as usize],
                49 => self.bg_color = DEFAULT_BG,
                90..=97 => self.fg_color = PALETTE[(p - 90 + 8) as usize],
                100..=107 => self.bg_color = PALETTE[(p - 100 + 8) as usize],
                _ => {}
            }
        }
    }

    fn sgr_reset(&mut self) {
        self.fg_color = DEFAULT_FG;
        self.bg_color = DEFAULT_BG;
        self.bold = false;
    }

    fn set_modes(&mut self, params: &[u16], private_mode: bool, set: bool) {
        if !private_mode {
            return;
        }
        for &p in params {
            match p {
                25 => self.cursor_visible = set,
                // Alternate screen: acknowledged, not backed by a second grid.
                47 | 1047 | 1049 => {}
                _ => {}
            }
        }
    }

    fn device_status_report(&mut self, kind: usize, reply: &mut dyn Write) {
        match kind {
            5 => {
                let _ = reply.write_all(b"\x1b[0n");
            }
            6 => {
                let _ = write!(reply, "\x1b[{};{}R", self.cursor_y + 1, self.cursor_x + 1);
            }
            _ => {}
        }
    }
}

/// Raw parameter value; missing parameters read as 0.
fn param(params: &[u16], idx: usize) -> usize {
    params.get(idx).copied().unwrap_or(0) as usize
}

/// Parameter with a default for the missing-or-zero case.
fn param_or(params: &[u16], idx: usize, default: usize) -> usize {
    match param(params, idx) {
        0 => default,
        v => v,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn term() -> Term {
        Term::new(80, 24)
    }

    fn put_str(t: &mut Term, s: &str) {
        for c in s.chars() {
            t.put_char(c);
        }
    }

    fn row_text(t: &Term, y: usize, len: usize) -> String {
        (0..len).map(|x| t.cell(x, y).codepoint).collect()
    }

    fn csi(t: &mut Term, final_byte: u8, params: &[u16]) {
        let mut sink = Vec::new();
        t.csi_dispatch(final_byte, params, false, &mut sink);
    }

    #[test]
    fn put_char_advances_and_stamps_sgr() {
        let mut t = term();
        csi(&mut t, b'm', &[31]);
        t.put_char('X');
        assert_eq!(t.cursor_x, 1);
        let c = t.cell(0, 0);
        assert_eq!(c.codepoint, 'X');
        assert_eq!(c.fg_color, PALETTE[1]);
        assert_eq!(c.bg_color, DEFAULT_BG);
    }

    #[test]
    fn pending_wrap_frontier() {
        let mut t = term();
        csi(&mut t, b'H', &[1, 80]);
        t.put_char('a');
        // The write in the last column parks the cursor at the frontier.
        assert_eq!(t.cursor_x, 80);
        assert_eq!(t.cursor_y, 0);
        t.put_char('b');
        assert_eq!((t.cursor_x, t.cursor_y), (1, 1));
        assert_eq!(t.cell(79, 0).codepoint, 'a');
        assert_eq!(t.cell(0, 1).codepoint, 'b');
    }

    #[test]
    fn newline_at_region_bottom_scrolls() {
        let mut t = term();
        put_str(&mut t, "top");
        csi(&mut t, b'H', &[24, 1]);
        t.newline();
        assert_eq!(t.cursor_y, 23);
        // Row 0 content scrolled away.
        assert_eq!(t.cell(0, 0).codepoint, ' ');
    }

    #[test]
    fn tab_stops_and_wrap() {
        let mut t = term();
        t.put_char('a');
        t.tab();
        assert_eq!(t.cursor_x, 8);
        t.tab();
        assert_eq!(t.cursor_x, 16);
        // A stop at the right edge becomes CR+NL.
        csi(&mut t, b'H', &[1, 78]);
        t.tab();
        assert_eq!((t.cursor_x, t.cursor_y), (0, 1));
    }

    #[test]
    fn backspace_clamps_at_zero() {
        let mut t = term();
        t.backspace();
        assert_eq!(t.cursor_x, 0);
        t.put_char('x');
        t.backspace();
        assert_eq!(t.cursor_x, 0);
    }

    #[test]
    fn cursor_moves_clamp_to_grid() {
        let mut t = term();
        csi(&mut t, b'H', &[999, 999]);
        assert_eq!((t.cursor_x, t.cursor_y), (79, 23));
        csi(&mut t, b'A', &[100]);
        assert_eq!(t.cursor_y, 0);
        csi(&mut t, b'D', &[100]);
        assert_eq!(t.cursor_x, 0);
        csi(&mut t, b'B', &[]);
        assert_eq!(t.cursor_y, 1);
        csi(&mut t, b'C', &[5]);
        assert_eq!(t.cursor_x, 5);
        csi(&mut t, b'G', &[3]);
        assert_eq!(t.cursor_x, 2);
        csi(&mut t, b'd', &[10]);
        assert_eq!(t.cursor_y, 9);
    }

    #[test]
    fn erase_display_modes() {
        let mut t = term();
        put_str(&mut t, "abcdef");
        csi(&mut t, b'H', &[1, 4]); // on the 'd'
        csi(&mut t, b'J', &[]);
        assert_eq!(row_text(&t, 0, 6), "abc   ");

        let mut t = term();
        put_str(&mut t, "abcdef");
        csi(&mut t, b'H', &[1, 3]);
        csi(&mut t, b'J', &[1]); // start through cursor, inclusive
        assert_eq!(row_text(&t, 0, 6), "   def");

        let mut t = term();
        put_str(&mut t, "abc");
        csi(&mut t, b'J', &[2]);
        assert_eq!(row_text(&t, 0, 3), "   ");
    }

    #[test]
    fn erase_line_modes() {
        let mut t = term();
        put_str(&mut t, "abcdef");
        csi(&mut t, b'G', &[3]);
        csi(&mut t, b'K', &[0]);
        assert_eq!(row_text(&t, 0, 6), "ab    ");
        put_str(&mut t, "cdef");
        csi(&mut t, b'G', &[3]);
        csi(&mut t, b'K', &[1]);
        assert_eq!(row_text(&t, 0, 6), "   def");
        csi(&mut t, b'K', &[2]);
        assert_eq!(row_text(&t, 0, 6), "      ");
    }

    #[test]
    fn erase_chars_stops_at_row_end() {
        let mut t = term();
        put_str(&mut t, "abcdef");
        csi(&mut t, b'G', &[5]);
        csi(&mut t, b'X', &[400]);
        assert_eq!(row_text(&t, 0, 6), "abcd  ");
        assert_eq!(t.cursor_x, 4); // ECH does not move the cursor
    }

    #[test]
    fn delete_and_insert_chars() {
        let mut t = term();
        put_str(&mut t, "abcdef");
        csi(&mut t, b'G', &[2]);
        csi(&mut t, b'P', &[2]); // delete "bc"
        assert_eq!(row_text(&t, 0, 6), "adef  ");

        csi(&mut t, b'G', &[2]);
        csi(&mut t, b'@', &[3]);
        assert_eq!(row_text(&t, 0, 9), "a   def  ");
        // The row tail must have fallen off, not wrapped.
        assert_eq!(t.cell(79, 0).codepoint, ' ');
    }

    #[test]
    fn delete_chars_oversized_count() {
        let mut t = term();
        put_str(&mut t, "abc");
        csi(&mut t, b'G', &[2]);
        csi(&mut t, b'P', &[500]);
        assert_eq!(row_text(&t, 0, 3), "a  ");
    }

    #[test]
    fn insert_delete_lines_respect_region() {
        let mut t = term();
        for y in 0..6 {
            csi(&mut t, b'H', &[y + 1, 1]);
            put_str(&mut t, &format!("line{y}"));
        }
        csi(&mut t, b'r', &[2, 5]); // region rows 1..=4
        csi(&mut t, b'H', &[2, 1]);
        csi(&mut t, b'L', &[1]);
        assert_eq!(row_text(&t, 0, 5), "line0");
        assert_eq!(row_text(&t, 1, 5), "     ");
        assert_eq!(row_text(&t, 2, 5), "line1");
        assert_eq!(row_text(&t, 4, 5), "line3");
        // line4 was pushed out of the region bottom; row 5 is untouched.
        assert_eq!(row_text(&t, 5, 5), "line5");

        csi(&mut t, b'M', &[1]);
        assert_eq!(row_text(&t, 1, 5), "line1");
        assert_eq!(row_text(&t, 4, 5), "     ");
        assert_eq!(row_text(&t, 5, 5), "line5");
    }

    #[test]
    fn scroll_region_set_and_clamp() {
        let mut t = term();
        csi(&mut t, b'r', &[3, 6]);
        assert_eq!(t.scroll_region(), (2, 5));
        csi(&mut t, b'r', &[]);
        assert_eq!(t.scroll_region(), (0, 23));
        csi(&mut t, b'r', &[1, 999]);
        assert_eq!(t.scroll_region(), (0, 23));
        // Inverted regions are ignored.
        csi(&mut t, b'r', &[10, 2]);
        assert_eq!(t.scroll_region(), (0, 23));
    }

    #[test]
    fn scroll_up_down_within_region() {
        let mut t = term();
        for y in 0..8 {
            csi(&mut t, b'H', &[y + 1, 1]);
            put_str(&mut t, &format!("r{y}"));
        }
        csi(&mut t, b'r', &[3, 6]); // rows 2..=5
        csi(&mut t, b'S', &[1]);
        assert_eq!(row_text(&t, 1, 2), "r1");
        assert_eq!(row_text(&t, 2, 2), "r3");
        assert_eq!(row_text(&t, 4, 2), "r5");
        assert_eq!(row_text(&t, 5, 2), "  ");
        assert_eq!(row_text(&t, 6, 2), "r6");
        csi(&mut t, b'T', &[1]);
        assert_eq!(row_text(&t, 2, 2), "  ");
        assert_eq!(row_text(&t, 3, 2), "r3");
        assert_eq!(row_text(&t, 5, 2), "r5");
    }

    #[test]
    fn sgr_reset_is_idempotent() {
        let mut t = term();
        csi(&mut t, b'm', &[1, 31, 44]);
        csi(&mut t, b'm', &[]);
        t.put_char('x');
        let c = t.cell(0, 0);
        assert_eq!((c.fg_color, c.bg_color, c.bold), (DEFAULT_FG, DEFAULT_BG, false));
        // Applying the bare reset again changes nothing.
        csi(&mut t, b'm', &[]);
        t.put_char('y');
        let c = t.cell(1, 0);
        assert_eq!((c.fg_color, c.bg_color, c.bold), (DEFAULT_FG, DEFAULT_BG, false));
    }

    #[test]
    fn sgr_palette_ranges() {
        let mut t = term();
        csi(&mut t, b'm', &[90]);
        t.put_char('a');
        assert_eq!(t.cell(0, 0).fg_color, PALETTE[8]);
        csi(&mut t, b'm', &[107]);
        t.put_char('b');
        assert_eq!(t.cell(1, 0).bg_color, PALETTE[15]);
        csi(&mut t, b'm', &[39, 49]);
        t.put_char('c');
        let c = t.cell(2, 0);
        assert_eq!((c.fg_color, c.bg_color), (DEFAULT_FG, DEFAULT_BG));
    }

    #[test]
    fn erase_blanks_use_current_background() {
        let mut t = term();
        csi(&mut t, b'm', &[44]);
        csi(&mut t, b'K', &[2]);
        assert_eq!(t.cell(0, 0).bg_color, PALETTE[4]);
        assert_eq!(t.cell(0, 0).codepoint, ' ');
    }

    #[test]
    fn cursor_visibility_modes() {
        let mut t = term();
        let mut sink = Vec::new();
        t.csi_dispatch(b'l', &[25], true, &mut sink);
        assert!(!t.cursor_visible);
        t.csi_dispatch(b'h', &[25], true, &mut sink);
        assert!(t.cursor_visible);
        // Non-private 25 is not DECTCEM.
        t.csi_dispatch(b'l', &[25], false, &mut sink);
        assert!(t.cursor_visible);
        // Alt-screen modes are acknowledged without touching the grid.
        t.csi_dispatch(b'h', &[1049], true, &mut sink);
        assert_eq!(t.cell(0, 0).codepoint, ' ');
    }

    #[test]
    fn device_reports() {
        let mut t = term();
        let mut reply = Vec::new();
        t.csi_dispatch(b'H', &[3, 10], false, &mut reply);
        t.csi_dispatch(b'n', &[6], false, &mut reply);
        assert_eq!(reply, b"\x1b[3;10R");

        reply.clear();
        t.csi_dispatch(b'n', &[5], false, &mut reply);
        assert_eq!(reply, b"\x1b[0n");

        reply.clear();
        t.csi_dispatch(b'c', &[], false, &mut reply);
        assert_eq!(reply, b"\x1b[?1;2c");
    }

    #[test]
    fn scroll_cancellation_on_blank_edges() {
        let mut t = term();
        // Content only in the region interior, edges blank.
        csi(&mut t, b'r', &[5, 10]);
        csi(&mut t, b'H', &[7, 1]);
        put_str(&mut t, "mid");
        let before: Vec<Cell> = (4..10).map(|y| t.cell(0, y)).collect();
        csi(&mut t, b'S', &[2]);
        csi(&mut t, b'T', &[2]);
        let after: Vec<Cell> = (4..10).map(|y| t.cell(0, y)).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn grid_size_clamps() {
        assert_eq!(grid_size(1920, 1080, 10, 20), (191, 53));
        assert_eq!(grid_size(100, 100, 10, 20), (MIN_COLS, MIN_ROWS));
        assert_eq!(grid_size(100_000, 100_000, 8, 16), (MAX_COLS, MAX_ROWS));
    }
}
