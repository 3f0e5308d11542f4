/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Paint the frame into the 660×390 `Canvas`
///   2. Downscale it into `front` (array of Cell); each cell is a '▀' whose
///      foreground is the upper pixel and background the lower one
///   3. Compare each cell with `back` buffer (previous frame)
///   4. Only emit terminal commands for cells that changed
///   5. All commands are batched with `queue!`, flushed once at the end
///   6. Swap front/back
///
/// This eliminates flicker caused by full-screen redraws.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};
use image::RgbaImage;

use crate::sim::world::{Mode, WorldState};
use super::assets::Sprites;
use super::canvas::{paint_menu, paint_world, Canvas};

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    /// Explicit dark background for all "empty" terminal cells, so the
    /// gaps between rows match the cell colour on VTE-based terminals.
    const BASE_BG: Color = Color::Rgb { r: 0, g: 0, b: 0 };

    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: Cell::BASE_BG };

    /// Sentinel cell used to invalidate the back buffer.
    /// Different from any real cell, so every position will be diff'd.
    const INVALID: Cell = Cell { ch: '?', fg: Color::Magenta, bg: Color::Magenta };

    fn pixels(top: Color, bottom: Color) -> Self {
        Cell { ch: '▀', fg: top, bg: bottom }
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer { width: w, height: h, cells: vec![Cell::BLANK; w * h] }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    /// Write a string at (x, y) with given colors. Each char occupies 1 column.
    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width {
                break;
            }
            self.set(x + i, y, Cell { ch, fg, bg });
        }
    }
}

// ── Downscaling ──

/// Where the playfield lands in the terminal.
#[derive(Clone, Copy, PartialEq, Debug)]
struct Viewport {
    /// Canvas pixels per output pixel (same on both axes).
    scale: f64,
    /// Output size in terminal columns and half-rows.
    cols: usize,
    half_rows: usize,
    left: usize,
}

impl Viewport {
    fn fit(canvas_w: u32, canvas_h: u32, term_cols: usize, term_rows: usize) -> Viewport {
        let avail_w = term_cols.max(1) as f64;
        let avail_h = (term_rows.max(1) * 2) as f64;
        let scale = (canvas_w as f64 / avail_w).max(canvas_h as f64 / avail_h);
        let cols = ((canvas_w as f64 / scale) as usize).min(term_cols);
        let half_rows = ((canvas_h as f64 / scale) as usize).min(term_rows * 2);
        Viewport { scale, cols, half_rows, left: (term_cols - cols) / 2 }
    }

    /// Source span [start, end) covered by output pixel `i`.
    fn span(&self, i: usize, limit: u32) -> (u32, u32) {
        let start = ((i as f64 * self.scale) as u32).min(limit.saturating_sub(1));
        let end = (((i + 1) as f64 * self.scale) as u32).clamp(start + 1, limit);
        (start, end)
    }
}

/// Mean colour of a canvas rectangle.
fn box_average(img: &RgbaImage, (x0, x1): (u32, u32), (y0, y1): (u32, u32)) -> Color {
    let mut sum = [0u32; 3];
    for y in y0..y1 {
        for x in x0..x1 {
            let p = img.get_pixel(x, y).0;
            sum[0] += p[0] as u32;
            sum[1] += p[1] as u32;
            sum[2] += p[2] as u32;
        }
    }
    let n = ((x1 - x0) * (y1 - y0)).max(1);
    Color::Rgb { r: (sum[0] / n) as u8, g: (sum[1] / n) as u8, b: (sum[2] / n) as u8 }
}

// ── Renderer ──

/// Vertical offsets
const HUD_ROW: usize = 0;
const MAP_ROW: usize = 1;

const HUD_FG: Color = Color::Rgb { r: 255, g: 220, b: 80 };
const HELP_FG: Color = Color::Rgb { r: 150, g: 150, b: 170 };

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    canvas: Canvas,
    enhanced_keys: bool,
    last_mode: Option<(Mode, bool)>,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(1 << 16, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            canvas: Canvas::new(),
            enhanced_keys: false,
            last_mode: None,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        self.enhanced_keys = terminal::supports_keyboard_enhancement().unwrap_or(false);
        if self.enhanced_keys {
            execute!(
                self.writer,
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )?;
        }
        log::info!("keyboard release events: {}", self.enhanced_keys);

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        // Force full repaint on first frame: back ≠ front for every cell.
        self.back.cells.fill(Cell::INVALID);

        Ok(())
    }

    /// Whether the terminal reports key releases.
    pub fn keyboard_enhanced(&self) -> bool {
        self.enhanced_keys
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        if self.enhanced_keys {
            execute!(self.writer, PopKeyboardEnhancementFlags)?;
        }
        execute!(
            self.writer,
            ResetColor,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    pub fn render(&mut self, world: &WorldState, sprites: &Sprites) -> io::Result<()> {
        // Detect terminal resize
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            // Force full repaint after resize.
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        // Mode change (including menu ↔ finish screen) → clear for clean transition
        let mode = (world.mode, world.won);
        if self.last_mode != Some(mode) {
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
            self.last_mode = Some(mode);
        }

        match world.mode {
            Mode::Menu => paint_menu(&mut self.canvas, world, sprites),
            Mode::Playing => paint_world(&mut self.canvas, world, sprites),
        }

        self.front.clear();
        self.compose_hud(world);
        self.compose_canvas();

        // Diff and emit
        self.flush_diff()?;

        // Swap: current front becomes next back
        std::mem::swap(&mut self.front, &mut self.back);

        Ok(())
    }

    // ── Compose: build front buffer content ──

    fn compose_hud(&mut self, w: &WorldState) {
        let (status, help) = match w.mode {
            Mode::Menu if w.won => (" KUKAROO!  You made it home!".to_string(), "[Space] Play again  [Esc] Quit "),
            Mode::Menu => (" KUKAROO!".to_string(), "[Space] Start  [Esc] Quit "),
            Mode::Playing => {
                let cheat = if w.invincible { "  INVINCIBLE" } else { "" };
                (
                    format!(" KUKAROO!  Level {}/{}{cheat}", w.level, w.final_level),
                    "[A/D] Move  [Space] Flap  [N] Reload  [P] Menu  [Esc] Quit ",
                )
            }
        };
        self.front.put_str(0, HUD_ROW, &status, HUD_FG, Cell::BASE_BG);
        let help_len = help.chars().count();
        let status_len = status.chars().count();
        if self.front.width >= status_len + help_len + 2 {
            self.front.put_str(self.front.width - help_len, HUD_ROW, help, HELP_FG, Cell::BASE_BG);
        }
    }

    fn compose_canvas(&mut self) {
        let rows = self.term_h.saturating_sub(MAP_ROW);
        if rows == 0 || self.term_w == 0 {
            return;
        }
        let img = self.canvas.image();
        let view = Viewport::fit(img.width(), img.height(), self.term_w, rows);

        for row in 0..(view.half_rows + 1) / 2 {
            let top_y = view.span(row * 2, img.height());
            let bottom = row * 2 + 1;
            for col in 0..view.cols {
                let xs = view.span(col, img.width());
                let top = box_average(img, xs, top_y);
                let bottom = if bottom < view.half_rows {
                    box_average(img, xs, view.span(bottom, img.height()))
                } else {
                    Cell::BASE_BG
                };
                self.front.set(view.left + col, MAP_ROW + row, Cell::pixels(top, bottom));
            }
        }
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut need_move = true;
        let mut last_x: usize = 0;
        let mut last_y: usize = 0;

        // Set explicit base colors at start of frame.
        // Do NOT use ResetColor here: the terminal's native default may
        // differ from BASE_BG and leave line artifacts.
        queue!(self.writer,
            SetForegroundColor(Color::White),
            SetBackgroundColor(Cell::BASE_BG),
        )?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    need_move = true;
                    continue;
                }

                // Position cursor if needed
                if need_move || x != last_x + 1 || y != last_y {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                    need_move = false;
                }

                // Set colors only if changed
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }

                queue!(self.writer, Print(cell.ch))?;
                last_x = x;
                last_y = y;
            }
        }

        self.writer.flush()
    }
}
