//! Cell-to-pixel rasterisation.
//!
//! The event loop redraws the whole grid whenever the dirty flag is set;
//! there is no damage tracking. What makes that affordable is the glyph
//! cache: the cell size is fixed for the lifetime of the process, so each
//! codepoint is rasterised exactly once and replayed as a coverage blit on
//! every subsequent frame.

use std::collections::HashMap;

use fontdue::Metrics;

use crate::font::{CellMetrics, FontSet};
use crate::framebuffer::Framebuffer;
use crate::term::Term;

struct CachedGlyph {
    metrics: Metrics,
    coverage: Vec<u8>,
}

pub struct Renderer {
    fonts: FontSet,
    cache: HashMap<char, CachedGlyph>,
}

impl Renderer {
    pub fn new(fonts: FontSet) -> Self {
        Self {
            fonts,
            cache: HashMap::new(),
        }
    }

    pub fn metrics(&self) -> CellMetrics {
        self.fonts.metrics()
    }

    /// Repaint every cell of the grid.
    pub fn draw_grid(&mut self, fb: &mut Framebuffer, term: &Term) {
        for y in 0..term.rows() {
            for x in 0..term.cols() {
                self.draw_cell(fb, term, x, y);
            }
        }
    }

    /// Paint one cell: background fill, then the alpha-blended glyph.
    fn draw_cell(&mut self, fb: &mut Framebuffer, term: &Term, gx: usize, gy: usize) {
        let m = self.fonts.metrics();
        let cell = term.cell(gx, gy);
        let px = (gx * m.char_width) as i32;
        let py = (gy * m.char_height) as i32;

        for yy in 0..m.char_height as i32 {
            for xx in 0..m.char_width as i32 {
                fb.put_pixel(px + xx, py + yy, cell.bg_color);
            }
        }

        if cell.codepoint == ' ' || cell.codepoint == '\0' {
            return;
        }

        let fonts = &self.fonts;
        let glyph = self.cache.entry(cell.codepoint).or_insert_with(|| {
            let (metrics, coverage) = fonts.rasterize(cell.codepoint);
            CachedGlyph { metrics, coverage }
        });

        // fontdue's ymin is baseline-relative with y growing upward; convert
        // to the top-down pixel origin of the bitmap.
        let origin_x = px + glyph.metrics.xmin;
        let origin_y = py + m.baseline - (glyph.metrics.height as i32 + glyph.metrics.ymin);
        draw_bitmap(
            fb,
            origin_x,
            origin_y,
            glyph.metrics.width,
            glyph.metrics.height,
            &glyph.coverage,
            cell.fg_color,
            cell.bg_color,
        );
    }
}

/// Blit an 8-bit coverage bitmap, blending partial coverage between the
/// foreground and the already-painted background.
#[allow(clippy::too_many_arguments)]
fn draw_bitmap(
    fb: &mut Framebuffer,
    x: i32,
    y: i32,
    width: usize,
    height: usize,
    coverage: &[u8],
    fg: u32,
    bg: u32,
) {
    for j in 0..height {
        for i in 0..width {
            match coverage[j * width + i] {
                0 => {} // background already drawn
                255 => fb.put_pixel(x + i as i32, y + j as i32, fg),
                alpha => fb.put_pixel(x + i as i32, y + j as i32, blend(fg, bg, alpha)),
            }
        }
    }
}

/// Channel-wise linear interpolation: `alpha` of `fg` over `bg`.
fn blend(fg: u32, bg: u32, alpha: u8) -> u32 {
    let a = alpha as u32;
    let mix = |shift: u32| -> u32 {
        let f = (fg >> shift) & 0xFF;
        let b = (bg >> shift) & 0xFF;
        (f * a + b * (255 - a)) / 255
    };
    (mix(16) << 16) | (mix(8) << 8) | mix(0)
}
