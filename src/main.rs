//! fbterm: a terminal emulator on the Linux framebuffer.
//!
//! Runs a shell on a PTY and renders its screen straight into `/dev/fb0` —
//! no display server, no VT text mode, just a TrueType font and a memory
//! mapping. Quit with Ctrl+Q.
//!
//! Startup wiring lives here; all behavior is in the library modules.

use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use fbterm::event_loop;
use fbterm::font::{self, FontSet};
use fbterm::framebuffer::Framebuffer;
use fbterm::input::{InputSource, RawModeGuard};
use fbterm::logging;
use fbterm::palette::DEFAULT_BG;
use fbterm::pty::ShellPty;
use fbterm::render::Renderer;
use fbterm::term::{self, Term};

/// Framebuffer terminal emulator
#[derive(Parser, Debug)]
#[command(name = "fbterm", version, about = "Framebuffer terminal emulator")]
struct Args {
    /// Path to the primary TrueType font
    font: PathBuf,

    /// Font size in pixels (6-72); 0 or absent means 16
    font_size: Option<f32>,

    /// Framebuffer device
    #[arg(long, default_value = "/dev/fb0")]
    fb: PathBuf,

    /// Extra fallback fonts, tried after the built-in Noto probes
    #[arg(long = "fallback")]
    fallback: Vec<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let _log_guard = logging::init();

    let font_size = font::resolve_font_size(args.font_size)?;
    let mut fb = Framebuffer::open(&args.fb)?;
    let fonts = FontSet::load(&args.font, &args.fallback, font_size)?;

    let m = fonts.metrics();
    let (cols, rows) = term::grid_size(fb.width(), fb.height(), m.char_width, m.char_height);
    eprintln!(
        "Terminal size: {cols}x{rows} (char {}x{}, screen {}x{})",
        m.char_width,
        m.char_height,
        fb.width(),
        fb.height()
    );

    let mut term = Term::new(cols, rows);

    // Handler first: a shell that exits immediately must still clear the flag.
    event_loop::install_sigchld_handler();
    let mut pty = ShellPty::spawn(cols, rows)?;
    tracing::info!("running {} at {cols}x{rows}", pty.shell());

    let mut input = InputSource::open();
    let _raw_guard = RawModeGuard::install();

    // The VT console underneath keeps blinking its own cursor otherwise.
    set_host_cursor(false);
    fb.clear(DEFAULT_BG);

    let mut renderer = Renderer::new(fonts);
    let result = event_loop::run(&mut fb, &mut renderer, &mut term, &mut input, &mut pty);

    fb.clear(DEFAULT_BG);
    set_host_cursor(true);

    result
}

/// Show or hide the host VT's cursor on stdout.
fn set_host_cursor(visible: bool) {
    let mut out = std::io::stdout();
    let _ = out.write_all(if visible { b"\x1b[?25h" } else { b"\x1b[?25l" });
    let _ = out.flush();
}
