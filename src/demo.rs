//! Interactive terminal front-end: the host that drives the engine's tick.
//!
//! Pixels are presented two-per-cell with the upper-half-block glyph; the
//! text rows above and below the pixel area carry the card titles, statuses,
//! yields and the control help. Only changed cells are flushed each frame.

use crate::config::Config;
use crate::engine::{Engine, Frame, FramePacer, SENSOR};
use crate::scene::Scene;
use crate::surface::Surface;
use crate::weather::WeatherMode;
use anyhow::{Context, Result};
use crossterm::{
    cursor,
    event::{self, DisableFocusChange, EnableFocusChange, Event, KeyCode, KeyEventKind},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{
        self, BeginSynchronizedUpdate, Clear, ClearType, DisableLineWrap, EnableLineWrap,
        EndSynchronizedUpdate, EnterAlternateScreen, LeaveAlternateScreen,
    },
};
use std::{
    io::{self, Stdout, Write},
    time::{Duration, Instant},
};

/// Text rows reserved above and below the pixel area.
const OVERLAY_TOP: u16 = 1;
const OVERLAY_BOTTOM: u16 = 2;

/// Smallest terminal the layout is computed for.
const MIN_COLS: u16 = 60;
const MIN_ROWS: u16 = 16;

/// Bounds for the interactive speed control.
const SPEED_STEP: f64 = 2.0;
const MAX_SECONDS_PER_DAY: f64 = 120.0;

const TEXT: Color = Color::Rgb {
    r: 233,
    g: 238,
    b: 252,
};
const TEXT_DIM: Color = Color::Rgb {
    r: 140,
    g: 150,
    b: 170,
};
const TEXT_FAULT: Color = Color::Rgb {
    r: 255,
    g: 170,
    b: 170,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    fn blank() -> Self {
        Cell {
            ch: ' ',
            fg: Color::Reset,
            bg: Color::Black,
        }
    }
}

/// Run the demo until the user quits. Restores the terminal on every exit
/// path, including errors from the loop body.
pub fn run(cfg: Config) -> Result<()> {
    let mut engine = Engine::new(cfg.clone()).context("failed to construct engine")?;

    let mut out = io::stdout();
    terminal::enable_raw_mode().context("failed to enable raw mode")?;
    execute!(
        out,
        EnterAlternateScreen,
        cursor::Hide,
        DisableLineWrap,
        EnableFocusChange
    )?;

    let res = event_loop(&mut out, &mut engine, &cfg);

    execute!(
        out,
        ResetColor,
        cursor::Show,
        EnableLineWrap,
        DisableFocusChange,
        LeaveAlternateScreen
    )?;
    terminal::disable_raw_mode().context("failed to disable raw mode")?;

    res
}

fn event_loop(out: &mut Stdout, engine: &mut Engine, cfg: &Config) -> Result<()> {
    let mut cols = 0u16;
    let mut rows = 0u16;
    let mut prev_buf: Vec<Cell> = Vec::new();
    let mut cur_buf: Vec<Cell> = Vec::new();
    let mut surface = Surface::new(0, 0);
    let mut scene = Scene::new(0, 0);

    let mut pacer = FramePacer::new(cfg.demo.target_fps);
    let poll_timeout = Duration::from_secs_f64(pacer.interval() / 8.0);
    let mut last_loop = Instant::now();
    let mut last_tick = Instant::now();

    loop {
        // Block briefly for input, then drain whatever arrived. The poll
        // timeout doubles as the loop's sleep.
        if event::poll(poll_timeout)? {
            while event::poll(Duration::ZERO)? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => match key.code {
                        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => return Ok(()),
                        KeyCode::Char(' ') => {
                            engine.toggle_running();
                        }
                        KeyCode::Char('r') | KeyCode::Char('R') => engine.reset(),
                        KeyCode::Char('1') => engine.set_weather(WeatherMode::Sunny),
                        KeyCode::Char('2') => engine.set_weather(WeatherMode::Cloudy),
                        KeyCode::Char('3') => engine.set_weather(WeatherMode::Dusty),
                        KeyCode::Char('+') | KeyCode::Char('=') => {
                            let speed = engine.state().seconds_per_day + SPEED_STEP;
                            engine.set_speed(speed.min(MAX_SECONDS_PER_DAY));
                        }
                        KeyCode::Char('-') => {
                            engine.set_speed(engine.state().seconds_per_day - SPEED_STEP);
                        }
                        _ => {}
                    },
                    Event::FocusGained => engine.set_visible(true),
                    Event::FocusLost => engine.set_visible(false),
                    _ => {}
                }
            }
        }

        // Resize: reallocate buffers and rebuild the cached layout.
        let (w, h) = terminal::size().context("failed to query terminal size")?;
        let (w, h) = (w.max(MIN_COLS), h.max(MIN_ROWS));
        if w != cols || h != rows {
            cols = w;
            rows = h;
            let px_w = cols as usize;
            let px_h = (rows - OVERLAY_TOP - OVERLAY_BOTTOM) as usize * 2;
            surface.resize(px_w, px_h);
            scene.resize(px_w, px_h);
            prev_buf = vec![Cell::blank(); cols as usize * rows as usize];
            cur_buf = prev_buf.clone();
            execute!(out, Clear(ClearType::All))?;
        }

        let now = Instant::now();
        let elapsed = (now - last_loop).as_secs_f64();
        last_loop = now;

        if !pacer.ready(elapsed) {
            continue;
        }

        let dt = (now - last_tick).as_secs_f64();
        last_tick = now;

        let frame = engine.tick(dt).context("failed to tick engine")?;
        scene.render(&mut surface, &frame);

        for cell in cur_buf.iter_mut() {
            *cell = Cell::blank();
        }
        blit(&surface, &mut cur_buf, cols, rows);
        overlay(&mut cur_buf, cols, rows, &scene, &frame, engine);

        execute!(out, BeginSynchronizedUpdate)?;
        flush_diff(out, cols, rows, &mut prev_buf, &cur_buf)?;
        execute!(out, EndSynchronizedUpdate)?;
        out.flush()?;
    }
}

/// Copy the pixel surface into the cell buffer, two pixels per cell.
fn blit(surface: &Surface, buf: &mut [Cell], cols: u16, rows: u16) {
    let pixel_rows =
        ((rows - OVERLAY_TOP - OVERLAY_BOTTOM) as usize).min(surface.height() / 2) as u16;
    let pixel_cols = (cols as usize).min(surface.width()) as u16;
    for cell_y in 0..pixel_rows {
        for cell_x in 0..pixel_cols {
            let top = surface.pixel(cell_x as usize, cell_y as usize * 2);
            let bottom = surface.pixel(cell_x as usize, cell_y as usize * 2 + 1);
            let cell = Cell {
                ch: '▀',
                fg: Color::Rgb {
                    r: top.r,
                    g: top.g,
                    b: top.b,
                },
                bg: Color::Rgb {
                    r: bottom.r,
                    g: bottom.g,
                    b: bottom.b,
                },
            };
            put_cell(buf, cols, cell_x, cell_y + OVERLAY_TOP, cell);
        }
    }
}

/// Text rows: card titles and statuses on top, yields and controls below.
fn overlay(buf: &mut [Cell], cols: u16, rows: u16, scene: &Scene, frame: &Frame, engine: &Engine) {
    for (i, card) in scene.layout().cards.iter().enumerate() {
        let panel = &frame.panels[i];
        let title = format!("{} [{}]", panel.name, panel.pose.status.label());
        let fg = if panel.pose.status.is_fault() {
            TEXT_FAULT
        } else {
            TEXT
        };
        let x = (card.card.center_x() - title.chars().count() as f64 / 2.0).max(0.0) as u16;
        put_str(buf, cols, x, 0, &title, fg);

        let mut line = format!("Yield {:3.0}%", panel.yield_fraction * 100.0);
        if i == SENSOR {
            if panel.pose.status.is_fault() {
                line.push_str("  hunting");
            } else if frame.weather == WeatherMode::Dusty {
                line.push_str("  dirty sensor");
            }
        }
        let fg = if i == SENSOR && panel.pose.status.is_fault() {
            TEXT_FAULT
        } else {
            TEXT
        };
        let x = (card.card.center_x() - line.chars().count() as f64 / 2.0).max(0.0) as u16;
        put_str(buf, cols, x, rows - 2, &line, fg);
    }

    let state = engine.state();
    let mut help = format!(
        "{} · {:.0} s/day · space pause · r reset · 1/2/3 weather · +/- speed · q quit",
        frame.weather.caption(),
        state.seconds_per_day
    );
    if !state.running {
        help.push_str(" · PAUSED");
    }
    if !state.visible {
        help.push_str(" · UNFOCUSED");
    }
    put_str(buf, cols, 1, rows - 1, &help, TEXT_DIM);
}

fn put_cell(buf: &mut [Cell], cols: u16, x: u16, y: u16, cell: Cell) {
    let idx = y as usize * cols as usize + x as usize;
    if x < cols && idx < buf.len() {
        buf[idx] = cell;
    }
}

fn put_str(buf: &mut [Cell], cols: u16, x: u16, y: u16, text: &str, fg: Color) {
    for (i, ch) in text.chars().enumerate() {
        let cx = x as usize + i;
        if cx >= cols as usize {
            break;
        }
        put_cell(
            buf,
            cols,
            cx as u16,
            y,
            Cell {
                ch,
                fg,
                bg: Color::Black,
            },
        );
    }
}

/// Flush only the cells that changed since the previous frame.
fn flush_diff(
    out: &mut Stdout,
    cols: u16,
    rows: u16,
    prev: &mut [Cell],
    cur: &[Cell],
) -> io::Result<()> {
    let mut cur_fg = Color::Reset;
    let mut cur_bg = Color::Reset;

    for y in 0..rows as usize {
        for x in 0..cols as usize {
            let i = y * cols as usize + x;
            if prev[i] == cur[i] {
                continue;
            }
            prev[i] = cur[i];

            let c = cur[i];
            queue!(out, cursor::MoveTo(x as u16, y as u16))?;

            if c.bg != cur_bg {
                cur_bg = c.bg;
                queue!(out, SetBackgroundColor(cur_bg))?;
            }
            if c.fg != cur_fg {
                cur_fg = c.fg;
                queue!(out, SetForegroundColor(cur_fg))?;
            }
            queue!(out, Print(c.ch))?;
        }
    }
    Ok(())
}
