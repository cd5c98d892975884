//! Scene renderer: paints the three panel cards onto a pixel surface.
//!
//! Layout and the sky gradient depend only on the surface size, so they are
//! computed once per resize and cached; `render` itself never re-derives
//! them.

use crate::engine::{Frame, SENSOR};
use crate::solar::{self, SunSample};
use crate::surface::{Color, Surface};
use crate::tracker::HORIZON_Y;
use crate::weather::WeatherMode;
use std::f64::consts::TAU;

const BACKGROUND: Color = Color::rgb(7, 10, 20);
const CARD_FILL: Color = Color::rgba(255, 255, 255, 10);
const CARD_EDGE: Color = Color::rgba(255, 255, 255, 26);
const SKY_TOP: Color = Color::rgb(12, 18, 40);
const SKY_BOTTOM: Color = Color::rgb(8, 10, 22);
const ARC: Color = Color::rgba(255, 255, 255, 20);
const CLOUD: Color = Color::rgba(200, 220, 255, 36);
const SUN: Color = Color::rgba(255, 220, 140, 230);
const GROUND: Color = Color::rgba(255, 255, 255, 26);
const STAND: Color = Color::rgba(255, 255, 255, 46);
const PANEL_FILL: Color = Color::rgba(15, 23, 48, 217);
const PANEL_GRID: Color = Color::rgba(255, 255, 255, 20);
const BAR_TRACK: Color = Color::rgba(255, 255, 255, 15);
const BAR_EDGE: Color = Color::rgba(255, 255, 255, 31);
const PILL_FILL: Color = Color::rgba(255, 255, 255, 15);
const PILL_EDGE: Color = Color::rgba(255, 255, 255, 26);
const PILL_FAULT_FILL: Color = Color::rgba(255, 120, 120, 41);
const PILL_FAULT_EDGE: Color = Color::rgba(255, 120, 120, 89);
const SENSOR_EYE: Color = Color::rgba(233, 238, 252, 89);
const SENSOR_EYE_DIRTY: Color = Color::rgba(255, 160, 120, 166);
const DIRT_PATCH: Color = Color::rgba(255, 170, 120, 31);

/// Accent colors, one per strategy card.
const STRATEGY_COLORS: [Color; 3] = [
    Color::rgba(255, 255, 255, 166),
    Color::rgba(110, 168, 255, 217),
    Color::rgba(126, 231, 135, 230),
];

/// Segments of the reference arc tracing the sun's full-day path.
const ARC_SEGMENTS: usize = 50;

#[derive(Debug, Clone, Copy)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub fn center_x(&self) -> f64 {
        self.x + self.w / 2.0
    }
}

/// Cached per-card geometry.
#[derive(Debug, Clone, Copy)]
pub struct CardLayout {
    pub card: Rect,
    pub pill: Rect,
    pub sky: Rect,
    pub ground_y: f64,
    pub panel_center: [f64; 2],
    pub panel_w: f64,
    pub panel_h: f64,
    pub bar: Rect,
}

/// Cached geometry for the whole surface.
#[derive(Debug, Clone)]
pub struct Layout {
    pub cards: [CardLayout; 3],
}

impl Layout {
    fn compute(width: f64, height: f64) -> Self {
        let pad_x = (width * 0.016).max(2.0);
        let pad_y = (height * 0.05).max(2.0);
        let col_gap = (width * 0.014).max(2.0);

        let col_w = (width - pad_x * 2.0 - col_gap * 2.0) / 3.0;
        let card_h = height - pad_y * 2.0;

        let cards = std::array::from_fn(|i| {
            let card = Rect {
                x: pad_x + i as f64 * (col_w + col_gap),
                y: pad_y,
                w: col_w,
                h: card_h,
            };

            let pill_w = col_w * 0.22;
            let pill_h = (card_h * 0.06).max(2.0);
            let pill = Rect {
                x: card.x + card.w - pill_w - col_w * 0.045,
                y: card.y + card_h * 0.04,
                w: pill_w,
                h: pill_h,
            };

            let inset = col_w * 0.04;
            let sky = Rect {
                x: card.x + inset,
                y: card.y + card_h * 0.12,
                w: card.w - inset * 2.0,
                h: card_h * 0.52,
            };
            let ground_y = sky.y + sky.h + card_h * 0.02;

            let panel_center = [card.center_x(), ground_y + card_h * 0.16];
            let panel_w = col_w * 0.39;
            let panel_h = card_h * 0.12;

            let bar = Rect {
                x: card.x + inset,
                y: card.y + card_h - card_h * 0.1,
                w: card.w - inset * 2.0,
                h: (card_h * 0.045).max(2.0),
            };

            CardLayout {
                card,
                pill,
                sky,
                ground_y,
                panel_center,
                panel_w,
                panel_h,
                bar,
            }
        });

        Layout { cards }
    }
}

/// Renderer with its size-dependent caches.
pub struct Scene {
    layout: Layout,
    sky_rows: Vec<Color>,
}

impl Scene {
    pub fn new(width: usize, height: usize) -> Self {
        let mut scene = Scene {
            layout: Layout::compute(width as f64, height as f64),
            sky_rows: Vec::new(),
        };
        scene.rebuild_sky();
        scene
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Recompute the cached layout and gradient for a new surface size.
    pub fn resize(&mut self, width: usize, height: usize) {
        self.layout = Layout::compute(width as f64, height as f64);
        self.rebuild_sky();
    }

    fn rebuild_sky(&mut self) {
        let rows = self.layout.cards[0].sky.h.ceil().max(1.0) as usize;
        self.sky_rows = (0..rows)
            .map(|row| {
                let t = row as f64 / rows as f64;
                lerp_color(SKY_TOP, SKY_BOTTOM, t)
            })
            .collect();
    }

    /// Paint one frame. Pure side-effecting draw over the cached layout.
    pub fn render(&self, surface: &mut Surface, frame: &Frame) {
        surface.clear(BACKGROUND);

        for (i, card) in self.layout.cards.iter().enumerate() {
            self.draw_card(surface, frame, i, card);
        }
    }

    fn draw_card(&self, surface: &mut Surface, frame: &Frame, index: usize, layout: &CardLayout) {
        let panel = &frame.panels[index];
        let accent = STRATEGY_COLORS[index];
        let corner = layout.card.w * 0.06;

        // Card background.
        let c = layout.card;
        surface.fill_rounded_rect(c.x, c.y, c.w, c.h, corner, CARD_FILL);
        surface.stroke_rounded_rect(c.x, c.y, c.w, c.h, corner, CARD_EDGE);

        // Status pill, colored by fault.
        let p = layout.pill;
        let (pill_fill, pill_edge) = if panel.pose.status.is_fault() {
            (PILL_FAULT_FILL, PILL_FAULT_EDGE)
        } else {
            (PILL_FILL, PILL_EDGE)
        };
        surface.fill_rounded_rect(p.x, p.y, p.w, p.h, p.h / 2.0, pill_fill);
        surface.stroke_rounded_rect(p.x, p.y, p.w, p.h, p.h / 2.0, pill_edge);

        // Sky, row by row from the cached gradient.
        let sky = layout.sky;
        for (row, color) in self.sky_rows.iter().enumerate() {
            let y = sky.y + row as f64;
            if y >= sky.y + sky.h {
                break;
            }
            surface.fill_rect(sky.x, y, sky.w, 1.0, *color);
        }

        // Reference arc of the sun's full-day path.
        let mut prev = sun_point(&sky, &solar::sun_position(0.0));
        for k in 1..=ARC_SEGMENTS {
            let t = k as f64 / ARC_SEGMENTS as f64;
            let next = sun_point(&sky, &solar::sun_position(t));
            surface.draw_line(prev[0], prev[1], next[0], next[1], ARC);
            prev = next;
        }

        // Drifting clouds.
        if frame.weather == WeatherMode::Cloudy {
            self.draw_clouds(surface, &sky, frame.day_fraction, index);
        }

        // Sun disk with a soft glow, dimmed by cloud cover and elevation.
        let sun_px = sun_point(&sky, &frame.sun);
        let visibility = (0.25 + 0.75 * (1.0 - frame.env.cloud_cover)).clamp(0.15, 1.0)
            * (0.55 + 0.45 * frame.sun.y_norm);
        let glow_r = sky.h * 0.28;
        surface.fill_glow(sun_px[0], sun_px[1], glow_r, SUN.with_alpha(0.28 * visibility));
        surface.fill_disk(
            sun_px[0],
            sun_px[1],
            (sky.h * 0.035).max(1.5),
            SUN.with_alpha(visibility),
        );

        // Ground and mounting stand.
        surface.draw_line(sky.x, layout.ground_y, sky.x + sky.w, layout.ground_y, GROUND);
        let [base_x, base_y] = layout.panel_center;
        surface.draw_line(base_x, layout.ground_y + 1.0, base_x, base_y, STAND);

        // Sensor card extras: photodetector eyes, plus a dirt patch when the
        // air is dusty.
        if index == SENSOR {
            let eye = if frame.env.sensor_contamination > 0.5 {
                SENSOR_EYE_DIRTY
            } else {
                SENSOR_EYE
            };
            let eye_r = (layout.panel_h * 0.08).max(1.0);
            surface.fill_disk(base_x - layout.panel_w * 0.12, base_y, eye_r, eye);
            surface.fill_disk(base_x + layout.panel_w * 0.12, base_y, eye_r, eye);

            if frame.weather == WeatherMode::Dusty {
                surface.fill_rounded_rect(
                    base_x - layout.panel_w * 0.3,
                    base_y - layout.panel_h * 0.75,
                    layout.panel_w * 0.6,
                    layout.panel_h * 0.3,
                    2.0,
                    DIRT_PATCH,
                );
            }
        }

        // Panel rotated by the strategy's current angle, with a grid texture.
        let corners = panel_corners(layout, panel.pose.angle);
        surface.fill_quad(corners, PANEL_FILL);
        for k in 0..4 {
            let a = corners[k];
            let b = corners[(k + 1) % 4];
            surface.draw_line(a[0], a[1], b[0], b[1], accent);
        }
        self.draw_panel_grid(surface, layout, panel.pose.angle);

        // Sun-to-panel ray while the sun is up.
        if frame.sun.y_norm > HORIZON_Y {
            let alpha = 0.10 + 0.18 * frame.env.irradiance;
            surface.draw_line(
                sun_px[0],
                sun_px[1],
                base_x,
                base_y,
                SUN.with_alpha(alpha),
            );
        }

        // Yield bar.
        let bar = layout.bar;
        surface.fill_rounded_rect(bar.x, bar.y, bar.w, bar.h, bar.h / 2.0, BAR_TRACK);
        surface.stroke_rounded_rect(bar.x, bar.y, bar.w, bar.h, bar.h / 2.0, BAR_EDGE);
        let fill_w = bar.w * panel.yield_fraction.clamp(0.0, 1.0);
        if fill_w >= 1.0 {
            surface.fill_rounded_rect(bar.x, bar.y, fill_w, bar.h, bar.h / 2.0, accent);
        }
    }

    fn draw_clouds(&self, surface: &mut Surface, sky: &Rect, day_fraction: f64, index: usize) {
        let base_y = sky.y + sky.h * 0.16 + (day_fraction * TAU + index as f64).sin() * sky.h * 0.03;
        for c in 0..3 {
            let cx = sky.x + ((day_fraction * 0.6 + c as f64 * 0.33) % 1.0) * sky.w;
            let cy = base_y + c as f64 * sky.h * 0.1;
            let w = sky.w * 0.26;
            let h = (sky.h * 0.1).max(2.0);
            surface.fill_rounded_rect(cx - w / 2.0, cy, w, h, h / 2.0, CLOUD);
            surface.fill_rounded_rect(cx - w * 0.1, cy - h * 0.55, w * 0.6, h, h / 2.0, CLOUD);
        }
    }

    fn draw_panel_grid(&self, surface: &mut Surface, layout: &CardLayout, angle: f64) {
        let (sin_a, cos_a) = angle.sin_cos();
        let [cx, cy] = layout.panel_center;
        let half_w = layout.panel_w / 2.0;
        let half_h = layout.panel_h / 2.0;
        let inset = layout.panel_h * 0.1;

        for k in 1..6 {
            let gx = -half_w + k as f64 * layout.panel_w / 6.0;
            let top = rotate([gx, -half_h + inset], sin_a, cos_a);
            let bottom = rotate([gx, half_h - inset], sin_a, cos_a);
            surface.draw_line(
                cx + top[0],
                cy + top[1],
                cx + bottom[0],
                cy + bottom[1],
                PANEL_GRID,
            );
        }
    }
}

/// Pixel position of a sun sample within a sky rect. The arc occupies the
/// upper band of the sky with a small margin top and bottom.
fn sun_point(sky: &Rect, sun: &SunSample) -> [f64; 2] {
    [
        sky.x + sun.x_norm * sky.w,
        sky.y + (1.0 - sun.y_norm) * (sky.h * 0.78) + sky.h * 0.08,
    ]
}

fn panel_corners(layout: &CardLayout, angle: f64) -> [[f64; 2]; 4] {
    let (sin_a, cos_a) = angle.sin_cos();
    let [cx, cy] = layout.panel_center;
    let half_w = layout.panel_w / 2.0;
    let half_h = layout.panel_h / 2.0;

    [
        [-half_w, -half_h],
        [half_w, -half_h],
        [half_w, half_h],
        [-half_w, half_h],
    ]
    .map(|corner| {
        let [x, y] = rotate(corner, sin_a, cos_a);
        [cx + x, cy + y]
    })
}

fn rotate([x, y]: [f64; 2], sin_a: f64, cos_a: f64) -> [f64; 2] {
    [x * cos_a - y * sin_a, x * sin_a + y * cos_a]
}

fn lerp_color(a: Color, b: Color, t: f64) -> Color {
    let lerp = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
    Color::rgb(lerp(a.r, b.r), lerp(a.g, b.g), lerp(a.b, b.b))
}
