//! SVG rendering of a single telemetry overlay frame.
//!
//! The frame is a fixed 400x300 panel holding a speed dial with a compass needle, a small g-force
//! dial, an elevation readout, a numeric speed box and a timestamp label. Geometry is computed with
//! `kurbo` in SVG user space (y down, angles clockwise from +x).

use std::fmt::Write as _;

use kurbo::{Arc, Point, Shape as _, Vec2};

use crate::{foundation::time::Instant, telemetry::model::TrackMetrics};

pub const FRAME_WIDTH: u32 = 400;
pub const FRAME_HEIGHT: u32 = 300;

const DIAL_CENTER: Point = Point::new(140.0, 150.0);
const DIAL_RADIUS: f64 = 95.0;
const DIAL_START_DEG: f64 = 135.0;
const DIAL_SWEEP_DEG: f64 = 270.0;
const SPEED_STEP_KMH: f64 = 10.0;

const G_CENTER: Point = Point::new(325.0, 70.0);
const G_RADIUS: f64 = 30.0;
/// Full-scale deflection of the g-force needle.
pub const G_FULL_SCALE: f64 = 2.0;

const ELEVATION_ORIGIN: Point = Point::new(325.0, 160.0);
const SPEED_BOX_ORIGIN: Point = Point::new(325.0, 245.0);

/// Everything needed to draw one frame.
#[derive(Clone, Copy, Debug)]
pub struct GaugeInput {
    pub metrics: TrackMetrics,
    pub time: Instant,
    /// Full-scale value of the speed dial (km/h), shared by every frame of a sequence.
    pub speed_scale_kmh: f64,
}

/// Smallest multiple of 10 km/h at or above `max_speed_kmh`, never below 10.
pub fn speed_scale(max_speed_kmh: f64) -> f64 {
    if !max_speed_kmh.is_finite() || max_speed_kmh <= 0.0 {
        return SPEED_STEP_KMH;
    }
    ((max_speed_kmh / SPEED_STEP_KMH).ceil() * SPEED_STEP_KMH).max(SPEED_STEP_KMH)
}

fn polar(center: Point, radius: f64, deg: f64) -> Point {
    center + Vec2::from_angle(deg.to_radians()) * radius
}

fn dial_angle(speed_kmh: f64, scale_kmh: f64) -> f64 {
    let frac = (speed_kmh / scale_kmh).clamp(0.0, 1.0);
    DIAL_START_DEG + frac * DIAL_SWEEP_DEG
}

pub fn render_svg(input: &GaugeInput) -> String {
    let m = &input.metrics;
    let mut svg = String::with_capacity(6 * 1024);

    let _ = write!(
        svg,
        r##"<?xml version="1.0" encoding="UTF-8"?>
<svg width="{FRAME_WIDTH}" height="{FRAME_HEIGHT}" viewBox="0 0 {FRAME_WIDTH} {FRAME_HEIGHT}" xmlns="http://www.w3.org/2000/svg">
<defs>
<radialGradient id="panel" cx="50%" cy="50%" r="60%">
<stop offset="0%" stop-color="#000000" stop-opacity="0.55"/>
<stop offset="100%" stop-color="#000000" stop-opacity="0.85"/>
</radialGradient>
<linearGradient id="speed" x1="0%" y1="0%" x2="100%" y2="0%">
<stop offset="0%" stop-color="#00ffff"/>
<stop offset="50%" stop-color="#0080ff"/>
<stop offset="100%" stop-color="#ff00ff"/>
</linearGradient>
</defs>
<rect width="{FRAME_WIDTH}" height="{FRAME_HEIGHT}" rx="20" fill="url(#panel)" opacity="0.8"/>
"##
    );

    speed_dial(&mut svg, m.speed_kmh, input.speed_scale_kmh);
    compass(&mut svg, m.bearing_deg);
    g_dial(&mut svg, m.g_force);
    elevation(&mut svg, m.total_elevation_gain_m, m.elevation_gain_m);
    speed_box(&mut svg, m.speed_kmh);

    let _ = write!(
        svg,
        r##"<text x="12" y="290" font-family="sans-serif" font-size="10" fill="#ffffff" fill-opacity="0.6">{}</text>
</svg>
"##,
        input.time.format("%H:%M:%S")
    );
    svg
}

fn speed_dial(svg: &mut String, speed_kmh: f64, scale_kmh: f64) {
    let c = DIAL_CENTER;
    let _ = writeln!(
        svg,
        r##"<circle cx="{:.1}" cy="{:.1}" r="{DIAL_RADIUS}" fill="none" stroke="#ffffff" stroke-opacity="0.3" stroke-width="2"/>"##,
        c.x, c.y
    );

    let steps = (scale_kmh / SPEED_STEP_KMH).round() as u32;
    for step in 0..=steps {
        let value = f64::from(step) * SPEED_STEP_KMH;
        let deg = dial_angle(value, scale_kmh);
        let inner = polar(c, DIAL_RADIUS - 10.0, deg);
        let outer = polar(c, DIAL_RADIUS, deg);
        let label = polar(c, DIAL_RADIUS - 24.0, deg);
        let _ = writeln!(
            svg,
            r##"<line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="#ffffff" stroke-width="2" stroke-opacity="0.8"/>"##,
            inner.x, inner.y, outer.x, outer.y
        );
        let _ = writeln!(
            svg,
            r##"<text x="{:.1}" y="{:.1}" text-anchor="middle" dominant-baseline="middle" font-family="sans-serif" font-size="10" fill="#ffffff" fill-opacity="0.7">{value:.0}</text>"##,
            label.x, label.y
        );
    }

    if speed_kmh > 0.0 {
        let sweep = dial_angle(speed_kmh, scale_kmh) - DIAL_START_DEG;
        let arc = Arc {
            center: c,
            radii: Vec2::new(DIAL_RADIUS, DIAL_RADIUS),
            start_angle: DIAL_START_DEG.to_radians(),
            sweep_angle: sweep.to_radians(),
            x_rotation: 0.0,
        };
        let _ = writeln!(
            svg,
            r##"<path d="{}" fill="none" stroke="url(#speed)" stroke-width="6" stroke-linecap="round" opacity="0.9"/>"##,
            arc.to_path(0.1).to_svg()
        );
    }
}

fn compass(svg: &mut String, bearing_deg: f64) {
    let c = DIAL_CENTER;
    // Bearing 0 is north, i.e. straight up in SVG space.
    let deg = bearing_deg - 90.0;
    let tip = polar(c, 55.0, deg);
    let tail = polar(c, 15.0, deg + 180.0);
    for (color, width) in [("#ff4444", 5), ("#ffffff", 2)] {
        let _ = writeln!(
            svg,
            r##"<line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="{color}" stroke-width="{width}" stroke-linecap="round"/>"##,
            tail.x, tail.y, tip.x, tip.y
        );
    }
    let _ = writeln!(
        svg,
        r##"<circle cx="{:.1}" cy="{:.1}" r="7" fill="#ff4444"/><circle cx="{:.1}" cy="{:.1}" r="3" fill="#ffffff"/>"##,
        c.x, c.y, c.x, c.y
    );

    for (label, deg) in [("N", -90.0), ("E", 0.0), ("S", 90.0), ("W", 180.0)] {
        let p = polar(c, DIAL_RADIUS + 14.0, deg);
        let _ = writeln!(
            svg,
            r##"<text x="{:.1}" y="{:.1}" text-anchor="middle" dominant-baseline="middle" font-family="sans-serif" font-size="12" font-weight="bold" fill="#ffffff">{label}</text>"##,
            p.x, p.y
        );
    }
}

fn g_dial(svg: &mut String, g_force: f64) {
    let c = G_CENTER;
    let frac = (g_force / G_FULL_SCALE).clamp(0.0, 1.0);
    let tip = polar(c, G_RADIUS - 8.0, -90.0 + frac * 180.0);
    let _ = write!(
        svg,
        r##"<circle cx="{cx:.1}" cy="{cy:.1}" r="{G_RADIUS}" fill="#000000" fill-opacity="0.7" stroke="#ffffff" stroke-opacity="0.5"/>
<line x1="{cx:.1}" y1="{cy:.1}" x2="{tx:.1}" y2="{ty:.1}" stroke="#ffaa00" stroke-width="2" stroke-linecap="round"/>
<text x="{cx:.1}" y="{label_y:.1}" text-anchor="middle" font-family="sans-serif" font-size="9" fill="#ffffff" fill-opacity="0.8">G-Force</text>
<text x="{cx:.1}" y="{value_y:.1}" text-anchor="middle" font-family="sans-serif" font-size="11" font-weight="bold" fill="#ffaa00">{g_force:.2}</text>
"##,
        cx = c.x,
        cy = c.y,
        tx = tip.x,
        ty = tip.y,
        label_y = c.y - G_RADIUS - 6.0,
        value_y = c.y + 16.0,
    );
}

fn elevation(svg: &mut String, total_gain_m: f64, step_gain_m: f64) {
    let o = ELEVATION_ORIGIN;
    let _ = write!(
        svg,
        r##"<circle cx="{x:.1}" cy="{y:.1}" r="{G_RADIUS}" fill="#000000" fill-opacity="0.7" stroke="#ffffff" stroke-opacity="0.5"/>
<text x="{x:.1}" y="{label_y:.1}" text-anchor="middle" font-family="sans-serif" font-size="9" fill="#ffffff" fill-opacity="0.8">Elevation</text>
<text x="{x:.1}" y="{y:.1}" text-anchor="middle" font-family="sans-serif" font-size="11" font-weight="bold" fill="#00ff00">{total_gain_m:.0}m</text>
<text x="{x:.1}" y="{step_y:.1}" text-anchor="middle" font-family="sans-serif" font-size="8" fill="#00ff00" fill-opacity="0.7">+{step_gain_m:.1}</text>
"##,
        x = o.x,
        y = o.y,
        label_y = o.y - G_RADIUS - 6.0,
        step_y = o.y + 13.0,
    );
}

fn speed_box(svg: &mut String, speed_kmh: f64) {
    let o = SPEED_BOX_ORIGIN;
    let _ = write!(
        svg,
        r##"<rect x="{rx:.1}" y="{ry:.1}" width="70" height="30" rx="5" fill="#000000" fill-opacity="0.8" stroke="#00ffff"/>
<text x="{x:.1}" y="{value_y:.1}" text-anchor="middle" font-family="sans-serif" font-size="16" font-weight="bold" fill="#00ffff">{speed_kmh:.1}</text>
<text x="{x:.1}" y="{unit_y:.1}" text-anchor="middle" font-family="sans-serif" font-size="10" fill="#ffffff" fill-opacity="0.8">km/h</text>
"##,
        rx = o.x - 35.0,
        ry = o.y - 15.0,
        x = o.x,
        value_y = o.y + 6.0,
        unit_y = o.y - 20.0,
    );
}

#[cfg(test)]
#[path = "../../tests/unit/overlay/gauge.rs"]
mod tests;
