//! Fixed schema of named screen regions. Every region has a constant
//! position and size, so nothing a string contains can move another region.

use embedded_graphics::{
    prelude::{Point, Size},
    primitives::Rectangle,
};

pub const ROW_COUNT: usize = 3;
pub const GAUGE_COUNT: usize = 2;

/// Characters that fit in a metric row at 6 px per glyph.
pub const ROW_CHARS: usize = 11;
/// Characters that fit in the aside slot right of the last row.
pub const ASIDE_CHARS: usize = 10;
/// Characters that fit in the header strip.
pub const HEADER_CHARS: usize = 21;
/// Characters that fit in the footer, left of the indicator.
pub const FOOTER_CHARS: usize = 18;

pub const HEADER: Rectangle = rect(0, 0, 128, 12);

/// Metric rows, top to bottom.
pub const ROWS: [Rectangle; ROW_COUNT] = [
    rect(0, 13, 68, 12),
    rect(0, 25, 68, 12),
    rect(0, 37, 68, 12),
];

/// Secondary text slot to the right of the last metric row.
pub const ASIDE: Rectangle = rect(68, 37, 60, 12);

/// Gauge outlines, aligned with the first two rows.
pub const GAUGES: [Rectangle; GAUGE_COUNT] = [rect(70, 15, 50, 7), rect(70, 27, 50, 7)];

/// Rule between the metric rows and the footer.
pub const FOOTER_RULE_Y: i32 = 50;

pub const FOOTER: Rectangle = rect(0, 52, 112, 12);

/// Status indicator cell in the bottom-right corner.
pub const INDICATOR: Rectangle = rect(117, 53, 9, 9);

const fn rect(x: i32, y: i32, w: u32, h: u32) -> Rectangle {
    Rectangle::new(Point::new(x, y), Size::new(w, h))
}

/// Inner fill area of a gauge for `percent`, clamped to [0, 100].
pub fn gauge_fill(gauge: &Rectangle, percent: f32) -> Rectangle {
    let clamped = if percent.is_finite() {
        percent.clamp(0.0, 100.0)
    } else {
        0.0
    };
    let inner_w = gauge.size.width.saturating_sub(2);
    let inner_h = gauge.size.height.saturating_sub(2);
    let filled = ((inner_w as f32) * clamped / 100.0).round() as u32;
    Rectangle::new(
        gauge.top_left + Point::new(1, 1),
        Size::new(filled.min(inner_w), inner_h),
    )
}
