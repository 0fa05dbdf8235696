use std::time::Duration;

use embedded_graphics::{
    mono_font::{ascii::FONT_6X10, MonoTextStyle},
    pixelcolor::BinaryColor,
    prelude::*,
    primitives::{Circle, Line, PrimitiveStyle, Rectangle},
    text::{Baseline, Text},
};

use super::{
    frame::{Frame, WIDTH},
    layout::{self, gauge_fill},
};
use crate::{
    config::HeaderMode,
    pages::Page,
    state::{BlinkState, HealthStatus, MetricsSnapshot},
};

const PLACEHOLDER: &str = "--.-";

/// Turns the latest state into a frame. Never fails: missing values render
/// as placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Composer {
    header: HeaderMode,
}

impl Composer {
    pub fn new(header: HeaderMode) -> Self {
        Self { header }
    }

    pub fn compose(
        &self,
        metrics: Option<&MetricsSnapshot>,
        health: &HealthStatus,
        blink: &BlinkState,
        page: Page,
    ) -> Frame {
        let mut frame = Frame::new();
        let content = PageContent::build(&self.header, metrics, health, page);

        draw_text(&mut frame, &layout::HEADER, &content.header);
        for (region, text) in layout::ROWS.iter().zip(content.rows.iter()) {
            draw_text(&mut frame, region, text);
        }
        draw_text(&mut frame, &layout::ASIDE, &content.aside);
        for (region, percent) in layout::GAUGES.iter().zip(content.gauges.iter()) {
            if let Some(percent) = percent {
                draw_gauge(&mut frame, region, *percent);
            }
        }
        Line::new(
            Point::new(0, layout::FOOTER_RULE_Y),
            Point::new(WIDTH as i32 - 1, layout::FOOTER_RULE_Y),
        )
        .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 1))
        .draw(&mut frame)
        .ok();
        draw_text(&mut frame, &layout::FOOTER, &content.footer);
        draw_indicator(&mut frame, blink.on);
        frame
    }
}

/// Text and gauge values for one page, already fixed-width formatted.
#[derive(Debug, Clone, PartialEq)]
struct PageContent {
    header: String,
    rows: [String; layout::ROW_COUNT],
    aside: String,
    gauges: [Option<f32>; layout::GAUGE_COUNT],
    footer: String,
}

impl PageContent {
    fn build(
        header: &HeaderMode,
        metrics: Option<&MetricsSnapshot>,
        health: &HealthStatus,
        page: Page,
    ) -> Self {
        let header = match (header, metrics) {
            (HeaderMode::Label(label), _) => label.clone(),
            (HeaderMode::Ip, Some(m)) => format!("IP: {}", m.host_ip),
            (HeaderMode::Ip, None) => "IP: --".to_string(),
        };
        match page {
            Page::Overview => Self {
                header,
                rows: [
                    format!("CPU:{}%", fixed(metrics.map(|m| m.cpu_percent), 6, 1)),
                    format!("RAM:{}%", fixed(metrics.map(|m| m.ram_percent), 6, 1)),
                    format!("TMP:{}C", fixed(metrics.map(|m| m.temp_celsius), 6, 1)),
                ],
                aside: health
                    .version
                    .as_deref()
                    .map(|v| format!("v{v}"))
                    .unwrap_or_default(),
                gauges: [
                    Some(metrics.map_or(0.0, |m| m.cpu_percent)),
                    Some(metrics.map_or(0.0, |m| m.ram_percent)),
                ],
                footer: format!("HA: {}", health.state),
            },
            Page::Host => Self {
                header,
                rows: [
                    format!("DSK:{}%", fixed(metrics.map(|m| m.disk_percent), 6, 1)),
                    format!("FRE:{}G", fixed(metrics.map(|m| m.disk_free_gb), 6, 1)),
                    format!("RX: {}", megabytes(metrics.map(|m| m.net_in_mb), 7)),
                ],
                aside: format!("TX:{}", megabytes(metrics.map(|m| m.net_out_mb), 7)),
                gauges: [Some(metrics.map_or(0.0, |m| m.disk_percent)), None],
                footer: format!(
                    "UP: {}",
                    metrics.map_or_else(|| "--".to_string(), |m| format_uptime(m.uptime))
                ),
            },
        }
    }
}

fn text_style() -> MonoTextStyle<'static, BinaryColor> {
    MonoTextStyle::new(&FONT_6X10, BinaryColor::On)
}

/// Draw `text` at the region's origin, clipped to the region.
fn draw_text(frame: &mut Frame, region: &Rectangle, text: &str) {
    if text.is_empty() {
        return;
    }
    let mut target = frame.clipped(region);
    Text::with_baseline(
        text,
        region.top_left + Point::new(0, 1),
        text_style(),
        Baseline::Top,
    )
    .draw(&mut target)
    .ok();
}

fn draw_gauge(frame: &mut Frame, gauge: &Rectangle, percent: f32) {
    gauge
        .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 1))
        .draw(frame)
        .ok();
    gauge_fill(gauge, percent)
        .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
        .draw(frame)
        .ok();
}

/// Filled circle when on, outline only when off.
fn draw_indicator(frame: &mut Frame, on: bool) {
    let cell = layout::INDICATOR;
    let style = if on {
        PrimitiveStyle::with_fill(BinaryColor::On)
    } else {
        PrimitiveStyle::with_stroke(BinaryColor::On, 1)
    };
    Circle::new(cell.top_left, cell.size.width)
        .into_styled(style)
        .draw(frame)
        .ok();
}

/// Right-aligned, fixed-width decimal. Out-of-range values saturate so the
/// string never grows past `width`; missing or non-finite values become the
/// placeholder.
pub fn fixed(value: Option<f32>, width: usize, precision: usize) -> String {
    let value = match value {
        Some(v) if v.is_finite() => v,
        _ => return format!("{PLACEHOLDER:>width$}"),
    };
    let int_digits = width.saturating_sub(precision + usize::from(precision > 0)).max(1);
    let step = 10f32.powi(-(precision as i32));
    let max = 10f32.powi(int_digits as i32) - step;
    let min = -(10f32.powi(int_digits.saturating_sub(1) as i32) - step);
    let clamped = value.clamp(min, max);
    format!("{clamped:>width$.precision$}")
}

const MB_PER_GB: f64 = 1024.0;

/// Cumulative traffic as `<value>M`, switching to `<value>G` once the
/// megabyte figure no longer fits; always `width` characters.
pub fn megabytes(mb: Option<f64>, width: usize) -> String {
    let Some(mb) = mb.filter(|v| v.is_finite()) else {
        return format!("{}M", fixed(None, width - 1, 1));
    };
    let inner = width - 1;
    let limit = 10f64.powi(inner as i32 - 2);
    if mb < limit {
        format!("{}M", fixed(Some(mb as f32), inner, 1))
    } else {
        format!("{}G", fixed(Some((mb / MB_PER_GB) as f32), inner, 1))
    }
}

/// `3d 04h 05m`, or `04h 05m` below one day.
pub fn format_uptime(uptime: Duration) -> String {
    let secs = uptime.as_secs();
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3_600;
    let minutes = (secs % 3_600) / 60;
    if days > 0 {
        format!("{days}d {hours:02}h {minutes:02}m")
    } else {
        format!("{hours:02}h {minutes:02}m")
    }
}
