//! SVG equity chart: buy-and-hold against the crossover strategy.

use crate::domain::series::EquityCurve;

const WIDTH: f64 = 640.0;
const HEIGHT: f64 = 360.0;
const PADDING: f64 = 48.0;

const HOLD_COLOR: &str = "blue";
const STRATEGY_COLOR: &str = "orange";

fn polyline(curve: &EquityCurve, min: f64, scale_x: f64, scale_y: f64, color: &str) -> String {
    let points: Vec<String> = curve
        .values()
        .enumerate()
        .map(|(i, equity)| {
            let x = PADDING + i as f64 * scale_x;
            let y = HEIGHT - PADDING - (equity - min) * scale_y;
            format!("{:.1},{:.1}", x, y)
        })
        .collect();

    format!(
        r#"  <polyline fill="none" stroke="{}" stroke-width="1.5" points="{}"/>"#,
        color,
        points.join(" ")
    )
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Both curves are drawn on a shared y-axis. Returns `None` when there is
/// nothing to plot.
pub fn format_equity_chart(
    title: &str,
    strategy_label: &str,
    strategy: &EquityCurve,
    buy_and_hold: &EquityCurve,
) -> Option<String> {
    if strategy.is_empty() && buy_and_hold.is_empty() {
        return None;
    }

    let all = || strategy.values().chain(buy_and_hold.values());
    let min = all().fold(f64::INFINITY, f64::min);
    let max = all().fold(f64::NEG_INFINITY, f64::max);

    let plot_width = WIDTH - 2.0 * PADDING;
    let plot_height = HEIGHT - 2.0 * PADDING;

    let range = max - min;
    let scale_y = if range > 0.0 { plot_height / range } else { 1.0 };
    let longest = strategy.len().max(buy_and_hold.len());
    let scale_x = if longest > 1 {
        plot_width / (longest - 1) as f64
    } else {
        0.0
    };

    let mut lines = vec![
        format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{0:.0}" height="{1:.0}" viewBox="0 0 {0:.0} {1:.0}">"#,
            WIDTH, HEIGHT
        ),
        format!(r#"  <rect width="{:.0}" height="{:.0}" fill="white"/>"#, WIDTH, HEIGHT),
        format!(
            r#"  <text x="{:.0}" y="24" text-anchor="middle" font-size="16">{}</text>"#,
            WIDTH / 2.0,
            escape(title)
        ),
        format!(
            r#"  <line x1="{p:.0}" y1="{p:.0}" x2="{p:.0}" y2="{b:.0}" stroke="black"/>"#,
            p = PADDING,
            b = HEIGHT - PADDING
        ),
        format!(
            r#"  <line x1="{p:.0}" y1="{b:.0}" x2="{r:.0}" y2="{b:.0}" stroke="black"/>"#,
            p = PADDING,
            b = HEIGHT - PADDING,
            r = WIDTH - PADDING
        ),
        format!(
            r#"  <text x="14" y="{:.0}" font-size="12" transform="rotate(-90 14 {:.0})" text-anchor="middle">Growth Factor</text>"#,
            HEIGHT / 2.0,
            HEIGHT / 2.0
        ),
        format!(
            r#"  <text x="{:.0}" y="{:.0}" font-size="10" text-anchor="end">{:.2}</text>"#,
            PADDING - 4.0,
            PADDING,
            max
        ),
        format!(
            r#"  <text x="{:.0}" y="{:.0}" font-size="10" text-anchor="end">{:.2}</text>"#,
            PADDING - 4.0,
            HEIGHT - PADDING,
            min
        ),
    ];

    if !buy_and_hold.is_empty() {
        lines.push(polyline(buy_and_hold, min, scale_x, scale_y, HOLD_COLOR));
    }
    if !strategy.is_empty() {
        lines.push(polyline(strategy, min, scale_x, scale_y, STRATEGY_COLOR));
    }

    let legend_x = PADDING + 12.0;
    for (row, (label, color)) in [("Buy & Hold", HOLD_COLOR), (strategy_label, STRATEGY_COLOR)]
        .iter()
        .enumerate()
    {
        let y = PADDING + 14.0 + row as f64 * 16.0;
        lines.push(format!(
            r#"  <line x1="{:.0}" y1="{:.0}" x2="{:.0}" y2="{:.0}" stroke="{}" stroke-width="2"/>"#,
            legend_x,
            y - 4.0,
            legend_x + 18.0,
            y - 4.0,
            color
        ));
        lines.push(format!(
            r#"  <text x="{:.0}" y="{:.0}" font-size="11">{}</text>"#,
            legend_x + 24.0,
            y,
            escape(label)
        ));
    }

    lines.push("</svg>".to_string());
    Some(lines.join("\n") + "\n")
}
