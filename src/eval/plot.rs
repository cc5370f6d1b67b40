//! SVG rendering for metric curves
//!
//! Training runs log their ROC and precision-recall curves as standalone
//! SVG images alongside the raw point sets. The renderer assumes both axes
//! span the unit interval.

use std::fmt::Write;

const SIZE: f64 = 480.0;
const MARGIN: f64 = 48.0;

/// Render unit-square curve points as a self-contained SVG document
#[must_use]
pub fn curve_svg(points: &[(f64, f64)], title: &str, x_label: &str, y_label: &str) -> String {
    let span = SIZE - 2.0 * MARGIN;
    let to_px = |(x, y): (f64, f64)| {
        (
            MARGIN + x.clamp(0.0, 1.0) * span,
            SIZE - MARGIN - y.clamp(0.0, 1.0) * span,
        )
    };

    let polyline: String = points
        .iter()
        .map(|&p| {
            let (px, py) = to_px(p);
            format!("{px:.1},{py:.1}")
        })
        .collect::<Vec<_>>()
        .join(" ");

    let mut svg = String::new();
    let _ = write!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{SIZE}" height="{SIZE}" viewBox="0 0 {SIZE} {SIZE}">"#
    );
    let _ = write!(svg, r#"<rect width="{SIZE}" height="{SIZE}" fill="white"/>"#);

    // axes
    let x0 = MARGIN;
    let y0 = SIZE - MARGIN;
    let x1 = SIZE - MARGIN;
    let y1 = MARGIN;
    let _ = write!(
        svg,
        r#"<line x1="{x0}" y1="{y0}" x2="{x1}" y2="{y0}" stroke="black"/>"#
    );
    let _ = write!(
        svg,
        r#"<line x1="{x0}" y1="{y0}" x2="{x0}" y2="{y1}" stroke="black"/>"#
    );

    // diagonal reference
    let _ = write!(
        svg,
        r##"<line x1="{x0}" y1="{y0}" x2="{x1}" y2="{y1}" stroke="#cccccc" stroke-dasharray="4 4"/>"##
    );

    let _ = write!(
        svg,
        r##"<polyline points="{polyline}" fill="none" stroke="#1f77b4" stroke-width="2"/>"##
    );

    let mid = SIZE / 2.0;
    let _ = write!(
        svg,
        r#"<text x="{mid}" y="24" text-anchor="middle" font-family="sans-serif" font-size="16">{title}</text>"#
    );
    let _ = write!(
        svg,
        r#"<text x="{mid}" y="{}" text-anchor="middle" font-family="sans-serif" font-size="12">{x_label}</text>"#,
        SIZE - 12.0
    );
    let _ = write!(
        svg,
        r#"<text x="14" y="{mid}" text-anchor="middle" font-family="sans-serif" font-size="12" transform="rotate(-90 14 {mid})">{y_label}</text>"#
    );
    svg.push_str("</svg>");
    svg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_a_wellformed_document() {
        let svg = curve_svg(
            &[(0.0, 0.0), (0.2, 0.7), (1.0, 1.0)],
            "ROC Curve",
            "False positive rate",
            "True positive rate",
        );
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains("ROC Curve"));
        assert!(svg.contains("polyline"));
    }

    #[test]
    fn out_of_range_points_are_clamped() {
        let svg = curve_svg(&[(-1.0, 2.0)], "t", "x", "y");
        // clamped to the plot corner, inside the viewbox
        assert!(svg.contains(&format!("{MARGIN:.1},{MARGIN:.1}")));
    }
}
