use crate::models::{ChargingCircuit, LoadProfile, ModelResult, STEPS_PER_DAY};
use crate::pipeline::traits::LoadPlotter;
use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

const COLORS: [&str; 6] = ["#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b"];

/// Line chart of each charging circuit over the first `days` days, written as SVG.
#[derive(Clone, Debug)]
pub struct SvgLoadPlotter {
    pub days: usize,
    pub width: f64,
    pub height: f64,
}

impl Default for SvgLoadPlotter {
    fn default() -> Self {
        Self {
            days: 7,
            width: 960.0,
            height: 420.0,
        }
    }
}

impl SvgLoadPlotter {
    const MARGIN: f64 = 48.0;

    pub fn render(&self, profile: &LoadProfile, title: &str) -> String {
        let n = profile.len().min(self.days * STEPS_PER_DAY);
        let peak = ChargingCircuit::ALL
            .iter()
            .flat_map(|c| profile.column(*c)[..n].iter().copied())
            .fold(0.0_f64, f64::max);
        let y_max = if peak > 0.0 { peak } else { 1.0 };
        let plot_w = self.width - 2.0 * Self::MARGIN;
        let plot_h = self.height - 2.0 * Self::MARGIN;
        let x = |i: usize| Self::MARGIN + plot_w * i as f64 / (n.max(2) - 1) as f64;
        let y = |v: f64| Self::MARGIN + plot_h * (1.0 - v / y_max);

        let mut svg = String::new();
        let _ = writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            w = self.width,
            h = self.height
        );
        let _ = writeln!(svg, r#"<rect width="100%" height="100%" fill="white"/>"#);
        let _ = writeln!(
            svg,
            r#"<text x="{}" y="24" font-family="sans-serif" font-size="16">{}</text>"#,
            Self::MARGIN,
            escape(title)
        );
        let _ = writeln!(
            svg,
            r#"<text x="4" y="{}" font-family="sans-serif" font-size="11">{:.0} kW</text>"#,
            Self::MARGIN,
            y_max
        );
        let _ = writeln!(
            svg,
            r#"<path d="M{m} {m} V{b} H{r}" stroke="black" fill="none"/>"#,
            m = Self::MARGIN,
            b = self.height - Self::MARGIN,
            r = self.width - Self::MARGIN
        );

        for (k, circuit) in ChargingCircuit::ALL.iter().enumerate() {
            let points = profile.column(*circuit)[..n]
                .iter()
                .enumerate()
                .map(|(i, v)| format!("{:.1},{:.1}", x(i), y(*v)))
                .collect::<Vec<_>>()
                .join(" ");
            let _ = writeln!(
                svg,
                r#"<polyline fill="none" stroke="{}" stroke-width="1.2" points="{}"/>"#,
                COLORS[k], points
            );
            let _ = writeln!(
                svg,
                r#"<text x="{}" y="{}" font-family="sans-serif" font-size="11" fill="{}">{}</text>"#,
                self.width - Self::MARGIN - 70.0,
                Self::MARGIN + 14.0 * k as f64,
                COLORS[k],
                circuit.column()
            );
        }
        svg.push_str("</svg>\n");
        svg
    }
}

fn escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

impl LoadPlotter for SvgLoadPlotter {
    fn plot(&self, result: &ModelResult, scenario: usize, path: &Path) -> Result<()> {
        let profile = result
            .get(scenario)
            .with_context(|| format!("result has no scenario {scenario}"))?;
        let title = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("charging load");
        fs::write(path, self.render(profile, title))
            .with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }

    fn extension(&self) -> &'static str {
        "svg"
    }
}
