//! Plain-text output for the command line.

use itertools::Itertools;
use luma::extract::LevelExtraction;
use luma::registry::{Drift, Registry};
use luma::tone_curve::ToneCurve;

const BAR_WIDTH: usize = 40;

pub fn levels(registry: &Registry) -> String {
    let mut lines = vec![format!("registry {}", registry.version())];
    for family in registry.families() {
        lines.push(format!(
            "{} ({} fields: {})",
            family.name(),
            family.expected_count(),
            family.fields().iter().join(" ")
        ));
        for level in family.levels() {
            lines.push(format!("  {}: {}", level.name(), level.defaults().iter().join(", ")));
        }
    }
    lines.join("\n")
}

pub fn drift(issues: &[(String, Drift)]) -> String {
    if issues.is_empty() {
        return "no issues".to_string();
    }
    issues
        .iter()
        .map(|(family, drift)| format!("{}: {}", family, drift))
        .join("\n")
}

pub fn extraction(extraction: &LevelExtraction, precision: u32) -> String {
    let mut lines = vec![extraction.level.clone()];
    for field in &extraction.fields {
        lines.push(format!("  {:<4} {:.*}", field.name, precision as usize, field.value));
    }
    for err in &extraction.errors {
        lines.push(format!("  ! {}", err));
    }
    lines.join("\n")
}

pub fn curve(curve: &ToneCurve) -> String {
    curve
        .points()
        .iter()
        .enumerate()
        .map(|(idx, point)| {
            let bar = "#".repeat((point * BAR_WIDTH as f32).round() as usize);
            format!("P{:<3}{:.4} {}", idx, point, bar)
        })
        .join("\n")
}
