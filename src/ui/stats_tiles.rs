//! Stats tiles: live count, totals, today, average persons.
//!
//! When a stats snapshot from the push channel is present its values are
//! used verbatim; otherwise the same metrics are derived locally from the
//! detection list. Both paths share `compute_tiles` so they cannot drift.

use chrono::NaiveDate;

use crate::models::{DetectionRecord, StatsSnapshot};

/// Rendered tile values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileValues {
    pub live: String,
    pub total: String,
    pub today: String,
    pub avg: String,
}

/// Tile values from the snapshot (verbatim) or derived from the list.
///
/// Derivation: "today" counts records whose timestamp falls on `today`
/// in local time; the average is the arithmetic mean of person counts,
/// one decimal; the live value is the current frame's person count.
pub fn compute_tiles(
    stats: Option<&StatsSnapshot>,
    detections: &[DetectionRecord],
    live_person_count: u32,
    today: NaiveDate,
) -> TileValues {
    if let Some(stats) = stats {
        return TileValues {
            live: stats.live_count.to_string(),
            total: stats.total_detections.to_string(),
            today: stats.today_detections.to_string(),
            avg: format!("{:.1}", stats.avg_persons),
        };
    }

    let total = detections.len();
    let today_count = detections
        .iter()
        .filter(|d| d.local_date() == Some(today))
        .count();
    let avg = if total > 0 {
        let persons: u32 = detections.iter().map(|d| d.person_count).sum();
        format!("{:.1}", persons as f32 / total as f32)
    } else {
        "0".to_string()
    };

    TileValues {
        live: live_person_count.to_string(),
        total: total.to_string(),
        today: today_count.to_string(),
        avg,
    }
}

/// Render the four tiles in one row
pub fn show(ui: &mut egui::Ui, values: &TileValues) {
    ui.columns(4, |columns| {
        tile(&mut columns[0], "Live Count", &values.live);
        tile(&mut columns[1], "Total Detections", &values.total);
        tile(&mut columns[2], "Today", &values.today);
        tile(&mut columns[3], "Avg. Persons", &values.avg);
    });
}

fn tile(ui: &mut egui::Ui, label: &str, value: &str) {
    egui::Frame::group(ui.style()).show(ui, |ui| {
        ui.set_width(ui.available_width());
        ui.vertical(|ui| {
            ui.label(
                egui::RichText::new(value)
                    .size(24.0)
                    .strong(),
            );
            ui.label(egui::RichText::new(label).weak());
        });
    });
}
