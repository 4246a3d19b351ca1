//! Detection history grid: cards, selection, deletes, image modal.
//!
//! One card per record, in list order. The widget owns only presentation
//! state (selection, open modal); deletions are emitted as actions and
//! applied by the root composition through the history service.

use std::collections::BTreeSet;

use crate::image_store::{ImageDisplay, ImageStore};
use crate::models::{self, DetectionRecord};
use crate::ui::stream_view::person_badge;

const CARD_WIDTH: f32 = 280.0;
const THUMB_HEIGHT: f32 = 150.0;

/// Actions emitted by the grid for the root composition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridAction {
    Refresh,
    /// Delete these records (one backend call per id)
    Delete(Vec<i64>),
}

/// Full-size image modal with its own error presentation
struct ModalView {
    id: i64,
    path: String,
}

/// History grid widget state
#[derive(Default)]
pub struct HistoryGrid {
    selected: BTreeSet<i64>,
    modal: Option<ModalView>,
}

impl HistoryGrid {
    /// Render the grid; returns the actions the user requested this frame
    pub fn show(
        &mut self,
        ui: &mut egui::Ui,
        records: &[DetectionRecord],
        loading: bool,
        error: Option<&str>,
        images: &mut ImageStore,
    ) -> Vec<GridAction> {
        let mut actions = Vec::new();

        ui.horizontal(|ui| {
            ui.heading("Detection History");
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui
                    .add_enabled(!loading, egui::Button::new("Refresh"))
                    .clicked()
                {
                    actions.push(GridAction::Refresh);
                }
                if !self.selected.is_empty() {
                    let label = format!("Delete selected ({})", self.selected.len());
                    if ui.button(label).clicked() {
                        actions.push(GridAction::Delete(self.take_selection()));
                    }
                }
                if loading {
                    ui.spinner();
                }
            });
        });

        if let Some(error) = error {
            ui.colored_label(egui::Color32::from_rgb(248, 113, 113), error);
        }

        if records.is_empty() {
            if !loading {
                ui.allocate_ui(egui::vec2(ui.available_width(), 120.0), |ui| {
                    ui.centered_and_justified(|ui| {
                        ui.vertical_centered(|ui| {
                            ui.label("No detections yet");
                            ui.weak("Start the camera to see detection history");
                        });
                    });
                });
            }
            return actions;
        }

        ui.horizontal_wrapped(|ui| {
            for record in records {
                ui.allocate_ui(egui::vec2(CARD_WIDTH, THUMB_HEIGHT + 80.0), |ui| {
                    if let Some(action) = self.card(ui, record, images) {
                        actions.push(action);
                    }
                });
            }
        });

        actions
    }

    fn card(
        &mut self,
        ui: &mut egui::Ui,
        record: &DetectionRecord,
        images: &mut ImageStore,
    ) -> Option<GridAction> {
        let mut action = None;
        egui::Frame::group(ui.style()).show(ui, |ui| {
            ui.set_width(CARD_WIDTH - 16.0);

            ui.horizontal(|ui| {
                let mut checked = self.selected.contains(&record.id);
                if ui.checkbox(&mut checked, "").changed() {
                    self.set_selected(record.id, checked);
                }
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.small_button("🗑").clicked() {
                        self.selected.remove(&record.id);
                        action = Some(GridAction::Delete(vec![record.id]));
                    }
                });
            });

            match images.get(ui.ctx(), &record.image_path) {
                ImageDisplay::Ready(texture) => {
                    let thumb = egui::Image::new(&texture)
                        .max_size(egui::vec2(CARD_WIDTH - 24.0, THUMB_HEIGHT))
                        .maintain_aspect_ratio(true)
                        .sense(egui::Sense::click());
                    if ui.add(thumb).clicked() {
                        self.modal = Some(ModalView {
                            id: record.id,
                            path: record.image_path.clone(),
                        });
                    }
                }
                ImageDisplay::Failed(placeholder) => {
                    ui.add(
                        egui::Image::new(&placeholder)
                            .max_size(egui::vec2(CARD_WIDTH - 24.0, THUMB_HEIGHT)),
                    );
                }
                ImageDisplay::Loading => {
                    ui.allocate_ui(egui::vec2(CARD_WIDTH - 24.0, THUMB_HEIGHT), |ui| {
                        ui.centered_and_justified(|ui| ui.spinner());
                    });
                }
            }

            ui.horizontal(|ui| {
                ui.colored_label(
                    egui::Color32::from_rgb(74, 222, 128),
                    person_badge(record.person_count),
                );
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.weak(confidence_label(record.confidence));
                });
            });
            ui.weak(card_date_label(&record.timestamp));
        });
        action
    }

    /// Full-size image modal; drawn over the panels
    pub fn show_modal(&mut self, ctx: &egui::Context, images: &mut ImageStore) {
        let Some(modal) = &self.modal else { return };
        let path = modal.path.clone();
        let mut open = true;
        egui::Window::new("Detection Image")
            .collapsible(false)
            .resizable(true)
            .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
            .open(&mut open)
            .show(ctx, |ui| match images.get(ctx, &path) {
                ImageDisplay::Ready(texture) => {
                    ui.add(
                        egui::Image::new(&texture)
                            .max_size(egui::vec2(900.0, 620.0))
                            .maintain_aspect_ratio(true),
                    );
                }
                ImageDisplay::Loading => {
                    ui.spinner();
                }
                ImageDisplay::Failed(placeholder) => {
                    ui.colored_label(
                        egui::Color32::from_rgb(248, 113, 113),
                        "Could not load the image. It may be missing on the server.",
                    );
                    ui.add(egui::Image::new(&placeholder));
                }
            });
        if !open {
            self.modal = None;
        }
    }

    /// Keep selection (and the modal) a subset of the loaded records
    pub fn retain_loaded(&mut self, records: &[DetectionRecord]) {
        self.selected
            .retain(|id| records.iter().any(|r| r.id == *id));
        if let Some(modal) = &self.modal {
            if !records.iter().any(|r| r.id == modal.id) {
                self.modal = None;
            }
        }
    }

    pub fn set_selected(&mut self, id: i64, selected: bool) {
        if selected {
            self.selected.insert(id);
        } else {
            self.selected.remove(&id);
        }
    }

    pub fn selected_ids(&self) -> Vec<i64> {
        self.selected.iter().copied().collect()
    }

    /// Drain the selection for a bulk delete
    fn take_selection(&mut self) -> Vec<i64> {
        std::mem::take(&mut self.selected).into_iter().collect()
    }
}

/// "91% confidence"
fn confidence_label(confidence: f32) -> String {
    format!("{}% confidence", (confidence * 100.0).round() as i32)
}

/// "2026-08-07 at 10:15:30", or the raw string when unparseable
fn card_date_label(timestamp: &str) -> String {
    match timestamp.parse::<chrono::NaiveDateTime>() {
        Ok(dt) => dt.format("%Y-%m-%d at %H:%M:%S").to_string(),
        Err(_) => match models::parse_local_date(timestamp) {
            Some(date) => format!("{} at {}", date, models::format_local_time(timestamp)),
            None => timestamp.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: i64) -> DetectionRecord {
        DetectionRecord {
            id,
            timestamp: "2026-08-07T10:15:30".to_string(),
            person_count: 1,
            image_path: format!("detection_{}.jpg", id),
            confidence: 0.914,
        }
    }

    #[test]
    fn test_selection_toggling() {
        let mut grid = HistoryGrid::default();
        grid.set_selected(1, true);
        grid.set_selected(2, true);
        grid.set_selected(1, false);
        assert_eq!(grid.selected_ids(), vec![2]);
    }

    #[test]
    fn test_take_selection_clears_it() {
        let mut grid = HistoryGrid::default();
        grid.set_selected(3, true);
        grid.set_selected(1, true);
        assert_eq!(grid.take_selection(), vec![1, 3]);
        assert!(grid.selected_ids().is_empty());
    }

    #[test]
    fn test_retain_loaded_keeps_selection_subset() {
        let mut grid = HistoryGrid::default();
        grid.set_selected(1, true);
        grid.set_selected(2, true);
        grid.set_selected(9, true);
        grid.retain_loaded(&[record(1), record(3)]);
        assert_eq!(grid.selected_ids(), vec![1]);
    }

    #[test]
    fn test_retain_loaded_closes_orphaned_modal() {
        let mut grid = HistoryGrid::default();
        grid.modal = Some(ModalView {
            id: 2,
            path: "detection_2.jpg".to_string(),
        });
        grid.retain_loaded(&[record(1)]);
        assert!(grid.modal.is_none());
    }

    #[test]
    fn test_confidence_label_rounds() {
        assert_eq!(confidence_label(0.914), "91% confidence");
        assert_eq!(confidence_label(0.915), "92% confidence");
        assert_eq!(confidence_label(1.0), "100% confidence");
    }

    #[test]
    fn test_card_date_label() {
        assert_eq!(
            card_date_label("2026-08-07T10:15:30.123456"),
            "2026-08-07 at 10:15:30"
        );
        assert_eq!(card_date_label("garbage"), "garbage");
    }
}
