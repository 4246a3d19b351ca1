//! Live stream viewer: latest frame, timestamp overlay, connection badge.
//!
//! Purely a function of the channel snapshot passed in. The frame texture
//! is re-uploaded only when a new frame arrives.

use crate::live_channel::{ChannelState, ChannelStatus};
use crate::models;

/// Stream viewer widget state (texture cache only)
#[derive(Default)]
pub struct StreamView {
    texture: Option<egui::TextureHandle>,
    /// Timestamp of the frame currently uploaded
    last_timestamp: Option<String>,
}

impl StreamView {
    /// Render the viewer from a channel snapshot.
    ///
    /// `init_error` carries a connect-time failure when no channel could
    /// be opened at all; it renders in the same inline banner as channel
    /// errors.
    pub fn show(&mut self, ui: &mut egui::Ui, state: &ChannelState, init_error: Option<&str>) {
        ui.horizontal(|ui| {
            ui.heading("Live Stream");
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                match state.status {
                    ChannelStatus::Connected => {
                        ui.colored_label(egui::Color32::from_rgb(74, 222, 128), "● Connected");
                    }
                    ChannelStatus::Connecting => {
                        ui.colored_label(egui::Color32::YELLOW, "● Connecting…");
                    }
                    ChannelStatus::Disconnected => {
                        ui.colored_label(egui::Color32::from_rgb(248, 113, 113), "● Disconnected");
                    }
                }
                if let Some(frame) = &state.last_frame {
                    ui.label(person_badge(frame.person_count));
                }
            });
        });

        if let Some(error) = state.last_error.as_deref().or(init_error) {
            ui.colored_label(egui::Color32::from_rgb(248, 113, 113), error);
        }

        match &state.last_frame {
            Some(frame) => {
                self.sync_texture(ui.ctx(), frame);
                if let Some(texture) = &self.texture {
                    let available = ui.available_width();
                    let response = ui.add(
                        egui::Image::new(texture)
                            .max_size(egui::vec2(available, 480.0))
                            .maintain_aspect_ratio(true),
                    );
                    // timestamp overlay, bottom-left like a camera OSD
                    let pos = response.rect.left_bottom() + egui::vec2(8.0, -8.0);
                    ui.painter().text(
                        pos,
                        egui::Align2::LEFT_BOTTOM,
                        models::format_local_time(&frame.timestamp),
                        egui::FontId::monospace(13.0),
                        egui::Color32::WHITE,
                    );
                } else {
                    ui.weak("Frame received but not decodable");
                }
            }
            None => {
                let message = if state.connected() {
                    "Waiting for stream…"
                } else {
                    "Connecting…"
                };
                ui.allocate_ui(egui::vec2(ui.available_width(), 160.0), |ui| {
                    ui.centered_and_justified(|ui| {
                        ui.weak(message);
                    });
                });
            }
        }
    }

    /// Upload the frame to a texture when it changed since last paint
    fn sync_texture(&mut self, ctx: &egui::Context, frame: &crate::models::LiveFrame) {
        if self.last_timestamp.as_deref() == Some(frame.timestamp.as_str()) {
            return;
        }
        self.last_timestamp = Some(frame.timestamp.clone());

        let color_image = frame.image_bytes().and_then(|bytes| {
            image::load_from_memory(&bytes)
                .map_err(|e| crate::error::Error::ImageLoad(e.to_string()))
                .map(|decoded| {
                    let rgba = decoded.to_rgba8();
                    let size = [rgba.width() as usize, rgba.height() as usize];
                    egui::ColorImage::from_rgba_unmultiplied(size, rgba.as_raw())
                })
        });
        match color_image {
            Ok(color_image) => match &mut self.texture {
                Some(texture) => texture.set(color_image, egui::TextureOptions::LINEAR),
                None => {
                    self.texture = Some(ctx.load_texture(
                        "live-frame",
                        color_image,
                        egui::TextureOptions::LINEAR,
                    ));
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "Live frame decode failed");
                self.texture = None;
            }
        }
    }
}

/// "1 person" / "3 persons"
pub(crate) fn person_badge(count: u32) -> String {
    if count == 1 {
        "1 person".to_string()
    } else {
        format!("{} persons", count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_person_badge_pluralization() {
        assert_eq!(person_badge(0), "0 persons");
        assert_eq!(person_badge(1), "1 person");
        assert_eq!(person_badge(3), "3 persons");
    }
}
