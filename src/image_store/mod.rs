//! ImageStore - Detection Image Cache
//!
//! ## Responsibilities
//!
//! - Fetch detection images via the access client, once per path
//! - Cache decoded textures for the grid and the modal
//! - Map broken references to a fixed placeholder, permanently
//!
//! A failed load (missing image or undecodable bytes) never shows a
//! broken-image state and is not retried; the placeholder stands in until
//! the entry is dropped.

use std::collections::HashMap;
use std::sync::mpsc;
use std::sync::Arc;

use crate::detection_client::DetectionClient;
use crate::error::{Error, Result};

/// Cache entry lifecycle
enum ImageEntry {
    /// Fetch in flight (at most one per path)
    Loading,
    Ready(egui::TextureHandle),
    /// Fetch or decode failed; rendered as the placeholder
    Failed,
}

/// What the widgets render for a given path
pub enum ImageDisplay {
    Loading,
    Ready(egui::TextureHandle),
    /// Placeholder texture for a broken reference
    Failed(egui::TextureHandle),
}

/// Detection image cache
pub struct ImageStore {
    client: Arc<DetectionClient>,
    runtime: tokio::runtime::Handle,
    entries: HashMap<String, ImageEntry>,
    results_tx: mpsc::Sender<(String, Result<Vec<u8>>)>,
    results_rx: mpsc::Receiver<(String, Result<Vec<u8>>)>,
    placeholder: Option<egui::TextureHandle>,
}

impl ImageStore {
    pub fn new(client: Arc<DetectionClient>, runtime: tokio::runtime::Handle) -> Self {
        let (results_tx, results_rx) = mpsc::channel();
        Self {
            client,
            runtime,
            entries: HashMap::new(),
            results_tx,
            results_rx,
            placeholder: None,
        }
    }

    /// Apply finished fetches. Called once per UI frame, before rendering.
    pub fn drain(&mut self, ctx: &egui::Context) {
        while let Ok((path, result)) = self.results_rx.try_recv() {
            self.apply_result(ctx, path, result);
        }
    }

    /// Texture for a path, spawning the fetch on first request
    pub fn get(&mut self, ctx: &egui::Context, path: &str) -> ImageDisplay {
        if !self.entries.contains_key(path) {
            self.entries.insert(path.to_string(), ImageEntry::Loading);
            let client = self.client.clone();
            let tx = self.results_tx.clone();
            let path = path.to_string();
            self.runtime.spawn(async move {
                let result = client.fetch_image(&path).await;
                // receiver dropped means the store is gone; nothing to do
                let _ = tx.send((path, result));
            });
        }
        if let Some(ImageEntry::Ready(texture)) = self.entries.get(path) {
            return ImageDisplay::Ready(texture.clone());
        }
        if self.is_failed(path) {
            return ImageDisplay::Failed(self.placeholder(ctx));
        }
        ImageDisplay::Loading
    }

    /// True once a path has permanently failed to load
    pub fn is_failed(&self, path: &str) -> bool {
        matches!(self.entries.get(path), Some(ImageEntry::Failed))
    }

    fn apply_result(&mut self, ctx: &egui::Context, path: String, result: Result<Vec<u8>>) {
        let entry = match result.and_then(|bytes| decode_color_image(&bytes)) {
            Ok(color_image) => {
                let texture = ctx.load_texture(
                    format!("detection:{}", path),
                    color_image,
                    egui::TextureOptions::LINEAR,
                );
                ImageEntry::Ready(texture)
            }
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "Image load failed");
                ImageEntry::Failed
            }
        };
        self.entries.insert(path, entry);
    }

    fn placeholder(&mut self, ctx: &egui::Context) -> egui::TextureHandle {
        self.placeholder
            .get_or_insert_with(|| {
                let image =
                    egui::ColorImage::new([200, 120], egui::Color32::from_rgb(55, 65, 81));
                ctx.load_texture("image-placeholder", image, egui::TextureOptions::LINEAR)
            })
            .clone()
    }
}

/// Decode raw image bytes to an egui color image
fn decode_color_image(bytes: &[u8]) -> Result<egui::ColorImage> {
    let decoded =
        image::load_from_memory(bytes).map_err(|e| Error::ImageLoad(e.to_string()))?;
    let rgba = decoded.to_rgba8();
    let size = [rgba.width() as usize, rgba.height() as usize];
    Ok(egui::ColorImage::from_rgba_unmultiplied(size, rgba.as_raw()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn store() -> ImageStore {
        let client = Arc::new(
            DetectionClient::with_timeouts(
                "http://127.0.0.1:1",
                Duration::from_millis(100),
                Duration::from_millis(100),
            )
            .unwrap(),
        );
        ImageStore::new(client, tokio::runtime::Handle::current())
    }

    fn png_bytes() -> Vec<u8> {
        let mut bytes = Vec::new();
        let img = image::RgbaImage::from_pixel(2, 2, image::Rgba([10, 20, 30, 255]));
        image::DynamicImage::ImageRgba8(img)
            .write_to(
                &mut std::io::Cursor::new(&mut bytes),
                image::ImageFormat::Png,
            )
            .unwrap();
        bytes
    }

    #[tokio::test]
    async fn test_valid_bytes_become_ready() {
        let mut store = store();
        let ctx = egui::Context::default();
        store
            .entries
            .insert("a.jpg".to_string(), ImageEntry::Loading);
        store.apply_result(&ctx, "a.jpg".to_string(), Ok(png_bytes()));
        assert!(matches!(
            store.get(&ctx, "a.jpg"),
            ImageDisplay::Ready(_)
        ));
    }

    #[tokio::test]
    async fn test_fetch_failure_shows_placeholder() {
        let mut store = store();
        let ctx = egui::Context::default();
        store
            .entries
            .insert("gone.jpg".to_string(), ImageEntry::Loading);
        store.apply_result(
            &ctx,
            "gone.jpg".to_string(),
            Err(Error::Network("GET /api/images/gone.jpg returned 404".to_string())),
        );
        assert!(store.is_failed("gone.jpg"));
        assert!(matches!(
            store.get(&ctx, "gone.jpg"),
            ImageDisplay::Failed(_)
        ));
    }

    #[tokio::test]
    async fn test_undecodable_bytes_fail() {
        let mut store = store();
        let ctx = egui::Context::default();
        store
            .entries
            .insert("junk.jpg".to_string(), ImageEntry::Loading);
        store.apply_result(&ctx, "junk.jpg".to_string(), Ok(vec![1, 2, 3, 4]));
        assert!(store.is_failed("junk.jpg"));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode_color_image(&[0u8; 16]),
            Err(Error::ImageLoad(_))
        ));
    }
}
