//! DashboardApp - Root Composition
//!
//! Wires the services to the widgets. Each service owns its state
//! exclusively; the app passes snapshots down and routes widget actions
//! back. The live channel is the only acquired external resource and
//! drops with the app.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Local;

use crate::config::DashboardConfig;
use crate::detection_client::DetectionClient;
use crate::error::{Error, Result};
use crate::history_service::HistoryService;
use crate::image_store::ImageStore;
use crate::live_channel::{ChannelState, LiveChannel};
use crate::models::StatsSnapshot;
use crate::ui::history_grid::{GridAction, HistoryGrid};
use crate::ui::stats_tiles;
use crate::ui::stream_view::StreamView;

/// Root dashboard application
pub struct DashboardApp {
    channel: Option<LiveChannel>,
    /// Connect-time channel failure, shown in the stream viewer banner
    channel_init_error: Option<String>,
    history: HistoryService,
    images: ImageStore,
    stream: StreamView,
    grid: HistoryGrid,
    /// One-shot `/api/stats` fetch shown until the first push snapshot
    seed_stats: Arc<Mutex<Option<StatsSnapshot>>>,
}

impl DashboardApp {
    pub fn new(config: DashboardConfig, runtime: tokio::runtime::Handle) -> Result<Self> {
        let client = Arc::new(DetectionClient::new(&config)?);

        let (channel, channel_init_error) = match LiveChannel::connect(&config) {
            Ok(channel) => (Some(channel), None),
            Err(e @ Error::Config(_)) => return Err(e),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    "Push channel unavailable, continuing without live updates"
                );
                (None, Some(e.to_string()))
            }
        };

        let seed_stats = Arc::new(Mutex::new(None));
        {
            let client = client.clone();
            let seed_stats = seed_stats.clone();
            runtime.spawn(async move {
                match client.fetch_stats().await {
                    Ok(stats) => {
                        *seed_stats.lock().unwrap_or_else(|e| e.into_inner()) = Some(stats);
                    }
                    Err(e) => tracing::debug!(error = %e, "Stats seed fetch failed"),
                }
            });
        }

        let history = HistoryService::new(
            client.clone(),
            runtime.clone(),
            config.refresh_min_interval,
        );
        let images = ImageStore::new(client, runtime);

        Ok(Self {
            channel,
            channel_init_error,
            history,
            images,
            stream: StreamView::default(),
            grid: HistoryGrid::default(),
            seed_stats,
        })
    }

    fn channel_state(&self) -> ChannelState {
        self.channel
            .as_ref()
            .map(|c| c.snapshot())
            .unwrap_or_default()
    }
}

impl eframe::App for DashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.images.drain(ctx);

        let channel_state = self.channel_state();
        if let Some(channel) = &self.channel {
            self.history.poll(channel.signal_seq());
        }

        let detections = self.history.detections();
        let loading = self.history.loading();
        let history_error = self.history.last_error();

        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("CamDeck");
                ui.weak("Real-time person detection");
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                let seeded = self
                    .seed_stats
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .clone();
                // push snapshots win over the startup seed
                let stats = channel_state.stats.clone().or(seeded);
                let live_count = channel_state
                    .last_frame
                    .as_ref()
                    .map(|f| f.person_count)
                    .unwrap_or(0);
                let tiles = stats_tiles::compute_tiles(
                    stats.as_ref(),
                    &detections,
                    live_count,
                    Local::now().date_naive(),
                );
                stats_tiles::show(ui, &tiles);
                ui.add_space(12.0);

                self.stream
                    .show(ui, &channel_state, self.channel_init_error.as_deref());
                ui.add_space(12.0);

                let actions = self.grid.show(
                    ui,
                    &detections,
                    loading,
                    history_error.as_deref(),
                    &mut self.images,
                );
                for action in actions {
                    match action {
                        GridAction::Refresh => self.history.refresh(),
                        GridAction::Delete(ids) => self.history.delete(&ids),
                    }
                }
            });
        });

        self.grid.show_modal(ctx, &mut self.images);
        self.grid.retain_loaded(&self.history.detections());

        // push events must become visible without input events
        ctx.request_repaint_after(Duration::from_millis(100));
    }
}
