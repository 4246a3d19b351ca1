//! CamDeck Library
//!
//! Desktop dashboard for a person-detection camera backend.
//!
//! ## Architecture (7 Components)
//!
//! 1. DetectionClient - backend REST access (list/delete/images/stats)
//! 2. LiveChannel - Socket.IO push channel (frames, stats, errors)
//! 3. HistoryService - detection list state, debounced refresh, optimistic delete
//! 4. ImageStore - detection image cache with placeholder fallback
//! 5. UI widgets - stream viewer, stats tiles, history grid
//! 6. DashboardApp - root composition
//! 7. DashboardConfig - environment-driven endpoints and intervals
//!
//! ## Design Principles
//!
//! - Each service owns its state exclusively; widgets render snapshots
//! - Latest fact wins: push payloads replace state wholesale
//! - Errors stay inline in the widget they belong to

pub mod app;
pub mod config;
pub mod detection_client;
pub mod error;
pub mod history_service;
pub mod image_store;
pub mod live_channel;
pub mod models;
pub mod ui;

pub use config::DashboardConfig;
pub use error::{Error, Result};
