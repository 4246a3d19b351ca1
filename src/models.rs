//! Shared models and types for CamDeck
//!
//! This module contains the backend wire types shared across multiple
//! modules. Field casing matches the backend exactly: detection records
//! and live frames are camelCase, stats snapshots are snake_case.

use base64::Engine;
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One historical detection record, server-assigned and read-only.
///
/// Deleted only via an explicit `DELETE /api/detections/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionRecord {
    /// Unique server-assigned id
    pub id: i64,
    /// ISO datetime string as stored by the backend
    pub timestamp: String,
    pub person_count: u32,
    /// Server-relative image reference (`GET /api/images/{image_path}`)
    pub image_path: String,
    /// Detection confidence in [0, 1]
    pub confidence: f32,
}

impl DetectionRecord {
    /// Calendar date of the record in local time, if the timestamp parses
    pub fn local_date(&self) -> Option<NaiveDate> {
        parse_local_date(&self.timestamp)
    }
}

/// One live frame pushed over the channel. Ephemeral: replaced wholesale
/// on each `detection` event, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveFrame {
    /// Base64-encoded JPEG bytes
    pub image: String,
    pub person_count: u32,
    pub timestamp: String,
    /// Bounding boxes in delivery order; absent on the wire means empty
    #[serde(default)]
    pub detections: Vec<BoundingBox>,
}

impl LiveFrame {
    /// Decode the base64 image payload to raw JPEG bytes
    pub fn image_bytes(&self) -> Result<Vec<u8>> {
        base64::engine::general_purpose::STANDARD
            .decode(&self.image)
            .map_err(|e| Error::ImageLoad(format!("invalid base64 frame: {}", e)))
    }
}

/// One detected object within a live frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Detection confidence in [0, 1]
    pub confidence: f32,
    /// Class label ("person", ...)
    #[serde(rename = "class")]
    pub label: String,
}

/// Periodic aggregate summary pushed over the channel, used instead of
/// recomputing aggregates client-side. Replaced wholesale per event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub live_count: u32,
    pub today_detections: u32,
    pub total_detections: u32,
    pub avg_persons: f32,
}

/// Parse a backend timestamp to its local calendar date.
///
/// The backend writes naive `datetime.now().isoformat()` strings, but
/// RFC 3339 with an offset is accepted too. Unparseable input yields
/// `None` so a bad record can never count as "today".
pub fn parse_local_date(timestamp: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(timestamp) {
        return Some(dt.with_timezone(&Local).date_naive());
    }
    timestamp
        .parse::<NaiveDateTime>()
        .ok()
        .map(|dt| dt.date())
}

/// Parse a backend timestamp to a wall-clock time string for overlays
pub fn format_local_time(timestamp: &str) -> String {
    if let Ok(dt) = DateTime::parse_from_rfc3339(timestamp) {
        return dt.with_timezone(&Local).format("%H:%M:%S").to_string();
    }
    if let Ok(dt) = timestamp.parse::<NaiveDateTime>() {
        return dt.format("%H:%M:%S").to_string();
    }
    timestamp.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detection_record_wire_format() {
        let json = r#"{
            "id": 7,
            "timestamp": "2026-08-07T10:15:30.123456",
            "personCount": 2,
            "imagePath": "detection_7.jpg",
            "confidence": 0.91
        }"#;
        let record: DetectionRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.id, 7);
        assert_eq!(record.person_count, 2);
        assert_eq!(record.image_path, "detection_7.jpg");
    }

    #[test]
    fn test_live_frame_detections_default_empty() {
        let json = r#"{
            "image": "aGVsbG8=",
            "personCount": 1,
            "timestamp": "2026-08-07T10:15:30"
        }"#;
        let frame: LiveFrame = serde_json::from_str(json).unwrap();
        assert!(frame.detections.is_empty());
        assert_eq!(frame.image_bytes().unwrap(), b"hello");
    }

    #[test]
    fn test_bounding_box_class_field() {
        let json = r#"{"x":1.0,"y":2.0,"width":3.0,"height":4.0,"confidence":0.5,"class":"person"}"#;
        let bbox: BoundingBox = serde_json::from_str(json).unwrap();
        assert_eq!(bbox.label, "person");
    }

    #[test]
    fn test_invalid_base64_is_image_load_error() {
        let frame = LiveFrame {
            image: "not base64!!".to_string(),
            person_count: 0,
            timestamp: String::new(),
            detections: Vec::new(),
        };
        assert!(matches!(frame.image_bytes(), Err(Error::ImageLoad(_))));
    }

    #[test]
    fn test_parse_local_date_naive_and_rfc3339() {
        assert_eq!(
            parse_local_date("2026-08-07T10:15:30.123456"),
            Some(NaiveDate::from_ymd_opt(2026, 8, 7).unwrap())
        );
        assert!(parse_local_date("2026-08-07T10:15:30+00:00").is_some());
        assert_eq!(parse_local_date("garbage"), None);
    }

    #[test]
    fn test_stats_snapshot_wire_format() {
        let json = r#"{"live_count":3,"today_detections":5,"total_detections":20,"avg_persons":2.4}"#;
        let stats: StatsSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(stats.total_detections, 20);
        assert!((stats.avg_persons - 2.4).abs() < f32::EPSILON);
    }
}
