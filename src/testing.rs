//! Shared fixtures for unit tests.

use crate::store::Recording;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};

/// Fake WebM bytes; only the EBML magic is real
pub const MEDIA_BYTES: &[u8] = &[0x1A, 0x45, 0xDF, 0xA3, 0x9F, 0x42, 0x86, 0x81, 0x01];

pub fn timestamp(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_714_557_600 + secs, 0).unwrap()
}

pub fn valid_payload() -> String {
    STANDARD.encode(MEDIA_BYTES)
}

/// Recording with an embedded payload, created `secs` after a fixed epoch
pub fn recording_at(id: &str, secs: i64) -> Recording {
    Recording {
        id: id.to_string(),
        created_at: timestamp(secs),
        duration: 8,
        size: MEDIA_BYTES.len() as u64,
        platform: "macos".to_string(),
        public_url: None,
        embedded_payload: Some(valid_payload()),
    }
}

pub fn remote_recording(id: &str, secs: i64, url: &str) -> Recording {
    Recording {
        public_url: Some(url.to_string()),
        embedded_payload: None,
        ..recording_at(id, secs)
    }
}

pub fn corrupt_recording(id: &str, secs: i64) -> Recording {
    Recording {
        embedded_payload: Some("%%% not base64 %%%".to_string()),
        ..recording_at(id, secs)
    }
}

pub fn bare_recording(id: &str, secs: i64) -> Recording {
    Recording {
        public_url: None,
        embedded_payload: None,
        ..recording_at(id, secs)
    }
}
