//! Detection record store — NVS-backed ring of recent detections.
//!
//! Implements [`RecordsStorePort`] over any [`StoragePort`].  The ring
//! keeps the most recent detections for boot-time review; long-term
//! history lives off-device behind the same port.

use log::warn;

use crate::app::ports::{RecordsStorePort, StoragePort};
use crate::detection::types::DetectionRecord;
use crate::error::{Error, Result};

const LOG_NAMESPACE: &str = "detect";
const INDEX_KEY: &str = "idx";
const RING_SLOTS: usize = 16;

/// NVS-backed detection log.
pub struct DetectionLog<S: StoragePort> {
    nvs: S,
    write_index: usize,
}

impl<S: StoragePort> DetectionLog<S> {
    /// Wrap a storage backend, resuming the ring index if present.
    pub fn new(nvs: S) -> Self {
        let mut log = Self {
            nvs,
            write_index: 0,
        };
        let mut buf = [0u8; 4];
        if let Ok(4) = log.nvs.read(LOG_NAMESPACE, INDEX_KEY, &mut buf) {
            log.write_index = u32::from_le_bytes(buf) as usize % RING_SLOTS;
        }
        log
    }

    /// Most recent records, unordered (ring slots).
    pub fn read_recent(&self) -> heapless::Vec<DetectionRecord, RING_SLOTS> {
        let mut records = heapless::Vec::new();
        for i in 0..RING_SLOTS {
            let mut buf = [0u8; 64];
            if let Ok(len) = self.nvs.read(LOG_NAMESPACE, &Self::slot_key(i), &mut buf) {
                if let Ok(rec) = postcard::from_bytes::<DetectionRecord>(&buf[..len]) {
                    let _ = records.push(rec);
                }
            }
        }
        records
    }

    fn slot_key(index: usize) -> heapless::String<16> {
        let mut s = heapless::String::new();
        let _ = core::fmt::Write::write_fmt(&mut s, format_args!("d{}", index));
        s
    }
}

impl<S: StoragePort> RecordsStorePort for DetectionLog<S> {
    async fn add_detection(&mut self, record: &DetectionRecord) -> Result<()> {
        let bytes = postcard::to_allocvec(record)
            .map_err(|_| Error::Storage("record serialization failed"))?;

        let slot = Self::slot_key(self.write_index);
        if let Err(e) = self.nvs.write(LOG_NAMESPACE, &slot, &bytes) {
            warn!("detection log: slot write failed: {e}");
            return Err(Error::Storage("detection slot write failed"));
        }

        self.write_index = (self.write_index + 1) % RING_SLOTS;
        let idx = (self.write_index as u32).to_le_bytes();
        if let Err(e) = self.nvs.write(LOG_NAMESPACE, INDEX_KEY, &idx) {
            // The record landed; a stale index only costs overwrite order.
            warn!("detection log: index write failed: {e}");
        }
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::nvs::NvsAdapter;
    use futures_lite::future::block_on;

    fn record(at: u64) -> DetectionRecord {
        DetectionRecord {
            detection_count: 1,
            temperature_detected: true,
            detected_at: at,
        }
    }

    #[test]
    fn stores_and_reads_back_records() {
        let mut log = DetectionLog::new(NvsAdapter::new().unwrap());

        block_on(log.add_detection(&record(100))).unwrap();
        block_on(log.add_detection(&record(200))).unwrap();

        let recent = log.read_recent();
        assert_eq!(recent.len(), 2);
        assert!(recent.iter().any(|r| r.detected_at == 200));
    }

    #[test]
    fn ring_overwrites_oldest_beyond_capacity() {
        let mut log = DetectionLog::new(NvsAdapter::new().unwrap());

        for i in 0..(RING_SLOTS as u64 + 4) {
            block_on(log.add_detection(&record(i))).unwrap();
        }
        let recent = log.read_recent();
        assert_eq!(recent.len(), RING_SLOTS);
        // The first four entries were overwritten.
        assert!(!recent.iter().any(|r| r.detected_at < 4));
    }
}
