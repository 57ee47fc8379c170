//! In-memory telemetry log

use crate::record::{AlertRecord, TelemetryRecord};
use crate::{TelemetryError, TelemetrySink};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Bounded store of recent telemetry records
pub struct TelemetryLog {
    records: Mutex<VecDeque<TelemetryRecord>>,
    max_records: usize,
}

impl TelemetryLog {
    /// Create a log keeping at most `max_records` records
    pub fn new(max_records: usize) -> Self {
        debug!("Creating telemetry log (retention {})", max_records);
        Self {
            records: Mutex::new(VecDeque::with_capacity(max_records.min(1024))),
            max_records: max_records.max(1),
        }
    }

    /// Append a record, logging it as JSON
    pub fn record(&self, record: TelemetryRecord) -> Result<(), TelemetryError> {
        let json = serde_json::to_string(&record)
            .map_err(|e| TelemetryError::Serialization(e.to_string()))?;
        info!(target: "telemetry", kind = record.kind(), "{}", json);

        let mut records = self
            .records
            .lock()
            .map_err(|e| TelemetryError::LockPoisoned(e.to_string()))?;

        // Enforce retention
        while records.len() >= self.max_records {
            records.pop_front();
        }
        records.push_back(record);
        Ok(())
    }

    /// Most recent records, newest first
    pub fn recent(&self, limit: usize) -> Result<Vec<TelemetryRecord>, TelemetryError> {
        self.filtered(limit, |_| true)
    }

    /// Most recent records of one kind, newest first
    pub fn recent_of_kind(
        &self,
        kind: &str,
        limit: usize,
    ) -> Result<Vec<TelemetryRecord>, TelemetryError> {
        self.filtered(limit, |record| record.kind() == kind)
    }

    /// Most recent records whose kind is any of `kinds`, newest first
    pub fn recent_of_kinds(
        &self,
        kinds: &[&str],
        limit: usize,
    ) -> Result<Vec<TelemetryRecord>, TelemetryError> {
        self.filtered(limit, |record| kinds.contains(&record.kind()))
    }

    /// Most recent alert records, newest first
    pub fn alerts(&self, limit: usize) -> Result<Vec<AlertRecord>, TelemetryError> {
        let records = self.recent_of_kind("alert", limit)?;
        Ok(records
            .into_iter()
            .filter_map(|record| match record {
                TelemetryRecord::Alert(alert) => Some(alert),
                _ => None,
            })
            .collect())
    }

    /// Number of retained records
    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn filtered(
        &self,
        limit: usize,
        keep: impl Fn(&TelemetryRecord) -> bool,
    ) -> Result<Vec<TelemetryRecord>, TelemetryError> {
        let records = self
            .records
            .lock()
            .map_err(|e| TelemetryError::LockPoisoned(e.to_string()))?;
        Ok(records
            .iter()
            .rev()
            .filter(|record| keep(record))
            .take(limit)
            .cloned()
            .collect())
    }
}

impl Default for TelemetryLog {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl TelemetrySink for TelemetryLog {
    fn emit(&mut self, record: TelemetryRecord) -> Result<(), TelemetryError> {
        self.record(record)
    }
}

impl TelemetrySink for Arc<TelemetryLog> {
    fn emit(&mut self, record: TelemetryRecord) -> Result<(), TelemetryError> {
        self.record(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{LocationUpdate, ValidationPacket};
    use chrono::Utc;
    use occupancy_status::StatusTier;
    use sensor_fusion::MismatchLevel;
    use uuid::Uuid;

    fn validation(validated: u32) -> TelemetryRecord {
        TelemetryRecord::Validation(ValidationPacket {
            bus_id: "BUS-1".to_string(),
            ir_count: validated,
            camera_count: validated,
            validated,
            validation_passed: true,
            mismatch: MismatchLevel::None,
            timestamp: Utc::now(),
        })
    }

    fn alert(count: u32) -> TelemetryRecord {
        TelemetryRecord::Alert(AlertRecord {
            id: Uuid::new_v4(),
            alert_type: StatusTier::Red,
            bus_id: "BUS-1".to_string(),
            passenger_count: count,
            occupancy_percent: 90.0,
            location: "Pettah".to_string(),
            lat: 6.9356,
            lon: 79.8487,
            timestamp: Utc::now(),
            action_required: "Deploy additional bus".to_string(),
        })
    }

    #[test]
    fn test_retention_drops_oldest() {
        let log = TelemetryLog::new(3);
        for n in 0..5 {
            log.record(validation(n)).unwrap();
        }
        assert_eq!(log.len(), 3);

        let recent = log.recent(10).unwrap();
        assert_eq!(recent.len(), 3);
        match &recent[0] {
            TelemetryRecord::Validation(packet) => assert_eq!(packet.validated, 4),
            other => panic!("unexpected record {other:?}"),
        }
    }

    #[test]
    fn test_alerts_filtered_newest_first() {
        let mut log = TelemetryLog::default();
        log.emit(alert(81)).unwrap();
        log.emit(validation(20)).unwrap();
        log.emit(TelemetryRecord::Location(LocationUpdate {
            timestamp: Utc::now(),
            bus_id: "BUS-1".to_string(),
            lat: 0.0,
            lon: 0.0,
            stop_name: "Pettah".to_string(),
            passenger_count: 20,
        }))
        .unwrap();
        log.emit(alert(95)).unwrap();

        let alerts = log.alerts(10).unwrap();
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].passenger_count, 95);
        assert_eq!(alerts[1].passenger_count, 81);

        assert_eq!(log.alerts(1).unwrap().len(), 1);
        assert_eq!(log.recent_of_kind("location", 10).unwrap().len(), 1);
        assert_eq!(
            log.recent_of_kinds(&["validation", "location"], 10)
                .unwrap()
                .len(),
            2
        );
    }

    #[test]
    fn test_shared_log_as_sink() {
        let log = Arc::new(TelemetryLog::default());
        let mut sink = Arc::clone(&log);
        sink.emit(validation(5)).unwrap();
        assert_eq!(log.len(), 1);
        assert!(!log.is_empty());
    }
}
