// Fleet state store - latest record per vessel
use crate::domain::fleet::FleetState;
use crate::domain::telemetry::TelemetryRecord;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IngestError {
    #[error("telemetry record has an empty vessel id")]
    MissingVesselId,
}

#[derive(Debug, Default)]
pub struct FleetStore {
    vessels: FleetState,
}

impl FleetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or wholly replace the entry for the record's vessel.
    /// Returns true when the vessel had not been seen before.
    pub fn apply(&mut self, record: TelemetryRecord) -> Result<bool, IngestError> {
        if record.vessel_id.trim().is_empty() {
            return Err(IngestError::MissingVesselId);
        }
        Ok(self
            .vessels
            .insert(record.vessel_id.clone(), record)
            .is_none())
    }

    pub fn get(&self, vessel_id: &str) -> Option<&TelemetryRecord> {
        self.vessels.get(vessel_id)
    }

    /// Copy of every vessel's latest record, ordered by id
    pub fn get_all(&self) -> FleetState {
        self.vessels.clone()
    }

    pub fn view(&self) -> &FleetState {
        &self.vessels
    }

    pub fn len(&self) -> usize {
        self.vessels.len()
    }
}
