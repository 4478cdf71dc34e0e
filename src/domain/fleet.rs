// Fleet-wide views built from the current state of every vessel
use super::alert::Alert;
use super::telemetry::TelemetryRecord;
use serde::Serialize;
use std::collections::BTreeMap;

/// Battery percentage under which a vessel is flagged in the fleet list
pub const LOW_BATTERY_PERCENT: f64 = 20.0;

pub type FleetState = BTreeMap<String, TelemetryRecord>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FleetSummary {
    pub total_vessels: usize,
    pub online_vessels: usize,
    pub critical_alerts: usize,
    pub selected: Option<String>,
}

impl FleetSummary {
    pub fn build(
        fleet: &FleetState,
        alerts: &[Alert],
        connected: bool,
        selected: Option<String>,
    ) -> Self {
        // Nothing is online while the feed itself is down
        let online_vessels = if connected {
            fleet
                .values()
                .filter(|r| !r.network_or_default().is_offline())
                .count()
        } else {
            0
        };

        Self {
            total_vessels: fleet.len(),
            online_vessels,
            critical_alerts: alerts.iter().filter(|a| a.is_critical()).count(),
            selected,
        }
    }
}

/// One row of the fleet list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VesselRow {
    pub vessel_id: String,
    pub battery_percentage: f64,
    pub low_battery: bool,
    pub network_status: String,
    pub signal_strength: f64,
    pub buffered_packets: u64,
    pub speed: f64,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub selected: bool,
}

impl VesselRow {
    pub fn from_record(record: &TelemetryRecord, selected: Option<&str>) -> Self {
        let battery_percentage = record.sensors.battery_percentage().unwrap_or(0.0);
        let network = record.network_or_default();
        let location = record.location.clone().unwrap_or_default();

        Self {
            vessel_id: record.vessel_id.clone(),
            battery_percentage,
            low_battery: battery_percentage < LOW_BATTERY_PERCENT,
            network_status: network.status,
            signal_strength: network.signal_strength,
            buffered_packets: network.buffered_packets,
            speed: record.speed(),
            latitude: location.latitude,
            longitude: location.longitude,
            selected: selected == Some(record.vessel_id.as_str()),
        }
    }
}

pub fn vessel_rows(fleet: &FleetState, selected: Option<&str>) -> Vec<VesselRow> {
    fleet
        .values()
        .map(|r| VesselRow::from_record(r, selected))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapMarker {
    pub vessel_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub selected: bool,
}

/// Vessels without usable coordinates are left off the map
pub fn map_markers(fleet: &FleetState, selected: Option<&str>) -> Vec<MapMarker> {
    fleet
        .values()
        .filter_map(|r| {
            let (latitude, longitude) = r.location.as_ref()?.coordinates()?;
            Some(MapMarker {
                vessel_id: r.vessel_id.clone(),
                latitude,
                longitude,
                selected: selected == Some(r.vessel_id.as_str()),
            })
        })
        .collect()
}
