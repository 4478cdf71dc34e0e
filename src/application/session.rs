// Fleet session - owns every piece of aggregator state for one dashboard
use crate::application::alert_log::{AlertLog, DEFAULT_ALERT_CAPACITY};
use crate::application::fleet_store::{FleetStore, IngestError};
use crate::application::history::{HistoryBuffer, DEFAULT_HISTORY_CAPACITY};
use crate::application::selection::{SelectionChange, SelectionController};
use crate::domain::alert::Alert;
use crate::domain::fleet::{FleetState, FleetSummary};
use crate::domain::telemetry::TelemetryRecord;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    pub history_capacity: usize,
    pub alert_capacity: usize,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            alert_capacity: DEFAULT_ALERT_CAPACITY,
        }
    }
}

/// Inbound events, already decoded from the wire
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Connected,
    Disconnected,
    /// The upstream client stopped retrying; only a restart brings it back
    ReconnectExhausted,
    FleetUpdate(TelemetryRecord),
    /// Legacy per-vessel update, handled exactly like `FleetUpdate`
    TelemetryUpdate(TelemetryRecord),
    AlertTriggered(Alert),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Connectivity {
    pub connected: bool,
    pub gave_up: bool,
}

/// Change notifications for renderers
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionUpdate {
    Connectivity(Connectivity),
    Vessel {
        vessel_id: String,
        first_seen: bool,
        history_appended: bool,
    },
    Selection {
        vessel_id: String,
        automatic: bool,
    },
    Alert(Alert),
}

#[derive(Debug)]
pub struct FleetSession {
    store: FleetStore,
    selection: SelectionController,
    history: HistoryBuffer,
    alerts: AlertLog,
    connectivity: Connectivity,
}

impl FleetSession {
    pub fn new(limits: SessionLimits) -> Self {
        Self {
            store: FleetStore::new(),
            selection: SelectionController::new(),
            history: HistoryBuffer::new(limits.history_capacity),
            alerts: AlertLog::new(limits.alert_capacity),
            connectivity: Connectivity::default(),
        }
    }

    /// Single mutation entry point for the event stream
    pub fn handle(&mut self, event: SessionEvent) -> Result<Vec<SessionUpdate>, IngestError> {
        match event {
            SessionEvent::Connected => Ok(self.set_connectivity(Connectivity {
                connected: true,
                gave_up: false,
            })),
            SessionEvent::Disconnected => Ok(self.set_connectivity(Connectivity {
                connected: false,
                gave_up: self.connectivity.gave_up,
            })),
            SessionEvent::ReconnectExhausted => Ok(self.set_connectivity(Connectivity {
                connected: false,
                gave_up: true,
            })),
            SessionEvent::FleetUpdate(record) | SessionEvent::TelemetryUpdate(record) => {
                self.apply(record)
            }
            SessionEvent::AlertTriggered(alert) => {
                self.alerts.on_alert(alert.clone());
                tracing::debug!(vessel_id = %alert.vessel_id, kind = %alert.kind, retained = self.alerts.len(), "alert logged");
                Ok(vec![SessionUpdate::Alert(alert)])
            }
        }
    }

    fn set_connectivity(&mut self, connectivity: Connectivity) -> Vec<SessionUpdate> {
        if self.connectivity == connectivity {
            return Vec::new();
        }
        self.connectivity = connectivity;
        vec![SessionUpdate::Connectivity(connectivity)]
    }

    /// Store, then auto-select, then append to history. The record that
    /// triggers auto-selection is the first history entry.
    pub fn apply(&mut self, record: TelemetryRecord) -> Result<Vec<SessionUpdate>, IngestError> {
        let vessel_id = record.vessel_id.clone();
        let first_seen = self.store.apply(record)?;
        if first_seen {
            tracing::info!(vessel_id = %vessel_id, vessels = self.store.len(), "new vessel on the feed");
        }
        let mut updates = Vec::new();

        if self.selection.observe(&vessel_id) == SelectionChange::AutoSelected {
            tracing::info!(vessel_id = %vessel_id, "auto-selected first vessel");
            updates.push(SessionUpdate::Selection {
                vessel_id: vessel_id.clone(),
                automatic: true,
            });
        }

        let history_appended = match self.store.get(&vessel_id) {
            Some(stored) => self.history.on_record(stored, self.selection.current()),
            None => false,
        };

        updates.push(SessionUpdate::Vessel {
            vessel_id,
            first_seen,
            history_appended,
        });
        Ok(updates)
    }

    /// Operator selection. A switch clears history; re-selecting does not.
    pub fn select(&mut self, vessel_id: &str) -> Option<SessionUpdate> {
        match self.selection.select(vessel_id) {
            SelectionChange::Switched => {
                let dropped = self.history.len();
                self.history.clear();
                tracing::info!(vessel_id, dropped, "selection switched, history cleared");
                Some(SessionUpdate::Selection {
                    vessel_id: vessel_id.to_string(),
                    automatic: false,
                })
            }
            _ => None,
        }
    }

    pub fn current_fleet_state(&self) -> FleetState {
        self.store.get_all()
    }

    pub fn vessel(&self, vessel_id: &str) -> Option<TelemetryRecord> {
        self.store.get(vessel_id).cloned()
    }

    pub fn current_selection(&self) -> Option<String> {
        self.selection.current().map(str::to_string)
    }

    pub fn selected_record(&self) -> Option<&TelemetryRecord> {
        self.selection.current().and_then(|id| self.store.get(id))
    }

    pub fn current_history(&self) -> Vec<TelemetryRecord> {
        self.history.snapshot()
    }

    pub fn current_alerts(&self) -> Vec<Alert> {
        self.alerts.snapshot()
    }

    pub fn alerts_for(&self, vessel_id: &str) -> Vec<Alert> {
        self.alerts.for_vessel(vessel_id)
    }

    pub fn connectivity(&self) -> Connectivity {
        self.connectivity
    }

    pub fn summary(&self) -> FleetSummary {
        FleetSummary::build(
            self.store.view(),
            &self.alerts.snapshot(),
            self.connectivity.connected,
            self.current_selection(),
        )
    }

    pub fn fleet_view(&self) -> &FleetState {
        self.store.view()
    }
}

impl Default for FleetSession {
    fn default() -> Self {
        Self::new(SessionLimits::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::telemetry::Battery;
    use chrono::Utc;

    fn record(id: &str) -> TelemetryRecord {
        TelemetryRecord::new(id, Utc::now())
    }

    fn with_battery(id: &str, pct: f64) -> TelemetryRecord {
        let mut r = record(id);
        r.sensors.battery = Some(Battery {
            voltage: None,
            percentage: Some(pct),
        });
        r
    }

    #[test]
    fn test_store_overwrite_full_replace() {
        let mut session = FleetSession::default();
        session
            .handle(SessionEvent::FleetUpdate(with_battery("A", 15.0)))
            .unwrap();
        assert_eq!(
            session.current_fleet_state()["A"].sensors.battery_percentage(),
            Some(15.0)
        );

        session
            .handle(SessionEvent::FleetUpdate(with_battery("A", 12.0)))
            .unwrap();
        let state = session.current_fleet_state();
        assert_eq!(state.len(), 1);
        assert_eq!(state["A"].sensors.battery_percentage(), Some(12.0));
    }

    #[test]
    fn test_auto_select_then_operator_switch() {
        let mut session = FleetSession::default();
        session.handle(SessionEvent::FleetUpdate(record("B1"))).unwrap();
        assert_eq!(session.current_selection().as_deref(), Some("B1"));
        assert_eq!(session.current_history().len(), 1);

        session.handle(SessionEvent::FleetUpdate(record("B2"))).unwrap();
        assert_eq!(session.current_selection().as_deref(), Some("B1"));

        let update = session.select("B2");
        assert!(matches!(
            update,
            Some(SessionUpdate::Selection { automatic: false, .. })
        ));
        assert_eq!(session.current_selection().as_deref(), Some("B2"));
        assert!(session.current_history().is_empty());
    }

    #[test]
    fn test_reselect_keeps_history() {
        let mut session = FleetSession::default();
        for _ in 0..3 {
            session.handle(SessionEvent::FleetUpdate(record("V1"))).unwrap();
        }
        assert!(session.select("V1").is_none());
        assert_eq!(session.current_history().len(), 3);
    }

    #[test]
    fn test_history_only_for_selected() {
        let mut session = FleetSession::default();
        session.handle(SessionEvent::FleetUpdate(record("V1"))).unwrap();
        let updates = session
            .handle(SessionEvent::TelemetryUpdate(record("V2")))
            .unwrap();
        assert_eq!(
            updates,
            vec![SessionUpdate::Vessel {
                vessel_id: "V2".to_string(),
                first_seen: true,
                history_appended: false,
            }]
        );
        session.handle(SessionEvent::TelemetryUpdate(record("V1"))).unwrap();

        let history = session.current_history();
        assert_eq!(history.len(), 2);
        assert!(history.iter().all(|r| r.vessel_id == "V1"));
    }

    #[test]
    fn test_history_bound_from_limits() {
        let mut session = FleetSession::new(SessionLimits {
            history_capacity: 4,
            alert_capacity: 2,
        });
        for i in 0..9 {
            session
                .handle(SessionEvent::FleetUpdate(with_battery("V1", i as f64)))
                .unwrap();
        }
        let pcts: Vec<f64> = session
            .current_history()
            .iter()
            .filter_map(|r| r.sensors.battery_percentage())
            .collect();
        assert_eq!(pcts, vec![5.0, 6.0, 7.0, 8.0]);
    }

    #[test]
    fn test_empty_id_rejected_without_side_effects() {
        let mut session = FleetSession::default();
        let result = session.handle(SessionEvent::FleetUpdate(record("")));
        assert_eq!(result, Err(IngestError::MissingVesselId));
        assert_eq!(session.current_selection(), None);
        assert!(session.current_fleet_state().is_empty());
    }

    #[test]
    fn test_alerts_and_summary() {
        let mut session = FleetSession::default();
        session.handle(SessionEvent::Connected).unwrap();
        session.handle(SessionEvent::FleetUpdate(record("V1"))).unwrap();
        for n in 0..15 {
            session
                .handle(SessionEvent::AlertTriggered(Alert::new(
                    "V1",
                    "critical",
                    format!("#{}", n),
                    Utc::now(),
                )))
                .unwrap();
        }

        let alerts = session.current_alerts();
        assert_eq!(alerts.len(), 10);
        assert_eq!(alerts[0].message, "#14");
        assert_eq!(session.alerts_for("V2").len(), 0);

        let summary = session.summary();
        assert_eq!(summary.total_vessels, 1);
        assert_eq!(summary.online_vessels, 1);
        assert_eq!(summary.critical_alerts, 10);
        assert_eq!(summary.selected.as_deref(), Some("V1"));
    }

    #[test]
    fn test_connectivity_transitions() {
        let mut session = FleetSession::default();
        assert!(!session.connectivity().connected);

        let updates = session.handle(SessionEvent::Connected).unwrap();
        assert_eq!(updates.len(), 1);
        assert!(session.handle(SessionEvent::Connected).unwrap().is_empty());

        session.handle(SessionEvent::Disconnected).unwrap();
        assert!(!session.connectivity().connected);
        assert!(!session.connectivity().gave_up);

        session.handle(SessionEvent::ReconnectExhausted).unwrap();
        assert!(session.connectivity().gave_up);
        session.handle(SessionEvent::Disconnected).unwrap();
        assert!(session.connectivity().gave_up);
    }

    #[test]
    fn test_sessions_are_isolated() {
        let mut a = FleetSession::default();
        let b = FleetSession::default();
        a.handle(SessionEvent::FleetUpdate(record("V1"))).unwrap();
        assert!(b.current_fleet_state().is_empty());
        assert_eq!(b.current_selection(), None);
    }
}
