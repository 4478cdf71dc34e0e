// Live session - async shell around the fleet session
use crate::application::fleet_store::IngestError;
use crate::application::session::{FleetSession, SessionEvent, SessionLimits, SessionUpdate};
use crate::application::weather_service::WeatherService;
use crate::domain::weather::WeatherState;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

const UPDATE_CHANNEL_CAPACITY: usize = 256;

/// Mutations take the write lock only for the synchronous state change,
/// never across an await, so one event is applied at a time. Each mutation
/// draws a revision under that lock so weather moves follow the same order.
pub struct LiveSession {
    session: RwLock<FleetSession>,
    revision: AtomicU64,
    updates: broadcast::Sender<SessionUpdate>,
    weather: Option<WeatherService>,
}

impl LiveSession {
    pub fn new(limits: SessionLimits, weather: Option<WeatherService>) -> Arc<Self> {
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Arc::new(Self {
            session: RwLock::new(FleetSession::new(limits)),
            revision: AtomicU64::new(0),
            updates,
            weather,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionUpdate> {
        self.updates.subscribe()
    }

    pub async fn dispatch(&self, event: SessionEvent) -> Result<(), IngestError> {
        let (updates, revision, coordinates) = {
            let mut session = self.session.write().await;
            let updates = session.handle(event)?;
            (updates, self.next_revision(), selected_coordinates(&session))
        };

        self.publish(updates);
        self.refresh_weather(revision, coordinates).await;
        Ok(())
    }

    /// Returns true when the selection actually moved
    pub async fn select(&self, vessel_id: &str) -> bool {
        let (update, revision, coordinates) = {
            let mut session = self.session.write().await;
            let update = session.select(vessel_id);
            (update, self.next_revision(), selected_coordinates(&session))
        };

        let switched = update.is_some();
        self.publish(update.into_iter().collect());
        self.refresh_weather(revision, coordinates).await;
        switched
    }

    /// Operator-requested weather lookup for the displayed location
    pub async fn refresh_weather_now(&self) -> bool {
        match &self.weather {
            Some(weather) => weather.refresh().await,
            None => false,
        }
    }

    /// Run a read-only query against the current state
    pub async fn read<R>(&self, query: impl FnOnce(&FleetSession) -> R) -> R {
        let session = self.session.read().await;
        query(&session)
    }

    pub async fn weather(&self) -> WeatherState {
        match &self.weather {
            Some(weather) => weather.state().await,
            None => WeatherState::Idle,
        }
    }

    fn publish(&self, updates: Vec<SessionUpdate>) {
        for update in updates {
            // No subscribers is fine
            let _ = self.updates.send(update);
        }
    }

    // Only called while holding the session write lock
    fn next_revision(&self) -> u64 {
        self.revision.fetch_add(1, Ordering::Relaxed)
    }

    async fn refresh_weather(&self, revision: u64, coordinates: Option<(f64, f64)>) {
        if let Some(weather) = &self.weather {
            weather.on_coordinates(revision, coordinates).await;
        }
    }
}

fn selected_coordinates(session: &FleetSession) -> Option<(f64, f64)> {
    session
        .selected_record()
        .and_then(|r| r.location.as_ref())
        .and_then(|l| l.coordinates())
}
