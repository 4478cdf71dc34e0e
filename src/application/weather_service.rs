// Weather service - lookups keyed by the displayed location, stale results dropped
use crate::application::weather_provider::{WeatherError, WeatherProvider};
use crate::domain::weather::{CurrentWeather, LocationKey, WeatherState};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackOutcome {
    Unchanged,
    Cleared,
    Fetch(LocationKey),
}

/// Which location the dashboard currently shows and what we know about it
#[derive(Debug)]
pub struct WeatherTracker {
    state: WeatherState,
}

impl WeatherTracker {
    pub fn new() -> Self {
        Self {
            state: WeatherState::Idle,
        }
    }

    pub fn state(&self) -> &WeatherState {
        &self.state
    }

    fn current_key(&self) -> Option<&LocationKey> {
        match &self.state {
            WeatherState::Idle => None,
            WeatherState::Loading { key }
            | WeatherState::Ready { key, .. }
            | WeatherState::Unavailable { key } => Some(key),
        }
    }

    /// A settled lookup for the same key is only repeated through `refresh`
    pub fn track(&mut self, key: Option<LocationKey>) -> TrackOutcome {
        if key.as_ref() == self.current_key() {
            return TrackOutcome::Unchanged;
        }
        match key {
            None => {
                self.state = WeatherState::Idle;
                TrackOutcome::Cleared
            }
            Some(key) => {
                self.state = WeatherState::Loading { key: key.clone() };
                TrackOutcome::Fetch(key)
            }
        }
    }

    /// Operator-requested lookup for the current key. Nothing happens while
    /// idle or while a lookup is already running.
    pub fn refresh(&mut self) -> TrackOutcome {
        let key = match &self.state {
            WeatherState::Ready { key, .. } | WeatherState::Unavailable { key } => key.clone(),
            WeatherState::Idle | WeatherState::Loading { .. } => return TrackOutcome::Unchanged,
        };
        self.state = WeatherState::Loading { key: key.clone() };
        TrackOutcome::Fetch(key)
    }

    /// Returns false when the response belongs to a location no longer shown
    pub fn resolve(
        &mut self,
        key: &LocationKey,
        result: Result<CurrentWeather, WeatherError>,
    ) -> bool {
        if self.current_key() != Some(key) {
            tracing::debug!(key = key.as_str(), "discarding stale weather response");
            return false;
        }
        self.state = match result {
            Ok(weather) => WeatherState::Ready {
                key: key.clone(),
                weather,
            },
            Err(e) => {
                tracing::warn!(key = key.as_str(), error = %e, "weather lookup failed");
                WeatherState::Unavailable { key: key.clone() }
            }
        };
        true
    }
}

impl Default for WeatherTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Tracker, running lookup and the position it was asked for, all behind one lock
#[derive(Default)]
struct Lookup {
    tracker: WeatherTracker,
    inflight: Option<JoinHandle<()>>,
    coordinates: Option<(f64, f64)>,
    revision: Option<u64>,
}

impl Lookup {
    fn abort_inflight(&mut self) {
        if let Some(handle) = self.inflight.take() {
            handle.abort();
        }
    }
}

pub struct WeatherService {
    provider: Arc<dyn WeatherProvider>,
    lookup: Arc<Mutex<Lookup>>,
}

impl WeatherService {
    pub fn new(provider: Arc<dyn WeatherProvider>) -> Self {
        Self {
            provider,
            lookup: Arc::new(Mutex::new(Lookup::default())),
        }
    }

    pub async fn state(&self) -> WeatherState {
        self.lookup.lock().await.tracker.state().clone()
    }

    /// Called whenever the displayed coordinates may have moved. `revision`
    /// orders callers; a call older than one already applied is ignored.
    pub async fn on_coordinates(&self, revision: u64, coordinates: Option<(f64, f64)>) {
        let mut lookup = self.lookup.lock().await;
        if lookup.revision.is_some_and(|applied| applied > revision) {
            tracing::trace!(revision, "ignoring superseded weather location");
            return;
        }
        lookup.revision = Some(revision);

        let key = coordinates.and_then(|(lat, lon)| LocationKey::from_coordinates(lat, lon));
        match lookup.tracker.track(key) {
            TrackOutcome::Unchanged => {}
            TrackOutcome::Cleared => {
                lookup.abort_inflight();
                lookup.coordinates = None;
            }
            TrackOutcome::Fetch(key) => {
                if let Some(coordinates) = coordinates {
                    lookup.coordinates = Some(coordinates);
                    self.start(&mut lookup, key, coordinates);
                }
            }
        }
    }

    /// Re-run the lookup for the location currently shown.
    /// Returns true when a new lookup was started.
    pub async fn refresh(&self) -> bool {
        let mut lookup = self.lookup.lock().await;
        let Some(coordinates) = lookup.coordinates else {
            return false;
        };
        match lookup.tracker.refresh() {
            TrackOutcome::Fetch(key) => {
                self.start(&mut lookup, key, coordinates);
                true
            }
            _ => false,
        }
    }

    fn start(&self, lookup: &mut Lookup, key: LocationKey, (latitude, longitude): (f64, f64)) {
        lookup.abort_inflight();

        tracing::debug!(key = key.as_str(), "starting weather lookup");
        let provider = self.provider.clone();
        let shared = self.lookup.clone();
        lookup.inflight = Some(tokio::spawn(async move {
            let result = provider.current(latitude, longitude).await;
            shared.lock().await.tracker.resolve(&key, result);
        }));
    }

    /// Wait for the current lookup, if any, to finish
    #[cfg(test)]
    pub async fn settle(&self) {
        let handle = self.lookup.lock().await.inflight.take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn weather(temp: f64) -> CurrentWeather {
        CurrentWeather {
            temperature_2m: Some(temp),
            relative_humidity_2m: None,
            rain: None,
            wind_speed_10m: None,
        }
    }

    /// Echoes the latitude back as the temperature
    struct EchoProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl WeatherProvider for EchoProvider {
        async fn current(&self, latitude: f64, _longitude: f64) -> Result<CurrentWeather, WeatherError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(weather(latitude))
        }
    }

    /// Never answers for negative latitudes
    struct StallingProvider;

    #[async_trait]
    impl WeatherProvider for StallingProvider {
        async fn current(&self, latitude: f64, _longitude: f64) -> Result<CurrentWeather, WeatherError> {
            if latitude < 0.0 {
                std::future::pending::<()>().await;
            }
            Ok(weather(latitude))
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl WeatherProvider for FailingProvider {
        async fn current(&self, _latitude: f64, _longitude: f64) -> Result<CurrentWeather, WeatherError> {
            Err(WeatherError::MissingCurrent)
        }
    }

    fn key(lat: f64, lon: f64) -> LocationKey {
        LocationKey::from_coordinates(lat, lon).unwrap()
    }

    #[test]
    fn test_tracker_discards_stale_response() {
        let mut tracker = WeatherTracker::new();
        let first = key(10.0, 20.0);
        let second = key(11.0, 20.0);

        assert_eq!(tracker.track(Some(first.clone())), TrackOutcome::Fetch(first.clone()));
        assert_eq!(tracker.track(Some(second.clone())), TrackOutcome::Fetch(second.clone()));

        assert!(!tracker.resolve(&first, Ok(weather(1.0))));
        assert_eq!(tracker.state(), &WeatherState::Loading { key: second.clone() });

        assert!(tracker.resolve(&second, Ok(weather(2.0))));
        assert!(matches!(tracker.state(), WeatherState::Ready { .. }));
    }

    #[test]
    fn test_tracker_failure_is_unavailable_without_retry() {
        let mut tracker = WeatherTracker::new();
        let k = key(10.0, 20.0);
        tracker.track(Some(k.clone()));
        assert!(tracker.resolve(&k, Err(WeatherError::MissingCurrent)));
        assert_eq!(tracker.state(), &WeatherState::Unavailable { key: k.clone() });
        assert_eq!(tracker.track(Some(k)), TrackOutcome::Unchanged);
    }

    #[test]
    fn test_tracker_clears_without_location() {
        let mut tracker = WeatherTracker::new();
        assert_eq!(tracker.track(None), TrackOutcome::Unchanged);
        tracker.track(Some(key(10.0, 20.0)));
        assert_eq!(tracker.track(None), TrackOutcome::Cleared);
        assert_eq!(tracker.state(), &WeatherState::Idle);
    }

    #[tokio::test]
    async fn test_service_fetches_once_per_location() {
        let provider = Arc::new(EchoProvider {
            calls: AtomicUsize::new(0),
        });
        let service = WeatherService::new(provider.clone());

        service.on_coordinates(1, Some((12.5, 80.0))).await;
        service.settle().await;
        service.on_coordinates(2, Some((12.50001, 80.0))).await;
        service.settle().await;

        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        match service.state().await {
            WeatherState::Ready { weather, .. } => assert_eq!(weather.temperature_2m, Some(12.5)),
            other => panic!("unexpected state {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_service_moves_past_stalled_lookup() {
        let service = WeatherService::new(Arc::new(StallingProvider));

        service.on_coordinates(1, Some((-5.0, 80.0))).await;
        assert!(matches!(service.state().await, WeatherState::Loading { .. }));

        service.on_coordinates(2, Some((7.0, 80.0))).await;
        service.settle().await;

        assert_eq!(
            service.state().await,
            WeatherState::Ready {
                key: key(7.0, 80.0),
                weather: weather(7.0),
            }
        );
    }

    #[tokio::test]
    async fn test_service_swallows_failures() {
        let service = WeatherService::new(Arc::new(FailingProvider));
        service.on_coordinates(1, Some((7.0, 80.0))).await;
        service.settle().await;
        assert_eq!(
            service.state().await,
            WeatherState::Unavailable { key: key(7.0, 80.0) }
        );
    }

    #[tokio::test]
    async fn test_service_ignores_missing_coordinates() {
        let provider = Arc::new(EchoProvider {
            calls: AtomicUsize::new(0),
        });
        let service = WeatherService::new(provider.clone());
        service.on_coordinates(1, None).await;
        service.on_coordinates(2, Some((0.0, 0.0))).await;
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
        assert_eq!(service.state().await, WeatherState::Idle);
    }

    #[test]
    fn test_tracker_refresh_only_when_settled() {
        let mut tracker = WeatherTracker::new();
        assert_eq!(tracker.refresh(), TrackOutcome::Unchanged);

        let k = key(10.0, 20.0);
        tracker.track(Some(k.clone()));
        assert_eq!(tracker.refresh(), TrackOutcome::Unchanged);

        tracker.resolve(&k, Err(WeatherError::MissingCurrent));
        assert_eq!(tracker.refresh(), TrackOutcome::Fetch(k.clone()));
        assert_eq!(tracker.state(), &WeatherState::Loading { key: k });
    }

    #[tokio::test]
    async fn test_service_refresh_refetches_current_location() {
        let provider = Arc::new(EchoProvider {
            calls: AtomicUsize::new(0),
        });
        let service = WeatherService::new(provider.clone());
        assert!(!service.refresh().await);

        service.on_coordinates(1, Some((12.5, 80.0))).await;
        service.settle().await;
        assert!(service.refresh().await);
        service.settle().await;

        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
        assert!(matches!(service.state().await, WeatherState::Ready { .. }));
    }

    #[tokio::test]
    async fn test_service_ignores_superseded_location() {
        let service = WeatherService::new(Arc::new(StallingProvider));

        service.on_coordinates(2, Some((7.0, 80.0))).await;
        service.on_coordinates(1, Some((-5.0, 80.0))).await;
        service.settle().await;

        assert_eq!(
            service.state().await,
            WeatherState::Ready {
                key: key(7.0, 80.0),
                weather: weather(7.0),
            }
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_service_concurrent_moves_end_on_latest() {
        for _ in 0..50 {
            let service = Arc::new(WeatherService::new(Arc::new(StallingProvider)));
            let older = {
                let service = service.clone();
                tokio::spawn(async move { service.on_coordinates(1, Some((-5.0, 80.0))).await })
            };
            let newer = {
                let service = service.clone();
                tokio::spawn(async move { service.on_coordinates(2, Some((7.0, 80.0))).await })
            };
            older.await.unwrap();
            newer.await.unwrap();
            service.settle().await;

            assert_eq!(
                service.state().await,
                WeatherState::Ready {
                    key: key(7.0, 80.0),
                    weather: weather(7.0),
                }
            );
        }
    }
}
