// Application state for HTTP handlers
use crate::application::live_session::LiveSession;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub session: Arc<LiveSession>,
}
