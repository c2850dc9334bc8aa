use std::sync::Arc;

use axum::extract::FromRef;

use crate::{
    clients::Collaborators, config::Config, engine::timer::Clock, registry::SessionRegistry,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub collaborators: Collaborators,
    pub clock: Arc<dyn Clock>,
    pub sessions: SessionRegistry,
}

impl FromRef<AppState> for SessionRegistry {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
