//! AquaFeed client core - session, tenant selection, and the REST gateway
//! for the multi-tenant aquarium / IoT-feeder administration product.
//!
//! Screens consume three handles: [`SessionManager`] for authentication
//! state, [`TenantSelector`] for the active company, and [`ApiClient`] for
//! everything else. The pieces communicate only through [`bus::SignalBus`]
//! broadcasts, so each can be constructed and tested on its own; [`Core`]
//! wires them together in dependency order for real shells.

pub mod api;
pub mod auth;
pub mod bus;
pub mod config;
pub mod models;
pub mod tenant;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tokio::task::JoinHandle;

pub use api::{ApiClient, ApiError};
pub use auth::{SessionManager, SessionState, TokenStore};
pub use bus::{AuthSignal, SignalBus};
pub use config::Config;
pub use tenant::TenantSelector;

/// The wired-up client core, one instance per process.
pub struct Core {
    pub bus: SignalBus,
    pub api: ApiClient,
    pub session: Arc<SessionManager>,
    pub tenants: Arc<TenantSelector>,
}

impl Core {
    /// Construct the core from configuration: bus, token store, gateway,
    /// session manager, tenant selector, in that order.
    pub fn bootstrap(config: &Config) -> Result<Self> {
        Self::bootstrap_in(config.state_dir()?, &config.api_url())
    }

    /// Construct the core against an explicit state directory and backend
    /// URL. Shells use [`Core::bootstrap`]; tests point this at temp dirs
    /// and mock servers.
    pub fn bootstrap_in(state_dir: PathBuf, api_url: &str) -> Result<Self> {
        let bus = SignalBus::new();
        let store = Arc::new(TokenStore::new(state_dir.clone()));
        let api = ApiClient::new(api_url, Arc::clone(&store), bus.clone())?;
        // Subscribe before the session resolves its initial state, so a
        // logout emitted on the expired-token branch is not lost.
        let mut startup_rx = bus.subscribe();
        let session = Arc::new(SessionManager::new(api.clone(), store, bus.clone()));
        let tenants = Arc::new(TenantSelector::new(state_dir, bus.clone()));
        // The selector only subscribes once its listener task runs; replay
        // any teardown that happened during construction so a restored
        // selection cannot outlive a session that resolved to expired.
        while let Ok(signal) = startup_rx.try_recv() {
            if signal == AuthSignal::UserLoggedOut {
                tenants.clear();
            }
        }
        Ok(Self {
            bus,
            api,
            session,
            tenants,
        })
    }

    /// Start the two signal subscriptions: the session manager reacting to
    /// `LogoutRequested` and the tenant selector reacting to
    /// `UserLoggedOut`. The handles live until the process exits.
    pub fn spawn_listeners(&self) -> (JoinHandle<()>, JoinHandle<()>) {
        (
            tokio::spawn(Arc::clone(&self.session).listen()),
            tokio::spawn(Arc::clone(&self.tenants).listen()),
        )
    }
}
