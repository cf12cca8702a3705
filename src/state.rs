use std::path::PathBuf;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::bridge::DispatchBridge;
use crate::registry::Catalog;
use crate::session::SessionTable;
use crate::settings::BridgeSettings;

// ── Server State ───────────────────────────────────────────────────

/// Everything the transport surfaces share. The host itself is not here: it
/// lives on the host thread, reachable only through the bridge.
pub struct ServerState {
    pub catalog: Arc<Catalog>,
    pub bridge: DispatchBridge,
    pub settings: BridgeSettings,
    pub project_dir: PathBuf,
    pub started_at: DateTime<Utc>,
    /// Port the HTTP surface is bound to (0 = not serving).
    pub api_port: AtomicU16,
}

impl ServerState {
    pub fn new(
        catalog: Arc<Catalog>,
        bridge: DispatchBridge,
        settings: BridgeSettings,
        project_dir: PathBuf,
    ) -> Self {
        Self {
            catalog,
            bridge,
            settings,
            project_dir,
            started_at: Utc::now(),
            api_port: AtomicU16::new(0),
        }
    }

    pub fn sessions(&self) -> &Arc<SessionTable> {
        self.bridge.sessions()
    }

    pub fn port(&self) -> u16 {
        self.api_port.load(Ordering::Relaxed)
    }

    pub fn set_port(&self, port: u16) {
        self.api_port.store(port, Ordering::Relaxed);
    }
}
