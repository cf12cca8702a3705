//! The host mutation thread.

use std::io;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::info;

use crate::bridge::{CommandPump, DrainReport};
use crate::host::Host;
use crate::registry::HandlerRegistry;

pub const HOST_THREAD_NAME: &str = "host-main";

/// Owns the host, the registry and the queue consumer. Everything that
/// touches the host graph happens inside [`HostLoop::tick`].
pub struct HostLoop<H> {
    host: H,
    registry: HandlerRegistry,
    pump: CommandPump,
    tick_interval: Duration,
}

impl<H: Host> HostLoop<H> {
    pub fn new(host: H, registry: HandlerRegistry, pump: CommandPump, tick_interval: Duration) -> Self {
        Self {
            host,
            registry,
            pump,
            tick_interval,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// One host frame: advance the host, then drain the queue.
    pub fn tick(&mut self) -> DrainReport {
        self.host.tick();
        self.pump.drain(&self.registry, &mut self.host)
    }

    /// Tick at a fixed interval until the bridge shuts down, then hand the
    /// host back.
    pub fn run(mut self) -> H {
        info!(tick_ms = self.tick_interval.as_millis(), "host loop started");
        while !self.pump.is_shut_down() {
            let started = Instant::now();
            self.tick();
            if let Some(rest) = self.tick_interval.checked_sub(started.elapsed()) {
                thread::sleep(rest);
            }
        }
        info!("host loop stopped");
        self.host
    }
}

impl<H: Host + 'static> HostLoop<H> {
    /// Run the loop on its own named thread.
    pub fn spawn(self) -> io::Result<JoinHandle<H>> {
        thread::Builder::new()
            .name(HOST_THREAD_NAME.to_string())
            .spawn(move || self.run())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::bridge::DispatchBridge;
    use crate::command::{Arguments, Command};
    use crate::host::{HeadlessHost, NodePath, ResPath};
    use crate::registry::Catalog;
    use crate::session::SessionTable;
    use crate::value::NativeValue;

    fn parts() -> (tempfile::TempDir, DispatchBridge, HostLoop<HeadlessHost>) {
        let dir = tempfile::tempdir().unwrap();
        let mut host = HeadlessHost::open(dir.path()).unwrap();
        host.new_scene(&ResPath::parse("res://main.tscn").unwrap(), "Node2D")
            .unwrap();
        let (bridge, pump) = DispatchBridge::new(Arc::new(SessionTable::new()));
        let registry = HandlerRegistry::new(Arc::new(Catalog::new()));
        let host_loop = HostLoop::new(host, registry, pump, Duration::from_millis(2));
        (dir, bridge, host_loop)
    }

    #[test]
    fn tick_advances_host_even_when_idle() {
        let (_dir, _bridge, mut host_loop) = parts();
        assert_eq!(host_loop.tick(), DrainReport::default());
        host_loop.tick();
        assert_eq!(host_loop.host().editor_state().ticks, 2);
    }

    #[tokio::test]
    async fn spawned_loop_serves_submissions_until_shutdown() {
        let (_dir, bridge, host_loop) = parts();
        let handle = host_loop.spawn().unwrap();

        let args: Arguments = [("type", NativeValue::from("Camera2D"))].into_iter().collect();
        let result = bridge
            .submit(Command::new("create_node", args), Duration::from_secs(5))
            .await;
        assert!(result.is_success(), "{result:?}");

        bridge.shutdown();
        let host = tokio::task::spawn_blocking(move || handle.join().unwrap())
            .await
            .unwrap();
        assert!(host.node(&NodePath::parse("/root/Camera2D").unwrap()).is_ok());
        assert!(host.editor_state().ticks > 0);
    }
}
