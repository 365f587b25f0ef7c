//! The trogdor coordinator: the central daemon that fans faults out to the
//! agents.
//!
//! The coordinator schedules faults with the same start-time idiom as the
//! agent, but never activates anything itself: when a fault comes due it is
//! handed to the [`node_manager::NodeManager`] of every target node, which
//! delivers it over REST with unbounded retry.

pub mod http;
pub mod node_manager;

use std::{collections::BTreeMap, net::SocketAddr, sync::Arc, time::Duration};

use futures::future::join_all;
use platform::{
    fault::{FaultSet, MAX_SCHEDULER_SLEEP_MS},
    wire::{AddFaultRequest, FaultRecord, NodeReport, NodesResponse, ServerStatus},
    Platform, PlatformError,
};
use support::{clock::Clock, time::wall_clock_ms_to_str};
use tokio::{
    sync::{Mutex, Notify},
    task::JoinHandle,
    time::timeout,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::node_manager::NodeManager;

pub use crate::node_manager::DEFAULT_HEARTBEAT_MS;

struct CoordinatorState {
    faults: FaultSet,
    closing: bool,
}

/// The coordinator daemon. Shared between the scheduler task and the HTTP
/// handlers through an `Arc`.
pub struct Coordinator {
    clock: Arc<dyn Clock>,
    platform: Arc<Platform>,
    port: u16,
    started_time_ms: i64,
    state: Mutex<CoordinatorState>,
    wake: Notify,
    shutdown: CancellationToken,
    managers: BTreeMap<String, Arc<NodeManager>>,
    manager_tasks: std::sync::Mutex<Vec<(String, JoinHandle<()>)>>,
}

/// The long-lived tasks of a started coordinator.
pub struct CoordinatorHandle {
    pub local_addr: SocketAddr,
    coordinator: Arc<Coordinator>,
    scheduler: JoinHandle<()>,
    server: JoinHandle<()>,
}

impl CoordinatorHandle {
    /// Block until the coordinator has shut down and every task has exited.
    pub async fn wait_for_exit(self) {
        let _ = self.scheduler.await;
        let _ = self.server.await;
        let tasks = {
            let mut tasks = self
                .coordinator
                .manager_tasks
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            std::mem::take(&mut *tasks)
        };
        let names: Vec<String> = tasks.iter().map(|(name, _)| name.clone()).collect();
        let results = join_all(tasks.into_iter().map(|(_, task)| task)).await;
        for (name, result) in names.iter().zip(results) {
            if let Err(err) = result {
                warn!("node_manager({name}) task failed: {err}");
                if let Some(manager) = self.coordinator.managers.get(name) {
                    manager.reset_comms();
                }
            }
        }
    }
}

impl Coordinator {
    /// Create the coordinator and spawn one NodeManager per node that has an
    /// agent port. Must be called on the runtime.
    pub fn new(
        clock: Arc<dyn Clock>,
        platform: Arc<Platform>,
        port: u16,
        heartbeat_ms: i64,
    ) -> Arc<Self> {
        let mut managers = BTreeMap::new();
        let mut manager_tasks = Vec::new();
        for node in platform.topology.nodes() {
            if let Some(agent_port) = node.trogdor_agent_port {
                let (manager, task) =
                    NodeManager::spawn(clock.clone(), node.clone(), agent_port, heartbeat_ms);
                managers.insert(node.name.clone(), manager);
                manager_tasks.push((node.name.clone(), task));
            }
        }
        let started_time_ms = clock.now_ms();
        Arc::new(Self {
            clock,
            platform,
            port,
            started_time_ms,
            state: Mutex::new(CoordinatorState {
                faults: FaultSet::new(),
                closing: false,
            }),
            wake: Notify::new(),
            shutdown: CancellationToken::new(),
            managers,
            manager_tasks: std::sync::Mutex::new(manager_tasks),
        })
    }

    /// Bind the REST listener and spawn the scheduler and server tasks.
    pub async fn start(self: &Arc<Self>) -> Result<CoordinatorHandle, PlatformError> {
        let listener = platform::http::bind(self.port).await?;
        let local_addr = listener.local_addr()?;
        info!("starting trogdor coordinator on {local_addr}");
        let scheduler = tokio::spawn(self.clone().run_scheduler());
        let router = http::router(self.clone());
        let shutdown = self.shutdown.clone();
        let server = tokio::spawn(async move {
            if let Err(err) = platform::http::serve(listener, router, shutdown).await {
                warn!("coordinator http server error: {err}");
            }
        });
        Ok(CoordinatorHandle {
            local_addr,
            coordinator: self.clone(),
            scheduler,
            server,
        })
    }

    /// The fan-out scheduler. Due faults are handed to every target node's
    /// manager and marked finished; delivery and retry happen on the manager
    /// tasks.
    async fn run_scheduler(self: Arc<Self>) {
        loop {
            let now = self.clock.now_ms();
            let (to_dispatch, next_wakeup) = {
                let state = self.state.lock().await;
                state.faults.due_to_start(now)
            };
            for fault in to_dispatch {
                let request = AddFaultRequest::new(fault.name(), fault.spec().to_value());
                fault.finish();
                // no node selector in the spec yet: every managed node is a
                // target
                for manager in self.managers.values() {
                    manager.enqueue(request.clone()).await;
                }
                debug!(
                    "dispatched fault '{}' to {} nodes",
                    fault.name(),
                    self.managers.len()
                );
            }
            {
                let state = self.state.lock().await;
                if state.closing {
                    break;
                }
                let delta = (next_wakeup - now).clamp(0, MAX_SCHEDULER_SLEEP_MS) as u64;
                trace!("{now}: waiting for {delta} ms");
                drop(state);
                let _ = timeout(Duration::from_millis(delta), self.wake.notified()).await;
            }
        }
        for manager in self.managers.values() {
            manager.begin_shutdown().await;
        }
        info!("trogdor coordinator exiting");
        self.shutdown.cancel();
    }

    pub fn status(&self) -> ServerStatus {
        ServerStatus {
            started_time_ms: self.started_time_ms,
            started_time_str: wall_clock_ms_to_str(self.started_time_ms),
        }
    }

    /// The coordinator's own view of its faults, in start-time order.
    pub async fn faults(&self) -> Vec<FaultRecord> {
        let state = self.state.lock().await;
        state
            .faults
            .by_start_time()
            .map(|fault| fault.to_record())
            .collect()
    }

    /// The status of every configured node.
    pub fn nodes(&self) -> NodesResponse {
        let mut nodes = BTreeMap::new();
        for node in self.platform.topology.nodes() {
            let report = match self.managers.get(&node.name) {
                Some(manager) => {
                    let status = manager.status();
                    NodeReport {
                        hostname: node.hostname.clone(),
                        agent_port: node.trogdor_agent_port,
                        faults: status.faults,
                        last_contact: status.last_comms_ms,
                    }
                }
                None => NodeReport {
                    hostname: node.hostname.clone(),
                    agent_port: node.trogdor_agent_port,
                    faults: Vec::new(),
                    last_contact: 0,
                },
            };
            nodes.insert(node.name.clone(), report);
        }
        NodesResponse { nodes }
    }

    /// Ingest a new fault for fan-out and wake the scheduler.
    pub async fn add_fault(&self, request: &AddFaultRequest) -> Result<(), PlatformError> {
        let now = self.clock.now_ms();
        let (name, spec) = request.resolve_spec(now)?;
        let fault = self.platform.create_fault(&name, spec)?;
        let mut state = self.state.lock().await;
        if state.closing {
            return Err(PlatformError::Ingest(
                "the coordinator is shutting down".to_owned(),
            ));
        }
        if state.faults.contains_name(&name) {
            return Err(PlatformError::Ingest(format!(
                "a fault named '{name}' already exists"
            )));
        }
        state.faults.insert(fault);
        self.wake.notify_one();
        Ok(())
    }

    /// Request shutdown. Idempotent.
    pub async fn begin_shutdown(&self) {
        let mut state = self.state.lock().await;
        if state.closing {
            return;
        }
        info!(
            "shutting down trogdor coordinator {} by request",
            std::process::id()
        );
        state.closing = true;
        self.wake.notify_one();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::BTreeMap;

    use platform::{
        config::DEFAULT_MODULES,
        fault::FaultState,
        registry::FaultRegistry,
        topology::{Node, Topology},
    };
    use serde_json::json;
    use support::{clock::WallClock, util::wait_until};
    use trogdor_agent::Agent;

    use super::*;

    pub(crate) fn test_node(name: &str, agent_port: u16) -> Node {
        Node {
            name: name.to_owned(),
            hostname: "127.0.0.1".to_owned(),
            trogdor_agent_port: Some(agent_port),
            trogdor_coordinator_port: None,
            tags: vec![],
        }
    }

    pub(crate) fn test_platform(agent_port: u16) -> Arc<Platform> {
        let registry = Arc::new(
            FaultRegistry::with_modules(
                &DEFAULT_MODULES
                    .iter()
                    .map(|name| name.to_string())
                    .collect::<Vec<_>>(),
            )
            .unwrap(),
        );
        let node = test_node("node01", agent_port);
        let topology = Topology::new(BTreeMap::from([(node.name.clone(), node)]));
        Arc::new(Platform::new("basic_platform", topology, registry))
    }

    #[tokio::test]
    async fn fan_out_should_deliver_a_due_fault_to_every_agent() {
        let agent = Agent::new(Arc::new(WallClock), test_platform(8888), 0);
        let agent_handle = agent.start().await.unwrap();
        let agent_port = agent_handle.local_addr.port();

        let coordinator = Coordinator::new(
            Arc::new(WallClock),
            test_platform(agent_port),
            0,
            100,
        );
        let handle = coordinator.start().await.unwrap();

        coordinator
            .add_fault(&AddFaultRequest::new(
                "f1",
                json!({ "kind": "NoOpFault", "start_ms": 0, "duration_ms": 0 }),
            ))
            .await
            .unwrap();

        let delivered = wait_until(Duration::from_secs(5), || async move {
            client::get_agent_faults("127.0.0.1", agent_port)
                .await
                .map(|faults| faults.len() == 1)
                .unwrap_or(false)
        })
        .await;
        assert!(delivered);

        // hand-off marks the coordinator's copy finished
        let faults = coordinator.faults().await;
        assert_eq!(faults.len(), 1);
        assert_eq!(faults[0].status.state, FaultState::Finished);

        let nodes = coordinator.nodes();
        let report = nodes.nodes.get("node01").unwrap();
        assert_eq!(report.agent_port, Some(agent_port));
        assert_eq!(report.faults.len(), 1);
        assert!(report.last_contact > 0);

        coordinator.begin_shutdown().await;
        tokio::time::timeout(Duration::from_secs(5), handle.wait_for_exit())
            .await
            .unwrap();
        agent.begin_shutdown().await;
        agent_handle.wait_for_exit().await;
    }

    #[tokio::test]
    async fn a_future_fault_should_stay_pending_until_its_start() {
        let agent = Agent::new(Arc::new(WallClock), test_platform(8888), 0);
        let agent_handle = agent.start().await.unwrap();
        let agent_port = agent_handle.local_addr.port();

        let coordinator = Coordinator::new(
            Arc::new(WallClock),
            test_platform(agent_port),
            0,
            100,
        );
        let handle = coordinator.start().await.unwrap();

        // a start far in the future never dispatches during this test
        coordinator
            .add_fault(&AddFaultRequest::new(
                "later",
                json!({ "kind": "NoOpFault", "start_ms": i64::MAX - 1_000_000, "duration_ms": 0 }),
            ))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        let faults = coordinator.faults().await;
        assert_eq!(faults[0].status.state, FaultState::Pending);
        assert!(client::get_agent_faults("127.0.0.1", agent_port)
            .await
            .unwrap()
            .is_empty());

        coordinator.begin_shutdown().await;
        handle.wait_for_exit().await;
        agent.begin_shutdown().await;
        agent_handle.wait_for_exit().await;
    }

    #[tokio::test]
    async fn duplicate_fault_names_should_be_rejected() {
        let coordinator = Coordinator::new(Arc::new(WallClock), test_platform(8888), 0, 100);
        let handle = coordinator.start().await.unwrap();

        let request = AddFaultRequest::new(
            "f1",
            json!({ "kind": "NoOpFault", "start_ms": i64::MAX - 1_000_000, "duration_ms": 0 }),
        );
        coordinator.add_fault(&request).await.unwrap();
        let err = coordinator.add_fault(&request).await.unwrap_err();
        assert!(err.to_string().contains("already exists"));

        coordinator.begin_shutdown().await;
        handle.wait_for_exit().await;
    }
}
