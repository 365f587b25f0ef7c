//! The per-node worker of the coordinator.
//!
//! A NodeManager owns the communication with one remote agent: it delivers
//! queued faults, retries them for as long as the transport fails, and
//! heartbeats the agent when nothing else has been sent for a while. Each
//! manager runs on its own task so a slow or hanging agent never blocks
//! requests to the others.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex as StdMutex, PoisonError},
    time::Duration,
};

use platform::{
    fault::FaultState,
    topology::Node,
    wire::{AddFaultRequest, FaultRecord, FaultStatus},
};
use serde_json::Value;
use support::clock::Clock;
use tokio::{
    sync::{Mutex, Notify},
    task::JoinHandle,
    time::timeout,
};
use tracing::{debug, warn};

/// How often a manager checks on its agent when no faults are flowing.
pub const DEFAULT_HEARTBEAT_MS: i64 = 10_000;

/// The observed status of one managed node. Snapshots of this are what
/// `GET /nodes` reports.
#[derive(Debug, Clone)]
pub struct NodeStatus {
    pub node_name: String,
    /// Last successful exchange in ms since the epoch, 0 if never reached.
    pub last_comms_ms: i64,
    /// The faults handed to this node, in delivery order.
    pub faults: Vec<FaultRecord>,
}

struct DeliveryQueue {
    queue: VecDeque<AddFaultRequest>,
    closing: bool,
}

pub struct NodeManager {
    clock: Arc<dyn Clock>,
    node: Node,
    agent_port: u16,
    heartbeat_ms: i64,
    queue: Mutex<DeliveryQueue>,
    wake: Notify,
    status: StdMutex<NodeStatus>,
}

impl NodeManager {
    /// Create the manager and start its worker task. `node` must carry an
    /// agent port.
    pub fn spawn(
        clock: Arc<dyn Clock>,
        node: Node,
        agent_port: u16,
        heartbeat_ms: i64,
    ) -> (Arc<Self>, JoinHandle<()>) {
        let manager = Arc::new(Self {
            clock,
            status: StdMutex::new(NodeStatus {
                node_name: node.name.clone(),
                last_comms_ms: 0,
                faults: Vec::new(),
            }),
            node,
            agent_port,
            heartbeat_ms,
            queue: Mutex::new(DeliveryQueue {
                queue: VecDeque::new(),
                closing: false,
            }),
            wake: Notify::new(),
        });
        let task = tokio::spawn(manager.clone().run());
        (manager, task)
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    /// Queue a fault for delivery and wake the worker.
    pub async fn enqueue(&self, request: AddFaultRequest) {
        let record = FaultRecord {
            name: request.name.clone().unwrap_or_default(),
            spec: request.spec.clone().unwrap_or(Value::Null),
            status: FaultStatus {
                state: FaultState::Pending,
            },
        };
        {
            let mut delivery = self.queue.lock().await;
            delivery.queue.push_back(request);
        }
        self.lock_status().faults.push(record);
        self.wake.notify_one();
    }

    /// A copy of the node status; safe to read outside the manager.
    pub fn status(&self) -> NodeStatus {
        self.lock_status().clone()
    }

    /// Begin closing the manager without waiting for the task to exit.
    pub async fn begin_shutdown(&self) {
        let mut delivery = self.queue.lock().await;
        if delivery.closing {
            return;
        }
        delivery.closing = true;
        self.wake.notify_one();
    }

    /// Mark the node unreachable. Called when the worker task dies instead
    /// of shutting down.
    pub fn reset_comms(&self) {
        self.lock_status().last_comms_ms = 0;
    }

    async fn run(self: Arc<Self>) {
        let mut current: Option<AddFaultRequest> = None;
        let mut last_comm_attempt_ms: i64 = 0;
        loop {
            let now = self.clock.now_ms();
            if let Some(request) = current.as_ref() {
                last_comm_attempt_ms = now;
                if self.send_fault(request, now).await {
                    current = None;
                }
            }
            if now >= last_comm_attempt_ms.saturating_add(self.heartbeat_ms) {
                last_comm_attempt_ms = now;
                self.send_heartbeat(now).await;
            }
            let wait_ms =
                (last_comm_attempt_ms.saturating_add(self.heartbeat_ms) - now).max(0) as u64;
            {
                let mut delivery = self.queue.lock().await;
                if delivery.closing {
                    break;
                }
                let dequeued = if current.is_none() {
                    current = delivery.queue.pop_front();
                    current.is_some()
                } else {
                    false
                };
                // a freshly dequeued fault is sent right away; otherwise
                // sleep until the next required contact or a wake-up
                if !dequeued {
                    drop(delivery);
                    let _ = timeout(Duration::from_millis(wait_ms), self.wake.notified()).await;
                }
            }
        }
        debug!("node_manager({}) exiting", self.node.name);
    }

    async fn send_fault(&self, request: &AddFaultRequest, now: i64) -> bool {
        match client::add_agent_fault(&self.node.hostname, self.agent_port, request).await {
            Ok(_) => {
                self.lock_status().last_comms_ms = now;
                true
            }
            Err(err) => {
                warn!(
                    "node_manager({}) unable to create fault on node: {err}",
                    self.node.name
                );
                false
            }
        }
    }

    async fn send_heartbeat(&self, now: i64) {
        match client::get_agent_status(&self.node.hostname, self.agent_port).await {
            Ok(_) => self.lock_status().last_comms_ms = now,
            Err(err) => {
                warn!(
                    "node_manager({}) unable to contact node: {err}",
                    self.node.name
                );
            }
        }
    }

    fn lock_status(&self) -> std::sync::MutexGuard<'_, NodeStatus> {
        self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use platform::wire::AddFaultRequest;
    use serde_json::json;
    use support::{clock::WallClock, util::wait_until};
    use trogdor_agent::Agent;

    use super::*;
    use crate::tests::{test_node, test_platform};

    fn noop_request(name: &str) -> AddFaultRequest {
        AddFaultRequest::new(
            name,
            json!({ "kind": "NoOpFault", "start_ms": 0, "duration_ms": 0 }),
        )
    }

    #[tokio::test]
    async fn node_manager_should_deliver_queued_faults() {
        let agent = Agent::new(Arc::new(WallClock), test_platform(8888), 0);
        let agent_handle = agent.start().await.unwrap();
        let agent_port = agent_handle.local_addr.port();

        let (manager, task) = NodeManager::spawn(
            Arc::new(WallClock),
            test_node("node01", agent_port),
            agent_port,
            100,
        );
        manager.enqueue(noop_request("f1")).await;

        let delivered = wait_until(Duration::from_secs(5), || async move {
            client::get_agent_faults("127.0.0.1", agent_port)
                .await
                .map(|faults| faults.len() == 1)
                .unwrap_or(false)
        })
        .await;
        assert!(delivered);
        let status = manager.status();
        assert!(status.last_comms_ms > 0);
        assert_eq!(status.faults.len(), 1);
        assert_eq!(status.faults[0].name, "f1");

        manager.begin_shutdown().await;
        task.await.unwrap();
        agent.begin_shutdown().await;
        agent_handle.wait_for_exit().await;
    }

    #[tokio::test]
    async fn node_manager_should_heartbeat_an_idle_agent() {
        let agent = Agent::new(Arc::new(WallClock), test_platform(8888), 0);
        let agent_handle = agent.start().await.unwrap();
        let agent_port = agent_handle.local_addr.port();

        let (manager, task) = NodeManager::spawn(
            Arc::new(WallClock),
            test_node("node01", agent_port),
            agent_port,
            50,
        );
        let contacted = wait_until(Duration::from_secs(5), || {
            let manager = manager.clone();
            async move { manager.status().last_comms_ms > 0 }
        })
        .await;
        assert!(contacted);

        manager.begin_shutdown().await;
        task.await.unwrap();
        agent.begin_shutdown().await;
        agent_handle.wait_for_exit().await;
    }

    #[tokio::test]
    async fn node_manager_should_retry_until_the_agent_appears() {
        // reserve an ephemeral port, then free it for the late-started agent
        let reserved = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let agent_port = reserved.local_addr().unwrap().port();
        drop(reserved);

        let (manager, task) = NodeManager::spawn(
            Arc::new(WallClock),
            test_node("node01", agent_port),
            agent_port,
            50,
        );
        manager.enqueue(noop_request("f1")).await;

        // the fault stays current while the agent is unreachable
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(manager.status().last_comms_ms, 0);

        let agent = Agent::new(Arc::new(WallClock), test_platform(agent_port), agent_port);
        let agent_handle = agent.start().await.unwrap();

        let delivered = wait_until(Duration::from_secs(5), || async move {
            client::get_agent_faults("127.0.0.1", agent_port)
                .await
                .map(|faults| faults.len() == 1)
                .unwrap_or(false)
        })
        .await;
        assert!(delivered);
        assert!(manager.status().last_comms_ms > 0);

        manager.begin_shutdown().await;
        task.await.unwrap();
        agent.begin_shutdown().await;
        agent_handle.wait_for_exit().await;
    }
}
