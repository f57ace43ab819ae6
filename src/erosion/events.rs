//! Erosion event plumbing: the event type, the two bounded mailboxes, and
//! the lifecycle of their single-consumer worker threads.
//!
//! A full mailbox blocks the sender until the consumer catches up; that is
//! the simulation's only backpressure mechanism.

use std::sync::mpsc::{sync_channel, SyncSender};
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::erosion::flow_field::FlowField;
use crate::erosion::height_field::{self, HeightField};
use crate::erosion::params::SimulationParams;

/// One pending lateral droplet move between two flat cell indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ErosionEvent {
    pub old_idx: usize,
    pub new_idx: usize,
}

/// Handles to the two running consumers. Dropping `flow_tx` (and every
/// clone handed to droplet tasks) starts the shutdown cascade: the flow
/// consumer drains its backlog, drops the elevation sender it owns, and the
/// elevation consumer drains in turn.
pub struct ErosionActors {
    pub flow_tx: SyncSender<ErosionEvent>,
    flow_worker: JoinHandle<(u64, u64)>,
    height_worker: JoinHandle<u64>,
}

/// Counts reported by the consumers after shutdown.
#[derive(Clone, Copy, Debug, Default)]
pub struct ActorStats {
    pub flow_events: u64,
    pub forwarded_events: u64,
    pub height_events: u64,
}

/// Spawn both consumer threads over bounded mailboxes.
pub fn start_actors(
    flow: Arc<FlowField>,
    heights: Arc<HeightField>,
    params: &SimulationParams,
) -> ErosionActors {
    let (flow_tx, flow_rx) = sync_channel(params.queue_capacity);
    let (height_tx, height_rx) = sync_channel(params.queue_capacity);

    let feedback_interval = params.feedback_interval;
    let ring_depth = params.ring_depth;
    let feedback_rate = params.feedback_rate;

    let flow_worker = std::thread::spawn(move || {
        crate::erosion::flow_field::run_consumer(
            flow,
            flow_rx,
            height_tx,
            feedback_interval,
            ring_depth,
            feedback_rate,
        )
    });
    let height_worker = std::thread::spawn(move || height_field::run_consumer(heights, height_rx));

    ErosionActors {
        flow_tx,
        flow_worker,
        height_worker,
    }
}

impl ErosionActors {
    /// Release the producer side and wait for both consumers to finish
    /// their backlogs.
    pub fn finish(self) -> ActorStats {
        drop(self.flow_tx);
        let (flow_events, forwarded_events) = self
            .flow_worker
            .join()
            .unwrap_or((0, 0));
        let height_events = self.height_worker.join().unwrap_or(0);
        ActorStats {
            flow_events,
            forwarded_events,
            height_events,
        }
    }
}
