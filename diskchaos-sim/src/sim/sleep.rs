//! Sleep futures completing on simulated time.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use diskchaos_core::SimulationResult;

use super::WeakSimWorld;

/// Future that completes once its timer event has been processed.
///
/// Created by [`SimWorld::sleep`](super::SimWorld::sleep), which schedules the
/// matching [`Event::Timer`](super::Event::Timer). Resolves to
/// `Err(SimulationShutdown)` if the simulation is dropped first.
#[derive(Debug)]
pub struct SleepFuture {
    sim: WeakSimWorld,
    task_id: u64,
    completed: bool,
}

impl SleepFuture {
    pub(crate) fn new(sim: WeakSimWorld, task_id: u64) -> Self {
        Self {
            sim,
            task_id,
            completed: false,
        }
    }
}

impl Future for SleepFuture {
    type Output = SimulationResult<()>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.completed {
            return Poll::Ready(Ok(()));
        }

        let sim = match self.sim.upgrade() {
            Ok(sim) => sim,
            Err(e) => return Poll::Ready(Err(e)),
        };

        if sim.is_task_awake(self.task_id) {
            self.completed = true;
            Poll::Ready(Ok(()))
        } else {
            sim.register_task_waker(self.task_id, cx.waker().clone());
            Poll::Pending
        }
    }
}
