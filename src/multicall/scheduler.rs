//! Flush scheduler
//!
//! One worker task per provider owns the pending queue and the debounce
//! timer. Callers only talk to it through an unbounded channel, so "a call
//! arrives" and "the timer fires" can never race: the worker handles one
//! command at a time.
//!
//! State machine:
//! - `Idle`: queue empty, no timer
//! - `Armed`: queue non-empty, flush at `deadline`; every arrival pushes the
//!   deadline back by the delay (bounded by the max wait, if any)
//! - draining: the queue is swapped for an empty one and the drained batch is
//!   handed to its own dispatch task, then back to `Idle`

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, trace};

use super::dispatcher::Dispatcher;
use super::queue::{PendingCall, PendingQueue};
use super::settings::BatchSettings;

enum Command {
    Enqueue(PendingCall),
    Flush(oneshot::Sender<()>),
    SetDelay(Duration),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SchedulerState {
    Idle,
    Armed { deadline: Instant },
}

/// Handle to the worker task. Dropping it flushes what is still queued.
pub struct FlushScheduler {
    tx: mpsc::UnboundedSender<Command>,
    settings: Arc<BatchSettings>,
}

impl FlushScheduler {
    /// Spawn the worker on the current tokio runtime
    pub fn spawn(dispatcher: Arc<Dispatcher>, settings: Arc<BatchSettings>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run(rx, dispatcher, settings.delay(), settings.clone()));

        Self { tx, settings }
    }

    /// Queue a call for the next flush cycle.
    ///
    /// If the worker is gone the call is dropped, which its handle reports
    /// as `MulticallError::Dropped`.
    pub fn enqueue(&self, call: PendingCall) {
        let _ = self.tx.send(Command::Enqueue(call));
    }

    /// Dispatch everything queued so far without waiting for the timer.
    /// Returns once the batch has been handed to its dispatch task.
    pub async fn flush(&self) {
        let (ack, done) = oneshot::channel();
        if self.tx.send(Command::Flush(ack)).is_ok() {
            let _ = done.await;
        }
    }

    /// Install a new debounce delay. Calls queued under the old delay are
    /// dispatched right away.
    pub fn set_delay(&self, delay: Duration) {
        self.settings.store_delay(delay);
        let _ = self.tx.send(Command::SetDelay(delay));
    }

    pub fn delay(&self) -> Duration {
        self.settings.delay()
    }
}

async fn run(
    mut rx: mpsc::UnboundedReceiver<Command>,
    dispatcher: Arc<Dispatcher>,
    mut delay: Duration,
    settings: Arc<BatchSettings>,
) {
    let mut queue = PendingQueue::default();
    let mut state = SchedulerState::Idle;

    loop {
        let command = match state {
            SchedulerState::Idle => rx.recv().await,
            SchedulerState::Armed { deadline } => {
                tokio::select! {
                    command = rx.recv() => command,
                    _ = sleep_until(deadline) => {
                        flush(&mut queue, &dispatcher);
                        state = SchedulerState::Idle;
                        continue;
                    }
                }
            }
        };

        match command {
            Some(Command::Enqueue(call)) => {
                queue.push(call);

                let mut deadline = Instant::now() + delay;
                if let (Some(max_wait), Some(first)) = (settings.max_wait(), queue.first_arrival()) {
                    deadline = deadline.min(first + max_wait);
                }
                state = SchedulerState::Armed { deadline };
            }
            Some(Command::Flush(ack)) => {
                flush(&mut queue, &dispatcher);
                state = SchedulerState::Idle;
                let _ = ack.send(());
            }
            Some(Command::SetDelay(new_delay)) => {
                flush(&mut queue, &dispatcher);
                state = SchedulerState::Idle;
                debug!("Multicall delay changed from {:?} to {:?}", delay, new_delay);
                delay = new_delay;
            }
            None => {
                flush(&mut queue, &dispatcher);
                trace!("Multicall scheduler stopped");
                break;
            }
        }
    }
}

/// Swap the queue out and dispatch it on its own task so new arrivals start
/// a fresh cycle immediately.
fn flush(queue: &mut PendingQueue, dispatcher: &Arc<Dispatcher>) {
    if queue.is_empty() {
        return;
    }

    let calls = queue.drain();
    trace!("Draining {} pending calls", calls.len());

    let dispatcher = Arc::clone(dispatcher);
    tokio::spawn(async move {
        dispatcher.dispatch(calls).await;
    });
}
