use crate::error::Result;
use crate::ipc::MpvIpc;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};
use trimline_core::{PlayerEvent, TimeUs};

/// The most recent source requested from the player, numbered so that
/// reloading the same path is still seen as a new load.
#[derive(Debug, Clone, Default)]
pub struct LoadTracker(Arc<Mutex<LoadRequest>>);

#[derive(Debug, Clone, Default, PartialEq)]
struct LoadRequest {
    generation: u64,
    url: Option<String>,
}

impl LoadTracker {
    pub fn record(&self, url: Option<&str>) {
        let mut request = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        request.generation += 1;
        request.url = url.map(str::to_owned);
    }

    fn latest(&self) -> LoadRequest {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

/// One poll of the player's state.
#[derive(Debug, Clone, Default, PartialEq)]
struct Sample {
    path: Option<String>,
    duration: Option<f64>,
    position: Option<f64>,
}

fn read_sample(ipc: &MpvIpc) -> Result<Sample> {
    Ok(Sample {
        path: ipc.get_string("path")?,
        duration: ipc.get_f64("duration")?,
        position: ipc.get_f64("time-pos")?,
    })
}

/// Polls a requested load may stay pending before it is reported as failed.
const LOAD_TIMEOUT_TICKS: u32 = 100;

/// Turns polled samples into player events.
#[derive(Debug, Default)]
struct EventTracker {
    seen_generation: u64,
    pending_ticks: u32,
}

impl EventTracker {
    fn events(&mut self, request: &LoadRequest, sample: &Sample) -> Vec<PlayerEvent> {
        let mut events = Vec::new();

        if request.generation != self.seen_generation {
            match (&request.url, &sample.path, sample.duration) {
                (None, _, _) => self.settle(request.generation),
                (Some(url), Some(path), Some(duration)) if url == path => {
                    self.settle(request.generation);
                    events.push(PlayerEvent::MetadataLoaded(TimeUs::from_seconds(duration)));
                }
                // still loading; positions belong to the previous source
                (Some(url), _, _) => {
                    self.pending_ticks += 1;
                    if self.pending_ticks >= LOAD_TIMEOUT_TICKS {
                        warn!(url = %url, path = ?sample.path, "mpv did not load the requested source");
                        self.settle(request.generation);
                        events.push(PlayerEvent::LoadFailed);
                    }
                    return events;
                }
            }
        }

        if sample.path.is_some() {
            if let Some(position) = sample.position {
                events.push(PlayerEvent::LocalTime(TimeUs::from_seconds(position)));
            }
        }
        events
    }

    fn settle(&mut self, generation: u64) {
        self.seen_generation = generation;
        self.pending_ticks = 0;
    }
}

/// Poll mpv every `every` and forward position and load events. The task
/// ends once the receiver is dropped.
pub fn spawn_position_poller(
    ipc: MpvIpc,
    loads: LoadTracker,
    every: Duration,
) -> (mpsc::Receiver<PlayerEvent>, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(32);

    let handle = tokio::spawn(async move {
        let ipc = Arc::new(ipc);
        let mut tracker = EventTracker::default();
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            if tx.is_closed() {
                break;
            }

            let reader = Arc::clone(&ipc);
            let sample = match tokio::task::spawn_blocking(move || read_sample(&reader)).await {
                Ok(Ok(sample)) => sample,
                Ok(Err(e)) => {
                    debug!(error = %e, "mpv poll failed");
                    continue;
                }
                Err(e) => {
                    warn!(error = %e, "mpv poll task failed");
                    break;
                }
            };

            for event in tracker.events(&loads.latest(), &sample) {
                if tx.send(event).await.is_err() {
                    debug!("position poller receiver dropped");
                    return;
                }
            }
        }
        debug!("position poller stopped");
    });

    (rx, handle)
}
