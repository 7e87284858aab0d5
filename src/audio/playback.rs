use anyhow::Result;
use std::collections::HashSet;
use std::sync::Mutex;
use tokio::sync::mpsc;
use tracing::debug;

/// Handle to one scheduled playback source.
pub type SourceId = u64;

/// Output device abstraction.
///
/// `now` is the device clock in seconds. `schedule` queues a buffer to start
/// at an absolute device time. Natural completion of each source is reported
/// on the channel created alongside the sink, so the owner can prune its
/// pending set without polling.
pub trait AudioSink: Send + Sync {
    /// Current device time in seconds.
    fn now(&self) -> f64;

    /// Resume the device if the platform suspended it.
    fn resume(&self) -> Result<()>;

    /// Queue a buffer to start playing at `start_at` (device time).
    fn schedule(&self, samples: Vec<i16>, sample_rate: u32, start_at: f64) -> Result<SourceId>;

    /// Stop one source immediately. Unknown or finished ids are ignored.
    fn stop(&self, source: SourceId);
}

/// Schedules decoded speech chunks back to back on an `AudioSink`.
///
/// `output_clock` is the device time at which the next buffer must start.
/// Every enqueue advances it by exactly the buffer duration, so arbitrarily
/// chunked speech plays gaplessly. A barge-in stops every pending source and
/// resets the clock to the current device time, so the next chunk never
/// schedules into a stale future.
pub struct PlaybackScheduler {
    sample_rate: u32,
    output_clock: f64,
    pending: HashSet<SourceId>,
}

impl PlaybackScheduler {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            output_clock: 0.0,
            pending: HashSet::new(),
        }
    }

    /// Queue one decoded chunk immediately after whatever is already queued.
    pub fn enqueue(&mut self, sink: &dyn AudioSink, samples: Vec<i16>) -> Result<SourceId> {
        self.output_clock = self.output_clock.max(sink.now());
        let duration = samples.len() as f64 / self.sample_rate as f64;
        let id = sink.schedule(samples, self.sample_rate, self.output_clock)?;
        self.output_clock += duration;
        self.pending.insert(id);
        Ok(id)
    }

    /// Barge-in: the user started speaking over the assistant. Stops every
    /// pending source and resumes scheduling from the current device time.
    pub fn interrupt(&mut self, sink: &dyn AudioSink) {
        let stopped = self.pending.len();
        for id in self.pending.drain() {
            sink.stop(id);
        }
        self.output_clock = sink.now();
        if stopped > 0 {
            debug!("Playback interrupted: stopped {} pending sources", stopped);
        }
    }

    /// A source finished playing on its own.
    pub fn source_done(&mut self, id: SourceId) {
        self.pending.remove(&id);
    }

    /// Teardown path. Identical to an interrupt.
    pub fn stop_all(&mut self, sink: &dyn AudioSink) {
        self.interrupt(sink);
    }

    /// Number of sources currently scheduled or playing.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Device time at which the next buffer would start.
    pub fn output_clock(&self) -> f64 {
        self.output_clock
    }
}

/// Record of one `schedule` call on a `SimulatedSink`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledBuffer {
    pub id: SourceId,
    pub start_at: f64,
    pub duration: f64,
}

/// Virtual-clock sink: records every schedule and stop, and lets the caller
/// advance time and complete sources explicitly. Used by the tests and the
/// offline self-check in place of a hardware output device.
pub struct SimulatedSink {
    state: Mutex<SimulatedState>,
    completions: mpsc::UnboundedSender<SourceId>,
}

struct SimulatedState {
    clock: f64,
    next_id: SourceId,
    scheduled: Vec<ScheduledBuffer>,
    stopped: Vec<SourceId>,
}

impl SimulatedSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SourceId>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                state: Mutex::new(SimulatedState {
                    clock: 0.0,
                    next_id: 1,
                    scheduled: Vec::new(),
                    stopped: Vec::new(),
                }),
                completions: tx,
            },
            rx,
        )
    }

    /// Advance the virtual device clock.
    pub fn advance(&self, seconds: f64) {
        self.state.lock().unwrap().clock += seconds;
    }

    /// Report natural completion of a source.
    pub fn complete(&self, id: SourceId) {
        let _ = self.completions.send(id);
    }

    /// Every schedule call so far, in order.
    pub fn scheduled(&self) -> Vec<ScheduledBuffer> {
        self.state.lock().unwrap().scheduled.clone()
    }

    /// Every explicitly stopped source id, in order.
    pub fn stopped(&self) -> Vec<SourceId> {
        self.state.lock().unwrap().stopped.clone()
    }
}

impl AudioSink for SimulatedSink {
    fn now(&self) -> f64 {
        self.state.lock().unwrap().clock
    }

    fn resume(&self) -> Result<()> {
        Ok(())
    }

    fn schedule(&self, samples: Vec<i16>, sample_rate: u32, start_at: f64) -> Result<SourceId> {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id;
        state.next_id += 1;
        state.scheduled.push(ScheduledBuffer {
            id,
            start_at,
            duration: samples.len() as f64 / sample_rate as f64,
        });
        Ok(id)
    }

    fn stop(&self, source: SourceId) {
        self.state.lock().unwrap().stopped.push(source);
    }
}
