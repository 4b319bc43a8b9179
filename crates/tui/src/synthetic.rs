use frame_timeline_core::{FRAME_COLLECTOR, MemorySource};
use frame_timeline_protocol::{FrameData, FrameEvent};
use rand::{Rng, SeedableRng, rngs::StdRng};
use tracing::{debug, trace};

const APP: usize = 1;
const CULL: usize = 2;
const DRAW: usize = 3;
const FLIP: usize = 4;
const LOAD: usize = 5;
const DECODE: usize = 6;
const UPLOAD: usize = 7;
/// Never started; its end events are noise the decoder must drop.
const STRAY: usize = 8;

const MAIN_PERIOD: f64 = 1.0 / 60.0;
const WORKER_PERIOD: f64 = 0.05;
/// Frames kept per thread in the source.
pub const HISTORY: usize = 4000;

#[derive(Debug)]
struct SimThread {
    next_frame: i64,
    clock: f64,
    period: f64,
    /// Length of the frame currently in progress.
    next_length: f64,
}

/// Produces a plausible frame stream for a main thread and any number of
/// worker threads, in simulated time.
///
/// A few frames are held back and delivered after their successor, some
/// worker frames close their collectors out of order, and the odd frame
/// carries an end event for a collector that never started.
#[derive(Debug)]
pub struct SyntheticClient {
    rng: StdRng,
    now: f64,
    threads: Vec<SimThread>,
    held_back: Vec<(usize, i64)>,
}

impl SyntheticClient {
    pub fn new(num_threads: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let threads = (0..num_threads.max(1))
            .map(|i| {
                let period = if i == 0 { MAIN_PERIOD } else { WORKER_PERIOD };
                SimThread {
                    next_frame: 0,
                    clock: 0.0,
                    period,
                    next_length: period * rng.random_range(0.8..1.2),
                }
            })
            .collect();
        Self {
            rng,
            now: 0.0,
            threads,
            held_back: Vec::new(),
        }
    }

    /// Define the collectors and name the threads in `source`.
    pub fn install(&self, source: &mut MemorySource) {
        source.define_collector(APP, "App", Some(FRAME_COLLECTOR));
        source.define_collector(CULL, "Cull", Some(APP));
        source.define_collector(DRAW, "Draw", Some(FRAME_COLLECTOR));
        source.define_collector(FLIP, "Flip", Some(DRAW));
        source.define_collector(LOAD, "Load", Some(FRAME_COLLECTOR));
        source.define_collector(DECODE, "Decode", Some(LOAD));
        source.define_collector(UPLOAD, "Upload", Some(LOAD));
        source.define_collector(STRAY, "Stray", Some(FRAME_COLLECTOR));
        for i in 0..self.threads.len() {
            let name = if i == 0 {
                "Main".to_string()
            } else {
                format!("Worker {i}")
            };
            source.add_thread(&name);
        }
    }

    /// Advance simulated time by `dt` seconds, storing every frame that
    /// completed in `source`. Returns the `(thread, frame)` pairs delivered
    /// by this call, in delivery order.
    pub fn advance(&mut self, dt: f64, source: &mut MemorySource) -> Vec<(usize, i64)> {
        self.now += dt.max(0.0);
        let mut completed = Vec::new();

        for thread_index in 0..self.threads.len() {
            loop {
                let (start, length, period) = {
                    let t = &self.threads[thread_index];
                    (t.clock, t.next_length, t.period)
                };
                if start + length > self.now {
                    break;
                }
                let frame = if thread_index == 0 {
                    self.main_frame(start, length)
                } else {
                    self.worker_frame(start, length)
                };
                let t = &mut self.threads[thread_index];
                let frame_number = t.next_frame;
                t.next_frame += 1;
                t.clock = frame.end;
                t.next_length = period * self.rng.random_range(0.8..1.2);
                source.insert_frame(thread_index, frame_number, frame);
                completed.push((thread_index, frame_number));
            }
        }

        let mut delivered = std::mem::take(&mut self.held_back);
        for pair in completed {
            if self.rng.random_bool(0.05) {
                trace!(thread = pair.0, frame = pair.1, "holding frame back");
                self.held_back.push(pair);
            } else {
                delivered.push(pair);
            }
        }
        if !delivered.is_empty() {
            debug!(frames = delivered.len(), now = self.now, "delivering frames");
        }
        delivered
    }

    fn main_frame(&mut self, start: f64, length: f64) -> FrameData {
        let end = start + length;
        let app_end = start + length * self.rng.random_range(0.3..0.5);
        let cull_end = start + (app_end - start) * self.rng.random_range(0.3..0.8);
        let draw_start = app_end + length * 0.02;
        let flip_start = draw_start + (end - draw_start) * self.rng.random_range(0.5..0.8);

        let mut events = vec![
            FrameEvent::start(FRAME_COLLECTOR, start),
            FrameEvent::start(APP, start),
            FrameEvent::start(CULL, start + length * 0.01),
            FrameEvent::end(CULL, cull_end),
            FrameEvent::end(APP, app_end),
            FrameEvent::start(DRAW, draw_start),
            FrameEvent::start(FLIP, flip_start),
            FrameEvent::end(FLIP, end - length * 0.02),
            FrameEvent::end(DRAW, end - length * 0.01),
        ];
        if self.rng.random_bool(0.02) {
            events.push(FrameEvent::end(STRAY, end - length * 0.005));
        }
        events.push(FrameEvent::end(FRAME_COLLECTOR, end));
        FrameData::new(start, end, events)
    }

    fn worker_frame(&mut self, start: f64, length: f64) -> FrameData {
        let end = start + length;
        let mut events = vec![FrameEvent::start(FRAME_COLLECTOR, start)];
        let jobs: u32 = self.rng.random_range(1..4);
        let slot = length / f64::from(jobs);

        for job in 0..jobs {
            let job_start = start + slot * f64::from(job) + slot * 0.05;
            let job_end = job_start + slot * self.rng.random_range(0.4..0.9);
            let decode_end = job_start + (job_end - job_start) * self.rng.random_range(0.3..0.6);
            events.push(FrameEvent::start(LOAD, job_start));
            events.push(FrameEvent::start(DECODE, job_start + slot * 0.01));
            events.push(FrameEvent::end(DECODE, decode_end));
            events.push(FrameEvent::start(UPLOAD, decode_end));
            if self.rng.random_bool(0.1) {
                // Load finishes before its Upload child does.
                events.push(FrameEvent::end(LOAD, job_end - slot * 0.05));
                events.push(FrameEvent::end(UPLOAD, job_end));
            } else {
                events.push(FrameEvent::end(UPLOAD, job_end - slot * 0.02));
                events.push(FrameEvent::end(LOAD, job_end));
            }
        }

        events.push(FrameEvent::end(FRAME_COLLECTOR, end));
        FrameData::new(start, end, events)
    }
}
