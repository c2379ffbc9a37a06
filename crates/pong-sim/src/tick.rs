use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const MIN_TPS: f64 = 1.0;

pub type TickHandler = Box<dyn FnMut(u64, f64) + Send + 'static>;

/// Fixed-rate driver for the simulation + broadcast step (spec §4.3). Runs
/// on its own OS thread; `step` must be synchronous and non-blocking since
/// nothing else covers for a stalled handler.
pub struct TickLoop {
    target_tps: f64,
    period: Duration,
    running: Arc<AtomicBool>,
    handler: Arc<Mutex<Option<TickHandler>>>,
    thread: Option<JoinHandle<()>>,
}

impl TickLoop {
    pub fn new(target_tps: f64) -> Self {
        let target_tps = if target_tps < MIN_TPS { MIN_TPS } else { target_tps };
        let period = Duration::from_secs_f64(1.0 / target_tps);
        Self {
            target_tps,
            period,
            running: Arc::new(AtomicBool::new(false)),
            handler: Arc::new(Mutex::new(None)),
            thread: None,
        }
    }

    pub fn target_tps(&self) -> f64 {
        self.target_tps
    }

    /// Idempotent: a second `start` while already running is a no-op.
    pub fn start(&mut self, handler: TickHandler) {
        *self.handler.lock().expect("tick handler mutex poisoned") = Some(handler);

        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        let running = Arc::clone(&self.running);
        let handler = Arc::clone(&self.handler);
        let period = self.period;
        let fallback_dt = 1.0 / self.target_tps;

        self.thread = Some(thread::spawn(move || run(running, handler, period, fallback_dt)));
    }

    /// Signals the worker and joins it; callers may observe up to one tick
    /// period of residual work before this returns.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for TickLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run(
    running: Arc<AtomicBool>,
    handler: Arc<Mutex<Option<TickHandler>>>,
    period: Duration,
    fallback_dt: f64,
) {
    let mut next_tick = Instant::now();
    let mut last_tick = next_tick;
    let mut tick_counter: u64 = 0;

    while running.load(Ordering::SeqCst) {
        let now = Instant::now();
        if now < next_tick {
            thread::sleep(next_tick - now);
            continue;
        }

        let mut dt_seconds = now.duration_since(last_tick).as_secs_f64();
        if dt_seconds <= 0.0 {
            dt_seconds = fallback_dt;
        }

        if let Some(handler) = handler.lock().expect("tick handler mutex poisoned").as_mut() {
            handler(tick_counter, dt_seconds);
        }

        last_tick = now;
        next_tick += period;
        if now.saturating_duration_since(next_tick) > period {
            next_tick = now + period;
        }
        tick_counter = tick_counter.wrapping_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn invokes_handler_at_roughly_the_target_rate() {
        let (tx, rx) = mpsc::channel();
        let mut loop_ = TickLoop::new(200.0);
        loop_.start(Box::new(move |tick, _dt| {
            let _ = tx.send(tick);
        }));

        let mut seen = 0;
        let deadline = Instant::now() + Duration::from_millis(200);
        while Instant::now() < deadline && seen < 10 {
            if rx.recv_timeout(Duration::from_millis(50)).is_ok() {
                seen += 1;
            }
        }
        loop_.stop();
        assert!(seen >= 5, "expected several ticks, saw {seen}");
    }

    #[test]
    fn second_start_is_a_no_op() {
        let mut loop_ = TickLoop::new(100.0);
        loop_.start(Box::new(|_, _| {}));
        loop_.start(Box::new(|_, _| {}));
        loop_.stop();
    }
}
