use pong_transport::CounterSnapshot;
use std::collections::VecDeque;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

const SAMPLE_WINDOW: usize = 256;

struct SampleWindow {
    samples: VecDeque<f64>,
}

impl SampleWindow {
    fn new() -> Self {
        Self {
            samples: VecDeque::with_capacity(SAMPLE_WINDOW),
        }
    }

    fn push(&mut self, value: f64) {
        self.samples.push_back(value);
        if self.samples.len() > SAMPLE_WINDOW {
            self.samples.pop_front();
        }
    }

    fn average(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<f64>() / self.samples.len() as f64
    }
}

/// Holds the counters and rolling samples the original `prometheus.h`/`.cpp`
/// exposed over HTTP. Nothing here binds a socket — `render_text` produces
/// the text exposition format as a `String` for an external scraper loop to
/// serve, which is out of scope for the core.
pub struct Metrics {
    tick_duration_ms: Mutex<SampleWindow>,
    keyframe_bytes: Mutex<SampleWindow>,
    delta_bytes: Mutex<SampleWindow>,
    input_ack_latency_ms: Mutex<SampleWindow>,
    dropped_parse: AtomicU64,
    reliable_retries: AtomicU64,
    reliable_timeouts: AtomicU64,
    dropped_duplicates: AtomicU64,
    dropped_old: AtomicU64,
    dropped_window: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            tick_duration_ms: Mutex::new(SampleWindow::new()),
            keyframe_bytes: Mutex::new(SampleWindow::new()),
            delta_bytes: Mutex::new(SampleWindow::new()),
            input_ack_latency_ms: Mutex::new(SampleWindow::new()),
            dropped_parse: AtomicU64::new(0),
            reliable_retries: AtomicU64::new(0),
            reliable_timeouts: AtomicU64::new(0),
            dropped_duplicates: AtomicU64::new(0),
            dropped_old: AtomicU64::new(0),
            dropped_window: AtomicU64::new(0),
        }
    }

    pub fn record_tick_duration_ms(&self, value: f64) {
        self.tick_duration_ms.lock().expect("metrics mutex poisoned").push(value);
    }

    pub fn record_keyframe_bytes(&self, len: usize) {
        self.keyframe_bytes
            .lock()
            .expect("metrics mutex poisoned")
            .push(len as f64);
    }

    pub fn record_delta_bytes(&self, len: usize) {
        self.delta_bytes.lock().expect("metrics mutex poisoned").push(len as f64);
    }

    pub fn record_input_ack_latency_ms(&self, value: f64) {
        self.input_ack_latency_ms
            .lock()
            .expect("metrics mutex poisoned")
            .push(value);
    }

    pub fn record_dropped_parse(&self) {
        self.dropped_parse.fetch_add(1, Ordering::Relaxed);
    }

    /// Mirrors the transport's cumulative reliability counters into this
    /// tick's metrics. The transport already tracks running totals, so this
    /// stores rather than adds.
    pub fn record_transport_counters(&self, snapshot: CounterSnapshot) {
        self.reliable_retries
            .store(snapshot.reliable_retries, Ordering::Relaxed);
        self.reliable_timeouts
            .store(snapshot.reliable_timeouts, Ordering::Relaxed);
        self.dropped_duplicates
            .store(snapshot.dropped_duplicates, Ordering::Relaxed);
        self.dropped_old.store(snapshot.dropped_old, Ordering::Relaxed);
        self.dropped_window.store(snapshot.dropped_window, Ordering::Relaxed);
    }

    /// Renders every tracked metric as Prometheus text exposition format.
    pub fn render_text(&self) -> String {
        let mut out = String::new();

        writeln!(out, "# HELP pong_tick_duration_ms Average tick handler duration.").unwrap();
        writeln!(out, "# TYPE pong_tick_duration_ms gauge").unwrap();
        writeln!(
            out,
            "pong_tick_duration_ms {:.3}",
            self.tick_duration_ms.lock().expect("metrics mutex poisoned").average()
        )
        .unwrap();

        writeln!(out, "# HELP pong_keyframe_bytes Average keyframe payload size.").unwrap();
        writeln!(out, "# TYPE pong_keyframe_bytes gauge").unwrap();
        writeln!(
            out,
            "pong_keyframe_bytes {:.1}",
            self.keyframe_bytes.lock().expect("metrics mutex poisoned").average()
        )
        .unwrap();

        writeln!(out, "# HELP pong_delta_bytes Average delta payload size.").unwrap();
        writeln!(out, "# TYPE pong_delta_bytes gauge").unwrap();
        writeln!(
            out,
            "pong_delta_bytes {:.1}",
            self.delta_bytes.lock().expect("metrics mutex poisoned").average()
        )
        .unwrap();

        writeln!(out, "# HELP pong_input_ack_latency_ms Average input-to-ack latency.").unwrap();
        writeln!(out, "# TYPE pong_input_ack_latency_ms gauge").unwrap();
        writeln!(
            out,
            "pong_input_ack_latency_ms {:.3}",
            self.input_ack_latency_ms
                .lock()
                .expect("metrics mutex poisoned")
                .average()
        )
        .unwrap();

        writeln!(out, "# HELP pong_dropped_total Dropped datagrams by reason.").unwrap();
        writeln!(out, "# TYPE pong_dropped_total counter").unwrap();
        writeln!(
            out,
            "pong_dropped_total{{reason=\"parse\"}} {}",
            self.dropped_parse.load(Ordering::Relaxed)
        )
        .unwrap();
        writeln!(
            out,
            "pong_dropped_total{{reason=\"duplicate\"}} {}",
            self.dropped_duplicates.load(Ordering::Relaxed)
        )
        .unwrap();
        writeln!(
            out,
            "pong_dropped_total{{reason=\"old\"}} {}",
            self.dropped_old.load(Ordering::Relaxed)
        )
        .unwrap();
        writeln!(
            out,
            "pong_dropped_total{{reason=\"window\"}} {}",
            self.dropped_window.load(Ordering::Relaxed)
        )
        .unwrap();

        writeln!(out, "# HELP pong_reliable_retries_total Reliable-send retransmissions.").unwrap();
        writeln!(out, "# TYPE pong_reliable_retries_total counter").unwrap();
        writeln!(out, "pong_reliable_retries_total {}", self.reliable_retries.load(Ordering::Relaxed)).unwrap();

        writeln!(out, "# HELP pong_reliable_timeouts_total Reliable sends that exhausted their retries.").unwrap();
        writeln!(out, "# TYPE pong_reliable_timeouts_total counter").unwrap();
        writeln!(
            out,
            "pong_reliable_timeouts_total {}",
            self.reliable_timeouts.load(Ordering::Relaxed)
        )
        .unwrap();

        out
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_text_includes_every_tracked_series() {
        let metrics = Metrics::new();
        metrics.record_tick_duration_ms(1.5);
        metrics.record_transport_counters(CounterSnapshot {
            reliable_retries: 3,
            reliable_timeouts: 1,
            dropped_duplicates: 2,
            dropped_old: 1,
            dropped_window: 4,
        });
        let text = metrics.render_text();
        assert!(text.contains("pong_tick_duration_ms 1.500"));
        assert!(text.contains("reason=\"old\"} 1"));
        assert!(text.contains("reason=\"window\"} 4"));
        assert!(text.contains("pong_reliable_retries_total 3"));
    }

    #[test]
    fn sample_window_reports_zero_average_when_empty() {
        let metrics = Metrics::new();
        assert!(metrics.render_text().contains("pong_keyframe_bytes 0.0"));
    }
}
