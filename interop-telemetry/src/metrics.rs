//! ## interop-telemetry::metrics
//! **Prometheus run metrics**
//!
//! One counter per outcome and a histogram of wall-clock run durations,
//! exported in the text format at the end of a sweep.

use std::time::Duration;

use prometheus::{Histogram, HistogramOpts, IntCounterVec, Opts, Registry};

#[derive(Debug, Clone)]
pub struct MetricsRecorder {
    pub registry: prometheus::Registry,
    pub runs_total: prometheus::IntCounterVec,
    pub run_duration: prometheus::Histogram,
}

impl MetricsRecorder {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let runs_total = IntCounterVec::new(
            Opts::new("interop_runs_total", "Completed interop runs by outcome"),
            &["outcome"],
        )?;

        let run_duration = Histogram::with_opts(
            HistogramOpts::new(
                "interop_run_duration_seconds",
                "Wall-clock time from server start to verdict",
            )
            .buckets(vec![0.1, 0.5, 1.0, 5.0, 30.0, 60.0, 120.0, 300.0, 600.0]),
        )?;

        registry.register(Box::new(runs_total.clone()))?;
        registry.register(Box::new(run_duration.clone()))?;

        Ok(Self {
            registry,
            runs_total,
            run_duration,
        })
    }

    pub fn record_run(&self, outcome: &str, duration: Duration) {
        self.runs_total.with_label_values(&[outcome]).inc();
        self.run_duration.observe(duration.as_secs_f64());
    }

    pub fn runs_with_outcome(&self, outcome: &str) -> u64 {
        self.runs_total.with_label_values(&[outcome]).get()
    }

    pub fn gather_metrics(&self) -> Result<String, prometheus::Error> {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let mut buffer = Vec::<u8>::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_are_counted_per_outcome() {
        let metrics = MetricsRecorder::new().unwrap();
        metrics.record_run("success", Duration::from_millis(200));
        metrics.record_run("success", Duration::from_millis(300));
        metrics.record_run("timeout", Duration::from_secs(420));

        assert_eq!(metrics.runs_with_outcome("success"), 2);
        assert_eq!(metrics.runs_with_outcome("timeout"), 1);
        assert_eq!(metrics.run_duration.get_sample_count(), 3);

        let text = metrics.gather_metrics().unwrap();
        assert!(text.contains("interop_runs_total{outcome=\"success\"} 2"));
        assert!(text.contains("interop_run_duration_seconds_count 3"));
    }
}
