use std::io::Write;

use parking_lot::Mutex;

use crate::metrics::snapshot::CacheStats;
use crate::metrics::traits::MetricsExporter;

/// Prometheus text exporter for cache stats snapshots.
///
/// This exporter writes in the Prometheus text exposition format so it can be
/// scraped by Prometheus or forwarded to an OpenTelemetry collector.
#[derive(Debug)]
pub struct PrometheusTextExporter<W: Write + Send> {
    prefix: String,
    writer: Mutex<W>,
}

impl<W: Write + Send> PrometheusTextExporter<W> {
    pub fn new(prefix: impl Into<String>, writer: W) -> Self {
        Self {
            prefix: prefix.into(),
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    fn write_metric(&self, kind: &str, suffix: &str, value: u64) {
        let name = self.metric_name(suffix);
        let mut writer = self.writer.lock();
        let _ = writeln!(writer, "# TYPE {} {}", name, kind);
        let _ = writeln!(writer, "{} {}", name, value);
    }

    fn metric_name(&self, suffix: &str) -> String {
        if self.prefix.is_empty() {
            suffix.to_string()
        } else {
            format!("{}_{}", self.prefix, suffix)
        }
    }
}

impl<W: Write + Send> MetricsExporter<CacheStats> for PrometheusTextExporter<W> {
    fn export(&self, snapshot: &CacheStats) {
        self.write_metric("counter", "reads_total", snapshot.reads);
        self.write_metric(
            "counter",
            "successful_reads_total",
            snapshot.successful_reads,
        );
        self.write_metric("counter", "inserts_total", snapshot.inserts);
        self.write_metric("counter", "eviction_passes_total", snapshot.eviction_passes);
        self.write_metric("counter", "evicted_items_total", snapshot.evicted_items);
        self.write_metric("counter", "clock_wraps_total", snapshot.clock_wraps);
        self.write_metric("gauge", "storage_used", snapshot.total_storage);
        self.write_metric(
            "gauge",
            "generation_time_used",
            snapshot.total_generation_time,
        );
        self.write_metric("gauge", "slots_used", snapshot.slots_used as u64);
        self.write_metric("gauge", "slot_capacity", snapshot.slot_capacity as u64);
        self.write_metric("gauge", "max_items", snapshot.max_items as u64);
        self.write_metric("gauge", "max_storage", snapshot.max_storage);
        self.write_metric("gauge", "clock", u64::from(snapshot.clock));
    }
}
