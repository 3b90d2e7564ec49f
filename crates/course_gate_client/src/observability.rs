//! Metric names and recorders for the availability gate.
//!
//! Only the `metrics` facade is used here; installing an exporter is left to
//! the embedding binary.

pub const HEALTH_PROBES_TOTAL: &str = "course_gate_health_probes_total";
pub const HEALTH_CACHE_HITS_TOTAL: &str = "course_gate_health_cache_hits_total";
pub const LIVE_TOTAL: &str = "course_gate_live_total";
pub const FALLBACK_TOTAL: &str = "course_gate_fallback_total";

pub fn record_probe(tier: &'static str, outcome: &'static str) {
    metrics::counter!(HEALTH_PROBES_TOTAL, "tier" => tier, "outcome" => outcome).increment(1);
}

pub fn record_cache_hit() {
    metrics::counter!(HEALTH_CACHE_HITS_TOTAL).increment(1);
}

pub fn record_live(operation: &'static str) {
    metrics::counter!(LIVE_TOTAL, "operation" => operation).increment(1);
}

pub fn record_fallback(operation: &'static str, reason: &'static str) {
    metrics::counter!(FALLBACK_TOTAL, "operation" => operation, "reason" => reason).increment(1);
}
