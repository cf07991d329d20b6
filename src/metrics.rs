// src/metrics.rs

#[cfg(feature = "observability")]
pub use ::metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};

// NOTE: When observability feature is disabled, provide stub implementations
#[cfg(not(feature = "observability"))]
pub enum Unit {}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! counter {
    ($name:expr, $value:expr $(, $label:expr => $label_value:expr)* $(,)?) => {};
    ($name:expr $(, $label:expr => $label_value:expr)* $(,)?) => {};
}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! gauge {
    ($name:expr, $value:expr $(, $label:expr => $label_value:expr)* $(,)?) => {};
}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! histogram {
    ($name:expr, $value:expr $(, $label:expr => $label_value:expr)* $(,)?) => {};
}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! describe_counter {
    ($name:expr, $unit:expr, $desc:expr) => {};
    ($name:expr, $desc:expr) => {};
}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! describe_gauge {
    ($name:expr, $desc:expr) => {};
}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! describe_histogram {
    ($name:expr, $unit:expr, $desc:expr) => {};
    ($name:expr, $desc:expr) => {};
}

use crate::level_store::SweepStats;
use std::time::Duration;

/// Initializes the descriptions for all the metrics in the crate.
/// This should be called once at startup.
pub fn describe_metrics() {
    describe_counter!("cache_hits_total", "Identity level lookups served from the level store.");
    describe_counter!("cache_miss_total", "Identity level lookups that required a registry call.");
    describe_gauge!("cache_size_gauge", "Number of addresses tracked by the level store.");
    describe_counter!(
        "registry_lookups_total",
        "Profile registry lookups by result (ok/failed)."
    );
    describe_counter!(
        "registry_lookup_failures_total",
        "Failed profile registry lookups by reason (encoding/transport/timeout/decoding)."
    );
    describe_histogram!(
        "registry_lookup_duration_seconds",
        Unit::Seconds,
        "Latency of profile registry lookups."
    );
    describe_counter!("refresh_sweeps_total", "Completed refresh sweeps.");
    describe_counter!(
        "refresh_level_changes_total",
        "Cached identity levels overwritten by a refresh sweep."
    );
    describe_histogram!(
        "refresh_sweep_duration_seconds",
        Unit::Seconds,
        "Duration of a full refresh sweep."
    );
}

#[cfg_attr(not(feature = "observability"), allow(unused_variables))]
pub fn increment_cache_hit(cache_name: &str) {
    counter!("cache_hits_total", 1, "cache" => cache_name.to_string());
}

#[cfg_attr(not(feature = "observability"), allow(unused_variables))]
pub fn increment_cache_miss(cache_name: &str) {
    counter!("cache_miss_total", 1, "cache" => cache_name.to_string());
}

#[cfg_attr(not(feature = "observability"), allow(unused_variables))]
pub fn set_cache_size(cache_name: &str, size: f64) {
    gauge!("cache_size_gauge", size, "cache" => cache_name.to_string());
}

#[cfg_attr(not(feature = "observability"), allow(unused_variables))]
pub fn record_registry_lookup(result: &str, duration: Duration) {
    counter!("registry_lookups_total", 1, "result" => result.to_string());
    histogram!("registry_lookup_duration_seconds", duration.as_secs_f64(), "result" => result.to_string());
}

#[cfg_attr(not(feature = "observability"), allow(unused_variables))]
pub fn increment_registry_failure(reason: &str) {
    counter!("registry_lookup_failures_total", 1, "reason" => reason.to_string());
}

#[cfg_attr(not(feature = "observability"), allow(unused_variables))]
pub fn record_refresh_sweep(stats: &SweepStats, duration: Duration) {
    counter!("refresh_sweeps_total", 1);
    counter!("refresh_level_changes_total", stats.updated as u64);
    histogram!("refresh_sweep_duration_seconds", duration.as_secs_f64());
}
