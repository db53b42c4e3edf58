use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled || PROM_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROM_HANDLE.set(handle);
    Ok(())
}

pub(crate) fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}

pub(crate) fn submission_created(language: &str) {
    metrics::counter!("submissions_created_total", "language" => language.to_string())
        .increment(1);
}

pub(crate) fn dispatch_finished(backend: &'static str, ok: bool, seconds: f64) {
    let outcome = if ok { "accepted" } else { "failed" };
    metrics::counter!("executor_dispatch_total", "backend" => backend, "outcome" => outcome)
        .increment(1);
    metrics::histogram!("executor_dispatch_duration_seconds", "backend" => backend)
        .record(seconds);
}

pub(crate) fn callback_handled(outcome: &'static str) {
    metrics::counter!("executor_callbacks_total", "outcome" => outcome).increment(1);
}
