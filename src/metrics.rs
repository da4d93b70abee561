use axum::{
    Router,
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
    routing::get,
};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

static OBSERVABILITY_ENABLED: OnceLock<bool> = OnceLock::new();

/// Check if observability is enabled via OBSERVABILITY_ENABLED env var
pub fn is_observability_enabled() -> bool {
    *OBSERVABILITY_ENABLED.get_or_init(|| {
        std::env::var("OBSERVABILITY_ENABLED")
            .map(|v| v.to_lowercase() != "false" && v != "0")
            .unwrap_or(true)
    })
}

/// Installs the Prometheus recorder and its upkeep task.
/// Returns `None` when observability is disabled.
pub fn init_metrics() -> anyhow::Result<Option<PrometheusHandle>> {
    if !is_observability_enabled() {
        return Ok(None);
    }

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("http_request_duration_seconds".to_string()),
            &[
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ],
        )?
        .install_recorder()?;

    let upkeep_handle = handle.clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(5)).await;
            upkeep_handle.run_upkeep();
        }
    });

    Ok(Some(handle))
}

pub async fn metrics_middleware(req: Request, next: Next) -> Response {
    if !is_observability_enabled() {
        return next.run(req).await;
    }

    let start = Instant::now();
    let method = req.method().as_str().to_owned();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned());

    gauge!("http_requests_active").increment(1.0);

    let response = next.run(req).await;

    let latency = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    counter!("http_requests_total", "method" => method.clone(), "path" => path.clone(), "status" => status).increment(1);
    histogram!("http_request_duration_seconds", "method" => method, "path" => path).record(latency);

    gauge!("http_requests_active").decrement(1.0);

    response
}

/// Router for the metrics listener
pub fn metrics_app(handle: PrometheusHandle) -> Router {
    Router::new().route("/metrics", get(move || async move { handle.render() }))
}

// Business metrics

pub fn track_token_issued() {
    if !is_observability_enabled() {
        return;
    }
    counter!("tokens_issued_total").increment(1);
}

pub fn track_login_success(role: &str) {
    if !is_observability_enabled() {
        return;
    }
    counter!("user_logins_total", "status" => "success", "role" => role.to_string()).increment(1);
}

pub fn track_login_failure() {
    if !is_observability_enabled() {
        return;
    }
    counter!("user_logins_total", "status" => "failure").increment(1);
}

pub fn track_auth_rejection(reason: &'static str) {
    if !is_observability_enabled() {
        return;
    }
    counter!("auth_rejections_total", "reason" => reason).increment(1);
}

pub fn track_upload_rejection(reason: &'static str) {
    if !is_observability_enabled() {
        return;
    }
    counter!("upload_rejections_total", "reason" => reason).increment(1);
}

pub fn track_application_created() {
    if !is_observability_enabled() {
        return;
    }
    counter!("loan_applications_created_total").increment(1);
}

/// `mode` is `force` or `transition`.
pub fn track_status_change(mode: &'static str, to: &'static str) {
    if !is_observability_enabled() {
        return;
    }
    counter!("loan_status_changes_total", "mode" => mode, "to" => to).increment(1);
}

pub fn track_cleanup_failure() {
    if !is_observability_enabled() {
        return;
    }
    counter!("attachment_cleanup_failures_total").increment(1);
}
