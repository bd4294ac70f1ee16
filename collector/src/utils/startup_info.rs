//! Startup information logging

use tracing::info;

use crate::core::config::RunParams;

/// Log the effective configuration of a run. Credentials are never printed.
pub fn log_startup_info(params: &RunParams) {
    info!("═══════════════════════════════════════════════════════════════════");
    info!("                     Chain Collector Starting                      ");
    info!("═══════════════════════════════════════════════════════════════════");

    info!("┌─ Mode");
    info!("│  Mode: {}", params.mode);
    info!("└─");

    info!("┌─ Storage");
    info!("│  Bucket: {}", params.storage.bucket_name);
    if let Some(endpoint) = &params.storage.endpoint_url {
        info!("│  Endpoint: {}", endpoint);
    }
    info!("└─");

    info!("┌─ Upstream");
    info!("│  API URL: {}", params.blockstream.api_url);
    info!("│  Token URL: {}", params.blockstream.token_url);
    info!("│  Client ID: {}", params.blockstream.client_id);
    info!("│  HTTP timeout: {}s", params.blockstream.http_timeout.as_secs());
    info!("└─");

    info!("┌─ Backfill Window");
    info!("│  Lookback: {} days x {} blocks/day", params.collection.lookback_days, params.collection.blocks_per_day);
    info!("│  Fee Sample Stride: {}", params.collection.sample_stride);
    info!("│  First Valid Height: {}", params.collection.first_valid_height);
    info!("└─");

    info!("┌─ Rate Budget");
    info!("│  Base Delay: {:.3}s", params.rate.base_delay.as_secs_f64());
    if let Some(per_hour) = params.rate.max_requests_per_hour() {
        info!("│  Max Requests/Hour: {}", per_hour);
    }
    info!("│  Max Retries: {} (backoff base {}s)", params.rate.max_retries, params.rate.retry_base_delay);
    info!(
        "│  Burst Protection: +{:.1}s every {} requests",
        params.rate.burst_extra_delay.as_secs_f64(),
        params.rate.burst_interval
    );
    info!("└─");

    info!("┌─ Loop");
    info!(
        "│  Batch: {} units, {:.1}s pause",
        params.loop_params.batch_size,
        params.loop_params.batch_pause.as_secs_f64()
    );
    info!("│  Checkpoint Every: {} units", params.loop_params.checkpoint_every);
    info!("│  Max Failures: {}", params.loop_params.max_failures);
    info!("└─");
}
