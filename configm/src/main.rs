mod config;
mod errors;
mod filter;
mod manager;
mod notification;
mod reconciler;
mod store;
mod values;

use config::Settings;
use manager::ConfigManager;

use clap::Parser;
use kube::Client as KubeClient;
use log;
use tokio::signal::unix::SignalKind;
use tokio::signal::unix::signal;

/*
 * Resolves on CTRL^C, or on SIGTERM when the pod is being stopped.
 */
async fn shutdown_signal() {
    let mut sigterm = match signal(SignalKind::terminate()) {
	Ok(sigterm) => sigterm,
	Err(err) => {
	    log::warn!("Unable to listen for SIGTERM, only CTRL^C stops us: {}", err);
	    let _ = tokio::signal::ctrl_c().await;
	    return;
	}
    };

    tokio::select! {
	_ = tokio::signal::ctrl_c() => {},
	_ = sigterm.recv() => {},
    }
}

/*
 * Program design:
 *
 *  1. Watch the pinniped-info ConfigMap, and the pinniped addon secrets
 *  2. Read the supervisor address and CA bundle from pinniped-info
 *  3. Write both into values.yaml of every addon secret that isn't up to date
 */
#[tokio::main]
async fn main() -> Result<(), kube::Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = Settings::parse();
    log::info!("starting pinniped config controller for {}, addon secrets: {}",
	       settings.source(), settings.target_selector());

    let kube_client = KubeClient::try_default().await?;
    let mgr = ConfigManager::new(kube_client, settings);
    tokio::select! {
	_ = mgr.controller() => {},

	// stop as gracefully as we can.
	_ = shutdown_signal() => {
	    log::info!("shutting down");
	},
    }

    Ok(())
}
