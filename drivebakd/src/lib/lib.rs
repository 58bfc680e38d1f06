pub mod oauth;
pub mod sched;
pub mod storage;
pub mod sync;

#[cfg(test)]
mod testutil;

pub use crate::sched::Scheduler;

use drivebak::{loc, Config};
use tokio::sync::watch;

/// Brings up the backup engine from a validated configuration and runs the
/// scheduler until a termination signal is received.
///
/// Authentication material is loaded once, here. A missing token store is
/// not fatal: the engine starts with a degraded client and every remote
/// call fails until tokens are saved to the store file.
pub async fn start(config: Config) -> anyhow::Result<()> {
    config.validate()?;

    let client = reqwest::Client::builder().build()?;

    let secret_file = loc::oauth_secret_file()?;
    let secret = if secret_file.exists() {
        Some(drivebak::oauth::load_google_secret(&secret_file).await?)
    } else {
        None
    };

    let token_file = loc::token_cache_file()?;
    let auth = oauth::Client::load(secret, &token_file, client.clone()).await?;
    if !auth.has_credentials() {
        log::warn!(
            "no stored credentials at {token_file}; remote operations will fail until authorized tokens are saved there"
        );
    }

    let remote = storage::gdrive::GoogleDrive::new(auth, client).await;

    let mut total = 0u64;
    for dir in &config.directories {
        match storage::fs::file_count(dir).await {
            Ok(count) => total += count,
            Err(err) => log::debug!("could not count files under {dir}: {err}"),
        }
    }
    log::info!(
        "{total} files to back up from {} directories, every {} minutes",
        config.directories.len(),
        config.interval_minutes
    );

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(err) = stop_on_signal(stop_tx).await {
            log::error!("failed to install signal handlers: {err}");
        }
    });

    Scheduler::new(remote, config).run(stop_rx).await;
    Ok(())
}

#[cfg(unix)]
async fn stop_on_signal(stop: watch::Sender<bool>) -> anyhow::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sig_term = signal(SignalKind::terminate())?;
    let mut sig_int = signal(SignalKind::interrupt())?;

    tokio::select! {
        _ = sig_term.recv() => {
            log::warn!("received SIGTERM");
        }
        _ = sig_int.recv() => {
            log::warn!("received SIGINT");
        }
    };
    let _ = stop.send(true);
    Ok(())
}

#[cfg(not(unix))]
async fn stop_on_signal(stop: watch::Sender<bool>) -> anyhow::Result<()> {
    tokio::signal::ctrl_c().await?;
    log::warn!("received interrupt signal");
    let _ = stop.send(true);
    Ok(())
}
