//! CLI command handlers.

pub mod auth;
pub mod config;
pub mod connectors;
pub mod status;

use std::sync::Arc;

use anyhow::Result;
use apixlab_core::backend::GraphqlBackend;
use apixlab_core::config::Config;
use apixlab_core::sequencer::{AuthSequencer, Snapshot};
use apixlab_core::session::SessionStore;
use apixlab_core::status::StatusState;
use apixlab_core::storage::FileStorage;
use apixlab_core::wallet::{LocalKeyWallet, SignApproval};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Wires the sequencer to the configured backend, wallet, and storage.
fn build_sequencer(config: &Config, approval: Arc<dyn SignApproval>) -> Result<AuthSequencer> {
    let backend = GraphqlBackend::from_config(&config.backend)?;
    let wallet = LocalKeyWallet::new(config.wallet.connectors.clone(), approval);
    let storage = FileStorage::new(config.session.storage_path());
    let store = SessionStore::new(Arc::new(storage), config.session.storage_key.clone());

    Ok(AuthSequencer::new(
        Arc::new(wallet),
        Arc::new(backend),
        store,
    ))
}

/// Prints in-flight step messages to stderr until aborted.
fn spawn_progress(mut rx: watch::Receiver<Snapshot>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut last = String::new();
        while rx.changed().await.is_ok() {
            let status = rx.borrow_and_update().status.clone();
            if status.state == StatusState::Loading && status.message != last {
                eprintln!("{}", status.message);
                last = status.message;
            }
        }
    })
}
