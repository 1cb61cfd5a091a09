//! Wallet collaborator: connectors, connection, and message signing.

mod local;

use std::future::Future;
use std::pin::Pin;

pub use local::{AutoApprove, LocalKeyWallet, SignApproval};

use crate::error::AuthResult;

/// Boxed future returned by wallet calls.
pub type WalletFuture<'a, T> = Pin<Box<dyn Future<Output = AuthResult<T>> + Send + 'a>>;

/// A wallet integration the user can connect with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connector {
    pub id: String,
    pub name: String,
}

/// Snapshot of the wallet connection as seen by the sequencer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalletConnection {
    /// Lowercased `0x` address, empty when disconnected
    pub address: String,
    pub is_connected: bool,
    /// Available connectors in preference order
    pub connectors: Vec<Connector>,
}

impl WalletConnection {
    pub fn disconnected(connectors: Vec<Connector>) -> Self {
        Self {
            address: String::new(),
            is_connected: false,
            connectors,
        }
    }
}

/// Externally supplied wallet capabilities.
///
/// Errors use the wallet kinds of [`crate::error::AuthErrorKind`]:
/// `WalletUnavailable` and `ConnectionRejected` from `connect`,
/// `SignatureRejected` (user cancelled) or `Wallet` from `sign_message`.
pub trait Wallet: Send + Sync {
    /// Available connectors, in preference order.
    fn connectors(&self) -> Vec<Connector>;

    /// Connects with a connector and returns the account address.
    fn connect<'a>(&'a self, connector_id: &'a str) -> WalletFuture<'a, String>;

    /// Drops the active connection.
    fn disconnect(&self) -> WalletFuture<'_, ()>;

    /// Signs a personal message with the connected account.
    fn sign_message<'a>(&'a self, message: &'a str) -> WalletFuture<'a, String>;
}
