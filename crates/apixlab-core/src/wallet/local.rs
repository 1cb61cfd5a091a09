//! Local private-key wallet.
//!
//! Each configured connector reads a hex private key from an environment
//! variable or a file. Signing follows `personal_sign` (EIP-191) and asks a
//! [`SignApproval`] before producing a signature. Keys are never logged.

use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use alloy_primitives::hex;
use alloy_signer::{Signer, SignerSync};
use alloy_signer_local::PrivateKeySigner;

use super::{Connector, Wallet, WalletFuture};
use crate::config::{ConnectorConfig, paths};
use crate::error::{AuthError, AuthErrorKind, AuthResult};

/// User confirmation for wallet requests.
///
/// Implementations may block (e.g., read a terminal); they are run on the
/// blocking thread pool.
pub trait SignApproval: Send + Sync {
    /// Asks whether `connector_name` may connect.
    fn approve_connection(&self, _connector_name: &str) -> bool {
        true
    }

    /// Asks whether `message` may be signed by `address`.
    fn approve_signature(&self, message: &str, address: &str) -> bool;
}

/// Approves every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoApprove;

impl SignApproval for AutoApprove {
    fn approve_signature(&self, _message: &str, _address: &str) -> bool {
        true
    }
}

struct ActiveAccount {
    connector_id: String,
    signer: PrivateKeySigner,
}

/// Wallet backed by locally held private keys.
pub struct LocalKeyWallet {
    connectors: Vec<ConnectorConfig>,
    approval: Arc<dyn SignApproval>,
    active: Mutex<Option<ActiveAccount>>,
}

impl std::fmt::Debug for LocalKeyWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalKeyWallet")
            .field("connectors", &self.connectors)
            .field("connected", &self.lock().as_ref().map(|a| &a.connector_id))
            .finish_non_exhaustive()
    }
}

impl LocalKeyWallet {
    pub fn new(connectors: Vec<ConnectorConfig>, approval: Arc<dyn SignApproval>) -> Self {
        Self {
            connectors,
            approval,
            active: Mutex::new(None),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<ActiveAccount>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn ask<F>(&self, question: F) -> AuthResult<bool>
    where
        F: FnOnce(&dyn SignApproval) -> bool + Send + 'static,
    {
        let approval = Arc::clone(&self.approval);
        tokio::task::spawn_blocking(move || question(approval.as_ref()))
            .await
            .map_err(|e| {
                AuthError::new(AuthErrorKind::Wallet, "Wallet prompt failed").with_details(e.to_string())
            })
    }
}

fn format_address(signer: &PrivateKeySigner) -> String {
    Signer::address(signer).to_string().to_lowercase()
}

/// Reads and parses the private key configured for a connector.
fn load_signer(connector: &ConnectorConfig) -> AuthResult<PrivateKeySigner> {
    let raw = if let Some(var) = connector.key_env.as_deref() {
        std::env::var(var).map_err(|_| {
            AuthError::wallet_unavailable(format!("{}: {var} is not set", connector.name))
        })?
    } else if let Some(file) = connector.key_file.as_deref() {
        let path = paths::expand_home(file);
        std::fs::read_to_string(&path).map_err(|e| {
            AuthError::wallet_unavailable(format!(
                "{}: cannot read key file {}",
                connector.name,
                path.display()
            ))
            .with_details(e.to_string())
        })?
    } else {
        return Err(AuthError::wallet_unavailable(format!(
            "{}: no key source configured",
            connector.name
        )));
    };

    PrivateKeySigner::from_str(raw.trim()).map_err(|e| {
        AuthError::wallet_unavailable(format!("{}: invalid private key", connector.name))
            .with_details(e.to_string())
    })
}

impl Wallet for LocalKeyWallet {
    fn connectors(&self) -> Vec<Connector> {
        self.connectors
            .iter()
            .map(|c| Connector {
                id: c.id.clone(),
                name: c.name.clone(),
            })
            .collect()
    }

    fn connect<'a>(&'a self, connector_id: &'a str) -> WalletFuture<'a, String> {
        Box::pin(async move {
            let connector = self
                .connectors
                .iter()
                .find(|c| c.id == connector_id)
                .ok_or_else(|| {
                    AuthError::wallet_unavailable(format!("Unknown wallet connector: {connector_id}"))
                })?;

            let signer = load_signer(connector)?;

            let name = connector.name.clone();
            if !self.ask(move |a| a.approve_connection(&name)).await? {
                return Err(AuthError::connection_rejected(format!(
                    "{}: connection request was rejected",
                    connector.name
                )));
            }

            let address = format_address(&signer);
            tracing::info!(connector = connector_id, %address, "wallet connected");
            *self.lock() = Some(ActiveAccount {
                connector_id: connector_id.to_string(),
                signer,
            });
            Ok(address)
        })
    }

    fn disconnect(&self) -> WalletFuture<'_, ()> {
        Box::pin(async move {
            if let Some(account) = self.lock().take() {
                tracing::info!(connector = %account.connector_id, "wallet disconnected");
            }
            Ok(())
        })
    }

    fn sign_message<'a>(&'a self, message: &'a str) -> WalletFuture<'a, String> {
        Box::pin(async move {
            let (signer, address) = {
                let guard = self.lock();
                let account = guard.as_ref().ok_or_else(|| {
                    AuthError::new(AuthErrorKind::Wallet, "No wallet connected")
                })?;
                (account.signer.clone(), format_address(&account.signer))
            };

            let prompt_message = message.to_string();
            let prompt_address = address.clone();
            let approved = self
                .ask(move |a| a.approve_signature(&prompt_message, &prompt_address))
                .await?;
            if !approved {
                return Err(AuthError::signature_rejected());
            }

            let signature = signer
                .sign_message_sync(message.as_bytes())
                .map_err(|e| AuthError::signing_failed(e.to_string()))?;
            Ok(hex::encode_prefixed(signature.as_bytes()))
        })
    }
}

#[cfg(test)]
mod tests {
    use tempfile::NamedTempFile;

    use super::*;

    // Well-known development key (first default account of local test chains).
    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcb78d7f2c2ab3ff80";
    const DEV_ADDRESS: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

    struct Deny;

    impl SignApproval for Deny {
        fn approve_signature(&self, _message: &str, _address: &str) -> bool {
            false
        }
    }

    struct DenyConnect;

    impl SignApproval for DenyConnect {
        fn approve_connection(&self, _connector_name: &str) -> bool {
            false
        }

        fn approve_signature(&self, _message: &str, _address: &str) -> bool {
            true
        }
    }

    fn key_file(contents: &str) -> NamedTempFile {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), contents).unwrap();
        file
    }

    fn file_connector(id: &str, file: &NamedTempFile) -> ConnectorConfig {
        ConnectorConfig {
            id: id.to_string(),
            name: format!("{id} wallet"),
            key_env: None,
            key_file: Some(file.path().to_string_lossy().to_string()),
        }
    }

    #[tokio::test]
    async fn test_connect_returns_lowercased_address() {
        let file = key_file(&format!("{DEV_KEY}\n"));
        let wallet = LocalKeyWallet::new(vec![file_connector("dev", &file)], Arc::new(AutoApprove));

        let address = wallet.connect("dev").await.unwrap();
        assert_eq!(address, DEV_ADDRESS);
        assert!(wallet.sign_message("hello").await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_connector_is_unavailable() {
        let wallet = LocalKeyWallet::new(Vec::new(), Arc::new(AutoApprove));
        let err = wallet.connect("nope").await.unwrap_err();
        assert_eq!(err.kind, AuthErrorKind::WalletUnavailable);
    }

    #[tokio::test]
    async fn test_invalid_key_is_unavailable() {
        let file = key_file("not-a-key");
        let wallet = LocalKeyWallet::new(vec![file_connector("dev", &file)], Arc::new(AutoApprove));
        let err = wallet.connect("dev").await.unwrap_err();
        assert_eq!(err.kind, AuthErrorKind::WalletUnavailable);
        assert!(err.message.contains("invalid private key"));
    }

    #[tokio::test]
    async fn test_denied_connection_is_rejected() {
        let file = key_file(DEV_KEY);
        let wallet = LocalKeyWallet::new(vec![file_connector("dev", &file)], Arc::new(DenyConnect));
        let err = wallet.connect("dev").await.unwrap_err();
        assert_eq!(err.kind, AuthErrorKind::ConnectionRejected);
        let err = wallet.sign_message("hello").await.unwrap_err();
        assert_eq!(err.kind, AuthErrorKind::Wallet);
    }

    #[tokio::test]
    async fn test_sign_produces_deterministic_65_byte_signature() {
        let file = key_file(DEV_KEY);
        let wallet = LocalKeyWallet::new(vec![file_connector("dev", &file)], Arc::new(AutoApprove));
        wallet.connect("dev").await.unwrap();

        let first = wallet.sign_message("hello").await.unwrap();
        let second = wallet.sign_message("hello").await.unwrap();
        assert!(first.starts_with("0x"));
        assert_eq!(first.len(), 2 + 130);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_declined_signature_is_rejection() {
        let file = key_file(DEV_KEY);
        let wallet = LocalKeyWallet::new(vec![file_connector("dev", &file)], Arc::new(Deny));
        wallet.connect("dev").await.unwrap();

        let err = wallet.sign_message("hello").await.unwrap_err();
        assert_eq!(err.kind, AuthErrorKind::SignatureRejected);
    }

    #[tokio::test]
    async fn test_sign_requires_connection() {
        let wallet = LocalKeyWallet::new(Vec::new(), Arc::new(AutoApprove));
        let err = wallet.sign_message("hello").await.unwrap_err();
        assert_eq!(err.kind, AuthErrorKind::Wallet);
    }

    #[tokio::test]
    async fn test_disconnect_clears_account() {
        let file = key_file(DEV_KEY);
        let wallet = LocalKeyWallet::new(vec![file_connector("dev", &file)], Arc::new(AutoApprove));
        wallet.connect("dev").await.unwrap();
        wallet.disconnect().await.unwrap();
        let err = wallet.sign_message("hello").await.unwrap_err();
        assert_eq!(err.kind, AuthErrorKind::Wallet);
    }
}
