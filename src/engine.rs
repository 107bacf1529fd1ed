//! Collaborator seams
//!
//! The controller never touches keys, RPC endpoints or views directly. It talks
//! to the wallet engine, the auto-lock manager, the view host and the app store
//! through these traits.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Wallet engine operations the controller depends on
#[async_trait]
pub trait Engine: Send + Sync {
    /// Refresh incoming/outgoing transaction history for the selected account
    async fn refresh_transaction_history(&self) -> Result<(), Error>;

    /// Cheap liveness probe against the current provider (`eth_blockNumber`)
    async fn query_block_number(&self) -> Result<u64, Error>;
}

/// Auto-lock timer owned by the controller
pub trait LockManager: Send + Sync {
    /// Begin watching for inactivity with the given timeout
    fn start_listening(&self, lock_time_ms: u64);
    /// Replace the timeout of a running timer
    fn update_lock_time(&self, lock_time_ms: u64);
    /// Stop the timer and release its OS listeners
    fn stop_listening(&self);
}

/// Navigation targets the controller can request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Route {
    /// Transaction list, optionally focused on one transaction
    TransactionsHome { transaction_id: Option<String> },
}

/// View tree / navigator
pub trait ViewHost: Send + Sync {
    fn navigate(&self, route: Route);
    /// Unmount (`true`) or remount (`false`) the main navigator
    fn set_force_reload(&self, reloading: bool);
    /// Blocking alert dialog
    fn show_alert(&self, title: &str, message: &str);
}

/// App store actions dispatched by the controller
pub trait StateStore: Send + Sync {
    fn remove_not_visible_notifications(&self);
    fn set_provider_blocked(&self, blocked: bool);
}

/// Network provider kind of the selected network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    Mainnet,
    Ropsten,
    Rinkeby,
    Kovan,
    Goerli,
    /// User-supplied RPC endpoint
    Rpc,
}

impl ProviderType {
    /// Hosted providers are probed for availability; custom RPC endpoints are not.
    pub fn is_custom(&self) -> bool {
        matches!(self, ProviderType::Rpc)
    }
}

impl FromStr for ProviderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mainnet" => Ok(ProviderType::Mainnet),
            "ropsten" => Ok(ProviderType::Ropsten),
            "rinkeby" => Ok(ProviderType::Rinkeby),
            "kovan" => Ok(ProviderType::Kovan),
            "goerli" => Ok(ProviderType::Goerli),
            "rpc" => Ok(ProviderType::Rpc),
            _ => Err(format!("Invalid provider type: {}", s)),
        }
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProviderType::Mainnet => "mainnet",
            ProviderType::Ropsten => "ropsten",
            ProviderType::Rinkeby => "rinkeby",
            ProviderType::Kovan => "kovan",
            ProviderType::Goerli => "goerli",
            ProviderType::Rpc => "rpc",
        };
        write!(f, "{}", name)
    }
}
