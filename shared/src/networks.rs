//! Payout networks and the reference network/currency catalog.
//!
//! Address format is a property of the chain, not of the token, so every
//! lookup here is keyed by network. Several EVM chains share one grammar.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Returned when a network code is not one of the supported payout networks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unsupported network: {0}")]
pub struct UnknownNetwork(pub String);

/// Every network a payout wallet may live on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PayoutNetwork {
    Btc,
    Eth,
    Bsc,
    Polygon,
    Arbitrum,
    Optimism,
    Avalanche,
    Base,
    Linea,
    Sol,
    Trx,
    Ton,
}

/// Address grammar families. One grammar may serve many networks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressGrammar {
    /// Legacy (`1...`), P2SH (`3...`) and Bech32 (`bc1...`) Bitcoin addresses
    Bitcoin,
    /// `0x` followed by 40 hex digits
    EvmHex160,
    /// Base58, 32 to 44 characters (Solana address space)
    Base58,
    /// `T` followed by 33 alphanumerics
    Tron,
    /// TON user-friendly or raw `workchain:hex` form
    Ton,
}

impl PayoutNetwork {
    pub const ALL: [PayoutNetwork; 12] = [
        PayoutNetwork::Btc,
        PayoutNetwork::Eth,
        PayoutNetwork::Bsc,
        PayoutNetwork::Polygon,
        PayoutNetwork::Arbitrum,
        PayoutNetwork::Optimism,
        PayoutNetwork::Avalanche,
        PayoutNetwork::Base,
        PayoutNetwork::Linea,
        PayoutNetwork::Sol,
        PayoutNetwork::Trx,
        PayoutNetwork::Ton,
    ];

    /// Parse a network code. Surrounding whitespace and case are ignored.
    pub fn from_code(code: &str) -> Result<Self, UnknownNetwork> {
        let normalized = code.trim().to_uppercase();
        Self::ALL
            .into_iter()
            .find(|network| network.code() == normalized)
            .ok_or_else(|| UnknownNetwork(code.to_string()))
    }

    pub fn code(&self) -> &'static str {
        match self {
            PayoutNetwork::Btc => "BTC",
            PayoutNetwork::Eth => "ETH",
            PayoutNetwork::Bsc => "BSC",
            PayoutNetwork::Polygon => "POLYGON",
            PayoutNetwork::Arbitrum => "ARBITRUM",
            PayoutNetwork::Optimism => "OPTIMISM",
            PayoutNetwork::Avalanche => "AVALANCHE",
            PayoutNetwork::Base => "BASE",
            PayoutNetwork::Linea => "LINEA",
            PayoutNetwork::Sol => "SOL",
            PayoutNetwork::Trx => "TRX",
            PayoutNetwork::Ton => "TON",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            PayoutNetwork::Btc => "Bitcoin",
            PayoutNetwork::Eth => "Ethereum",
            PayoutNetwork::Bsc => "Binance Smart Chain",
            PayoutNetwork::Polygon => "Polygon",
            PayoutNetwork::Arbitrum => "Arbitrum",
            PayoutNetwork::Optimism => "Optimism",
            PayoutNetwork::Avalanche => "Avalanche C-Chain",
            PayoutNetwork::Base => "Base",
            PayoutNetwork::Linea => "Linea",
            PayoutNetwork::Sol => "Solana",
            PayoutNetwork::Trx => "Tron",
            PayoutNetwork::Ton => "The Open Network",
        }
    }

    /// The address grammar wallets on this network must follow.
    pub fn grammar(&self) -> AddressGrammar {
        match self {
            PayoutNetwork::Btc => AddressGrammar::Bitcoin,
            PayoutNetwork::Eth
            | PayoutNetwork::Bsc
            | PayoutNetwork::Polygon
            | PayoutNetwork::Arbitrum
            | PayoutNetwork::Optimism
            | PayoutNetwork::Avalanche
            | PayoutNetwork::Base
            | PayoutNetwork::Linea => AddressGrammar::EvmHex160,
            PayoutNetwork::Sol => AddressGrammar::Base58,
            PayoutNetwork::Trx => AddressGrammar::Tron,
            PayoutNetwork::Ton => AddressGrammar::Ton,
        }
    }

    /// Catalog entries for this network.
    pub fn currencies(&self) -> impl Iterator<Item = &'static NetworkCurrencyMapping> {
        let code = self.code();
        NETWORK_CURRENCY_MAPPINGS
            .iter()
            .filter(move |mapping| mapping.network_code == code)
    }
}

impl fmt::Display for PayoutNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for PayoutNetwork {
    type Err = UnknownNetwork;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s)
    }
}

/// One row of the network/currency reference catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NetworkCurrencyMapping {
    pub network_code: &'static str,
    pub network_name: &'static str,
    pub currency_code: &'static str,
    pub currency_name: &'static str,
}

/// Code/name pair used by the network and currency listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub code: &'static str,
    pub name: &'static str,
}

const fn mapping(
    network_code: &'static str,
    network_name: &'static str,
    currency_code: &'static str,
    currency_name: &'static str,
) -> NetworkCurrencyMapping {
    NetworkCurrencyMapping {
        network_code,
        network_name,
        currency_code,
        currency_name,
    }
}

pub static NETWORK_CURRENCY_MAPPINGS: &[NetworkCurrencyMapping] = &[
    mapping("BTC", "Bitcoin", "BTC", "Bitcoin"),
    mapping("ETH", "Ethereum", "ETH", "Ethereum"),
    mapping("ETH", "Ethereum", "USDT", "Tether USD"),
    mapping("ETH", "Ethereum", "USDC", "USD Coin"),
    mapping("ETH", "Ethereum", "DAI", "Dai Stablecoin"),
    mapping("BSC", "Binance Smart Chain", "BNB", "BNB"),
    mapping("BSC", "Binance Smart Chain", "USDT", "Tether USD"),
    mapping("BSC", "Binance Smart Chain", "USDC", "USD Coin"),
    mapping("BSC", "Binance Smart Chain", "BUSD", "Binance USD"),
    mapping("POLYGON", "Polygon", "MATIC", "Polygon"),
    mapping("POLYGON", "Polygon", "USDT", "Tether USD"),
    mapping("POLYGON", "Polygon", "USDC", "USD Coin"),
    mapping("ARBITRUM", "Arbitrum", "ETH", "Ethereum"),
    mapping("ARBITRUM", "Arbitrum", "USDT", "Tether USD"),
    mapping("ARBITRUM", "Arbitrum", "USDC", "USD Coin"),
    mapping("OPTIMISM", "Optimism", "ETH", "Ethereum"),
    mapping("OPTIMISM", "Optimism", "USDT", "Tether USD"),
    mapping("OPTIMISM", "Optimism", "USDC", "USD Coin"),
    mapping("AVALANCHE", "Avalanche C-Chain", "AVAX", "Avalanche"),
    mapping("AVALANCHE", "Avalanche C-Chain", "USDT", "Tether USD"),
    mapping("AVALANCHE", "Avalanche C-Chain", "USDC", "USD Coin"),
    mapping("BASE", "Base", "ETH", "Ethereum"),
    mapping("BASE", "Base", "USDC", "USD Coin"),
    mapping("LINEA", "Linea", "ETH", "Ethereum"),
    mapping("LINEA", "Linea", "USDC", "USD Coin"),
    mapping("SOL", "Solana", "SOL", "Solana"),
    mapping("SOL", "Solana", "USDT", "Tether USD"),
    mapping("SOL", "Solana", "USDC", "USD Coin"),
    mapping("TRX", "Tron", "TRX", "Tron"),
    mapping("TRX", "Tron", "USDT", "Tether USD"),
    mapping("TRX", "Tron", "USDC", "USD Coin"),
    mapping("TON", "The Open Network", "TON", "Toncoin"),
    mapping("TON", "The Open Network", "USDT", "Tether USD"),
];

/// Distinct networks in catalog order
pub fn supported_networks() -> Vec<CatalogEntry> {
    let mut seen: Vec<CatalogEntry> = Vec::new();
    for m in NETWORK_CURRENCY_MAPPINGS {
        if !seen.iter().any(|entry| entry.code == m.network_code) {
            seen.push(CatalogEntry {
                code: m.network_code,
                name: m.network_name,
            });
        }
    }
    seen
}

/// Distinct currencies in first-seen order
pub fn supported_currencies() -> Vec<CatalogEntry> {
    let mut seen: Vec<CatalogEntry> = Vec::new();
    for m in NETWORK_CURRENCY_MAPPINGS {
        if !seen.iter().any(|entry| entry.code == m.currency_code) {
            seen.push(CatalogEntry {
                code: m.currency_code,
                name: m.currency_name,
            });
        }
    }
    seen
}
