//! Field validators for registration input
//!
//! Every function here is pure: no I/O, no side effects. The admission
//! pipeline calls them in a fixed order and stops at the first rejection.

use lazy_static::lazy_static;
use regex::Regex;
use shared::{AddressGrammar, PayoutNetwork};
use thiserror::Error;

lazy_static! {
    /// Bitcoin legacy P2PKH: starts with '1', base58 body
    static ref BTC_LEGACY_REGEX: Regex = Regex::new(r"^1[a-km-zA-HJ-NP-Z1-9]{25,34}$").unwrap();

    /// Bitcoin P2SH: starts with '3', base58 body
    static ref BTC_P2SH_REGEX: Regex = Regex::new(r"^3[a-km-zA-HJ-NP-Z1-9]{25,34}$").unwrap();

    /// Bitcoin native SegWit (bech32)
    static ref BTC_BECH32_REGEX: Regex = Regex::new(r"^bc1[a-zA-HJ-NP-Z0-9]{39,87}$").unwrap();

    /// Ethereum and every EVM-compatible chain
    static ref EVM_REGEX: Regex = Regex::new(r"^0x[0-9a-fA-F]{40}$").unwrap();

    /// Base58, 32 to 44 characters (Solana)
    static ref BASE58_REGEX: Regex = Regex::new(r"^[1-9A-HJ-NP-Za-km-z]{32,44}$").unwrap();

    /// Tron: 'T' followed by 33 alphanumerics
    static ref TRON_REGEX: Regex = Regex::new(r"^T[A-Za-z0-9]{33}$").unwrap();

    /// TON user-friendly (base64url) form
    static ref TON_FRIENDLY_REGEX: Regex = Regex::new(r"^[EU]Q[A-Za-z0-9_-]{46}$").unwrap();

    /// TON raw `workchain:hex` form
    static ref TON_RAW_REGEX: Regex = Regex::new(r"^-?[0-9]:[0-9a-fA-F]{64}$").unwrap();
}

pub const CHANNEL_ID_MIN_LENGTH: usize = 5;
pub const CHANNEL_ID_MAX_LENGTH: usize = 50;

/// Outcome of a single validation stage. Never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationVerdict {
    Accepted,
    Rejected { field: String, reason: String },
}

impl ValidationVerdict {
    /// Lift a validator result into a verdict for `field`.
    pub fn for_field<E: std::fmt::Display>(field: &str, result: Result<(), E>) -> Self {
        match result {
            Ok(()) => ValidationVerdict::Accepted,
            Err(e) => ValidationVerdict::Rejected {
                field: field.to_string(),
                reason: e.to_string(),
            },
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, ValidationVerdict::Accepted)
    }
}

/// Which channel id rule was broken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ChannelIdError {
    #[error("Channel ID must start with '-'")]
    MissingLeadingDash,
    #[error("Channel ID must contain only digits after '-'")]
    NonDigit,
    #[error("Channel ID must be 5-50 characters")]
    LengthOutOfRange,
}

/// Why a wallet address was refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("Unsupported network: {0}")]
    UnsupportedNetwork(String),
    #[error("Invalid {0} address format")]
    InvalidFormat(PayoutNetwork),
}

/// Validate string length within bounds
pub fn validate_length(value: &str, min: usize, max: usize) -> Result<(), String> {
    let len = value.chars().count();
    if len < min {
        return Err(format!("must be at least {} characters", min));
    }
    if len > max {
        return Err(format!("must be at most {} characters", max));
    }
    Ok(())
}

/// Validate a Telegram channel identifier.
///
/// Valid iff it starts with '-', everything after the dash is an ASCII digit
/// (at least one), and the whole id is 5 to 50 characters long. Rules are
/// checked in that order and the first failure is reported.
pub fn validate_channel_id(channel_id: &str) -> Result<(), ChannelIdError> {
    let Some(digits) = channel_id.strip_prefix('-') else {
        return Err(ChannelIdError::MissingLeadingDash);
    };

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ChannelIdError::NonDigit);
    }

    // ASCII only at this point, so byte length equals character count
    if !(CHANNEL_ID_MIN_LENGTH..=CHANNEL_ID_MAX_LENGTH).contains(&channel_id.len()) {
        return Err(ChannelIdError::LengthOutOfRange);
    }

    Ok(())
}

/// Whether `address` (already trimmed) is well-formed under `grammar`.
pub fn matches_grammar(grammar: AddressGrammar, address: &str) -> bool {
    match grammar {
        AddressGrammar::Bitcoin => {
            BTC_LEGACY_REGEX.is_match(address)
                || BTC_P2SH_REGEX.is_match(address)
                || BTC_BECH32_REGEX.is_match(address)
        }
        AddressGrammar::EvmHex160 => EVM_REGEX.is_match(address),
        AddressGrammar::Base58 => BASE58_REGEX.is_match(address),
        AddressGrammar::Tron => TRON_REGEX.is_match(address),
        AddressGrammar::Ton => {
            TON_FRIENDLY_REGEX.is_match(address) || TON_RAW_REGEX.is_match(address)
        }
    }
}

/// Validate a payout wallet address for a network code.
///
/// The address is trimmed and the code is matched case-insensitively.
/// Unknown network codes are always rejected. On success the resolved
/// network is returned.
pub fn validate_wallet_address(address: &str, network_code: &str) -> Result<PayoutNetwork, AddressError> {
    let address = address.trim();
    let network = PayoutNetwork::from_code(network_code)
        .map_err(|_| AddressError::UnsupportedNetwork(network_code.to_string()))?;

    if !matches_grammar(network.grammar(), address) {
        return Err(AddressError::InvalidFormat(network));
    }

    Ok(network)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EVM: &str = "0x52908400098527886E0F7030069857D2E4169EE7";
    const BTC_LEGACY: &str = "1BvBMSEYstWetqTFn5Au4m4GFg7xJaNVN2";
    const BTC_P2SH: &str = "3J98t1WpEZ73CNmQviecrnyiWrnqRhWNLy";
    const BTC_BECH32: &str = "bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq";
    const SOL: &str = "7EcDhSYGxXyscszYEp35KHN8vvw3svAuLKTzXwCFLtV";
    const TRON: &str = "TJRabPrwbZy45sbavfcjinPJC18kjpRTv8";
    const TON_FRIENDLY: &str = "EQDtFpEwcFAEcRe5mLVh2N6C0x-_hJEM7W61_JLnSF74p4q2";

    #[test]
    fn test_channel_id_accepts_telegram_ids() {
        assert_eq!(validate_channel_id("-1001234567890"), Ok(()));
        assert_eq!(validate_channel_id("-1234"), Ok(()));
        let longest = format!("-{}", "9".repeat(49));
        assert_eq!(validate_channel_id(&longest), Ok(()));
    }

    #[test]
    fn test_channel_id_reports_failed_rule() {
        assert_eq!(validate_channel_id("1001234567890"), Err(ChannelIdError::MissingLeadingDash));
        assert_eq!(validate_channel_id(""), Err(ChannelIdError::MissingLeadingDash));
        assert_eq!(validate_channel_id("-100abc"), Err(ChannelIdError::NonDigit));
        assert_eq!(validate_channel_id("-"), Err(ChannelIdError::NonDigit));
        assert_eq!(validate_channel_id("--12345"), Err(ChannelIdError::NonDigit));
        assert_eq!(validate_channel_id("-12 34"), Err(ChannelIdError::NonDigit));
        assert_eq!(validate_channel_id("-123"), Err(ChannelIdError::LengthOutOfRange));
        let too_long = format!("-{}", "1".repeat(50));
        assert_eq!(validate_channel_id(&too_long), Err(ChannelIdError::LengthOutOfRange));
    }

    #[test]
    fn test_channel_id_rejects_non_ascii_digits() {
        // Arabic-Indic digits are digits, but not ASCII ones
        assert_eq!(validate_channel_id("-١٢٣٤٥٦"), Err(ChannelIdError::NonDigit));
    }

    #[test]
    fn test_channel_id_revalidation_is_stable() {
        for id in ["-1001234567890", "-12345", "-9999"] {
            assert!(validate_channel_id(id).is_ok());
            assert!(validate_channel_id(id).is_ok());
        }
    }

    #[test]
    fn test_bitcoin_forms() {
        assert!(validate_wallet_address(BTC_LEGACY, "BTC").is_ok());
        assert!(validate_wallet_address(BTC_P2SH, "btc").is_ok());
        assert!(validate_wallet_address(BTC_BECH32, "BTC").is_ok());
        // '0' is outside the base58 alphabet
        assert!(validate_wallet_address("1BvBMSEYstWetqTFn5Au4m4GFg7xJaNVN0", "BTC").is_err());
        assert!(validate_wallet_address("2BvBMSEYstWetqTFn5Au4m4GFg7xJaNVN2", "BTC").is_err());
    }

    #[test]
    fn test_evm_grammar_shared_across_chains() {
        for code in ["ETH", "BSC", "POLYGON", "ARBITRUM", "OPTIMISM", "AVALANCHE", "BASE", "LINEA"] {
            assert_eq!(
                validate_wallet_address(EVM, code).map(|n| n.grammar()),
                Ok(AddressGrammar::EvmHex160),
                "{}",
                code
            );
        }
        assert!(validate_wallet_address("0x52908400098527886E0F7030069857D2E4169EE", "ETH").is_err());
        assert!(validate_wallet_address("0xZZZ08400098527886E0F7030069857D2E4169EE7", "ETH").is_err());
        assert!(validate_wallet_address("52908400098527886E0F7030069857D2E4169EE7", "ETH").is_err());
    }

    #[test]
    fn test_solana_tron_ton() {
        assert!(validate_wallet_address(SOL, "SOL").is_ok());
        assert!(validate_wallet_address(TRON, "TRX").is_ok());
        assert!(validate_wallet_address(TON_FRIENDLY, "TON").is_ok());
        let raw = format!("0:{}", "a".repeat(64));
        assert!(validate_wallet_address(&raw, "TON").is_ok());
        let masterchain = format!("-1:{}", "F".repeat(64));
        assert!(validate_wallet_address(&masterchain, "TON").is_ok());
        assert!(validate_wallet_address(&format!("0:{}", "a".repeat(63)), "TON").is_err());
    }

    #[test]
    fn test_addresses_do_not_cross_incompatible_networks() {
        assert_eq!(
            validate_wallet_address(EVM, "TRX"),
            Err(AddressError::InvalidFormat(PayoutNetwork::Trx))
        );
        assert!(validate_wallet_address(EVM, "SOL").is_err());
        assert!(validate_wallet_address(EVM, "BTC").is_err());
        assert!(validate_wallet_address(TRON, "ETH").is_err());
        assert!(validate_wallet_address(TON_FRIENDLY, "SOL").is_err());
        assert!(validate_wallet_address(BTC_BECH32, "SOL").is_err());
    }

    #[test]
    fn test_unsupported_network_always_rejected() {
        for address in [EVM, BTC_LEGACY, SOL, TRON, ""] {
            assert_eq!(
                validate_wallet_address(address, "DOGE"),
                Err(AddressError::UnsupportedNetwork("DOGE".to_string()))
            );
        }
    }

    #[test]
    fn test_address_is_trimmed_before_matching() {
        let padded = format!("  {}\n", EVM);
        assert_eq!(validate_wallet_address(&padded, " eth "), Ok(PayoutNetwork::Eth));
    }

    #[test]
    fn test_verdict_for_field() {
        let verdict = ValidationVerdict::for_field("open_channel_id", validate_channel_id("123"));
        assert_eq!(
            verdict,
            ValidationVerdict::Rejected {
                field: "open_channel_id".to_string(),
                reason: "Channel ID must start with '-'".to_string(),
            }
        );
        assert!(ValidationVerdict::for_field("x", Ok::<(), String>(())).is_accepted());
    }

    #[test]
    fn test_validate_length() {
        assert!(validate_length("hello", 1, 10).is_ok());
        assert!(validate_length("", 1, 10).is_err());
        assert!(validate_length("hello world!", 1, 5).is_err());
    }
}
