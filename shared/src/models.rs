use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ═══════════════════════════════════════════════════════════════════════════
// SUBMISSION (untrusted input)
// ═══════════════════════════════════════════════════════════════════════════

/// A registration request as received from a client.
///
/// Field presence and primitive types are guaranteed by deserialization;
/// nothing else about the contents is trusted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub open_channel_id: String,
    pub open_channel_title: String,
    pub open_channel_description: String,

    pub closed_channel_id: String,
    pub closed_channel_title: String,
    pub closed_channel_description: String,

    #[serde(default)]
    pub sub_1_price: Option<f64>,
    #[serde(default)]
    pub sub_1_time: Option<i32>,
    #[serde(default)]
    pub sub_2_price: Option<f64>,
    #[serde(default)]
    pub sub_2_time: Option<i32>,
    #[serde(default)]
    pub sub_3_price: Option<f64>,
    #[serde(default)]
    pub sub_3_time: Option<i32>,

    pub client_wallet_address: String,
    pub client_payout_currency: String,
    pub client_payout_network: String,

    /// Human-verification token handed to the risk oracle
    pub captcha_token: String,
}

/// One price/duration pair. Duration is in days.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionTier {
    pub number: u8,
    pub price: Option<f64>,
    pub duration_days: Option<i32>,
}

impl SubscriptionTier {
    /// A price without a duration is the only inconsistent combination.
    pub fn is_consistent(&self) -> bool {
        !(self.price.is_some() && self.duration_days.is_none())
    }
}

impl Submission {
    pub fn tiers(&self) -> [SubscriptionTier; 3] {
        [
            SubscriptionTier {
                number: 1,
                price: self.sub_1_price,
                duration_days: self.sub_1_time,
            },
            SubscriptionTier {
                number: 2,
                price: self.sub_2_price,
                duration_days: self.sub_2_time,
            },
            SubscriptionTier {
                number: 3,
                price: self.sub_3_price,
                duration_days: self.sub_3_time,
            },
        ]
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// CHANNEL REGISTRATION (persisted)
// ═══════════════════════════════════════════════════════════════════════════

/// Normalized, sanitized registration ready for insertion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewChannelRegistration {
    pub open_channel_id: String,
    pub open_channel_title: String,
    pub open_channel_description: String,
    pub closed_channel_id: String,
    pub closed_channel_title: String,
    pub closed_channel_description: String,
    pub sub_1_price: Option<f64>,
    pub sub_1_time: Option<i32>,
    pub sub_2_price: Option<f64>,
    pub sub_2_time: Option<i32>,
    pub sub_3_price: Option<f64>,
    pub sub_3_time: Option<i32>,
    pub client_wallet_address: String,
    pub client_payout_currency: String,
    pub client_payout_network: String,
}

/// A stored registration row.
///
/// Rows are never deleted; `is_active = false` retires a registration while
/// keeping both channel ids reserved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ChannelRegistration {
    pub id: i64,
    pub open_channel_id: String,
    pub open_channel_title: String,
    pub open_channel_description: String,
    pub closed_channel_id: String,
    pub closed_channel_title: String,
    pub closed_channel_description: String,
    pub sub_1_price: Option<f64>,
    pub sub_1_time: Option<i32>,
    pub sub_2_price: Option<f64>,
    pub sub_2_time: Option<i32>,
    pub sub_3_price: Option<f64>,
    pub sub_3_time: Option<i32>,
    pub client_wallet_address: String,
    pub client_payout_currency: String,
    pub client_payout_network: String,
    pub is_active: bool,
    pub verified: bool,
    pub verification_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ChannelRegistration {
    /// Materialize a freshly inserted row with the storage defaults applied.
    pub fn from_new(id: i64, new: NewChannelRegistration, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            open_channel_id: new.open_channel_id,
            open_channel_title: new.open_channel_title,
            open_channel_description: new.open_channel_description,
            closed_channel_id: new.closed_channel_id,
            closed_channel_title: new.closed_channel_title,
            closed_channel_description: new.closed_channel_description,
            sub_1_price: new.sub_1_price,
            sub_1_time: new.sub_1_time,
            sub_2_price: new.sub_2_price,
            sub_2_time: new.sub_2_time,
            sub_3_price: new.sub_3_price,
            sub_3_time: new.sub_3_time,
            client_wallet_address: new.client_wallet_address,
            client_payout_currency: new.client_payout_currency,
            client_payout_network: new.client_payout_network,
            is_active: true,
            verified: false,
            verification_notes: None,
            created_at,
            updated_at: None,
        }
    }
}

/// Public view of a registration returned to the submitter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationResponse {
    pub id: i64,
    pub open_channel_id: String,
    pub open_channel_title: String,
    pub closed_channel_id: String,
    pub closed_channel_title: String,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
    pub verified: bool,
}

impl From<&ChannelRegistration> for RegistrationResponse {
    fn from(row: &ChannelRegistration) -> Self {
        Self {
            id: row.id,
            open_channel_id: row.open_channel_id.clone(),
            open_channel_title: row.open_channel_title.clone(),
            closed_channel_id: row.closed_channel_id.clone(),
            closed_channel_title: row.closed_channel_title.clone(),
            created_at: row.created_at,
            is_active: row.is_active,
            verified: row.verified,
        }
    }
}
