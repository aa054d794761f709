//! The registration admission pipeline.
//!
//! A submission moves through a fixed sequence of stages and stops at the
//! first rejection:
//!
//! ```text
//! Received -> RiskChecked -> FormatChecked(open) -> FormatChecked(closed)
//!   -> DuplicateChecked -> AddressChecked -> TierChecked -> Sanitized
//!   -> Normalized -> Committed
//! ```
//!
//! Only the risk gate and the two storage calls do I/O. Every other stage is
//! a pure function returning a `ValidationVerdict`. Nothing is written until
//! the commit stage, and the commit is all-or-nothing.

use std::fmt;
use std::sync::Arc;

use shared::models::{ChannelRegistration, NewChannelRegistration, Submission};
use thiserror::Error;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::metrics;
use crate::risk::RiskScoreGate;
use crate::store::{RegistrationStore, StoreError};
use crate::validation::{
    normalize_code, normalize_wallet_address, sanitize_input, validate_channel_id,
    validate_wallet_address, ValidationVerdict, MAX_DESCRIPTION_LENGTH, MAX_TITLE_LENGTH,
};

pub const RISK_REJECTED_MESSAGE: &str = "Human verification failed. Please try again.";
pub const DUPLICATE_MESSAGE: &str =
    "Channel already registered. Please contact support if you need to update your registration.";
pub const INTERNAL_MESSAGE: &str = "Registration failed. Please try again later.";

/// Pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    RiskCheck,
    OpenChannelFormat,
    ClosedChannelFormat,
    DuplicateCheck,
    AddressCheck,
    TierCheck,
    Sanitize,
    Normalize,
    Commit,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::RiskCheck => "risk_check",
            Stage::OpenChannelFormat => "open_channel_format",
            Stage::ClosedChannelFormat => "closed_channel_format",
            Stage::DuplicateCheck => "duplicate_check",
            Stage::AddressCheck => "address_check",
            Stage::TierCheck => "tier_check",
            Stage::Sanitize => "sanitize",
            Stage::Normalize => "normalize",
            Stage::Commit => "commit",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The four rejection categories callers can act on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionClass {
    /// Malformed input; resubmitting unchanged will fail again
    BadInput,
    /// One of the channel ids is already registered
    Conflict,
    /// The human-verification step did not pass
    RiskRejected,
    /// Storage or another dependency failed; safe to retry later
    Internal,
}

impl RejectionClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionClass::BadInput => "bad_input",
            RejectionClass::Conflict => "conflict",
            RejectionClass::RiskRejected => "risk_rejected",
            RejectionClass::Internal => "internal",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct AdmissionRejection {
    pub stage: Stage,
    pub class: RejectionClass,
    pub field: Option<String>,
    pub reason: String,
}

impl AdmissionRejection {
    fn bad_input(stage: Stage, field: String, reason: String) -> Self {
        Self {
            stage,
            class: RejectionClass::BadInput,
            field: Some(field),
            reason,
        }
    }

    fn conflict(stage: Stage) -> Self {
        Self {
            stage,
            class: RejectionClass::Conflict,
            field: None,
            reason: DUPLICATE_MESSAGE.to_string(),
        }
    }

    fn risk_rejected() -> Self {
        Self {
            stage: Stage::RiskCheck,
            class: RejectionClass::RiskRejected,
            field: Some("captcha_token".to_string()),
            reason: RISK_REJECTED_MESSAGE.to_string(),
        }
    }

    /// Generic failure. The cause is logged, never returned.
    fn internal(stage: Stage) -> Self {
        Self {
            stage,
            class: RejectionClass::Internal,
            field: None,
            reason: INTERNAL_MESSAGE.to_string(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Pure stages
// ─────────────────────────────────────────────────────────────────────────────

/// Channel id format, labelled with which channel failed
pub fn check_channel_id(field: &str, label: &str, channel_id: &str) -> ValidationVerdict {
    match validate_channel_id(channel_id) {
        Ok(()) => ValidationVerdict::Accepted,
        Err(e) => ValidationVerdict::Rejected {
            field: field.to_string(),
            reason: format!("{}: {}", label, e),
        },
    }
}

pub fn check_address(submission: &Submission) -> ValidationVerdict {
    ValidationVerdict::for_field(
        "client_wallet_address",
        validate_wallet_address(
            &submission.client_wallet_address,
            &submission.client_payout_network,
        )
        .map(|_| ()),
    )
}

/// Every tier with a price must also have a duration. Tiers are checked
/// independently; the first inconsistent one is reported.
pub fn check_tiers(submission: &Submission) -> ValidationVerdict {
    match submission.tiers().iter().find(|tier| !tier.is_consistent()) {
        None => ValidationVerdict::Accepted,
        Some(tier) => ValidationVerdict::Rejected {
            field: format!("sub_{}_time", tier.number),
            reason: format!(
                "Subscription tier {} has a price but no duration",
                tier.number
            ),
        },
    }
}

/// Sanitize free text and normalize codes into a storable record.
pub fn normalize(submission: &Submission) -> NewChannelRegistration {
    NewChannelRegistration {
        open_channel_id: submission.open_channel_id.clone(),
        open_channel_title: sanitize_input(&submission.open_channel_title, MAX_TITLE_LENGTH),
        open_channel_description: sanitize_input(
            &submission.open_channel_description,
            MAX_DESCRIPTION_LENGTH,
        ),
        closed_channel_id: submission.closed_channel_id.clone(),
        closed_channel_title: sanitize_input(&submission.closed_channel_title, MAX_TITLE_LENGTH),
        closed_channel_description: sanitize_input(
            &submission.closed_channel_description,
            MAX_DESCRIPTION_LENGTH,
        ),
        sub_1_price: submission.sub_1_price,
        sub_1_time: submission.sub_1_time,
        sub_2_price: submission.sub_2_price,
        sub_2_time: submission.sub_2_time,
        sub_3_price: submission.sub_3_price,
        sub_3_time: submission.sub_3_time,
        client_wallet_address: normalize_wallet_address(&submission.client_wallet_address),
        client_payout_currency: normalize_code(&submission.client_payout_currency),
        client_payout_network: normalize_code(&submission.client_payout_network),
    }
}

fn gate(stage: Stage, verdict: ValidationVerdict) -> Result<(), AdmissionRejection> {
    match verdict {
        ValidationVerdict::Accepted => {
            debug!(stage = %stage, "stage passed");
            Ok(())
        }
        ValidationVerdict::Rejected { field, reason } => {
            Err(AdmissionRejection::bad_input(stage, field, reason))
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Orchestration
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct AdmissionPipeline {
    store: Arc<dyn RegistrationStore>,
    risk_gate: RiskScoreGate,
}

impl AdmissionPipeline {
    pub fn new(store: Arc<dyn RegistrationStore>, risk_gate: RiskScoreGate) -> Self {
        Self { store, risk_gate }
    }

    pub fn store(&self) -> &Arc<dyn RegistrationStore> {
        &self.store
    }

    pub fn risk_gate(&self) -> &RiskScoreGate {
        &self.risk_gate
    }

    /// Run a submission through every stage.
    ///
    /// `origin` is the client network address forwarded to the risk oracle.
    pub async fn admit(
        &self,
        submission: &Submission,
        origin: Option<&str>,
    ) -> Result<ChannelRegistration, AdmissionRejection> {
        let span = info_span!(
            "admission",
            request_id = %Uuid::new_v4(),
            open_channel_id = %submission.open_channel_id,
            closed_channel_id = %submission.closed_channel_id,
        );

        let result = self.run(submission, origin).instrument(span.clone()).await;

        let _entered = span.enter();
        match &result {
            Ok(row) => {
                metrics::observe_admission("committed");
                info!(id = row.id, "Registration committed");
            }
            Err(rejection) => {
                metrics::observe_admission(rejection.class.as_str());
                metrics::observe_rejection_stage(rejection.stage.as_str());
                warn!(
                    stage = %rejection.stage,
                    class = rejection.class.as_str(),
                    field = rejection.field.as_deref().unwrap_or(""),
                    reason = %rejection.reason,
                    "Registration rejected"
                );
            }
        }
        result
    }

    async fn run(
        &self,
        submission: &Submission,
        origin: Option<&str>,
    ) -> Result<ChannelRegistration, AdmissionRejection> {
        let decision = self.risk_gate.check(&submission.captcha_token, origin).await;
        if !decision.accepted {
            return Err(AdmissionRejection::risk_rejected());
        }
        debug!(score = decision.score, mode = decision.mode.as_str(), "risk check passed");

        gate(
            Stage::OpenChannelFormat,
            check_channel_id("open_channel_id", "Open channel", &submission.open_channel_id),
        )?;
        gate(
            Stage::ClosedChannelFormat,
            check_channel_id(
                "closed_channel_id",
                "Closed channel",
                &submission.closed_channel_id,
            ),
        )?;

        let existing = self
            .store
            .find_by_either_channel(&submission.open_channel_id, &submission.closed_channel_id)
            .await
            .map_err(|e| {
                error!(error = %e, "Duplicate lookup failed");
                AdmissionRejection::internal(Stage::DuplicateCheck)
            })?;
        if let Some(existing) = existing {
            debug!(existing_id = existing.id, "channel already registered");
            return Err(AdmissionRejection::conflict(Stage::DuplicateCheck));
        }

        gate(Stage::AddressCheck, check_address(submission))?;
        gate(Stage::TierCheck, check_tiers(submission))?;

        let record = normalize(submission);

        self.store.insert(&record).await.map_err(|e| match e {
            StoreError::UniqueViolation { constraint } => {
                warn!(constraint = %constraint, "Duplicate caught by unique constraint at commit");
                AdmissionRejection::conflict(Stage::Commit)
            }
            other => {
                error!(error = %other, "Failed to persist registration");
                AdmissionRejection::internal(Stage::Commit)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission() -> Submission {
        Submission {
            open_channel_id: "-1001111111111".to_string(),
            open_channel_title: "  Signals <script>alert(1)</script> ".to_string(),
            open_channel_description: "Free signals".to_string(),
            closed_channel_id: "-1002222222222".to_string(),
            closed_channel_title: "Signals VIP".to_string(),
            closed_channel_description: "Paid <iframe src=x></iframe>signals".to_string(),
            sub_1_price: None,
            sub_1_time: None,
            sub_2_price: None,
            sub_2_time: None,
            sub_3_price: None,
            sub_3_time: None,
            client_wallet_address: "  0x52908400098527886E0F7030069857D2E4169EE7 ".to_string(),
            client_payout_currency: " usdt".to_string(),
            client_payout_network: "eth ".to_string(),
            captcha_token: "token".to_string(),
        }
    }

    #[test]
    fn test_stages_are_ordered() {
        assert!(Stage::RiskCheck < Stage::OpenChannelFormat);
        assert!(Stage::ClosedChannelFormat < Stage::DuplicateCheck);
        assert!(Stage::DuplicateCheck < Stage::AddressCheck);
        assert!(Stage::TierCheck < Stage::Commit);
    }

    #[test]
    fn test_channel_reason_names_the_channel() {
        let verdict = check_channel_id("closed_channel_id", "Closed channel", "100123");
        assert_eq!(
            verdict,
            ValidationVerdict::Rejected {
                field: "closed_channel_id".to_string(),
                reason: "Closed channel: Channel ID must start with '-'".to_string(),
            }
        );
    }

    #[test]
    fn test_tier_check_reports_first_inconsistent_tier() {
        let mut s = submission();
        s.sub_1_price = Some(5.0);
        s.sub_1_time = Some(7);
        s.sub_3_price = Some(50.0);
        let verdict = check_tiers(&s);
        assert!(matches!(
            verdict,
            ValidationVerdict::Rejected { ref field, .. } if field == "sub_3_time"
        ));

        s.sub_3_time = Some(365);
        assert!(check_tiers(&s).is_accepted());
    }

    #[test]
    fn test_unsupported_network_is_an_address_rejection() {
        let mut s = submission();
        s.client_payout_network = "DOGE".to_string();
        let verdict = check_address(&s);
        assert!(matches!(
            verdict,
            ValidationVerdict::Rejected { ref reason, .. } if reason == "Unsupported network: DOGE"
        ));
    }

    #[test]
    fn test_normalize_sanitizes_and_uppercases() {
        let record = normalize(&submission());
        assert_eq!(record.open_channel_title, "Signals");
        assert_eq!(record.closed_channel_description, "Paid signals");
        assert_eq!(
            record.client_wallet_address,
            "0x52908400098527886E0F7030069857D2E4169EE7"
        );
        assert_eq!(record.client_payout_currency, "USDT");
        assert_eq!(record.client_payout_network, "ETH");
        assert_eq!(record.open_channel_id, "-1001111111111");
    }

    #[test]
    fn test_rejection_display_is_the_reason() {
        let rejection = AdmissionRejection::internal(Stage::Commit);
        assert_eq!(rejection.to_string(), INTERNAL_MESSAGE);
        assert_eq!(rejection.class.as_str(), "internal");
    }
}
