//! Shape checks for request bodies
//!
//! These only bound lengths and numeric ranges. Channel id grammar, address
//! grammar and tier consistency are admission stages and are not repeated
//! here.

use shared::models::Submission;

use super::extractors::{ShapeChecks, Validatable};
use super::sanitizers::{MAX_DESCRIPTION_LENGTH, MAX_TITLE_LENGTH};
use super::validators::{CHANNEL_ID_MAX_LENGTH, CHANNEL_ID_MIN_LENGTH};
use crate::error::FieldError;

const WALLET_LENGTH: std::ops::RangeInclusive<usize> = 10..=110;
const CURRENCY_LENGTH: std::ops::RangeInclusive<usize> = 2..=10;
const NETWORK_LENGTH: std::ops::RangeInclusive<usize> = 2..=20;
/// Smallest accepted tier price
const MIN_TIER_PRICE: f64 = 0.01;
/// Smallest accepted tier duration, in days
const MIN_TIER_DURATION: i32 = 1;

// `captcha_token` only has to be present. Its value is the risk gate's call,
// and an unconfigured gate accepts any token, blank included.
impl Validatable for Submission {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let channel_id = CHANNEL_ID_MIN_LENGTH..=CHANNEL_ID_MAX_LENGTH;
        let mut checks = ShapeChecks::new();

        checks
            .length("open_channel_id", &self.open_channel_id, channel_id.clone())
            .length("closed_channel_id", &self.closed_channel_id, channel_id)
            .length("open_channel_title", &self.open_channel_title, 1..=MAX_TITLE_LENGTH)
            .length("closed_channel_title", &self.closed_channel_title, 1..=MAX_TITLE_LENGTH)
            .length(
                "open_channel_description",
                &self.open_channel_description,
                1..=MAX_DESCRIPTION_LENGTH,
            )
            .length(
                "closed_channel_description",
                &self.closed_channel_description,
                1..=MAX_DESCRIPTION_LENGTH,
            );

        for tier in self.tiers() {
            if let Some(price) = tier.price {
                checks.reject_if(
                    !(price.is_finite() && price >= MIN_TIER_PRICE),
                    format!("sub_{}_price", tier.number),
                    format!("must be at least {}", MIN_TIER_PRICE),
                );
            }
            if let Some(days) = tier.duration_days {
                checks.reject_if(
                    days < MIN_TIER_DURATION,
                    format!("sub_{}_time", tier.number),
                    format!("must be at least {} day", MIN_TIER_DURATION),
                );
            }
        }

        checks
            .length("client_wallet_address", &self.client_wallet_address, WALLET_LENGTH)
            .length("client_payout_currency", &self.client_payout_currency, CURRENCY_LENGTH)
            .length("client_payout_network", &self.client_payout_network, NETWORK_LENGTH);

        checks.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_submission() -> Submission {
        Submission {
            open_channel_id: "-1001111111111".to_string(),
            open_channel_title: "Signals".to_string(),
            open_channel_description: "Free daily signals".to_string(),
            closed_channel_id: "-1002222222222".to_string(),
            closed_channel_title: "Signals VIP".to_string(),
            closed_channel_description: "Paid signals".to_string(),
            sub_1_price: Some(10.0),
            sub_1_time: Some(30),
            sub_2_price: None,
            sub_2_time: None,
            sub_3_price: None,
            sub_3_time: None,
            client_wallet_address: "0x52908400098527886E0F7030069857D2E4169EE7".to_string(),
            client_payout_currency: "USDT".to_string(),
            client_payout_network: "ETH".to_string(),
            captcha_token: "token".to_string(),
        }
    }

    #[test]
    fn test_valid_submission_passes() {
        assert!(valid_submission().validate().is_ok());
    }

    #[test]
    fn test_empty_title_rejected() {
        let mut submission = valid_submission();
        submission.open_channel_title = String::new();

        let errors = submission.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "open_channel_title");
    }

    #[test]
    fn test_overlong_description_rejected() {
        let mut submission = valid_submission();
        submission.closed_channel_description = "d".repeat(1001);

        let errors = submission.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.field == "closed_channel_description"));
    }

    #[test]
    fn test_tier_ranges() {
        let mut submission = valid_submission();
        submission.sub_1_price = Some(0.0);
        submission.sub_3_time = Some(0);
        submission.sub_2_price = Some(f64::NAN);

        let errors = submission.validate().unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"sub_1_price"));
        assert!(fields.contains(&"sub_2_price"));
        assert!(fields.contains(&"sub_3_time"));
    }

    #[test]
    fn test_price_without_duration_is_not_a_shape_error() {
        let mut submission = valid_submission();
        submission.sub_2_price = Some(9.99);

        assert!(submission.validate().is_ok());
    }

    #[test]
    fn test_blank_captcha_token_is_left_to_the_risk_gate() {
        let mut submission = valid_submission();
        submission.captcha_token = String::new();
        assert!(submission.validate().is_ok());

        submission.captcha_token = "   ".to_string();
        assert!(submission.validate().is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let mut submission = valid_submission();
        submission.open_channel_id = "-1".to_string();
        submission.client_wallet_address = "0x1".to_string();
        submission.client_payout_network = "E".to_string();

        let errors = submission.validate().unwrap_err();
        assert_eq!(errors.len(), 3);
    }
}
