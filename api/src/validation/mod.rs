//! Input validation for the intake API
//!
//! # Overview
//!
//! 1. **Extractors** - `ValidatedJson<T>` rejects malformed request shapes
//! 2. **Validators** - channel id and payout address grammars
//! 3. **Sanitizers** - free-text cleaning and code normalization
//!
//! Validators and sanitizers are pure functions. The admission pipeline
//! calls them in a fixed order; the extractor only guards lengths and
//! numeric ranges.
//!
//! # Shape error response
//!
//! Same body as any other `ApiError`, with stage `shape`:
//!
//! ```json
//! {
//!   "error": "ValidationError",
//!   "message": "Invalid values for 2 fields",
//!   "code": 400,
//!   "timestamp": "2026-02-20T10:30:00Z",
//!   "correlation_id": "uuid-here",
//!   "stage": "shape",
//!   "field": "open_channel_title",
//!   "errors": [
//!     {"field": "open_channel_title", "message": "must be at least 1 characters"},
//!     {"field": "sub_1_price", "message": "must be at least 0.01"}
//!   ]
//! }
//! ```

pub mod extractors;
pub mod requests;
pub mod sanitizers;
pub mod validators;

pub use extractors::{ShapeChecks, Validatable, ValidatedJson};
pub use sanitizers::{
    normalize_code, normalize_wallet_address, sanitize_input, MAX_DESCRIPTION_LENGTH,
    MAX_TITLE_LENGTH,
};
pub use validators::{
    validate_channel_id, validate_wallet_address, AddressError, ChannelIdError, ValidationVerdict,
};
