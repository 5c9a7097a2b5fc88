//! subtrack-core: shared transaction model, field normalization, and
//! frequency analysis for the membership-detection pipeline.

pub mod frequency;
pub mod merchant;
pub mod normalize;
pub mod transaction;

pub use frequency::{Cadence, CadenceStats, analyze};
pub use merchant::{clean_category, normalize_merchant};
pub use normalize::{parse_amount, parse_date, parse_date_or_now};
pub use transaction::{Frequency, MembershipType, Source, Transaction};
