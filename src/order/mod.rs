//! Order validation and normalization against exchange minimums.

pub mod preparer;
pub mod types;

pub use preparer::{ExchangeRounding, PrecisionRounding, check_limits, prepare_order};
pub use types::{OrderType, PreparedOrder, RawOrder, RejectReason, RejectedOrder};
