pub mod abi;
pub mod options;
pub mod skipped;

pub use abi::{GuestBuffer, RecordField, ResultRecord, ERROR_SENTINEL, RESULT_RECORD_LAYOUT};
pub use options::{ConvertRequest, FilterFlags, GameType, RakeSettings};
pub use skipped::{SkipReason, SkippedHandInfo};
