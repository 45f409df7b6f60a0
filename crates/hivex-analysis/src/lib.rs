//! Winner selection and the aggregations behind the results charts.

pub mod chart_data;
pub mod frame;
pub mod records;
pub mod select;

pub use records::{
    DatasetWinners, MeanValue, RecordKey, RecordKeyError, SkipReason, WinnerRecord, WinnerTable,
};
pub use select::select_winners;
pub use frame::observation_frame;
