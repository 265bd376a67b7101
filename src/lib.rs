//! Race-card feed normalization: parse heterogeneous race-time strings into a
//! display form plus a sortable minutes key, and nest flat feed records into
//! first-seen-ordered, deduplicated group trees.

pub mod csv_out;
pub mod dates;
pub mod errors;
pub mod feeds;
pub mod filter;
pub mod grouping;
pub mod model;
pub mod pipeline;
pub mod time;

pub use errors::AppError;
pub use grouping::{
    GroupKeySpec, GroupNode, GroupStats, GroupTree, KeyFn, any_field, date_field, field, group,
    group_with_stats,
};
pub use model::{NormalizedTime, Record, SourceFormatHint};
pub use time::{TimeNormalizer, normalize, normalize_value};
