//! Transformation module.
//!
//! This module turns an uploaded status sheet into dataload rows:
//! - Category: status column detection
//! - Quarter: quarter dates
//! - Normalize: synonyms, allow-list and lookup keys
//! - Join: left join onto the reference table
//! - Pipeline: main dataload pipeline

pub mod category;
pub mod join;
pub mod normalize;
pub mod pipeline;
pub mod quarter;

pub use category::{select_column, CategoryColumn, ColumnChoice, CODE_COLUMN};
pub use join::{left_join, JoinResult};
pub use normalize::{canonical_label, normalize_rows, NormalizeResult};
pub use pipeline::*;
pub use quarter::{DateRange, DateSource, Quarter};
