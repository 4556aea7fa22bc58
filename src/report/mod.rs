//! Market report naming and resolution
//!
//! MISO publishes each daily report under `{YYYYMMDD}_{suffix}.{ext}` and,
//! after a retention window, moves it into a monthly archive
//! `{YYYYMM}_{suffix}_{ext}.zip`. Some reports are named by the day they were
//! published rather than the market day they describe.

pub mod kind;
pub mod locator;

pub use kind::{ReportKind, ReportNaming};
pub use locator::{ReportDescriptor, ReportLocator, ResolvedReport};
