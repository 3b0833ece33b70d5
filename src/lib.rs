//! Accounts-payable executive dashboard core.
//!
//! Turns a curated [`model::Dataset`] into a [`view::DashboardView`]: formatted
//! amounts, severity styles and derived balances, ready for a renderer. The
//! [`refresh`] module drives the manual "last updated" interaction.

pub mod classify;
pub mod format;
pub mod logging;
pub mod model;
pub mod refresh;
pub mod validate;
pub mod view;

pub use classify::{classify_risk, classify_status, SeverityStyle};
pub use format::format_currency;
pub use model::Dataset;
pub use view::{build_view, DashboardView, ViewBuilder, ViewConfig};
