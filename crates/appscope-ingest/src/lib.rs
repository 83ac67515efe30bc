//! Source normalization for the local app-store export and the campaign export.

pub mod apps;
pub mod campaigns;
mod columns;
pub mod error;
pub mod parse;

pub use apps::{load_apps, normalize_apps, NormalizeReport, NormalizedApps};
pub use campaigns::{load_campaigns, read_campaigns, CampaignLoad};
pub use error::{IngestError, ParseError};
