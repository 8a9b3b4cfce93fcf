pub mod catalog;
pub mod config;
pub mod domain;
pub mod errors;
pub mod folio;
pub mod money;
pub mod pricing;
pub mod signing;

pub use catalog::loader::{fix_accents, load_from_dir, CatalogError};
pub use catalog::Catalog;
pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
pub use domain::client::ClientInfo;
pub use domain::product::Product;
pub use domain::quote::{DiscountApplyTo, QuoteInput, QuoteRecord, RequestedItem};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use folio::{
    event_prefix, format_folio, next_folio, FolioError, FolioSequence, InMemoryFolioSequence,
};
pub use money::format_mxn;
pub use pricing::exclusion::ExclusionReason;
pub use pricing::tiers::day_discount_rate;
pub use pricing::{
    price_quote, DeterministicPricingEngine, DiscountBreakdown, PricedLine, PricingEngine,
    PricingSettings, QuoteTotals,
};
pub use signing::{is_safe_file_name, FileLinkSigner, LinkError};
