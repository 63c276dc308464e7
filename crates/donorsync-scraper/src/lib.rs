//! Donor-site scraping: profile-driven extraction of product pages into
//! the canonical product model, including multi-strategy variant
//! resolution and listing traversal.

pub mod categories;
pub mod error;
pub mod extract;
pub mod listing;
pub mod page_source;
pub mod pipeline;
pub mod variants;

mod backoff;

pub use categories::resolve_categories;
pub use error::ScrapeError;
pub use extract::{ExtractedOption, PartialFormInfo};
pub use listing::collect_product_urls;
pub use page_source::{HttpPageSource, OptionToken, PageSource};
pub use pipeline::{scrape_product, ScrapedProduct};
pub use variants::{ParentFields, StrategyKind, VariantResolution, VariantResolver};
