pub mod canonical;
pub mod error;
pub mod pipeline;
pub mod store;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;
pub mod validate;
pub mod web;

pub use canonical::{canonical_form, Canonicalizer, PlatformRule};
pub use error::{ImportError, ImportResult};
pub use pipeline::{ImportOutcome, ImportPipeline};
pub use store::{PgContentStore, PgProfileDirectory};
pub use traits::{ContentStore, Extractor, PageFetcher, ProfileDirectory, UrlResolver};
pub use validate::validate_input_url;
pub use web::WebFetcher;
