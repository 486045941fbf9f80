pub mod import;

pub use import::{api_canonicalize, api_import};

pub async fn health() -> &'static str {
    "ok"
}
