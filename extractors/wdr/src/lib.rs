mod common;
mod manifest;
pub mod mobile;
pub mod page;
mod types;

use mediathek_extractor_api::{AnyExtractor, NewExtractor};
pub use mobile::WdrMobileRE;
use once_cell::sync::Lazy;
pub use page::WdrLE;

pub static EXTRACTORS: Lazy<Vec<AnyExtractor>> = Lazy::new(|| {
    vec![
        AnyExtractor::Page(Box::new(WdrLE::new())),
        AnyExtractor::Recording(Box::new(WdrMobileRE::new())),
    ]
});
