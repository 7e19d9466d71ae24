use futures::future::{BoxFuture, FutureExt};
use mediathek_extractor_api::anyhow::Result;
use mediathek_extractor_api::url::Url;
pub use mediathek_extractor_api::*;
use once_cell::sync::Lazy;
use tracing::{debug, warn};

/// How many pages deep references get followed, lists linking to themselves would never end otherwise
const MAX_REFERENCE_DEPTH: usize = 3;

pub static DEFAULT_EXTRACTOR_LIST: Lazy<Vec<&AnyExtractor>> = Lazy::new(|| {
    let l = vec![].into_iter();

    #[cfg(feature = "wdr")]
    let l = l.chain(mediathek_extractor_wdr::EXTRACTORS.iter());

    l.collect()
});

pub struct CoreClient<'a> {
    extractors: Vec<&'a AnyExtractor>,
    context: ExtractionContext,
}

impl CoreClient<'_> {
    pub fn new() -> Result<Self> {
        Ok(CoreClient::with_context(ExtractionContext::new()?))
    }

    pub fn with_context(context: ExtractionContext) -> Self {
        CoreClient {
            extractors: DEFAULT_EXTRACTOR_LIST.to_vec(),
            context,
        }
    }

    pub async fn extract_url(
        &self,
        url: &Url,
        wanted: &Extractable,
    ) -> Result<Option<AnyExtraction>> {
        for extractor in &self.extractors {
            if extractor.match_extractor(url) {
                return extractor
                    .extract_info(&self.context, url, wanted)
                    .await
                    .map(Option::Some);
            }
        }
        Ok(None)
    }

    /// Like [`CoreClient::extract_url`], but also extracts the pages that lists only link to.
    /// References that no extractor matches are kept as they are.
    pub async fn extract_url_resolved(
        &self,
        url: &Url,
        wanted: &Extractable,
    ) -> Result<Option<AnyExtraction>> {
        match self.extract_url(url, wanted).await? {
            Some(extraction) => Ok(Some(
                self.resolve_references(extraction, wanted, MAX_REFERENCE_DEPTH)
                    .await?,
            )),
            None => Ok(None),
        }
    }

    fn resolve_references<'s>(
        &'s self,
        extraction: AnyExtraction,
        wanted: &'s Extractable,
        depth: usize,
    ) -> BoxFuture<'s, Result<AnyExtraction>> {
        async move {
            match extraction {
                AnyExtraction::Reference(url) if depth > 0 => {
                    debug!("following {url}");
                    match self.extract_url(&url, wanted).await? {
                        Some(resolved) => {
                            self.resolve_references(resolved, wanted, depth - 1).await
                        }
                        None => Ok(AnyExtraction::Reference(url)),
                    }
                }
                AnyExtraction::Reference(url) => {
                    warn!("not following {url}, too deep");
                    Ok(AnyExtraction::Reference(url))
                }
                AnyExtraction::List(mut list) => {
                    let mut entries = vec![];
                    for entry in list.entries {
                        entries.push(self.resolve_references(entry, wanted, depth).await?);
                    }
                    list.entries = entries;
                    Ok(AnyExtraction::List(list))
                }
                recording => Ok(recording),
            }
        }
        .boxed()
    }
}
