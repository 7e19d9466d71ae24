use mediathek_extractor_api::anyhow::Result;
use mediathek_extractor_api::chrono::Local;
use mediathek_extractor_api::url::Url;
use mediathek_extractor_api::utils::{search_meta, unified_strdate};
use mediathek_extractor_api::{
    async_trait, AnyExtraction, Extractable, Extraction, ExtractionContext, ExtractionError,
    ListExtraction, LiveStatus, NewExtractor, PageExtractor, URLMatcher,
};
use tracing::{debug, instrument};

use crate::common::{locate_playlist_pages, locate_references, PageMatch};
use crate::manifest::extract_from_manifest;

/// What a page turned out to contain
#[derive(PartialEq, Debug)]
pub enum PageOutcome {
    /// one player, the manifest URL
    Single(Url),
    /// several players directly on the page, as on wdrmaus theme pages
    DirectPlaylist(Vec<Url>),
    /// links to the pages of single clips, to be extracted on their own
    DeferredPlaylist(Vec<Url>),
}

/// Tells what the page holds, without any further requests
pub fn inspect_page(webpage: &str, url: &Url, page: &PageMatch) -> Result<PageOutcome> {
    let mut references = locate_references(webpage, url)?;
    match references.len() {
        0 => {
            let pages = locate_playlist_pages(webpage, page)?;
            if pages.is_empty() {
                return Err(
                    ExtractionError::NoContent("No downloadable streams found".to_string()).into(),
                );
            }
            Ok(PageOutcome::DeferredPlaylist(pages))
        }
        1 => Ok(PageOutcome::Single(references.remove(0))),
        _ => Ok(PageOutcome::DirectPlaylist(references)),
    }
}

/// Page-level metadata of a single clip page, which is not in the manifest
fn complete_single(extraction: &mut Extraction, webpage: &str, page: &PageMatch) {
    let meta = &mut extraction.metadata;
    if page.is_live() {
        meta.title = format!("{} {}", meta.title, Local::now().format("%Y-%m-%d %H:%M"));
        meta.upload_date = None;
    } else if meta.upload_date.is_none() {
        meta.upload_date = search_meta(webpage, "DC.Date").and_then(|d| unified_strdate(&d));
    }
    meta.description = search_meta(webpage, "Description");
    meta.live_status = Some(if page.is_live() {
        LiveStatus::IsLive
    } else {
        LiveStatus::NotLive
    });
}

/// wdr.de mediathek and radio pages, and wdrmaus.de pages
pub struct WdrLE {}

impl NewExtractor for WdrLE {
    fn new() -> Self {
        WdrLE {}
    }
}

impl URLMatcher for WdrLE {
    fn match_extractor(&self, url: &Url) -> bool {
        PageMatch::parse(url).is_some()
    }
}

#[async_trait]
impl PageExtractor for WdrLE {
    #[instrument(skip(self, ctx, wanted))]
    async fn extract_page(
        &self,
        ctx: &ExtractionContext,
        url: &Url,
        wanted: &Extractable,
    ) -> Result<AnyExtraction> {
        let page = PageMatch::parse(url).ok_or_else(|| {
            ExtractionError::malformed("page URL", format!("{url} is not a WDR page"))
        })?;
        let webpage = ctx.get_body("webpage", url).await?;

        match inspect_page(&webpage, url, &page)? {
            PageOutcome::Single(manifest_url) => {
                let mut extraction =
                    extract_from_manifest(ctx, &manifest_url, page.page_id(), wanted).await?;
                complete_single(&mut extraction, &webpage, &page);
                Ok(AnyExtraction::Recording(extraction))
            }
            PageOutcome::DirectPlaylist(manifest_urls) => {
                debug!("{} players on the page", manifest_urls.len());
                let display_id = page.list_id();
                let mut entries = vec![];
                for manifest_url in &manifest_urls {
                    entries.push(AnyExtraction::Recording(
                        extract_from_manifest(ctx, manifest_url, display_id, wanted).await?,
                    ));
                }
                Ok(AnyExtraction::List(ListExtraction {
                    id: display_id.to_string(),
                    entries,
                    ..Default::default()
                }))
            }
            PageOutcome::DeferredPlaylist(pages) => {
                debug!("{} linked clip pages", pages.len());
                Ok(AnyExtraction::List(ListExtraction {
                    id: page.page_id().to_string(),
                    entries: pages.into_iter().map(AnyExtraction::Reference).collect(),
                    ..Default::default()
                }))
            }
        }
    }
}
