use mediathek_extractor_api::anyhow::Result;
use mediathek_extractor_api::url::Url;
use mediathek_extractor_api::utils::determine_ext;
use mediathek_extractor_api::{
    async_trait, Extractable, Extraction, ExtractionContext, ExtractionError, FormatBreed,
    HTTPConnectionOptions, HTTPDownloadOptions, MediaFormatDetails, MediaFormatEstablished,
    MediaFormatURL, MediaMetadata, NewExtractor, RecordingExtractor, URLMatcher,
};
use once_cell::sync::Lazy;
use regex::Regex;

static MOBILE_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https?://mobile-ondemand\.wdr\.de/.*?/fsk(?P<age_limit>[0-9]+)/[0-9]+/[0-9]+/(?P<id>[0-9]+)_(?P<title>[0-9]+)").unwrap()
});

/// Direct links to files on the mobile on-demand CDN.
/// Everything is in the URL, the files are only served to mobile user agents.
pub struct WdrMobileRE {}

impl NewExtractor for WdrMobileRE {
    fn new() -> Self {
        WdrMobileRE {}
    }
}

impl URLMatcher for WdrMobileRE {
    fn match_extractor(&self, url: &Url) -> bool {
        MOBILE_URL_RE.is_match(url.as_str())
    }
}

#[async_trait]
impl RecordingExtractor for WdrMobileRE {
    async fn extract_recording(
        &self,
        _ctx: &ExtractionContext,
        url: &Url,
        _wanted: &Extractable,
    ) -> Result<Extraction> {
        let captures = MOBILE_URL_RE.captures(url.as_str()).ok_or_else(|| {
            ExtractionError::malformed("mobile URL", format!("{url} is not a mobile WDR URL"))
        })?;
        // None when the digits overflow
        let age_limit = captures["age_limit"].parse::<u32>().ok();

        Ok(Extraction {
            metadata: MediaMetadata {
                id: captures["id"].to_string(),
                title: captures["title"].to_string(),
                age_limit,
                ..Default::default()
            },
            established_formats: vec![MediaFormatEstablished {
                details: MediaFormatDetails {
                    id: "mobile".to_string(),
                    breed: FormatBreed::AudioVideo,
                    ext: determine_ext(url),
                    ..Default::default()
                },
                url: MediaFormatURL::HTTP(
                    url.clone(),
                    HTTPDownloadOptions {
                        connection: HTTPConnectionOptions {
                            user_agent: Some("mobile".to_string()),
                        },
                    },
                ),
            }],
            ..Default::default()
        })
    }
}
