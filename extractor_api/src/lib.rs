#[macro_use]
extern crate smart_default;

mod context;
mod error;
pub mod info_dict;
pub mod manifests;
pub mod quality;
pub mod transport;
pub mod utils;

pub use context::{build_http, build_http_with_proxy, ExtractionContext};
pub use error::ExtractionError;
pub use transport::{FetchMethod, FetchRequest, FetchResponse, HttpTransport, StubTransport, Transport};

pub use anyhow;
pub use async_trait::async_trait;
pub use chrono::{self, NaiveDate};
pub use url;

use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use url::Url;

pub trait NewExtractor {
    fn new() -> Self;
}

pub trait URLMatcher {
    fn match_extractor(&self, url: &Url) -> bool;
}

#[async_trait]
pub trait RecordingExtractor: URLMatcher + Sync + Send {
    async fn extract_recording(
        &self,
        ctx: &ExtractionContext,
        url: &Url,
        wanted: &Extractable,
    ) -> Result<Extraction>;
}

/// Extractor for pages that can only be told apart after fetching them:
/// the same URL shape may hold a single recording, a list of embedded recordings,
/// or links to other pages of the same service.
#[async_trait]
pub trait PageExtractor: URLMatcher + Sync + Send {
    async fn extract_page(
        &self,
        ctx: &ExtractionContext,
        url: &Url,
        wanted: &Extractable,
    ) -> Result<AnyExtraction>;
}

/// What should be extracted from the service.
/// This is to limit the amount of requests made, based on what is needed.
#[derive(Default)]
pub struct Extractable {
    pub metadata: ExtractLevel,
    pub playback: ExtractLevel,
}

impl Extractable {
    pub fn everything() -> Self {
        Extractable {
            metadata: ExtractLevel::Extended,
            playback: ExtractLevel::Extended,
        }
    }
}

#[derive(Serialize, SmartDefault, PartialEq, Debug)]
pub enum ExtractLevel {
    #[default]
    None,
    Basic,
    Extended,
}

#[derive(Default, Debug)]
pub struct Extraction {
    pub metadata: MediaMetadata,
    pub established_formats: Vec<MediaFormatEstablished>,
    pub established_subtitles: Vec<Subtitle>,
}

impl Extraction {
    /// Subtitles grouped by their language code.
    pub fn subtitles_by_lang(&self) -> BTreeMap<&str, Vec<&Subtitle>> {
        let mut map: BTreeMap<&str, Vec<&Subtitle>> = BTreeMap::new();
        for subtitle in &self.established_subtitles {
            map.entry(subtitle.lang.as_str()).or_default().push(subtitle);
        }
        map
    }
}

#[derive(Serialize, Default, PartialEq, Clone, Debug)]
pub struct MediaMetadata {
    pub id: String,
    pub display_id: Option<String>,
    pub title: String,
    pub alt_title: Option<String>,
    pub description: Option<String>,
    pub live_status: Option<LiveStatus>,
    pub age_limit: Option<u32>,
    /// Calendar day of the original broadcast/publication
    pub upload_date: Option<NaiveDate>,
}

impl MediaMetadata {
    pub fn is_live(&self) -> bool {
        self.live_status == Some(LiveStatus::IsLive)
    }
}

#[derive(Serialize, PartialEq, Clone, Debug)]
pub enum LiveStatus {
    /// Never meant as a live stream
    NotLive,
    /// Is a live stream that is currently ongoing
    IsLive,
}

#[derive(PartialEq, Clone, Debug)]
pub struct MediaFormatEstablished {
    pub details: MediaFormatDetails,
    pub url: MediaFormatURL,
}

#[derive(Serialize, SmartDefault, PartialEq, Clone, Debug)]
pub struct MediaFormatDetails {
    pub id: String,
    pub breed: FormatBreed,
    /// file extension of the resulting media, if known
    pub ext: Option<String>,
    /// total bitrate in kbit/s
    pub bitrate: Option<u64>,
    /// RFC 6381 codecs string, as declared by a streaming manifest
    pub codecs: Option<String>,
    pub video_details: Option<VideoDetails>,
}

#[derive(PartialEq, Clone, Debug)]
pub enum MediaFormatURL {
    /// Progressive download of a single file
    HTTP(Url, HTTPDownloadOptions),
    /// Apple HTTP Live Streaming playlist
    HLS(Url),
    /// Adobe HTTP Dynamic Streaming (f4m) manifest
    HDS(Url),
    /// Stream location resolved from a SMIL document (RTMP or HTTP)
    SMIL(Url),
}

impl MediaFormatURL {
    pub fn url(&self) -> &Url {
        match self {
            MediaFormatURL::HTTP(u, _)
            | MediaFormatURL::HLS(u)
            | MediaFormatURL::HDS(u)
            | MediaFormatURL::SMIL(u) => u,
        }
    }

    /// Protocol name as understood by downloaders
    pub fn protocol(&self) -> &'static str {
        match self {
            MediaFormatURL::HTTP(u, _) => {
                if u.scheme() == "http" {
                    "http"
                } else {
                    "https"
                }
            }
            MediaFormatURL::HLS(_) => "m3u8_native",
            MediaFormatURL::HDS(_) => "f4m",
            MediaFormatURL::SMIL(u) => {
                if u.scheme().starts_with("rtmp") {
                    "rtmp"
                } else {
                    "http"
                }
            }
        }
    }
}

#[derive(Default, PartialEq, Clone, Debug)]
pub struct HTTPDownloadOptions {
    pub connection: HTTPConnectionOptions,
}

#[derive(Default, PartialEq, Clone, Debug)]
pub struct HTTPConnectionOptions {
    /// Overrides the downloader's user agent, some delivery paths only serve known clients
    pub user_agent: Option<String>,
}

/// Format type
#[derive(Serialize, SmartDefault, PartialEq, Clone, Debug)]
pub enum FormatBreed {
    #[default]
    AudioVideo,
    Video,
    Audio,
}

#[derive(Serialize, SmartDefault, PartialEq, Clone, Debug)]
pub struct VideoDetails {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Serialize, PartialEq, Clone, Debug)]
pub enum SubtitleExt {
    /// WebVTT - https://www.w3.org/TR/webvtt1/
    VTT,
    /// SubRip Text - https://www.matroska.org/technical/subtitles.html#srt-subtitles
    SRT,
    /// Timed Text Markup Language - https://www.w3.org/TR/ttml1/
    TTML,
    /// service-specific format that is not following any industry standards
    NonStandard(String),
}

impl SubtitleExt {
    pub fn as_ext(&self) -> &str {
        match self {
            SubtitleExt::VTT => "vtt",
            SubtitleExt::SRT => "srt",
            SubtitleExt::TTML => "ttml",
            SubtitleExt::NonStandard(ext) => ext,
        }
    }
}

#[derive(Serialize, PartialEq, Clone, Debug)]
pub struct Subtitle {
    pub lang: String,
    pub ext: SubtitleExt,
    pub url: Url,
}

/// Used as a result of the page/list extraction.
pub enum AnyExtraction {
    Recording(Extraction),
    List(ListExtraction),
    /// Page that still has to be extracted on its own, with the same set of extractors
    Reference(Url),
}

/// What the page extractor spits out at you, if it found more than one thing.
#[derive(Default)]
pub struct ListExtraction {
    pub id: String,
    pub title: Option<String>,
    pub entries: Vec<AnyExtraction>,
}

pub enum AnyExtractor {
    Recording(Box<dyn RecordingExtractor>),
    Page(Box<dyn PageExtractor>),
}

impl AnyExtractor {
    pub async fn extract_info(
        &self,
        ctx: &ExtractionContext,
        url: &Url,
        wanted: &Extractable,
    ) -> Result<AnyExtraction> {
        match self {
            AnyExtractor::Recording(re) => re
                .extract_recording(ctx, url, wanted)
                .await
                .map(AnyExtraction::Recording),
            AnyExtractor::Page(pe) => pe.extract_page(ctx, url, wanted).await,
        }
    }

    pub fn match_extractor(&self, url: &Url) -> bool {
        match self {
            AnyExtractor::Recording(re) => re.match_extractor(url),
            AnyExtractor::Page(pe) => pe.match_extractor(url),
        }
    }
}
