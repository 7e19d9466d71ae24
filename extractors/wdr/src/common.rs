use mediathek_extractor_api::anyhow::Result;
use mediathek_extractor_api::url::Url;
use mediathek_extractor_api::utils::parse_js_object;
use mediathek_extractor_api::ExtractionError;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::MediaLink;

static PAGE_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<page_url>https?://(?:www\d\.)?wdr\d?\.de)/(?:mediathek/)?[^/]+/(?P<type>[^/]+)/(?P<display_id>.+)\.html").unwrap()
});

static MAUS_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https?://(?:www\.)wdrmaus\.de/(?P<display_id_maus>(?:[^/]+/){1,4}[^/?#]+)\.php5")
        .unwrap()
});

/// Links from playlist pages to the pages of single clips
static PLAYLIST_ANCHOR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<a href="(/(?:mediathek/)?[^/"]+/[^/"]+/[^"]+\.html)"[^>]+data-extension="#)
        .unwrap()
});

/// Each site section marks its player buttons differently,
/// the first group is always the `data-extension` value.
static REFERENCE_MARKERS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // wdr.de mediathek
        r#"class="mediaLink\b[^"]*"[^>]+data-extension="([^"]+)""#,
        // wdr.de radio players
        r#"class="wdrrPlayerPlayBtn\b[^"]*"[^>]+data-extension="([^"]+)""#,
        // wdrmaus
        r#"class="videoButton\b[^"]*"[^>]+data-extension="([^"]+)""#,
        // wdrmaus, older pages with a multi-line link
        r#"class="videoLink\b[^"]*"\s*>\n[^\n]*data-extension="([^"]+)""#,
    ]
    .into_iter()
    .map(|re| Regex::new(re).unwrap())
    .collect()
});

/// What the page URL tells before fetching anything
#[derive(Clone, PartialEq, Debug)]
pub struct PageMatch {
    /// scheme and host, for resolving site-relative links
    pub origin: String,
    /// the path segment before the display id, `live` for livestreams
    pub page_type: Option<String>,
    pub display_id: Option<String>,
    pub maus_display_id: Option<String>,
}

impl PageMatch {
    pub fn parse(url: &Url) -> Option<PageMatch> {
        let url_str = url.as_str();
        if let Some(c) = PAGE_URL_RE.captures(url_str) {
            return Some(PageMatch {
                origin: c["page_url"].to_string(),
                page_type: Some(c["type"].to_string()),
                display_id: Some(c["display_id"].to_string()),
                maus_display_id: None,
            });
        }
        MAUS_URL_RE.captures(url_str).map(|c| PageMatch {
            origin: url.origin().ascii_serialization(),
            page_type: None,
            display_id: None,
            maus_display_id: Some(c["display_id_maus"].to_string()),
        })
    }

    pub fn is_live(&self) -> bool {
        self.page_type.as_deref() == Some("live")
    }

    /// The id of the page itself, the wdrmaus one only when there is no other
    pub fn page_id(&self) -> &str {
        self.display_id
            .as_deref()
            .or(self.maus_display_id.as_deref())
            .unwrap_or_default()
    }

    /// The id of a list of clips found directly on the page
    pub fn list_id(&self) -> &str {
        self.maus_display_id
            .as_deref()
            .or(self.display_id.as_deref())
            .unwrap_or_default()
    }
}

/// `data-extension` values of all the player buttons, in the order they appear in the page.
/// Markers never overlap, a match starting inside an earlier one is dropped.
pub fn find_reference_fragments(webpage: &str) -> Vec<&str> {
    let mut found: Vec<(usize, usize, &str)> = REFERENCE_MARKERS
        .iter()
        .flat_map(|re| re.captures_iter(webpage))
        .filter_map(|c| {
            let whole = c.get(0)?;
            Some((whole.start(), whole.end(), c.get(1)?.as_str()))
        })
        .collect();
    found.sort_by_key(|(start, _, _)| *start);

    let mut fragments = vec![];
    let mut end_of_last = 0;
    for (start, end, fragment) in found {
        if start < end_of_last {
            continue;
        }
        end_of_last = end;
        fragments.push(fragment);
    }
    fragments
}

/// Manifest URLs of all the player buttons on the page
pub fn locate_references(webpage: &str, page_url: &Url) -> Result<Vec<Url>> {
    find_reference_fragments(webpage)
        .into_iter()
        .map(|fragment| -> Result<Url> {
            let link: MediaLink = parse_js_object("media link", fragment)?;
            let url = link
                .media_obj
                .and_then(|o| o.url)
                .ok_or_else(|| ExtractionError::missing_field("media link", "mediaObj.url"))?;
            Ok(page_url
                .join(&url)
                .map_err(|e| ExtractionError::malformed("media link", e))?)
        })
        .collect()
}

/// Pages of single clips linked from a playlist page
pub fn locate_playlist_pages(webpage: &str, page: &PageMatch) -> Result<Vec<Url>> {
    PLAYLIST_ANCHOR_RE
        .captures_iter(webpage)
        .map(|c| -> Result<Url> {
            Ok(Url::parse(&format!("{}{}", page.origin, &c[1]))
                .map_err(|e| ExtractionError::malformed("playlist link", e))?)
        })
        .collect()
}
