//! Helpers shared by the extractors: lenient JSON, dates, URLs and HTML metadata.

use anyhow::Result;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use nipper::Document;
use once_cell::sync::Lazy;
use qstring::QString;
use regex::Regex;
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::ExtractionError;
use crate::transport::FetchResponse;

static JSONP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^\s*[a-zA-Z0-9_.$]+\s*\(\s*(.*)\)\s*;?\s*(?://[^\n]*\s*)*$").unwrap()
});

static TIMEZONE_SUFFIX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\s+(?:UTC|GMT|CES?T|MES?Z)|\s*(?:Z|[+-]\d{2}:?\d{2}))$").unwrap()
});

static CONTENT_DISPOSITION_FILENAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)filename\*?\s*=\s*(?:UTF-8'')?"?([^";]+)"?"#).unwrap()
});

static DATETIME_FORMATS: &[&str] = &[
    "%d.%m.%Y %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d/%m/%Y %H:%M:%S",
];

static DATE_FORMATS: &[&str] = &[
    "%d.%m.%Y",
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d/%m/%Y",
    "%Y%m%d",
    "%d %B %Y",
    "%d %b %Y",
    "%B %d %Y",
    "%b %d %Y",
];

/// Strips a JSONP callback wrapper (`callback({...});`), returning the input as-is if there is none
pub fn strip_jsonp(code: &str) -> &str {
    JSONP_RE
        .captures(code)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(code)
}

/// Turns a JavaScript object literal into JSON:
/// quotes bare identifiers, converts single-quoted strings,
/// drops comments and trailing commas, converts hex numbers.
pub fn js_to_json(code: &str) -> String {
    let chars: Vec<char> = code.chars().collect();
    let mut out = String::with_capacity(code.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '"' | '\'' => {
                let (s, next) = read_js_string(&chars, i);
                out.push_str(&serde_json::Value::String(s).to_string());
                i = next;
            }
            '/' if chars.get(i + 1) == Some(&'/') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                i += 2;
                while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                    i += 1;
                }
                i += 2;
            }
            ',' => {
                let mut j = i + 1;
                while j < chars.len() && chars[j].is_whitespace() {
                    j += 1;
                }
                // trailing comma
                if !matches!(chars.get(j), Some('}') | Some(']') | None) {
                    out.push(',');
                }
                i += 1;
            }
            c if c.is_alphabetic() || c == '_' || c == '$' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '$')
                {
                    i += 1;
                }
                let ident: String = chars[start..i].iter().collect();
                match ident.as_str() {
                    "true" | "false" | "null" => out.push_str(&ident),
                    "undefined" => out.push_str("null"),
                    _ => out.push_str(&serde_json::Value::String(ident).to_string()),
                }
            }
            c if c.is_ascii_digit() => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '.') {
                    i += 1;
                }
                let number: String = chars[start..i].iter().collect();
                let hex = number
                    .strip_prefix("0x")
                    .or_else(|| number.strip_prefix("0X"))
                    .and_then(|h| u64::from_str_radix(h, 16).ok());
                match hex {
                    Some(n) => out.push_str(&n.to_string()),
                    None => out.push_str(&number),
                }
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    out
}

/// Reads a quoted JS string starting at `start` (the quote), returns its value and the index after it
fn read_js_string(chars: &[char], start: usize) -> (String, usize) {
    let quote = chars[start];
    let mut value = String::new();
    let mut i = start + 1;

    while i < chars.len() {
        let c = chars[i];
        if c == quote {
            return (value, i + 1);
        }
        if c != '\\' {
            value.push(c);
            i += 1;
            continue;
        }

        let Some(&escaped) = chars.get(i + 1) else {
            break;
        };
        i += 2;
        match escaped {
            'n' => value.push('\n'),
            't' => value.push('\t'),
            'r' => value.push('\r'),
            'b' => value.push('\u{8}'),
            'f' => value.push('\u{c}'),
            'v' => value.push('\u{b}'),
            '0' => value.push('\0'),
            // line continuation
            '\n' => {}
            'u' | 'x' => {
                let len = if escaped == 'u' { 4 } else { 2 };
                let code: String = chars.iter().skip(i).take(len).collect();
                match u32::from_str_radix(&code, 16).ok().and_then(char::from_u32) {
                    Some(ch) if code.len() == len => {
                        value.push(ch);
                        i += len;
                    }
                    _ => value.push(escaped),
                }
            }
            other => value.push(other),
        }
    }

    (value, chars.len())
}

/// Parses a JavaScript object literal (see [`js_to_json`]) into `T`
pub fn parse_js_object<T>(resource_name: &str, code: &str) -> Result<T>
where
    T: DeserializeOwned,
{
    serde_json::from_str(&js_to_json(code))
        .map_err(|e| ExtractionError::malformed(resource_name, e).into())
}

/// File extension from the last URL path segment, `None` when it cannot be told
pub fn determine_ext(url: &Url) -> Option<String> {
    let last_segment = url.path().trim_end_matches('/').rsplit('/').next()?;
    let (_, ext) = last_segment.rsplit_once('.')?;
    Some(ext)
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(str::to_string)
}

/// Sets the query parameters, replacing the values of ones already present
pub fn update_url_query(url: &Url, params: &[(&str, &str)]) -> Url {
    let mut url = url.clone();
    let mut query = QString::new(
        url.query_pairs()
            .filter(|(k, _)| params.iter().all(|(p, _)| &**k != *p))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect(),
    );
    for (k, v) in params {
        query.add_pair((*k, *v));
    }
    url.set_query(Some(&query.to_string()));
    url
}

/// Calendar date from any of the date notations found on web pages and APIs
pub fn unified_strdate(date_str: &str) -> Option<NaiveDate> {
    let date_str = date_str.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(date_str) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(date_str) {
        return Some(dt.date_naive());
    }

    let date_str = date_str
        .replace(',', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    if date_str.is_empty() {
        return None;
    }

    let without_tz = TIMEZONE_SUFFIX_RE.replace(&date_str, "");
    DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(&without_tz, f).ok())
        .map(|dt| dt.date())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(&without_tz, f).ok())
        })
}

/// Value of a `<meta>` tag, looked up by its name/property/itemprop (case-insensitive)
pub fn search_meta(webpage: &str, name: &str) -> Option<String> {
    let document = Document::from(webpage);
    document
        .select("meta[content]")
        .iter()
        .find(|meta| {
            ["name", "property", "itemprop", "http-equiv"]
                .into_iter()
                .any(|attr| {
                    meta.attr(attr)
                        .filter(|v| v.trim().eq_ignore_ascii_case(name))
                        .is_some()
                })
        })
        .and_then(|meta| meta.attr("content"))
        .map(|content| content.trim().to_string())
}

/// File extension commonly used for the media type
pub fn mimetype2ext(mime_type: &str) -> Option<String> {
    let mime_type = mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    let known = match mime_type.as_str() {
        "audio/mp4" => Some("m4a"),
        "audio/mpeg" => Some("mp3"),
        "audio/aac" | "audio/x-aac" => Some("aac"),
        "audio/ogg" => Some("ogg"),
        "video/mp2t" => Some("ts"),
        "video/quicktime" => Some("mov"),
        "video/x-flv" => Some("flv"),
        "application/x-mpegurl" | "application/vnd.apple.mpegurl" | "audio/mpegurl" => {
            Some("m3u8")
        }
        "application/f4m+xml" => Some("f4m"),
        "application/smil+xml" | "application/smil" => Some("smil"),
        "application/ttml+xml" => Some("ttml"),
        "text/vtt" => Some("vtt"),
        _ => None,
    };
    if let Some(ext) = known {
        return Some(ext.to_string());
    }

    let (_, subtype) = mime_type.split_once('/')?;
    let subtype = subtype.rsplit('+').last().unwrap_or(subtype);
    Some(subtype)
        .filter(|s| !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(str::to_string)
}

/// File extension of the resource, based on the response headers of a request to it
pub fn detect_ext(response: &FetchResponse) -> Option<String> {
    response
        .header("content-disposition")
        .and_then(|cd| CONTENT_DISPOSITION_FILENAME_RE.captures(cd))
        .and_then(|c| c.get(1))
        .and_then(|filename| filename.as_str().trim().rsplit_once('.'))
        .map(|(_, ext)| ext.to_string())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .or_else(|| response.header("content-type").and_then(mimetype2ext))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::{json, Value};
    use url::Url;

    use super::*;
    use crate::transport::FetchResponse;

    #[test]
    fn js_to_json_media_link() {
        let fragment = "{'mediaObj':{'url':'https://deviceids-medp.wdr.de/ondemand/137/1378846.js'}, }";
        let value: Value = serde_json::from_str(&js_to_json(fragment)).unwrap();
        assert_eq!(
            value,
            json!({"mediaObj": {"url": "https://deviceids-medp.wdr.de/ondemand/137/1378846.js"}})
        );
    }

    #[test]
    fn js_to_json_bare_keys_and_literals() {
        let fragment = r#"{ mediaObj: { url: "x", autoplay: false, count: 0x1F, rate: 1.5, skip: undefined, list: [1, 2,], }, /* comment */ tag: 'it\'s' // trailing
        }"#;
        let value: Value = serde_json::from_str(&js_to_json(fragment)).unwrap();
        assert_eq!(value["mediaObj"]["url"], "x");
        assert_eq!(value["mediaObj"]["autoplay"], false);
        assert_eq!(value["mediaObj"]["count"], 31);
        assert_eq!(value["mediaObj"]["rate"], 1.5);
        assert_eq!(value["mediaObj"]["skip"], Value::Null);
        assert_eq!(value["mediaObj"]["list"], json!([1, 2]));
        assert_eq!(value["tag"], "it's");
    }

    #[test]
    fn js_to_json_string_escapes() {
        let value: Value =
            serde_json::from_str(&js_to_json(r#"{'a': 'say "hi"ä\x41'}"#)).unwrap();
        assert_eq!(value["a"], "say \"hi\"äA");
    }

    #[test]
    fn parse_js_object_reports_malformed() {
        let err = parse_js_object::<Value>("media link", "{'a': [}").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ExtractionError>(),
            Some(ExtractionError::MalformedMetadata { .. })
        ));
    }

    #[test]
    fn strip_jsonp_wrapper() {
        assert_eq!(
            strip_jsonp("$mediaObject.jsonpHelper.storeAndPlay({\"a\":1});"),
            "{\"a\":1}"
        );
        assert_eq!(strip_jsonp("cb ( [1] ) // done"), "[1] ");
        assert_eq!(strip_jsonp("{\"a\":1}"), "{\"a\":1}");
    }

    #[test]
    fn determine_ext_cases() {
        let ext = |u: &str| determine_ext(&Url::parse(u).unwrap());
        assert_eq!(ext("https://a.de/x/master.m3u8?foo=bar.mp4"), Some("m3u8".to_string()));
        assert_eq!(ext("https://a.de/x/clip.mp4/"), Some("mp4".to_string()));
        assert_eq!(ext("https://a.de/x/stream"), None);
        assert_eq!(ext("https://a.de/"), None);
        assert_eq!(ext("https://a.de/x/weird.m-3"), None);
    }

    #[test]
    fn update_url_query_overrides() {
        let url = Url::parse("https://a.de/z/manifest.f4m?hdcore=1.0&b=c").unwrap();
        let updated = update_url_query(&url, &[("hdcore", "3.2.0"), ("plugin", "aasp-3.2.0.77.18")]);
        let pairs: Vec<(String, String)> = updated.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("b".to_string(), "c".to_string()),
                ("hdcore".to_string(), "3.2.0".to_string()),
                ("plugin".to_string(), "aasp-3.2.0.77.18".to_string()),
            ]
        );
    }

    #[test]
    fn unified_strdate_notations() {
        let d = |y, m, d| Some(NaiveDate::from_ymd_opt(y, m, d).unwrap());
        assert_eq!(unified_strdate("20.05.2017 19:30"), d(2017, 5, 20));
        assert_eq!(unified_strdate("21.05.2017"), d(2017, 5, 21));
        assert_eq!(unified_strdate("2017-05-20T19:30:00+02:00"), d(2017, 5, 20));
        assert_eq!(unified_strdate("2013-09-19 10:00"), d(2013, 9, 19));
        assert_eq!(unified_strdate("Sat, 20 May 2017 19:30:00 +0200"), d(2017, 5, 20));
        assert_eq!(unified_strdate("May 20, 2017"), d(2017, 5, 20));
        assert_eq!(unified_strdate("20170520"), d(2017, 5, 20));
        assert_eq!(unified_strdate("  "), None);
        assert_eq!(unified_strdate("tomorrow"), None);
    }

    #[test]
    fn search_meta_by_name() {
        let page = r#"<html><head>
            <meta name="DC.Date" content="2017-05-20T19:30:00+02:00" />
            <meta name="description" content=" Nachrichten &amp; mehr " />
            <meta property="og:title" content="Lokalzeit" />
        </head><body></body></html>"#;
        assert_eq!(
            search_meta(page, "DC.Date").as_deref(),
            Some("2017-05-20T19:30:00+02:00")
        );
        assert_eq!(search_meta(page, "Description").as_deref(), Some("Nachrichten & mehr"));
        assert_eq!(search_meta(page, "og:title").as_deref(), Some("Lokalzeit"));
        assert_eq!(search_meta(page, "keywords"), None);
    }

    #[test]
    fn detect_ext_from_headers() {
        let response = FetchResponse::ok("")
            .with_header("Content-Type", "application/octet-stream")
            .with_header("Content-Disposition", "attachment; filename=\"beitrag.mp3\"");
        assert_eq!(detect_ext(&response).as_deref(), Some("mp3"));

        let response = FetchResponse::ok("").with_header("Content-Type", "video/mp4; charset=binary");
        assert_eq!(detect_ext(&response).as_deref(), Some("mp4"));

        let response = FetchResponse::ok("").with_header("Content-Type", "audio/mpeg");
        assert_eq!(detect_ext(&response).as_deref(), Some("mp3"));

        assert_eq!(detect_ext(&FetchResponse::ok("")), None);
    }
}
