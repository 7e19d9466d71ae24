//! Serialization of extraction results into the flat "info dict" shape
//! that downloaders of the youtube-dl family consume.

use serde_json::{json, Map, Value};

use crate::{AnyExtraction, Extraction, ListExtraction, MediaFormatEstablished, MediaFormatURL};

fn format_info_dict(format: &MediaFormatEstablished) -> Value {
    let mut fmt = Map::new();
    fmt.insert("format_id".to_string(), json!(format.details.id));
    fmt.insert("url".to_string(), json!(format.url.url().as_str()));
    fmt.insert("protocol".to_string(), json!(format.url.protocol()));
    if let Some(ext) = &format.details.ext {
        fmt.insert("ext".to_string(), json!(ext));
    }
    if let Some(tbr) = format.details.bitrate {
        fmt.insert("tbr".to_string(), json!(tbr));
    }
    if let Some(codecs) = &format.details.codecs {
        fmt.insert("codecs".to_string(), json!(codecs));
    }
    if let Some(video) = &format.details.video_details {
        if let Some(width) = video.width {
            fmt.insert("width".to_string(), json!(width));
        }
        if let Some(height) = video.height {
            fmt.insert("height".to_string(), json!(height));
        }
    }
    if let MediaFormatURL::HTTP(_, options) = &format.url {
        if let Some(user_agent) = &options.connection.user_agent {
            fmt.insert(
                "http_headers".to_string(),
                json!({ "User-Agent": user_agent }),
            );
        }
    }
    Value::Object(fmt)
}

pub fn extraction_info_dict(extraction: &Extraction) -> Value {
    let meta = &extraction.metadata;
    let mut info = Map::new();
    info.insert("id".to_string(), json!(meta.id));
    info.insert("title".to_string(), json!(meta.title));

    let optional = [
        ("display_id", meta.display_id.clone()),
        ("alt_title", meta.alt_title.clone()),
        ("description", meta.description.clone()),
        (
            "upload_date",
            meta.upload_date.map(|d| d.format("%Y%m%d").to_string()),
        ),
    ];
    for (key, value) in optional {
        if let Some(value) = value {
            info.insert(key.to_string(), json!(value));
        }
    }
    if meta.live_status.is_some() {
        info.insert("is_live".to_string(), json!(meta.is_live()));
    }
    if let Some(age_limit) = meta.age_limit {
        info.insert("age_limit".to_string(), json!(age_limit));
    }

    info.insert(
        "formats".to_string(),
        Value::Array(
            extraction
                .established_formats
                .iter()
                .map(format_info_dict)
                .collect(),
        ),
    );

    let subtitles: Map<String, Value> = extraction
        .subtitles_by_lang()
        .into_iter()
        .map(|(lang, tracks)| {
            (
                lang.to_string(),
                tracks
                    .into_iter()
                    .map(|s| json!({ "url": s.url.as_str(), "ext": s.ext.as_ext() }))
                    .collect(),
            )
        })
        .collect();
    info.insert("subtitles".to_string(), Value::Object(subtitles));

    Value::Object(info)
}

pub fn list_info_dict(list: &ListExtraction) -> Value {
    let mut info = json!({
        "_type": "playlist",
        "id": list.id,
        "entries": list.entries.iter().map(any_info_dict).collect::<Vec<_>>(),
    });
    if let Some(title) = &list.title {
        info["title"] = json!(title);
    }
    info
}

pub fn any_info_dict(extraction: &AnyExtraction) -> Value {
    match extraction {
        AnyExtraction::Recording(recording) => extraction_info_dict(recording),
        AnyExtraction::List(list) => list_info_dict(list),
        AnyExtraction::Reference(url) => json!({
            "_type": "url",
            "url": url.as_str(),
            "ie_key": "WDR",
        }),
    }
}
