use mediathek_extractor_api::anyhow::Result;
use mediathek_extractor_api::manifests::{
    extract_f4m_formats, extract_m3u8_formats, extract_smil_formats,
};
use mediathek_extractor_api::quality::sort_formats;
use mediathek_extractor_api::url::Url;
use mediathek_extractor_api::utils::{
    detect_ext, determine_ext, strip_jsonp, unified_strdate, update_url_query,
};
use mediathek_extractor_api::{
    ExtractLevel, Extractable, Extraction, ExtractionContext, ExtractionError, FormatBreed,
    HTTPDownloadOptions, MediaFormatDetails, MediaFormatEstablished, MediaFormatURL,
    MediaMetadata, Subtitle, SubtitleExt,
};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::types::Manifest;

static DELIVERY_VARIANTS: &[&str] = &["dflt", "alt"];

static HDS_QUERY: &[(&str, &str)] = &[("hdcore", "3.2.0"), ("plugin", "aasp-3.2.0.77.18")];

fn stream_role(key: &str) -> Option<(&'static str, FormatBreed)> {
    match key {
        "videoURL" => Some(("video", FormatBreed::AudioVideo)),
        "audioURL" => Some(("audio", FormatBreed::Audio)),
        _ => None,
    }
}

/// Expands a stream URL from the manifest into the formats behind it.
/// Unreachable or broken streaming manifests are only logged, the clip may have other variants.
#[instrument(skip(ctx))]
pub async fn classify_media_url(
    ctx: &ExtractionContext,
    medium_url: &Url,
    label: &str,
    breed: FormatBreed,
) -> Vec<MediaFormatEstablished> {
    let ext = determine_ext(medium_url);
    let expanded = match ext.as_deref() {
        Some("m3u8") => extract_m3u8_formats(ctx, medium_url, "mp4", "hls", breed).await,
        Some("f4m") => {
            extract_f4m_formats(ctx, &update_url_query(medium_url, HDS_QUERY), "hds").await
        }
        Some("smil") => extract_smil_formats(ctx, medium_url, "stream").await,
        _ => return vec![direct_format(ctx, medium_url, label, breed, ext.clone()).await],
    };
    expanded.unwrap_or_else(|e| {
        warn!("skipping {medium_url}: {e}");
        vec![]
    })
}

async fn direct_format(
    ctx: &ExtractionContext,
    medium_url: &Url,
    label: &str,
    breed: FormatBreed,
    ext: Option<String>,
) -> MediaFormatEstablished {
    let ext = match ext {
        Some(ext) => Some(ext),
        None => match ctx.probe("extension probe", medium_url).await {
            Ok(response) => detect_ext(&response),
            Err(e) => {
                warn!("could not determine the extension of {medium_url}: {e}");
                None
            }
        },
    };
    MediaFormatEstablished {
        details: MediaFormatDetails {
            id: label.to_string(),
            breed,
            ext,
            ..Default::default()
        },
        url: MediaFormatURL::HTTP(medium_url.clone(), HTTPDownloadOptions::default()),
    }
}

async fn collect_formats(
    ctx: &ExtractionContext,
    manifest_url: &Url,
    media_resource: &serde_json::Map<String, Value>,
) -> Vec<MediaFormatEstablished> {
    let mut formats = vec![];
    for (variant, streams) in media_resource
        .iter()
        .filter(|(k, _)| DELIVERY_VARIANTS.contains(&k.as_str()))
    {
        let Some(streams) = streams.as_object() else {
            continue;
        };
        for (role, medium) in streams {
            let (Some((role, breed)), Some(medium)) = (stream_role(role), medium.as_str()) else {
                continue;
            };
            match manifest_url.join(medium) {
                Ok(medium_url) => formats.extend(
                    classify_media_url(ctx, &medium_url, &format!("{variant}-{role}"), breed)
                        .await,
                ),
                Err(e) => warn!("skipping invalid stream URL {medium:?}: {e}"),
            }
        }
    }
    sort_formats(&mut formats);
    formats
}

/// Downloads the manifest of a single clip and builds its extraction
#[instrument(skip(ctx, wanted))]
pub async fn extract_from_manifest(
    ctx: &ExtractionContext,
    manifest_url: &Url,
    display_id: &str,
    wanted: &Extractable,
) -> Result<Extraction> {
    let manifest: Manifest = ctx
        .get_json("media manifest", manifest_url, Some(strip_jsonp))
        .await?;
    let tracker_data = manifest
        .tracker_data
        .ok_or_else(|| ExtractionError::missing_field("media manifest", "trackerData"))?;
    let media_resource = manifest
        .media_resource
        .ok_or_else(|| ExtractionError::missing_field("media manifest", "mediaResource"))?;

    let title = tracker_data.tracker_clip_title.ok_or_else(|| {
        ExtractionError::missing_field("media manifest", "trackerData.trackerClipTitle")
    })?;

    let established_formats = if wanted.playback != ExtractLevel::None {
        let formats = collect_formats(ctx, manifest_url, &media_resource).await;
        if formats.is_empty() {
            return Err(ExtractionError::NoContent("No video formats found".to_string()).into());
        }
        formats
    } else {
        vec![]
    };
    debug!("{} formats found", established_formats.len());

    let established_subtitles = match media_resource
        .get("captionURL")
        .and_then(Value::as_str)
        .filter(|u| !u.is_empty())
    {
        Some(caption_url) => vec![Subtitle {
            lang: "de".to_string(),
            ext: SubtitleExt::TTML,
            url: manifest_url
                .join(caption_url)
                .map_err(|e| ExtractionError::malformed("media manifest", e))?,
        }],
        None => vec![],
    };

    Ok(Extraction {
        metadata: MediaMetadata {
            id: tracker_data
                .tracker_clip_id
                .unwrap_or_else(|| display_id.to_string()),
            display_id: Some(display_id.to_string()),
            title,
            alt_title: tracker_data.tracker_clip_subcategory,
            upload_date: tracker_data
                .tracker_clip_air_time
                .as_deref()
                .and_then(unified_strdate),
            ..Default::default()
        },
        established_formats,
        established_subtitles,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use mediathek_extractor_api::url::Url;
    use mediathek_extractor_api::utils::update_url_query;
    use mediathek_extractor_api::{
        Extractable, ExtractionContext, ExtractionError, FetchMethod, FetchResponse, FormatBreed,
        MediaFormatURL, NaiveDate, StubTransport, SubtitleExt,
    };

    use super::{classify_media_url, extract_from_manifest, HDS_QUERY};

    const MASTER: &str = "#EXTM3U
#EXT-X-STREAM-INF:BANDWIDTH=3776000,RESOLUTION=1280x720,CODECS=\"avc1.640020,mp4a.40.2\"
index_3_av.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=1216000,RESOLUTION=640x360,CODECS=\"avc1.4d401e,mp4a.40.2\"
index_1_av.m3u8
";

    fn ctx(stub: &Arc<StubTransport>) -> ExtractionContext {
        ExtractionContext::with_transport(stub.clone())
    }

    fn url(u: &str) -> Url {
        Url::parse(u).unwrap()
    }

    fn jsonp(json: &str) -> String {
        format!("$mediaObject.jsonpHelper.storeAndPlay({json});")
    }

    #[tokio::test]
    async fn direct_file() {
        let stub = Arc::new(StubTransport::new());
        let formats = classify_media_url(
            &ctx(&stub),
            &url("http://ondemand-ww.wdr.de/medp/fsk0/137/1378846/1378846_15999040.mp4"),
            "alt-video",
            FormatBreed::AudioVideo,
        )
        .await;
        assert_eq!(formats.len(), 1);
        assert_eq!(formats[0].details.id, "alt-video");
        assert_eq!(formats[0].details.ext.as_deref(), Some("mp4"));
        assert!(matches!(formats[0].url, MediaFormatURL::HTTP(_, _)));
        assert!(stub.requests().is_empty());
    }

    #[tokio::test]
    async fn unknown_extension_gets_probed() {
        let stream = "http://wdr-1live-live.example.com/1live/live/mp3/128/stream";
        let stub = Arc::new(StubTransport::new().with_response(
            stream,
            FetchResponse::ok("").with_header("Content-Type", "audio/mpeg"),
        ));
        let formats =
            classify_media_url(&ctx(&stub), &url(stream), "dflt-audio", FormatBreed::Audio).await;
        assert_eq!(formats[0].details.ext.as_deref(), Some("mp3"));
        assert_eq!(stub.requests()[0].method, FetchMethod::Head);
    }

    #[tokio::test]
    async fn failed_probe_keeps_the_format() {
        let stream = "http://example.com/stream";
        let stub = Arc::new(StubTransport::new().with_failure(stream));
        let formats =
            classify_media_url(&ctx(&stub), &url(stream), "dflt-audio", FormatBreed::Audio).await;
        assert_eq!(formats.len(), 1);
        assert_eq!(formats[0].details.ext, None);
    }

    #[tokio::test]
    async fn broken_hls_is_skipped() {
        let stub = Arc::new(StubTransport::new());
        let formats = classify_media_url(
            &ctx(&stub),
            &url("https://example.com/master.m3u8"),
            "dflt-video",
            FormatBreed::AudioVideo,
        )
        .await;
        assert!(formats.is_empty());
    }

    #[tokio::test]
    async fn hds_query_is_forced() {
        let f4m = url("https://wdrfs247.example.com/z/wdrfs_1@s/manifest.f4m?hdcore=2.9.0&g=ABC");
        let expected = update_url_query(&f4m, HDS_QUERY);
        let stub = Arc::new(StubTransport::new().with_body(
            expected.as_str(),
            r#"<manifest xmlns="http://ns.adobe.com/f4m/1.0"><media bitrate="800" width="640" height="360"/></manifest>"#,
        ));
        let formats =
            classify_media_url(&ctx(&stub), &f4m, "dflt-video", FormatBreed::AudioVideo).await;
        assert_eq!(formats.len(), 1);
        assert_eq!(formats[0].details.id, "hds-800");

        let requested = &stub.requests()[0].url;
        let query: Vec<(String, String)> = requested.query_pairs().into_owned().collect();
        assert!(query.contains(&("hdcore".to_string(), "3.2.0".to_string())));
        assert!(query.contains(&("plugin".to_string(), "aasp-3.2.0.77.18".to_string())));
        assert!(query.contains(&("g".to_string(), "ABC".to_string())));
        assert_eq!(query.iter().filter(|(k, _)| k == "hdcore").count(), 1);
    }

    #[tokio::test]
    async fn classification_is_idempotent() {
        let m3u8 = "https://wdradaptiv-vh.example.com/i/medp/ondemand/weltweit/fsk0/137/1378846/master.m3u8";
        let stub = Arc::new(StubTransport::new().with_body(m3u8, MASTER));
        let ctx = ctx(&stub);
        let first = classify_media_url(&ctx, &url(m3u8), "dflt-video", FormatBreed::AudioVideo).await;
        let second = classify_media_url(&ctx, &url(m3u8), "dflt-video", FormatBreed::AudioVideo).await;
        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn manifest_with_caption() {
        let manifest_url = "http://deviceids-medp.wdr.de/ondemand/137/1378846.js";
        let stub = Arc::new(
            StubTransport::new()
                .with_body(
                    manifest_url,
                    &jsonp(r#"{
                        "mediaResource": {
                            "dflt": {"videoURL": "//wdradaptiv-vh.example.com/i/master.m3u8", "mediaFormat": "hls"},
                            "alt": {"videoURL": "//ondemand-ww.wdr.de/medp/fsk0/137/1378846/1378846_15999040.mp4"},
                            "captionURL": "//ondemand-ww.wdr.de/medp/fsk0/137/1378846/1378846_15999051.xml"
                        },
                        "trackerData": {
                            "trackerClipId": "mdb-1378846",
                            "trackerClipTitle": "Lokalzeit am Samstag",
                            "trackerClipSubcategory": "Lokalzeit",
                            "trackerClipAirTime": "20.05.2017 19:30"
                        }
                    }"#),
                )
                .with_body("http://wdradaptiv-vh.example.com/i/master.m3u8", MASTER),
        );
        let extraction = extract_from_manifest(
            &ctx(&stub),
            &url(manifest_url),
            "lokalzeit/video-lokalzeit-am-samstag-206",
            &Extractable::everything(),
        )
        .await
        .unwrap();

        assert_eq!(extraction.metadata.id, "mdb-1378846");
        assert_eq!(extraction.metadata.alt_title.as_deref(), Some("Lokalzeit"));
        assert_eq!(extraction.metadata.upload_date, NaiveDate::from_ymd_opt(2017, 5, 20));

        let ids: Vec<_> = extraction
            .established_formats
            .iter()
            .map(|f| f.details.id.as_str())
            .collect();
        assert_eq!(ids, vec!["alt-video", "hls-1216", "hls-3776"]);

        assert_eq!(extraction.established_subtitles.len(), 1);
        let subtitle = &extraction.established_subtitles[0];
        assert_eq!(subtitle.lang, "de");
        assert_eq!(subtitle.ext, SubtitleExt::TTML);
        assert_eq!(
            subtitle.url.as_str(),
            "http://ondemand-ww.wdr.de/medp/fsk0/137/1378846/1378846_15999051.xml"
        );
    }

    #[tokio::test]
    async fn id_falls_back_to_display_id() {
        let manifest_url = "https://example.com/clip.js";
        let stub = Arc::new(StubTransport::new().with_body(
            manifest_url,
            &jsonp(r#"{"mediaResource": {"dflt": {"audioURL": "https://example.com/a.mp3"}}, "trackerData": {"trackerClipTitle": "Hörspiel"}}"#),
        ));
        let extraction = extract_from_manifest(
            &ctx(&stub),
            &url(manifest_url),
            "hoerspiel-100",
            &Extractable::everything(),
        )
        .await
        .unwrap();
        assert_eq!(extraction.metadata.id, "hoerspiel-100");
        assert_eq!(extraction.metadata.upload_date, None);
        assert!(extraction.established_subtitles.is_empty());
        assert_eq!(extraction.established_formats[0].details.breed, FormatBreed::Audio);
    }

    #[tokio::test]
    async fn title_is_required() {
        let manifest_url = "https://example.com/clip.js";
        let stub = Arc::new(StubTransport::new().with_body(
            manifest_url,
            &jsonp(r#"{"mediaResource": {}, "trackerData": {"trackerClipId": "mdb-1"}}"#),
        ));
        let err = extract_from_manifest(&ctx(&stub), &url(manifest_url), "x", &Extractable::everything())
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ExtractionError>(),
            Some(ExtractionError::MissingField { .. })
        ));
    }

    #[tokio::test]
    async fn no_usable_stream() {
        let manifest_url = "https://example.com/clip.js";
        let stub = Arc::new(StubTransport::new().with_body(
            manifest_url,
            &jsonp(r#"{"mediaResource": {"dflt": {"videoURL": "https://example.com/broken.m3u8"}}, "trackerData": {"trackerClipTitle": "x"}}"#),
        ));
        let err = extract_from_manifest(&ctx(&stub), &url(manifest_url), "x", &Extractable::everything())
            .await
            .unwrap_err();
        match err.downcast_ref::<ExtractionError>() {
            Some(e @ ExtractionError::NoContent(_)) => {
                assert_eq!(e.to_string(), "No video formats found")
            }
            _ => panic!("expected no content, got {err}"),
        }
        assert_eq!(
            stub.requested_urls(),
            vec![manifest_url, "https://example.com/broken.m3u8"]
        );
    }

    #[tokio::test]
    async fn no_variants_at_all() {
        let manifest_url = "https://example.com/clip.js";
        let stub = Arc::new(StubTransport::new().with_body(
            manifest_url,
            &jsonp(r#"{"mediaResource": {"captionURL": "https://example.com/c.xml"}, "trackerData": {"trackerClipTitle": "x"}}"#),
        ));
        let err = extract_from_manifest(&ctx(&stub), &url(manifest_url), "x", &Extractable::everything())
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ExtractionError>(),
            Some(ExtractionError::NoContent(_))
        ));
    }

    #[tokio::test]
    async fn no_playback_no_stream_requests() {
        let manifest_url = "https://example.com/clip.js";
        let stub = Arc::new(StubTransport::new().with_body(
            manifest_url,
            &jsonp(r#"{"mediaResource": {"dflt": {"videoURL": "https://example.com/master.m3u8"}}, "trackerData": {"trackerClipTitle": "x"}}"#),
        ));
        let extraction = extract_from_manifest(
            &ctx(&stub),
            &url(manifest_url),
            "x",
            &Extractable::default(),
        )
        .await
        .unwrap();
        assert!(extraction.established_formats.is_empty());
        assert_eq!(stub.requested_urls(), vec![manifest_url.to_string()]);
    }
}
