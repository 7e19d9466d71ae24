use anyhow::Result;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::{debug, instrument};
use url::Url;

use crate::{ExtractionContext, FormatBreed, MediaFormatDetails, MediaFormatEstablished, MediaFormatURL, VideoDetails};

#[derive(Default)]
struct SmilMedia {
    src: String,
    breed: FormatBreed,
    bitrate: Option<u64>,
    width: Option<u32>,
    height: Option<u32>,
}

/// Downloads a SMIL document and lists the streams it points at
#[instrument(skip(ctx))]
pub async fn extract_smil_formats(
    ctx: &ExtractionContext,
    smil_url: &Url,
    smil_id: &str,
) -> Result<Vec<MediaFormatEstablished>> {
    let smil = ctx.get_body("SMIL file", smil_url).await?;
    let formats = parse_smil_formats(&smil, smil_url, smil_id)?;
    debug!("{} smil streams found", formats.len());
    Ok(formats)
}

fn read_media(e: &BytesStart, breed: FormatBreed) -> Result<SmilMedia> {
    let mut media = SmilMedia {
        breed,
        ..Default::default()
    };
    for attr in e.attributes() {
        let attr = attr?;
        let value = attr.unescape_value()?;
        match attr.key.local_name().as_ref() {
            b"src" => media.src = value.trim().to_string(),
            b"system-bitrate" | b"systemBitrate" => media.bitrate = value.trim().parse().ok(),
            b"width" => media.width = value.trim().parse().ok(),
            b"height" => media.height = value.trim().parse().ok(),
            _ => {}
        }
    }
    Ok(media)
}

fn read_base(e: &BytesStart) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr?;
        if matches!(attr.key.local_name().as_ref(), b"base" | b"httpBase") {
            return Ok(Some(attr.unescape_value()?.trim().to_string()));
        }
    }
    Ok(None)
}

/// Media sources are relative to `<meta base>` if there is one, else to the SMIL document.
/// RTMP bases are joined with a slash, as the play path is not a URL path.
fn stream_url(base: Option<&str>, smil_url: &Url, src: &str) -> Result<Url> {
    if src.contains("://") {
        return Ok(Url::parse(src)?);
    }
    match base {
        Some(base) if base.starts_with("rtmp") => Ok(Url::parse(&format!(
            "{}/{}",
            base.trim_end_matches('/'),
            src.trim_start_matches('/')
        ))?),
        Some(base) => Ok(smil_url.join(base)?.join(src)?),
        None => Ok(smil_url.join(src)?),
    }
}

pub fn parse_smil_formats(
    smil: &str,
    smil_url: &Url,
    smil_id: &str,
) -> Result<Vec<MediaFormatEstablished>> {
    let mut reader = Reader::from_str(smil);
    let mut base = None;
    let mut media = vec![];

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                b"meta" if base.is_none() => base = read_base(&e)?,
                b"video" => media.push(read_media(&e, FormatBreed::AudioVideo)?),
                b"audio" => media.push(read_media(&e, FormatBreed::Audio)?),
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    let mut formats = vec![];
    for (index, m) in media.into_iter().enumerate() {
        if m.src.is_empty() {
            continue;
        }
        let bitrate = m.bitrate.map(|b| b / 1000);
        formats.push(MediaFormatEstablished {
            details: MediaFormatDetails {
                id: match bitrate {
                    Some(b) => format!("{smil_id}-{b}"),
                    None => format!("{smil_id}-{index}"),
                },
                breed: m.breed,
                bitrate,
                video_details: (m.width.is_some() || m.height.is_some()).then_some(VideoDetails {
                    width: m.width,
                    height: m.height,
                }),
                ..Default::default()
            },
            url: MediaFormatURL::SMIL(stream_url(base.as_deref(), smil_url, &m.src)?),
        });
    }

    Ok(formats)
}
