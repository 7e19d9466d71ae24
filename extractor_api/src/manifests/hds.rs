use anyhow::Result;
use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::{debug, instrument};
use url::Url;

use crate::{ExtractionContext, FormatBreed, MediaFormatDetails, MediaFormatEstablished, MediaFormatURL, VideoDetails};

/// Downloads an Adobe f4m manifest and lists its media renditions as formats.
/// The formats point at the manifest itself, as the HDS downloaders expect.
#[instrument(skip(ctx))]
pub async fn extract_f4m_formats(
    ctx: &ExtractionContext,
    manifest_url: &Url,
    f4m_id: &str,
) -> Result<Vec<MediaFormatEstablished>> {
    let manifest = ctx.get_body("f4m manifest", manifest_url).await?;
    let formats = parse_f4m_formats(&manifest, manifest_url, f4m_id)?;
    debug!("{} hds formats found", formats.len());
    Ok(formats)
}

pub fn parse_f4m_formats(
    manifest: &str,
    manifest_url: &Url,
    f4m_id: &str,
) -> Result<Vec<MediaFormatEstablished>> {
    let mut reader = Reader::from_str(manifest);
    let mut formats = vec![];

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"media" => {
                let mut bitrate = None;
                let mut width = None;
                let mut height = None;
                for attr in e.attributes() {
                    let attr = attr?;
                    let value = attr.unescape_value()?;
                    match attr.key.local_name().as_ref() {
                        b"bitrate" => bitrate = value.trim().parse::<u64>().ok(),
                        b"width" => width = value.trim().parse::<u32>().ok(),
                        b"height" => height = value.trim().parse::<u32>().ok(),
                        _ => {}
                    }
                }

                let index = formats.len();
                formats.push(MediaFormatEstablished {
                    details: MediaFormatDetails {
                        id: match bitrate {
                            Some(b) => format!("{f4m_id}-{b}"),
                            None => format!("{f4m_id}-{index}"),
                        },
                        breed: FormatBreed::AudioVideo,
                        ext: Some("flv".to_string()),
                        bitrate,
                        video_details: (width.is_some() || height.is_some())
                            .then_some(VideoDetails { width, height }),
                        ..Default::default()
                    },
                    url: MediaFormatURL::HDS(manifest_url.clone()),
                });
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(formats)
}
