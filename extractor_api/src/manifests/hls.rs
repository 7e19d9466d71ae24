use anyhow::Result;
use m3u8_rs::{MasterPlaylist, Playlist, VariantStream};
use tracing::{debug, instrument};
use url::Url;

use crate::error::ExtractionError;
use crate::{ExtractionContext, FormatBreed, MediaFormatDetails, MediaFormatEstablished, MediaFormatURL, VideoDetails};

static VIDEO_CODECS: &[&str] = &["avc", "hvc", "hev", "vp8", "vp9", "vp09", "av01", "mp4v", "h26"];
static AUDIO_CODECS: &[&str] = &["mp4a", "ac-3", "ec-3", "opus", "mp3", "vorbis", "flac"];

/// Downloads an HLS playlist and lists its variants as formats
#[instrument(skip(ctx))]
pub async fn extract_m3u8_formats(
    ctx: &ExtractionContext,
    m3u8_url: &Url,
    ext: &str,
    m3u8_id: &str,
    breed: FormatBreed,
) -> Result<Vec<MediaFormatEstablished>> {
    let playlist = ctx.get_body("m3u8 playlist", m3u8_url).await?;
    let formats = parse_m3u8_formats(&playlist, m3u8_url, ext, m3u8_id, breed)?;
    debug!("{} hls formats found", formats.len());
    Ok(formats)
}

pub fn parse_m3u8_formats(
    playlist: &str,
    m3u8_url: &Url,
    ext: &str,
    m3u8_id: &str,
    breed: FormatBreed,
) -> Result<Vec<MediaFormatEstablished>> {
    match m3u8_rs::parse_playlist_res(playlist.as_bytes())
        .map_err(|e| ExtractionError::malformed("m3u8 playlist", e))?
    {
        Playlist::MasterPlaylist(master) => {
            master_formats(master, m3u8_url, ext, m3u8_id, breed)
        }
        // a playlist of segments, no variants to choose from
        Playlist::MediaPlaylist(_) => Ok(vec![MediaFormatEstablished {
            details: MediaFormatDetails {
                id: m3u8_id.to_string(),
                breed,
                ext: Some(ext.to_string()),
                ..Default::default()
            },
            url: MediaFormatURL::HLS(m3u8_url.clone()),
        }]),
    }
}

fn master_formats(
    master: MasterPlaylist,
    m3u8_url: &Url,
    ext: &str,
    m3u8_id: &str,
    breed: FormatBreed,
) -> Result<Vec<MediaFormatEstablished>> {
    master
        .variants
        .into_iter()
        .filter(|v| !v.is_i_frame)
        .map(|variant| -> Result<MediaFormatEstablished> {
            let url = m3u8_url.join(&variant.uri)?;
            let bitrate = variant
                .average_bandwidth
                .unwrap_or(variant.bandwidth)
                / 1000;
            Ok(MediaFormatEstablished {
                details: MediaFormatDetails {
                    id: format!("{m3u8_id}-{bitrate}"),
                    breed: variant_breed(&variant, &breed),
                    ext: Some(ext.to_string()),
                    bitrate: Some(bitrate).filter(|b| *b > 0),
                    video_details: variant.resolution.map(|r| VideoDetails {
                        width: u32::try_from(r.width).ok(),
                        height: u32::try_from(r.height).ok(),
                    }),
                    codecs: variant.codecs,
                },
                url: MediaFormatURL::HLS(url),
            })
        })
        .collect()
}

/// Tells the breed by the declared codecs, falling back to the one of the whole playlist
fn variant_breed(variant: &VariantStream, fallback: &FormatBreed) -> FormatBreed {
    let Some(codecs) = &variant.codecs else {
        return fallback.clone();
    };
    let codecs = codecs.to_ascii_lowercase();
    let has_video = VIDEO_CODECS.iter().any(|c| codecs.contains(c));
    let has_audio = AUDIO_CODECS.iter().any(|c| codecs.contains(c));
    match (has_video, has_audio) {
        (true, true) => FormatBreed::AudioVideo,
        (true, false) => FormatBreed::Video,
        (false, true) => FormatBreed::Audio,
        (false, false) => fallback.clone(),
    }
}
