//! Ranking of established formats.

use crate::{FormatBreed, MediaFormatEstablished, MediaFormatURL};

fn breed_preference(breed: &FormatBreed) -> u8 {
    match breed {
        FormatBreed::Audio => 0,
        FormatBreed::Video => 1,
        FormatBreed::AudioVideo => 2,
    }
}

fn protocol_preference(url: &MediaFormatURL) -> u8 {
    match url {
        MediaFormatURL::HDS(_) => 0,
        MediaFormatURL::SMIL(_) => 1,
        MediaFormatURL::HLS(_) => 2,
        MediaFormatURL::HTTP(_, _) => 3,
    }
}

fn quality_key(format: &MediaFormatEstablished) -> (u8, u32, u32, u64, u8) {
    let video = format.details.video_details.as_ref();
    (
        breed_preference(&format.details.breed),
        video.and_then(|v| v.height).unwrap_or(0),
        video.and_then(|v| v.width).unwrap_or(0),
        format.details.bitrate.unwrap_or(0),
        protocol_preference(&format.url),
    )
}

/// Sorts the formats from the worst to the best.
/// The sort is stable, formats of equal quality keep the order they were found in.
pub fn sort_formats(formats: &mut [MediaFormatEstablished]) {
    formats.sort_by_key(quality_key);
}
