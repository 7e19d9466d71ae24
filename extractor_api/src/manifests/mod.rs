//! Expansion of streaming manifests into lists of formats.

pub mod hds;
pub mod hls;
pub mod smil;

pub use hds::extract_f4m_formats;
pub use hls::extract_m3u8_formats;
pub use smil::extract_smil_formats;
