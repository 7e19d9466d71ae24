use serde::Deserialize;
use serde_json::{Map, Value};

/// Player configuration embedded in the `data-extension` attribute
#[derive(Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct MediaLink {
    pub media_obj: Option<MediaObj>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct MediaObj {
    pub url: Option<String>,
}

/// The JSONP document the player loads for a single clip
#[derive(Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub tracker_data: Option<TrackerData>,
    /// delivery variants (`dflt`, `alt`) mapping stream roles to URLs, and `captionURL`;
    /// kept loose, as the set of keys differs between the players
    pub media_resource: Option<Map<String, Value>>,
}

#[derive(Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TrackerData {
    pub tracker_clip_id: Option<String>,
    pub tracker_clip_title: Option<String>,
    pub tracker_clip_subcategory: Option<String>,
    pub tracker_clip_air_time: Option<String>,
}
