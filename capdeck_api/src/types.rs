//! Wire shapes of the control API.

use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value, json};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(from = "i64", into = "i64")]
pub enum SourceType {
    #[default]
    None,
    V4l2,
    DirectShow,
}

impl From<i64> for SourceType {
    fn from(value: i64) -> Self {
        match value {
            1 => SourceType::V4l2,
            2 => SourceType::DirectShow,
            _ => SourceType::None,
        }
    }
}

impl From<SourceType> for i64 {
    fn from(value: SourceType) -> Self {
        match value {
            SourceType::None => 0,
            SourceType::V4l2 => 1,
            SourceType::DirectShow => 2,
        }
    }
}

impl SourceType {
    pub fn label(self) -> &'static str {
        match self {
            SourceType::None => "None",
            SourceType::V4l2 => "V4L2",
            SourceType::DirectShow => "DirectShow",
        }
    }

    pub fn device_class(self) -> Option<DeviceClass> {
        match self {
            SourceType::None => None,
            SourceType::V4l2 => Some(DeviceClass::V4l2),
            SourceType::DirectShow => Some(DeviceClass::DirectShow),
        }
    }
}

/// Backend family that owns a device list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceClass {
    V4l2,
    DirectShow,
}

impl DeviceClass {
    pub fn segment(self) -> &'static str {
        match self {
            DeviceClass::V4l2 => "v4l2",
            DeviceClass::DirectShow => "ds",
        }
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceClass::V4l2 => f.write_str("V4L2"),
            DeviceClass::DirectShow => f.write_str("DirectShow"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SourceInfo {
    #[serde(rename = "type", default)]
    pub kind: SourceType,
    #[serde(default)]
    pub device: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct ShaderInfo {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct ShaderList {
    #[serde(default)]
    pub shaders: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShaderParameter {
    pub name: String,
    pub value: f64,
    #[serde(default)]
    pub min: f64,
    #[serde(default = "one")]
    pub max: f64,
    #[serde(default)]
    pub step: f64,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub default_value: Option<f64>,
}

impl ShaderParameter {
    /// Slider step; the backend reports 0 when it has no opinion.
    pub fn effective_step(&self) -> f64 {
        if self.step > 0.0 { self.step } else { 0.01 }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct ShaderParameters {
    #[serde(default)]
    pub parameters: Vec<ShaderParameter>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct CaptureResolution {
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct CaptureFps {
    #[serde(default)]
    pub fps: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageSettings {
    #[serde(default)]
    pub brightness: f64,
    #[serde(default = "one")]
    pub contrast: f64,
    #[serde(default)]
    pub maintain_aspect: bool,
    #[serde(default)]
    pub fullscreen: bool,
    #[serde(default = "no_monitor")]
    pub monitor_index: i32,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            brightness: 0.0,
            contrast: 1.0,
            maintain_aspect: false,
            fullscreen: false,
            monitor_index: -1,
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum VideoCodec {
    #[default]
    H264,
    H265,
    Vp8,
    Vp9,
}

impl VideoCodec {
    pub const ALL: [VideoCodec; 4] =
        [VideoCodec::H264, VideoCodec::H265, VideoCodec::Vp8, VideoCodec::Vp9];

    pub fn as_str(self) -> &'static str {
        match self {
            VideoCodec::H264 => "h264",
            VideoCodec::H265 => "h265",
            VideoCodec::Vp8 => "vp8",
            VideoCodec::Vp9 => "vp9",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum AudioCodec {
    #[default]
    Aac,
    Mp3,
    Opus,
}

impl AudioCodec {
    pub const ALL: [AudioCodec; 3] =
        [AudioCodec::Aac, AudioCodec::Mp3, AudioCodec::Opus];

    pub fn as_str(self) -> &'static str {
        match self {
            AudioCodec::Aac => "aac",
            AudioCodec::Mp3 => "mp3",
            AudioCodec::Opus => "opus",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
    }
}

/// Streaming settings as the backend reports them: every codec's fields at
/// once. Writes go through [`StreamingSettings::write_payload`], which only
/// carries the selected codec's fields.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamingSettings {
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub bitrate: u32,
    #[serde(default)]
    pub audio_bitrate: u32,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub fps: u32,
    #[serde(default)]
    pub video_codec: VideoCodec,
    #[serde(default)]
    pub audio_codec: AudioCodec,
    #[serde(default)]
    pub h264_preset: String,
    #[serde(default)]
    pub h265_preset: String,
    #[serde(default)]
    pub h265_profile: String,
    #[serde(default)]
    pub h265_level: String,
    #[serde(default)]
    pub vp8_speed: i32,
    #[serde(default)]
    pub vp9_speed: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecParams {
    H264 {
        preset: String,
    },
    H265 {
        preset: String,
        profile: String,
        level: String,
    },
    Vp8 {
        speed: i32,
    },
    Vp9 {
        speed: i32,
    },
}

impl CodecParams {
    fn write_into(&self, map: &mut Map<String, Value>) {
        match self {
            CodecParams::H264 { preset } => {
                map.insert("h264Preset".into(), json!(preset));
            }
            CodecParams::H265 {
                preset,
                profile,
                level,
            } => {
                map.insert("h265Preset".into(), json!(preset));
                map.insert("h265Profile".into(), json!(profile));
                map.insert("h265Level".into(), json!(level));
            }
            CodecParams::Vp8 { speed } => {
                map.insert("vp8Speed".into(), json!(speed));
            }
            CodecParams::Vp9 { speed } => {
                map.insert("vp9Speed".into(), json!(speed));
            }
        }
    }
}

impl StreamingSettings {
    pub fn codec_params(&self) -> CodecParams {
        match self.video_codec {
            VideoCodec::H264 => CodecParams::H264 {
                preset: self.h264_preset.clone(),
            },
            VideoCodec::H265 => CodecParams::H265 {
                preset: self.h265_preset.clone(),
                profile: self.h265_profile.clone(),
                level: self.h265_level.clone(),
            },
            VideoCodec::Vp8 => CodecParams::Vp8 {
                speed: self.vp8_speed,
            },
            VideoCodec::Vp9 => CodecParams::Vp9 {
                speed: self.vp9_speed,
            },
        }
    }

    pub fn write_payload(&self) -> Value {
        let mut map = Map::new();
        map.insert("port".into(), json!(self.port));
        map.insert("bitrate".into(), json!(self.bitrate));
        map.insert("audioBitrate".into(), json!(self.audio_bitrate));
        map.insert("width".into(), json!(self.width));
        map.insert("height".into(), json!(self.height));
        map.insert("fps".into(), json!(self.fps));
        map.insert("videoCodec".into(), json!(self.video_codec));
        map.insert("audioCodec".into(), json!(self.audio_codec));
        self.codec_params().write_into(&mut map);
        Value::Object(map)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamAction {
    Start,
    Stop,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawStatus {
    streaming_active: Option<bool>,
    active: Option<bool>,
    client_count: Option<u32>,
    stream_url: Option<String>,
    url: Option<String>,
    streaming_can_start: Option<bool>,
    streaming_cooldown_remaining_ms: Option<u64>,
}

/// Normalized `/status` response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawStatus")]
pub struct StreamStatus {
    pub streaming_active: bool,
    pub client_count: u32,
    pub stream_url: Option<String>,
    pub can_start: bool,
    pub cooldown_remaining_ms: u64,
}

impl From<RawStatus> for StreamStatus {
    fn from(raw: RawStatus) -> Self {
        let cooldown_remaining_ms =
            raw.streaming_cooldown_remaining_ms.unwrap_or(0);
        let non_empty = |s: Option<String>| s.filter(|s| !s.is_empty());

        Self {
            streaming_active: raw
                .streaming_active
                .or(raw.active)
                .unwrap_or(false),
            client_count: raw.client_count.unwrap_or(0),
            stream_url: non_empty(raw.stream_url).or_else(|| non_empty(raw.url)),
            // a pending cooldown always blocks a start
            can_start: raw.streaming_can_start.unwrap_or(true)
                && cooldown_remaining_ms == 0,
            cooldown_remaining_ms,
        }
    }
}

impl Default for StreamStatus {
    fn default() -> Self {
        RawStatus::default().into()
    }
}

impl StreamStatus {
    /// Whole seconds left, rounded up.
    pub fn cooldown_secs(&self) -> u64 {
        self.cooldown_remaining_ms.div_ceil(1000)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceTypeOption {
    pub value: SourceType,
    pub name: String,
}

impl SourceTypeOption {
    pub fn new(value: SourceType) -> Self {
        Self {
            value,
            name: value.label().to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformInfo {
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub available_source_types: Vec<SourceTypeOption>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDevice {
    Path(String),
    Entry {
        #[serde(default)]
        id: String,
        #[serde(default)]
        name: String,
        #[serde(default = "yes")]
        available: bool,
    },
}

/// A capture device. V4L2 reports bare paths, DirectShow reports objects.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawDevice")]
pub struct CaptureDevice {
    pub id: String,
    pub name: String,
    pub available: bool,
}

impl From<RawDevice> for CaptureDevice {
    fn from(raw: RawDevice) -> Self {
        match raw {
            RawDevice::Path(path) => Self {
                id: path.clone(),
                name: path,
                available: true,
            },
            RawDevice::Entry {
                id,
                name,
                available,
            } => {
                let id = if id.is_empty() { name.clone() } else { id };
                let name = if name.is_empty() { id.clone() } else { name };
                Self {
                    id,
                    name,
                    available,
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct DeviceList {
    #[serde(default)]
    pub devices: Vec<CaptureDevice>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeviceControl {
    pub name: String,
    pub value: i32,
    #[serde(default)]
    pub min: i32,
    #[serde(default)]
    pub max: i32,
    #[serde(default = "one_step")]
    pub step: i32,
    #[serde(default = "yes")]
    pub available: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct ControlList {
    #[serde(default)]
    pub controls: Vec<DeviceControl>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresetSummary {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub created: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub thumbnail: Option<String>,
}

impl PresetSummary {
    pub fn title(&self) -> &str {
        if self.display_name.is_empty() {
            &self.name
        } else {
            &self.display_name
        }
    }

    /// Thumbnails are served from `/assets/thumbnails/` by file name only.
    pub fn thumbnail_url(&self) -> Option<String> {
        let path = self.thumbnail.as_deref()?;
        let file = path.rsplit(['/', '\\']).next().unwrap_or(path);
        (!file.is_empty()).then(|| format!("/assets/thumbnails/{file}"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct PresetList {
    #[serde(default)]
    pub presets: Vec<PresetSummary>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct PresetShader {
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresetCapture {
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub fps: u32,
    #[serde(default)]
    pub source_type: SourceType,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresetImage {
    #[serde(default)]
    pub brightness: f64,
    #[serde(default = "one")]
    pub contrast: f64,
    #[serde(default)]
    pub maintain_aspect: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PresetDetail {
    #[serde(flatten)]
    pub summary: PresetSummary,
    #[serde(default)]
    pub shader: Option<PresetShader>,
    #[serde(default)]
    pub capture: Option<PresetCapture>,
    #[serde(default)]
    pub image: Option<PresetImage>,
}

/// Recording encoder settings. Unlike streaming, every codec's fields are
/// written back as they are.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingSettings {
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub fps: u32,
    #[serde(default)]
    pub bitrate: u32,
    #[serde(default)]
    pub audio_bitrate: u32,
    #[serde(default)]
    pub codec: VideoCodec,
    #[serde(default)]
    pub audio_codec: AudioCodec,
    #[serde(default)]
    pub h264_preset: String,
    #[serde(default)]
    pub h265_preset: String,
    #[serde(default)]
    pub h265_profile: String,
    #[serde(default)]
    pub h265_level: String,
    #[serde(default)]
    pub vp8_speed: i32,
    #[serde(default)]
    pub vp9_speed: i32,
    #[serde(default)]
    pub container: String,
    #[serde(default)]
    pub output_path: String,
    #[serde(default)]
    pub filename_template: String,
    #[serde(default = "yes")]
    pub include_audio: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct ActiveRecording {
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub fps: u32,
    #[serde(default)]
    pub codec: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingStatus {
    #[serde(default)]
    pub is_recording: bool,
    /// Microseconds.
    #[serde(default)]
    pub duration: u64,
    #[serde(default)]
    pub file_size: u64,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub current_file: Option<String>,
    /// Only reported while recording.
    #[serde(default)]
    pub settings: Option<ActiveRecording>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recording {
    pub id: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub filepath: String,
    #[serde(default)]
    pub container: String,
    #[serde(default)]
    pub video_codec: String,
    #[serde(default)]
    pub audio_codec: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub fps: u32,
    #[serde(default)]
    pub file_size: u64,
    /// Microseconds.
    #[serde(default)]
    pub duration: u64,
    #[serde(default)]
    pub created_at: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub thumbnail_path: Option<String>,
}

impl Recording {
    pub fn duration_secs(&self) -> u64 {
        self.duration / 1_000_000
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct RecordingList {
    #[serde(default)]
    pub recordings: Vec<Recording>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AudioInputSource {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct AudioInputList {
    #[serde(default, alias = "inputSources")]
    pub sources: Vec<AudioInputSource>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioStatus {
    #[serde(default)]
    pub connected: bool,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub source_id: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub source_name: Option<String>,
}

/// Generic acknowledgement returned by write endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct Ack {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
}

fn one() -> f64 {
    1.0
}

fn one_step() -> i32 {
    1
}

fn no_monitor() -> i32 {
    -1
}

fn yes() -> bool {
    true
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn streaming_active_wins_over_active() {
        let status: StreamStatus = serde_json::from_value(json!({
            "active": true,
            "streamingActive": false,
            "clientCount": 3,
        }))
        .unwrap();
        assert!(!status.streaming_active);
        assert_eq!(status.client_count, 3);

        let status: StreamStatus =
            serde_json::from_value(json!({ "active": true })).unwrap();
        assert!(status.streaming_active);
    }

    #[test]
    fn stream_url_prefers_stream_url_and_skips_empty() {
        let status: StreamStatus = serde_json::from_value(json!({
            "streamUrl": "",
            "url": "http://dev/stream",
        }))
        .unwrap();
        assert_eq!(status.stream_url.as_deref(), Some("http://dev/stream"));

        let status: StreamStatus = serde_json::from_value(json!({
            "streamUrl": "http://a/stream",
            "url": "http://b/stream",
        }))
        .unwrap();
        assert_eq!(status.stream_url.as_deref(), Some("http://a/stream"));
    }

    #[test]
    fn cooldown_blocks_start() {
        let status: StreamStatus = serde_json::from_value(json!({
            "streamingActive": false,
            "streamingCanStart": true,
            "streamingCooldownRemainingMs": 7500,
        }))
        .unwrap();
        assert!(!status.can_start);
        assert_eq!(status.cooldown_secs(), 8);

        let status: StreamStatus = serde_json::from_value(json!({})).unwrap();
        assert!(status.can_start);
        assert_eq!(status.cooldown_secs(), 0);
    }

    #[test]
    fn codec_payload_only_carries_selected_codec() {
        let mut settings = StreamingSettings {
            video_codec: VideoCodec::H264,
            h264_preset: "veryfast".into(),
            vp9_speed: 6,
            ..Default::default()
        };
        let payload = settings.write_payload();
        assert_eq!(payload["videoCodec"], "h264");
        assert_eq!(payload["h264Preset"], "veryfast");
        assert!(payload.get("vp9Speed").is_none());

        settings.video_codec = VideoCodec::Vp9;
        let payload = settings.write_payload();
        assert_eq!(payload["videoCodec"], "vp9");
        assert_eq!(payload["vp9Speed"], 6);
        assert!(payload.get("h264Preset").is_none());
        assert!(payload.get("h265Profile").is_none());
    }

    #[test]
    fn devices_accept_paths_and_entries() {
        let list: DeviceList = serde_json::from_value(json!({
            "devices": [
                "/dev/video0",
                { "id": "@device:pnp:1", "name": "USB Capture", "available": false },
                { "name": "OBS Virtual Camera" },
            ]
        }))
        .unwrap();

        assert_eq!(list.devices[0].id, "/dev/video0");
        assert_eq!(list.devices[0].name, "/dev/video0");
        assert!(list.devices[0].available);
        assert_eq!(list.devices[1].id, "@device:pnp:1");
        assert!(!list.devices[1].available);
        assert_eq!(list.devices[2].id, "OBS Virtual Camera");
    }

    #[test]
    fn source_type_round_trips_as_integer() {
        let info: SourceInfo =
            serde_json::from_value(json!({ "type": 2, "device": "cam" }))
                .unwrap();
        assert_eq!(info.kind, SourceType::DirectShow);
        assert_eq!(serde_json::to_value(&info).unwrap()["type"], 2);

        let info: SourceInfo =
            serde_json::from_value(json!({ "type": 9 })).unwrap();
        assert_eq!(info.kind, SourceType::None);
    }

    #[test]
    fn preset_thumbnail_url_uses_file_name() {
        let preset: PresetSummary = serde_json::from_value(json!({
            "name": "crt",
            "displayName": "",
            "thumbnail": "assets\\thumbnails\\crt.png",
        }))
        .unwrap();
        assert_eq!(preset.title(), "crt");
        assert_eq!(
            preset.thumbnail_url().as_deref(),
            Some("/assets/thumbnails/crt.png")
        );

        let preset: PresetSummary =
            serde_json::from_value(json!({ "name": "x", "thumbnail": "" }))
                .unwrap();
        assert_eq!(preset.thumbnail, None);
    }

    #[test]
    fn image_defaults_match_backend() {
        let image: ImageSettings = serde_json::from_value(json!({})).unwrap();
        assert_eq!(image, ImageSettings::default());
        assert_eq!(
            serde_json::to_value(&image).unwrap(),
            json!({
                "brightness": 0.0,
                "contrast": 1.0,
                "maintainAspect": false,
                "fullscreen": false,
                "monitorIndex": -1,
            })
        );
    }
}
