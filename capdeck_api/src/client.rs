use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::{
    error::RequestFailure,
    transport::{ApiRequest, Method, Transport},
    types::{
        Ack, AudioInputList, AudioStatus, CaptureFps, CaptureResolution,
        ControlList, DeviceClass, DeviceList, ImageSettings, PlatformInfo,
        PresetDetail, PresetList, Recording, RecordingList, RecordingSettings,
        RecordingStatus, ShaderInfo, ShaderList, ShaderParameters, SourceInfo,
        SourceType, StreamAction, StreamStatus, StreamingSettings,
    },
};

/// Successful response body: JSON when it parses, raw text otherwise.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse {
    Json(Value),
    Text(String),
}

impl ApiResponse {
    fn parse(body: String) -> Self {
        match serde_json::from_str(&body) {
            Ok(value) => ApiResponse::Json(value),
            Err(_) => ApiResponse::Text(body),
        }
    }
}

/// One method per backend resource. Cheap to clone.
#[derive(Debug)]
pub struct ApiClient<T> {
    transport: Arc<T>,
}

impl<T> Clone for ApiClient<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
        }
    }
}

impl<T: Transport> ApiClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport: Arc::new(transport),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    #[tracing::instrument(
        level = "trace",
        skip_all,
        fields(method = %request.method, path = %request.path())
    )]
    pub async fn request(
        &self,
        request: ApiRequest,
    ) -> Result<ApiResponse, RequestFailure> {
        let response = match self.transport.send(&request).await {
            Ok(response) => response,
            Err(e) => {
                warn!("{} {} failed: {e}", request.method, request.path());
                return Err(RequestFailure::transport(&e));
            }
        };

        if !response.is_success() {
            let failure =
                RequestFailure::from_response(response.status, &response.body);
            debug!(
                "{} {} -> {}: {}",
                request.method,
                request.path(),
                response.status,
                failure.message
            );
            return Err(failure);
        }

        Ok(ApiResponse::parse(response.body))
    }

    pub async fn fetch<R: DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> Result<R, RequestFailure> {
        match self.request(request).await? {
            ApiResponse::Json(value) => {
                serde_json::from_value(value).map_err(RequestFailure::decode)
            }
            ApiResponse::Text(text) => {
                Err(RequestFailure::decode(format!("not JSON: {text}")))
            }
        }
    }

    async fn write(&self, request: ApiRequest) -> Result<Ack, RequestFailure> {
        Ok(match self.request(request).await? {
            ApiResponse::Json(value) => {
                serde_json::from_value(value).unwrap_or_default()
            }
            ApiResponse::Text(text) => Ack {
                message: (!text.is_empty()).then_some(text),
                ..Ack::default()
            },
        })
    }

    // source

    pub async fn source(&self) -> Result<SourceInfo, RequestFailure> {
        self.fetch(ApiRequest::get("/source")).await
    }

    pub async fn set_source(
        &self,
        kind: SourceType,
        device: Option<&str>,
    ) -> Result<Ack, RequestFailure> {
        let mut body = json!({ "type": kind });
        if let Some(device) = device {
            body["device"] = json!(device);
        }
        self.write(ApiRequest::post("/source", body)).await
    }

    // shader

    pub async fn shader(&self) -> Result<ShaderInfo, RequestFailure> {
        self.fetch(ApiRequest::get("/shader")).await
    }

    pub async fn shader_list(&self) -> Result<ShaderList, RequestFailure> {
        self.fetch(ApiRequest::get("/shader/list")).await
    }

    pub async fn shader_parameters(
        &self,
    ) -> Result<ShaderParameters, RequestFailure> {
        self.fetch(ApiRequest::get("/shader/parameters")).await
    }

    pub async fn set_shader(&self, name: &str) -> Result<Ack, RequestFailure> {
        self.write(ApiRequest::post("/shader", json!({ "shader": name })))
            .await
    }

    pub async fn set_shader_parameter(
        &self,
        name: &str,
        value: f64,
    ) -> Result<Ack, RequestFailure> {
        self.write(ApiRequest::post(
            "/shader/parameter",
            json!({ "name": name, "value": value }),
        ))
        .await
    }

    // capture

    pub async fn capture_resolution(
        &self,
    ) -> Result<CaptureResolution, RequestFailure> {
        self.fetch(ApiRequest::get("/capture/resolution")).await
    }

    pub async fn capture_fps(&self) -> Result<CaptureFps, RequestFailure> {
        self.fetch(ApiRequest::get("/capture/fps")).await
    }

    pub async fn set_capture_resolution(
        &self,
        width: u32,
        height: u32,
    ) -> Result<Ack, RequestFailure> {
        self.write(ApiRequest::post(
            "/capture/resolution",
            json!({ "width": width, "height": height }),
        ))
        .await
    }

    pub async fn set_capture_fps(&self, fps: u32) -> Result<Ack, RequestFailure> {
        self.write(ApiRequest::post("/capture/fps", json!({ "fps": fps })))
            .await
    }

    // image

    pub async fn image_settings(&self) -> Result<ImageSettings, RequestFailure> {
        self.fetch(ApiRequest::get("/image/settings")).await
    }

    pub async fn set_image_settings(
        &self,
        settings: &ImageSettings,
    ) -> Result<Ack, RequestFailure> {
        let body = serde_json::to_value(settings).map_err(RequestFailure::decode)?;
        self.write(ApiRequest::post("/image/settings", body)).await
    }

    // streaming

    pub async fn streaming_settings(
        &self,
    ) -> Result<StreamingSettings, RequestFailure> {
        self.fetch(ApiRequest::get("/streaming/settings")).await
    }

    pub async fn set_streaming_settings(
        &self,
        settings: &StreamingSettings,
    ) -> Result<Ack, RequestFailure> {
        self.write(ApiRequest::post(
            "/streaming/settings",
            settings.write_payload(),
        ))
        .await
    }

    pub async fn status(&self) -> Result<StreamStatus, RequestFailure> {
        self.fetch(ApiRequest::get("/status")).await
    }

    pub async fn control_streaming(
        &self,
        action: StreamAction,
    ) -> Result<Ack, RequestFailure> {
        self.write(ApiRequest::post(
            "/streaming/control",
            json!({ "action": action }),
        ))
        .await
    }

    // devices

    pub async fn devices(
        &self,
        class: DeviceClass,
    ) -> Result<DeviceList, RequestFailure> {
        self.fetch(
            ApiRequest::new(Method::Get, "")
                .segment(class.segment())
                .segment("devices"),
        )
        .await
    }

    /// Asks the backend to rescan, then returns the fresh list.
    pub async fn refresh_devices(
        &self,
        class: DeviceClass,
    ) -> Result<DeviceList, RequestFailure> {
        self.fetch(
            ApiRequest::new(Method::Get, "")
                .segment(class.segment())
                .segment("devices")
                .segment("refresh"),
        )
        .await
    }

    pub async fn controls(
        &self,
        class: DeviceClass,
    ) -> Result<ControlList, RequestFailure> {
        self.fetch(
            ApiRequest::new(Method::Get, "")
                .segment(class.segment())
                .segment("controls"),
        )
        .await
    }

    pub async fn set_device(
        &self,
        class: DeviceClass,
        device: &str,
    ) -> Result<Ack, RequestFailure> {
        self.write(
            ApiRequest::new(Method::Post, "")
                .segment(class.segment())
                .segment("device")
                .with_body(json!({ "device": device })),
        )
        .await
    }

    pub async fn set_control(
        &self,
        class: DeviceClass,
        name: &str,
        value: i32,
    ) -> Result<Ack, RequestFailure> {
        self.write(
            ApiRequest::new(Method::Post, "")
                .segment(class.segment())
                .segment("control")
                .with_body(json!({ "name": name, "value": value })),
        )
        .await
    }

    // presets

    pub async fn presets(&self) -> Result<PresetList, RequestFailure> {
        self.fetch(ApiRequest::get("/presets")).await
    }

    pub async fn preset(&self, name: &str) -> Result<PresetDetail, RequestFailure> {
        self.fetch(ApiRequest::get("/presets").segment(name.to_owned()))
            .await
    }

    pub async fn create_preset(
        &self,
        name: &str,
        description: &str,
        capture_thumbnail: bool,
    ) -> Result<Ack, RequestFailure> {
        self.write(ApiRequest::post(
            "/presets",
            json!({
                "name": name,
                "description": description,
                "captureThumbnail": capture_thumbnail,
            }),
        ))
        .await
    }

    pub async fn apply_preset(&self, name: &str) -> Result<Ack, RequestFailure> {
        self.write(
            ApiRequest::new(Method::Post, "/presets")
                .segment(name.to_owned())
                .segment("apply")
                .with_body(json!({ "name": name })),
        )
        .await
    }

    pub async fn delete_preset(&self, name: &str) -> Result<Ack, RequestFailure> {
        self.write(ApiRequest::delete("/presets").segment(name.to_owned()))
            .await
    }

    // recordings

    pub async fn recording_settings(
        &self,
    ) -> Result<RecordingSettings, RequestFailure> {
        self.fetch(ApiRequest::get("/recording/settings")).await
    }

    pub async fn set_recording_settings(
        &self,
        settings: &RecordingSettings,
    ) -> Result<Ack, RequestFailure> {
        let body =
            serde_json::to_value(settings).map_err(RequestFailure::decode)?;
        self.write(ApiRequest::post("/recording/settings", body)).await
    }

    pub async fn recording_status(
        &self,
    ) -> Result<RecordingStatus, RequestFailure> {
        self.fetch(ApiRequest::get("/recording/status")).await
    }

    pub async fn control_recording(
        &self,
        action: StreamAction,
    ) -> Result<Ack, RequestFailure> {
        self.write(ApiRequest::post(
            "/recording/control",
            json!({ "action": action }),
        ))
        .await
    }

    pub async fn recordings(&self) -> Result<RecordingList, RequestFailure> {
        self.fetch(ApiRequest::get("/recordings")).await
    }

    pub async fn recording(&self, id: &str) -> Result<Recording, RequestFailure> {
        self.fetch(ApiRequest::get("/recordings").segment(id.to_owned()))
            .await
    }

    pub async fn rename_recording(
        &self,
        id: &str,
        name: &str,
    ) -> Result<Ack, RequestFailure> {
        self.write(
            ApiRequest::new(Method::Put, "/recordings")
                .segment(id.to_owned())
                .with_body(json!({ "name": name })),
        )
        .await
    }

    pub async fn delete_recording(&self, id: &str) -> Result<Ack, RequestFailure> {
        self.write(ApiRequest::delete("/recordings").segment(id.to_owned()))
            .await
    }

    // audio input

    pub async fn audio_input_sources(
        &self,
    ) -> Result<AudioInputList, RequestFailure> {
        self.fetch(ApiRequest::get("/audio/input-sources")).await
    }

    pub async fn audio_status(&self) -> Result<AudioStatus, RequestFailure> {
        self.fetch(ApiRequest::get("/audio/status")).await
    }

    pub async fn set_audio_input_source(
        &self,
        source_id: &str,
    ) -> Result<Ack, RequestFailure> {
        self.write(ApiRequest::post(
            "/audio/input-source",
            json!({ "sourceId": source_id }),
        ))
        .await
    }

    pub async fn disconnect_audio_input(&self) -> Result<Ack, RequestFailure> {
        self.write(ApiRequest::post("/audio/disconnect-input", json!({})))
            .await
    }

    // platform

    pub async fn platform(&self) -> Result<PlatformInfo, RequestFailure> {
        self.fetch(ApiRequest::get("/platform")).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::FailureReason, mock::MockTransport, types::VideoCodec};

    #[tokio::test]
    async fn apply_preset_encodes_name_and_echoes_body() {
        let client = ApiClient::new(MockTransport::new().respond_json(
            Method::Post,
            "/presets/My Preset/apply",
            &json!({ "success": true }),
        ));

        let ack = client.apply_preset("My Preset").await.unwrap();
        assert!(ack.success);

        let sent = client
            .transport()
            .requests_to(Method::Post, "/presets/My Preset/apply");
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].body, Some(json!({ "name": "My Preset" })));
    }

    #[tokio::test]
    async fn rename_recording_puts_new_name() {
        let client = ApiClient::new(MockTransport::new().respond_json(
            Method::Put,
            "/recordings/rec 01",
            &json!({ "success": true, "id": "rec 01", "name": "intro" }),
        ));

        let ack = client.rename_recording("rec 01", "intro").await.unwrap();
        assert!(ack.success);
        assert_eq!(ack.name.as_deref(), Some("intro"));

        let sent = client
            .transport()
            .requests_to(Method::Put, "/recordings/rec 01");
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].body, Some(json!({ "name": "intro" })));
    }

    #[tokio::test]
    async fn recordings_and_status_decode() {
        let client = ApiClient::new(
            MockTransport::new()
                .respond_json(
                    Method::Get,
                    "/recordings",
                    &json!({
                        "recordings": [{
                            "id": "a1", "filename": "recording_1.mp4",
                            "container": "mp4", "videoCodec": "h264",
                            "width": 1920, "height": 1080, "fps": 60,
                            "fileSize": 1024, "duration": 90_500_000u64,
                            "createdAt": "2024-05-01T10:00:00Z",
                        }],
                        "total": 1,
                    }),
                )
                .respond_json(
                    Method::Get,
                    "/recording/status",
                    &json!({
                        "isRecording": true, "duration": 5_000_000u64,
                        "fileSize": 2048, "currentFile": "recording_2.mp4",
                        "settings": { "width": 1280, "height": 720, "fps": 30, "codec": "vp9" },
                    }),
                ),
        );

        let list = client.recordings().await.unwrap();
        assert_eq!(list.recordings.len(), 1);
        assert_eq!(list.recordings[0].duration_secs(), 90);
        assert_eq!(list.recordings[0].thumbnail_path, None);

        let status = client.recording_status().await.unwrap();
        assert!(status.is_recording);
        assert_eq!(status.current_file.as_deref(), Some("recording_2.mp4"));
        assert_eq!(status.settings.unwrap().codec, "vp9");
    }

    #[tokio::test]
    async fn recording_settings_are_written_whole() {
        let client = ApiClient::new(
            MockTransport::new()
                .respond_json(
                    Method::Get,
                    "/recording/settings",
                    &json!({
                        "width": 1920, "height": 1080, "fps": 60,
                        "bitrate": 8_000_000, "audioBitrate": 256_000,
                        "codec": "h265", "audioCodec": "aac",
                        "container": "mkv", "includeAudio": false,
                    }),
                )
                .respond_json(
                    Method::Post,
                    "/recording/settings",
                    &json!({ "success": true }),
                ),
        );

        let mut settings = client.recording_settings().await.unwrap();
        assert_eq!(settings.codec, VideoCodec::H265);
        assert!(!settings.include_audio);

        settings.container = "mp4".into();
        client.set_recording_settings(&settings).await.unwrap();

        let sent = client
            .transport()
            .requests_to(Method::Post, "/recording/settings");
        let body = sent[0].body.as_ref().unwrap();
        assert_eq!(body["container"], "mp4");
        assert_eq!(body["codec"], "h265");
        assert_eq!(body["includeAudio"], false);
        assert_eq!(body["filenameTemplate"], "");
    }

    #[tokio::test]
    async fn audio_input_selection() {
        let client = ApiClient::new(
            MockTransport::new()
                .respond_json(
                    Method::Get,
                    "/audio/input-sources",
                    &json!({ "sources": [
                        { "id": "alsa_input.usb", "name": "USB Capture", "description": "" },
                    ]}),
                )
                .respond_json(
                    Method::Post,
                    "/audio/input-source",
                    &json!({ "success": true }),
                )
                .respond_json(
                    Method::Post,
                    "/audio/disconnect-input",
                    &json!({ "success": true }),
                ),
        );

        let list = client.audio_input_sources().await.unwrap();
        assert_eq!(list.sources[0].name, "USB Capture");

        client.set_audio_input_source("alsa_input.usb").await.unwrap();
        client.disconnect_audio_input().await.unwrap();

        let sent = client.transport().requests();
        assert_eq!(sent[1].body, Some(json!({ "sourceId": "alsa_input.usb" })));
        assert_eq!(sent[2].path(), "/audio/disconnect-input");
    }

    #[tokio::test]
    async fn cooldown_response_becomes_typed_failure() {
        let client = ApiClient::new(MockTransport::new().respond(
            Method::Post,
            "/streaming/control",
            429,
            r#"{"success": false, "message": "wait", "cooldownRemainingMs": 3000}"#,
        ));

        let err = client
            .control_streaming(StreamAction::Start)
            .await
            .unwrap_err();
        assert_eq!(err.message, "wait");
        assert_eq!(err.reason, FailureReason::Cooldown { remaining_ms: 3000 });
    }

    #[tokio::test]
    async fn text_bodies_are_kept() {
        let client = ApiClient::new(MockTransport::new().respond(
            Method::Get,
            "/status",
            200,
            "ok",
        ));

        let response = client.request(ApiRequest::get("/status")).await.unwrap();
        assert_eq!(response, ApiResponse::Text("ok".into()));

        let err = client.status().await.unwrap_err();
        assert_eq!(err.reason, FailureReason::Decode);
    }

    #[tokio::test]
    async fn transport_errors_are_mapped() {
        let client = ApiClient::new(MockTransport::new().fail(
            Method::Get,
            "/platform",
            "connection refused",
        ));

        let err = client.platform().await.unwrap_err();
        assert_eq!(err.reason, FailureReason::Transport);
        assert_eq!(err.status, None);
        assert!(err.message.contains("connection refused"));
    }

    #[tokio::test]
    async fn device_routes_follow_class() {
        let client = ApiClient::new(
            MockTransport::new()
                .respond_json(
                    Method::Get,
                    "/ds/devices/refresh",
                    &json!({ "devices": [{ "id": "a", "name": "Cam" }] }),
                )
                .respond_json(
                    Method::Post,
                    "/v4l2/control",
                    &json!({ "success": true }),
                ),
        );

        let list = client.refresh_devices(DeviceClass::DirectShow).await.unwrap();
        assert_eq!(list.devices[0].name, "Cam");

        client
            .set_control(DeviceClass::V4l2, "Brightness", 12)
            .await
            .unwrap();
        let sent = client.transport().requests_to(Method::Post, "/v4l2/control");
        assert_eq!(sent[0].body, Some(json!({ "name": "Brightness", "value": 12 })));
    }

    #[tokio::test]
    async fn source_body_carries_optional_device() {
        let client = ApiClient::new(MockTransport::new().respond_json(
            Method::Post,
            "/source",
            &json!({ "success": true }),
        ));

        client.set_source(SourceType::V4l2, None).await.unwrap();
        client
            .set_source(SourceType::V4l2, Some("/dev/video0"))
            .await
            .unwrap();

        let sent = client.transport().requests_to(Method::Post, "/source");
        assert_eq!(sent[0].body, Some(json!({ "type": 1 })));
        assert_eq!(
            sent[1].body,
            Some(json!({ "type": 1, "device": "/dev/video0" }))
        );
    }
}
