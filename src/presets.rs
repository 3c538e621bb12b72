use capdeck_api::{
    Transport,
    types::{PresetDetail, PresetSummary},
};
use itertools::Itertools;
use tracing::info;

use crate::sync::Synchronizer;

/// Human-readable lines for a stored preset.
pub fn describe(detail: &PresetDetail) -> Vec<String> {
    let summary = &detail.summary;
    let mut lines = vec![if summary.description.is_empty() {
        summary.title().to_owned()
    } else {
        format!("{} - {}", summary.title(), summary.description)
    }];

    if let Some(shader) = &detail.shader {
        let parameters = shader
            .parameters
            .iter()
            .map(|(name, value)| format!("{name}={value:.2}"))
            .join(", ");
        if parameters.is_empty() {
            lines.push(format!("shader: {}", shader.path));
        } else {
            lines.push(format!("shader: {} ({parameters})", shader.path));
        }
    }
    if let Some(capture) = &detail.capture {
        lines.push(format!(
            "capture: {}x{} @ {} fps",
            capture.width, capture.height, capture.fps
        ));
    }
    if let Some(image) = &detail.image {
        lines.push(format!(
            "image: brightness {:.2}, contrast {:.2}, aspect {}",
            image.brightness,
            image.contrast,
            if image.maintain_aspect { "kept" } else { "stretched" }
        ));
    }
    lines
}

/// Named configuration snapshots stored on the appliance.
///
/// Every failure ends up as a notice; the return values only say whether the
/// operation went through.
pub struct PresetManager<T> {
    sync: Synchronizer<T>,
}

impl<T> Clone for PresetManager<T> {
    fn clone(&self) -> Self {
        Self {
            sync: self.sync.clone(),
        }
    }
}

impl<T: Transport> PresetManager<T> {
    pub fn new(sync: Synchronizer<T>) -> Self {
        Self { sync }
    }

    pub async fn list(&self) -> Vec<PresetSummary> {
        if let Err(e) = self.sync.refresh_presets().await {
            self.sync
                .notices()
                .danger(format!("Failed to load presets: {}", e.message));
        }
        self.sync.store().read(|s| s.presets.clone())
    }

    pub async fn detail(&self, name: &str) -> Option<PresetDetail> {
        match self.sync.client().preset(name).await {
            Ok(detail) => Some(detail),
            Err(e) => {
                self.sync
                    .notices()
                    .danger(format!("Failed to load preset: {}", e.message));
                None
            }
        }
    }

    pub async fn create(
        &self,
        name: &str,
        description: &str,
        capture_thumbnail: bool,
    ) -> bool {
        let name = name.trim();
        if name.is_empty() {
            self.sync.notices().warning("Enter a name for the preset");
            return false;
        }

        match self
            .sync
            .client()
            .create_preset(name, description.trim(), capture_thumbnail)
            .await
        {
            Ok(_) => {
                info!("created preset {name:?}");
                self.sync
                    .notices()
                    .success(format!("Preset \"{name}\" created"));
                self.list().await;
                true
            }
            Err(e) => {
                self.sync
                    .notices()
                    .danger(format!("Failed to create preset: {}", e.message));
                false
            }
        }
    }

    /// Applies `name` and reloads everything it may have touched.
    pub async fn apply(&self, name: &str) -> bool {
        match self.sync.client().apply_preset(name).await {
            Ok(_) => {
                self.sync
                    .notices()
                    .success(format!("Preset \"{name}\" applied"));
                self.sync.load_all().await;
                true
            }
            Err(e) => {
                self.sync
                    .notices()
                    .danger(format!("Failed to apply preset: {}", e.message));
                false
            }
        }
    }

    /// Deletes `name` if `confirm` agrees.
    pub async fn delete(
        &self,
        name: &str,
        confirm: impl FnOnce(&str) -> bool,
    ) -> bool {
        if !confirm(name) {
            return false;
        }

        match self.sync.client().delete_preset(name).await {
            Ok(_) => {
                self.sync
                    .notices()
                    .success(format!("Preset \"{name}\" deleted"));
                self.list().await;
                true
            }
            Err(e) => {
                self.sync
                    .notices()
                    .danger(format!("Failed to delete preset: {}", e.message));
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use capdeck_api::{Method, mock::MockTransport};
    use serde_json::json;

    use super::*;
    use crate::{
        notice::NoticeLevel,
        sync::tests::{backend, synchronizer},
    };

    fn manager(mock: MockTransport) -> PresetManager<MockTransport> {
        PresetManager::new(synchronizer(mock))
    }

    fn mock(presets: &PresetManager<MockTransport>) -> &MockTransport {
        presets.sync.client().transport()
    }

    #[tokio::test(start_paused = true)]
    async fn detail_is_described() {
        let presets = manager(backend().respond_json(
            Method::Get,
            "/presets/crt",
            &json!({
                "name": "crt",
                "displayName": "CRT",
                "description": "warm",
                "shader": { "path": "crt.glsl", "parameters": { "curvature": 0.3 } },
                "capture": { "width": 1280, "height": 720, "fps": 30, "sourceType": 1 },
            }),
        ));

        let detail = presets.detail("crt").await.unwrap();

        assert_eq!(
            describe(&detail),
            vec![
                "CRT - warm",
                "shader: crt.glsl (curvature=0.30)",
                "capture: 1280x720 @ 30 fps",
            ]
        );
        assert!(presets.detail("gone").await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn blank_name_is_rejected_locally() {
        let presets = manager(backend());

        assert!(!presets.create("   ", "", true).await);

        assert!(mock(&presets).requests().is_empty());
        let live = presets.sync.notices().live();
        assert_eq!(live[0].level, NoticeLevel::Warning);
    }

    #[tokio::test(start_paused = true)]
    async fn create_sends_trimmed_name_and_reloads() {
        let presets = manager(
            backend().respond_json(
                Method::Post,
                "/presets",
                &json!({ "success": true }),
            ),
        );

        assert!(presets.create("  Retro  ", " scanlines ", false).await);

        let sent = mock(&presets).requests_to(Method::Post, "/presets");
        assert_eq!(
            sent[0].body,
            Some(json!({
                "name": "Retro",
                "description": "scanlines",
                "captureThumbnail": false,
            }))
        );
        assert_eq!(mock(&presets).requests_to(Method::Get, "/presets").len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn applying_twice_gives_same_state() {
        let presets = manager(backend().respond_json(
            Method::Post,
            "/presets/crt/apply",
            &json!({ "success": true }),
        ));

        assert!(presets.apply("crt").await);
        let first = presets.sync.store().snapshot();
        assert!(presets.apply("crt").await);
        let second = presets.sync.store().snapshot();

        assert_eq!(first, second);
        assert_eq!(first.shader, "crt.glsl");
        assert_eq!(
            mock(&presets)
                .requests_to(Method::Post, "/presets/crt/apply")
                .len(),
            2
        );
    }

    #[tokio::test(start_paused = true)]
    async fn delete_needs_confirmation() {
        let presets = manager(backend().respond_json(
            Method::Delete,
            "/presets/crt",
            &json!({ "success": true }),
        ));

        assert!(!presets.delete("crt", |_| false).await);
        assert!(mock(&presets).requests().is_empty());

        assert!(presets.delete("crt", |name| name == "crt").await);
        assert_eq!(
            mock(&presets).requests_to(Method::Delete, "/presets/crt").len(),
            1
        );
    }

    #[tokio::test(start_paused = true)]
    async fn failures_become_notices() {
        let presets = manager(backend());

        // no route scripted, the mock answers 404
        assert!(!presets.apply("gone").await);

        let live = presets.sync.notices().live();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].level, NoticeLevel::Danger);
        assert!(live[0].message.contains("Not found: /presets/gone/apply"));
    }
}
