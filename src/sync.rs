use std::{fmt, sync::Arc};

use async_channel::{Receiver, Sender};
use capdeck_api::{
    ApiClient, RequestFailure, Transport,
    types::{
        DeviceClass, ImageSettings, SourceType, StreamAction, StreamStatus,
        StreamingSettings,
    },
};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    constants::{DEBOUNCE_DELAY, POLL_INTERVAL, STATUS_SETTLE},
    debounce::Debouncer,
    notice::NoticeBoard,
    platform,
    state::{CaptureSettings, DeviceState, Section, StateStore, Ticket},
};

/// Controls whose edits are coalesced under one timer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WriteGroup {
    Image,
    Capture,
    Streaming,
    Control(String),
    ShaderParameter(String),
}

impl fmt::Display for WriteGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteGroup::Image => f.write_str("image settings"),
            WriteGroup::Capture => f.write_str("capture settings"),
            WriteGroup::Streaming => f.write_str("streaming settings"),
            WriteGroup::Control(name) => write!(f, "control {name}"),
            WriteGroup::ShaderParameter(name) => write!(f, "parameter {name}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Started,
    Stopped,
    /// Start refused locally while the cooldown runs.
    Refused { remaining_secs: u64 },
    /// A previous toggle is still settling.
    Busy,
    Failed,
}

fn log_failure(what: &str, result: Result<(), RequestFailure>) {
    if let Err(e) = result {
        debug!("loading {what} failed: {e}");
    }
}

/// Keeps [`StateStore`] in step with the appliance: polls status, runs full
/// refreshes and pushes debounced edits.
pub struct Synchronizer<T> {
    client: ApiClient<T>,
    store: StateStore,
    notices: NoticeBoard,
    debouncer: Debouncer<WriteGroup>,
    user_agent: Arc<str>,
    changed: Sender<Section>,
    updates: Receiver<Section>,
}

impl<T> Clone for Synchronizer<T> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            store: self.store.clone(),
            notices: self.notices.clone(),
            debouncer: self.debouncer.clone(),
            user_agent: Arc::clone(&self.user_agent),
            changed: self.changed.clone(),
            updates: self.updates.clone(),
        }
    }
}

impl<T: Transport> Synchronizer<T> {
    pub fn new(
        client: ApiClient<T>,
        store: StateStore,
        notices: NoticeBoard,
        user_agent: &str,
    ) -> Self {
        let (changed, updates) = async_channel::unbounded();
        Self {
            client,
            store,
            notices,
            debouncer: Debouncer::new(DEBOUNCE_DELAY),
            user_agent: Arc::from(user_agent),
            changed,
            updates,
        }
    }

    pub fn client(&self) -> &ApiClient<T> {
        &self.client
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn notices(&self) -> &NoticeBoard {
        &self.notices
    }

    pub fn debouncer(&self) -> &Debouncer<WriteGroup> {
        &self.debouncer
    }

    /// Sections whose data changed, in order.
    pub fn updates(&self) -> Receiver<Section> {
        self.updates.clone()
    }

    fn changed(&self, section: Section) {
        let _ = self.changed.try_send(section);
    }

    fn apply(
        &self,
        section: Section,
        ticket: Ticket,
        f: impl FnOnce(&mut DeviceState),
    ) {
        if self.store.apply(section, ticket, f) {
            self.changed(section);
        } else {
            debug!("dropping stale {section:?} answer");
        }
    }

    // loading

    /// Full refresh in dependency order. Failures are logged and the next
    /// step still runs.
    #[tracing::instrument(level = "debug", skip_all)]
    pub async fn load_all(&self) {
        self.refresh_platform().await;
        log_failure("status", self.refresh_status().await);
        log_failure("source", self.refresh_source().await);
        log_failure("shader list", self.refresh_shader_list().await);
        log_failure("shader", self.refresh_shader().await);
        log_failure("image", self.refresh_image().await);
        log_failure("streaming", self.refresh_streaming().await);
        log_failure("presets", self.refresh_presets().await);
    }

    pub async fn refresh_platform(&self) {
        let ticket = self.store.ticket();
        let platform = match self.client.platform().await {
            Ok(platform) => platform,
            Err(e) => {
                let guess = platform::from_user_agent(&self.user_agent);
                info!("platform unavailable ({e}), assuming {}", guess.platform);
                guess
            }
        };
        self.apply(Section::Platform, ticket, |s| s.platform = platform);
    }

    pub async fn refresh_status(&self) -> Result<(), RequestFailure> {
        let ticket = self.store.ticket();
        let status = self.client.status().await?;
        self.apply(Section::Status, ticket, |s| s.status = status);
        Ok(())
    }

    pub async fn refresh_source(&self) -> Result<(), RequestFailure> {
        let ticket = self.store.ticket();
        let source = self.client.source().await?;
        let class = source.kind.device_class();
        let has_device = !source.device.is_empty();
        self.apply(Section::Source, ticket, |s| s.source = source);

        if let Some(class) = class {
            log_failure("devices", self.refresh_devices(class, false).await);
            if class == DeviceClass::V4l2 {
                log_failure("controls", self.refresh_controls().await);
            }
            if has_device {
                log_failure("capture", self.refresh_capture().await);
            }
        }
        Ok(())
    }

    /// Reloads one device list. With `rescan` the appliance rescans the
    /// hardware again before answering.
    pub async fn refresh_devices(
        &self,
        class: DeviceClass,
        rescan: bool,
    ) -> Result<(), RequestFailure> {
        let ticket = self.store.ticket();
        let list = if rescan {
            self.client.refresh_devices(class).await?
        } else {
            self.client.devices(class).await?
        };
        self.apply(Section::Devices, ticket, |s| {
            s.device_lists.insert(class, list.devices);
        });
        Ok(())
    }

    pub async fn refresh_controls(&self) -> Result<(), RequestFailure> {
        let ticket = self.store.ticket();
        let controls = self.client.controls(DeviceClass::V4l2).await?;
        self.apply(Section::Controls, ticket, |s| {
            s.controls = controls.controls;
        });
        Ok(())
    }

    pub async fn refresh_capture(&self) -> Result<(), RequestFailure> {
        let ticket = self.store.ticket();
        let resolution = self.client.capture_resolution().await?;
        let fps = self.client.capture_fps().await?;
        self.apply(Section::Capture, ticket, |s| {
            s.capture = CaptureSettings {
                width: resolution.width,
                height: resolution.height,
                fps: fps.fps,
            };
        });
        Ok(())
    }

    pub async fn refresh_shader_list(&self) -> Result<(), RequestFailure> {
        let ticket = self.store.ticket();
        let list = self.client.shader_list().await?;
        self.apply(Section::Shader, ticket, |s| s.shaders = list.shaders);
        Ok(())
    }

    /// Active shader, then its parameters.
    pub async fn refresh_shader(&self) -> Result<(), RequestFailure> {
        let ticket = self.store.ticket();
        let shader = self.client.shader().await?;
        self.apply(Section::Shader, ticket, |s| s.shader = shader.name);
        self.refresh_shader_parameters().await
    }

    pub async fn refresh_shader_parameters(&self) -> Result<(), RequestFailure> {
        let ticket = self.store.ticket();
        let params = self.client.shader_parameters().await?;
        self.apply(Section::ShaderParameters, ticket, |s| {
            s.shader_parameters = params.parameters;
        });
        Ok(())
    }

    pub async fn refresh_image(&self) -> Result<(), RequestFailure> {
        let ticket = self.store.ticket();
        let image = self.client.image_settings().await?;
        self.apply(Section::Image, ticket, |s| s.image = image);
        Ok(())
    }

    pub async fn refresh_streaming(&self) -> Result<(), RequestFailure> {
        let ticket = self.store.ticket();
        let streaming = self.client.streaming_settings().await?;
        self.apply(Section::Streaming, ticket, |s| s.streaming = streaming);
        Ok(())
    }

    pub async fn refresh_presets(&self) -> Result<(), RequestFailure> {
        let ticket = self.store.ticket();
        let list = self.client.presets().await?;
        self.apply(Section::Presets, ticket, |s| s.presets = list.presets);
        Ok(())
    }

    /// Polls status every [`POLL_INTERVAL`] until `shutdown` fires.
    pub async fn run_poller(&self, shutdown: CancellationToken) {
        let mut interval = tokio::time::interval(POLL_INTERVAL);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval.tick().await;

        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                _ = interval.tick() => {
                    if let Err(e) = self.refresh_status().await {
                        debug!("status poll failed: {e}");
                    }
                }
            }
        }
    }

    // debounced edits

    fn write_failed(&self, group: &WriteGroup, e: &RequestFailure) {
        self.notices
            .danger(format!("Failed to update {group}: {}", e.message));
    }

    fn schedule(&self, group: WriteGroup) {
        let this = self.clone();
        let key = group.clone();
        self.debouncer
            .arm(key, async move { this.flush(group).await });
    }

    /// Sends the current value of `group` to the appliance.
    pub async fn flush(&self, group: WriteGroup) {
        let result = match &group {
            WriteGroup::Image => {
                let image = self.store.read(|s| s.image.clone());
                self.client.set_image_settings(&image).await.map(drop)
            }
            WriteGroup::Capture => self.flush_capture().await,
            WriteGroup::Streaming => {
                let streaming = self.store.read(|s| s.streaming.clone());
                self.client
                    .set_streaming_settings(&streaming)
                    .await
                    .map(drop)
            }
            WriteGroup::Control(name) => {
                let value =
                    self.store.read(|s| s.control(name).map(|c| c.value));
                match value {
                    Some(value) => self
                        .client
                        .set_control(DeviceClass::V4l2, name, value)
                        .await
                        .map(drop),
                    None => Ok(()),
                }
            }
            WriteGroup::ShaderParameter(name) => {
                let value = self
                    .store
                    .read(|s| s.shader_parameter(name).map(|p| p.value));
                match value {
                    Some(value) => self
                        .client
                        .set_shader_parameter(name, value)
                        .await
                        .map(drop),
                    None => Ok(()),
                }
            }
        };

        let Err(e) = result else {
            debug!("flushed {group}");
            return;
        };

        warn!("writing {group} failed: {e}");
        self.write_failed(&group, &e);

        let resync = match group {
            WriteGroup::Image => self.refresh_image().await,
            WriteGroup::Capture => self.refresh_capture().await,
            WriteGroup::Streaming => self.refresh_streaming().await,
            WriteGroup::Control(_) => self.refresh_controls().await,
            WriteGroup::ShaderParameter(_) => {
                self.refresh_shader_parameters().await
            }
        };
        log_failure("resync", resync);
    }

    async fn flush_capture(&self) -> Result<(), RequestFailure> {
        let capture = self.store.read(|s| s.capture);
        if capture.width > 0 && capture.height > 0 {
            self.client
                .set_capture_resolution(capture.width, capture.height)
                .await?;
        }
        if capture.fps > 0 {
            self.client.set_capture_fps(capture.fps).await?;
        }
        Ok(())
    }

    /// Sends every write still waiting out its debounce window.
    pub async fn flush_pending(&self) {
        for group in self.debouncer.take_pending() {
            self.flush(group).await;
        }
    }

    pub fn edit_image(&self, f: impl FnOnce(&mut ImageSettings)) {
        self.store.edit(Section::Image, |s| f(&mut s.image));
        self.schedule(WriteGroup::Image);
    }

    pub fn edit_capture(&self, f: impl FnOnce(&mut CaptureSettings)) {
        self.store.edit(Section::Capture, |s| f(&mut s.capture));
        self.schedule(WriteGroup::Capture);
    }

    pub fn edit_streaming(&self, f: impl FnOnce(&mut StreamingSettings)) {
        self.store.edit(Section::Streaming, |s| f(&mut s.streaming));
        self.schedule(WriteGroup::Streaming);
    }

    /// Returns false for a control the device does not have.
    pub fn edit_control(&self, name: &str, value: i32) -> bool {
        let known = self.store.try_edit(Section::Controls, |s| {
            s.controls
                .iter_mut()
                .find(|c| c.name == name)
                .map(|c| c.value = value)
                .is_some()
        });
        if known {
            self.schedule(WriteGroup::Control(name.to_owned()));
        }
        known
    }

    /// Values are sent as given, the appliance owns the range check.
    pub fn edit_shader_parameter(&self, name: &str, value: f64) -> bool {
        let known = self.store.try_edit(Section::ShaderParameters, |s| {
            s.shader_parameters
                .iter_mut()
                .find(|p| p.name == name)
                .map(|p| p.value = value)
                .is_some()
        });
        if known {
            self.schedule(WriteGroup::ShaderParameter(name.to_owned()));
        }
        known
    }

    // immediate actions

    pub async fn select_shader(&self, name: &str) {
        let name = name.trim();
        self.store.edit(Section::Shader, |s| s.shader = name.to_owned());

        if let Err(e) = self.client.set_shader(name).await {
            warn!("selecting shader {name:?} failed: {e}");
            self.notices
                .danger(format!("Failed to select shader: {}", e.message));
        }
        log_failure("shader", self.refresh_shader().await);
    }

    pub async fn select_source_type(&self, kind: SourceType) {
        self.store.edit(Section::Source, |s| s.source.kind = kind);

        match self.client.set_source(kind, None).await {
            Ok(_) => self.load_all().await,
            Err(e) => {
                self.notices
                    .danger(format!("Failed to change source: {}", e.message));
                log_failure("source", self.refresh_source().await);
            }
        }
    }

    pub async fn select_device(&self, device: &str) {
        let Some(class) = self.store.read(|s| s.source.kind.device_class())
        else {
            self.notices.warning("Select a source type first");
            return;
        };

        self.store
            .edit(Section::Source, |s| s.source.device = device.to_owned());

        match self.client.set_device(class, device).await {
            Ok(_) => {
                self.notices.success(format!("{class} device updated"));
                self.load_all().await;
            }
            Err(e) => {
                self.notices
                    .danger(format!("Failed to select device: {}", e.message));
                log_failure("source", self.refresh_source().await);
            }
        }
    }

    /// Rescans devices of the active source type.
    pub async fn rescan_devices(&self) {
        let Some(class) = self.store.read(|s| s.source.kind.device_class())
        else {
            return;
        };
        match self.refresh_devices(class, true).await {
            Ok(()) => {
                self.notices.success(format!("{class} device list updated"));
            }
            Err(e) => {
                self.notices
                    .danger(format!("Failed to refresh devices: {}", e.message));
            }
        }
    }

    /// Starts streaming when it is stopped and stops it when it runs.
    ///
    /// The transition is claimed before the status check, so a second
    /// toggle arriving while the first is still talking to the appliance
    /// answers [`ToggleOutcome::Busy`].
    #[tracing::instrument(level = "debug", skip_all)]
    pub async fn toggle_streaming(&self) -> ToggleOutcome {
        if !self.store.begin_transition() {
            return ToggleOutcome::Busy;
        }
        self.changed(Section::Status);

        let outcome = self.toggle_claimed().await;

        self.store.end_transition();
        self.changed(Section::Status);
        outcome
    }

    async fn toggle_claimed(&self) -> ToggleOutcome {
        let ticket = self.store.ticket();
        let status = match self.client.status().await {
            Ok(status) => {
                let fresh = status.clone();
                self.apply(Section::Status, ticket, |s| s.status = fresh);
                status
            }
            Err(e) => {
                self.notices
                    .danger(format!("Failed to toggle streaming: {}", e.message));
                return ToggleOutcome::Failed;
            }
        };

        let action = if status.streaming_active {
            StreamAction::Stop
        } else {
            StreamAction::Start
        };

        if action == StreamAction::Start && !status.can_start {
            return self.refuse_start(&status).await;
        }

        let outcome = self.send_control(action).await;
        log_failure("status", self.refresh_status().await);
        outcome
    }

    async fn refuse_start(&self, status: &StreamStatus) -> ToggleOutcome {
        let remaining_secs = status.cooldown_secs();
        self.notices.warning(format!(
            "Streaming is still cooling down. Wait {remaining_secs} seconds before starting again."
        ));
        log_failure("status", self.refresh_status().await);
        ToggleOutcome::Refused { remaining_secs }
    }

    async fn send_control(&self, action: StreamAction) -> ToggleOutcome {
        let verb = match action {
            StreamAction::Start => "start",
            StreamAction::Stop => "stop",
        };

        match self.client.control_streaming(action).await {
            Ok(ack) if ack.success => {
                info!("streaming {verb} accepted");
                tokio::time::sleep(STATUS_SETTLE).await;
                match action {
                    StreamAction::Start => ToggleOutcome::Started,
                    StreamAction::Stop => ToggleOutcome::Stopped,
                }
            }
            Ok(ack) => {
                let message = ack
                    .message
                    .unwrap_or_else(|| format!("Failed to {verb} streaming"));
                self.notices.danger(message);
                ToggleOutcome::Failed
            }
            Err(e) if e.is_cooldown() => {
                self.notices.warning(e.message);
                ToggleOutcome::Failed
            }
            Err(e) => {
                self.notices
                    .danger(format!("Failed to {verb} streaming: {}", e.message));
                ToggleOutcome::Failed
            }
        }
    }
}
