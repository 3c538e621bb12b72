//! The panel's view of the appliance.
//!
//! [`StateStore`] is the only owner of [`DeviceState`]. Local edits and poll
//! results both go through it so that a poll answer never clobbers an edit
//! the user made while that poll was in flight.

use std::sync::Arc;

use capdeck_api::types::{
    CaptureDevice, DeviceClass, DeviceControl, ImageSettings, PlatformInfo,
    PresetSummary, ShaderParameter, SourceInfo, StreamStatus,
    StreamingSettings,
};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CaptureSettings {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeviceState {
    pub platform: PlatformInfo,
    pub source: SourceInfo,
    pub shader: String,
    pub shaders: Vec<String>,
    pub shader_parameters: Vec<ShaderParameter>,
    pub capture: CaptureSettings,
    pub image: ImageSettings,
    pub streaming: StreamingSettings,
    pub device_lists: FxHashMap<DeviceClass, Vec<CaptureDevice>>,
    pub controls: Vec<DeviceControl>,
    pub status: StreamStatus,
    pub presets: Vec<PresetSummary>,
    /// A start/stop request is in flight.
    pub transitioning: bool,
}

impl DeviceState {
    pub fn devices_for_source(&self) -> &[CaptureDevice] {
        self.source
            .kind
            .device_class()
            .and_then(|class| self.device_lists.get(&class))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn has_device(&self) -> bool {
        self.source.kind.device_class().is_some() && !self.source.device.is_empty()
    }

    pub fn shader_parameter(&self, name: &str) -> Option<&ShaderParameter> {
        self.shader_parameters.iter().find(|p| p.name == name)
    }

    pub fn control(&self, name: &str) -> Option<&DeviceControl> {
        self.controls.iter().find(|c| c.name == name)
    }
}

/// Independently refreshed parts of [`DeviceState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Platform,
    Source,
    Devices,
    Controls,
    Capture,
    Shader,
    ShaderParameters,
    Image,
    Streaming,
    Status,
    Presets,
}

/// Edit sequence value observed when a fetch started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

#[derive(Debug, Default)]
struct Inner {
    state: DeviceState,
    edit_seq: u64,
    edits: FxHashMap<Section, u64>,
}

impl Inner {
    fn stamp(&mut self, section: Section) {
        self.edit_seq += 1;
        self.edits.insert(section, self.edit_seq);
    }
}

#[derive(Debug, Clone, Default)]
pub struct StateStore {
    inner: Arc<Mutex<Inner>>,
}

#[profiling::all_functions]
impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> DeviceState {
        self.inner.lock().state.clone()
    }

    pub fn read<R>(&self, f: impl FnOnce(&DeviceState) -> R) -> R {
        f(&self.inner.lock().state)
    }

    /// Records a local edit of `section` and applies it.
    pub fn edit<R>(
        &self,
        section: Section,
        f: impl FnOnce(&mut DeviceState) -> R,
    ) -> R {
        let mut inner = self.inner.lock();
        inner.stamp(section);
        f(&mut inner.state)
    }

    /// Like [`StateStore::edit`], but `f` reports whether it changed
    /// anything and `section` is only stamped when it did.
    pub fn try_edit(
        &self,
        section: Section,
        f: impl FnOnce(&mut DeviceState) -> bool,
    ) -> bool {
        let mut inner = self.inner.lock();
        let edited = f(&mut inner.state);
        if edited {
            inner.stamp(section);
        }
        edited
    }

    /// Take before issuing a fetch, hand back to [`StateStore::apply`].
    pub fn ticket(&self) -> Ticket {
        Ticket(self.inner.lock().edit_seq)
    }

    /// Applies fetched data unless `section` was edited after `ticket` was
    /// taken. Returns whether the data was applied.
    pub fn apply(
        &self,
        section: Section,
        ticket: Ticket,
        f: impl FnOnce(&mut DeviceState),
    ) -> bool {
        let mut inner = self.inner.lock();
        let edited_after = inner
            .edits
            .get(&section)
            .is_some_and(|&seq| seq > ticket.0);
        if edited_after {
            return false;
        }
        f(&mut inner.state);
        true
    }

    pub fn transitioning(&self) -> bool {
        self.inner.lock().state.transitioning
    }

    /// Marks a start/stop as in flight. Returns false when one already is.
    pub fn begin_transition(&self) -> bool {
        let mut inner = self.inner.lock();
        if inner.state.transitioning {
            return false;
        }
        inner.state.transitioning = true;
        true
    }

    pub fn end_transition(&self) {
        self.inner.lock().state.transitioning = false;
    }
}
