//! Projection of [`DeviceState`] onto a widget surface and back.
//!
//! Views never talk to the network. `synchronize` writes widget attributes
//! from state; `read` turns a changed widget value into an [`Edit`] that the
//! panel hands to the synchronizer. Widgets a surface does not have are
//! skipped.

use capdeck_api::types::{ImageSettings, SourceType, StreamingSettings};
use itertools::Itertools;
use rustc_hash::FxHashSet;

use crate::state::{CaptureSettings, DeviceState, Section};

pub mod controls;
pub mod image;
pub mod presets;
pub mod shader;
pub mod source;
pub mod status;
pub mod streaming;
pub mod surface;

pub use surface::MemorySurface;

#[derive(Debug, Clone, PartialEq)]
pub enum WidgetValue {
    Text(String),
    Number(f64),
    Flag(bool),
}

impl WidgetValue {
    pub fn as_number(&self) -> Option<f64> {
        let n = match self {
            WidgetValue::Number(n) => Some(*n),
            WidgetValue::Text(t) => t.trim().parse().ok(),
            WidgetValue::Flag(_) => None,
        };
        n.filter(|n: &f64| n.is_finite())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            WidgetValue::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            WidgetValue::Flag(f) => Some(*f),
            WidgetValue::Text(t) => match t.trim().to_ascii_lowercase().as_str() {
                "on" | "true" | "yes" | "1" => Some(true),
                "off" | "false" | "no" | "0" => Some(false),
                _ => None,
            },
            WidgetValue::Number(n) => Some(*n != 0.0),
        }
    }

    /// Reads raw user input with the same shape as `current`.
    pub fn parse_like(current: Option<&WidgetValue>, raw: &str) -> WidgetValue {
        let raw = raw.trim();
        match current {
            Some(WidgetValue::Number(_)) => raw
                .parse()
                .map_or_else(|_| WidgetValue::Text(raw.to_owned()), WidgetValue::Number),
            Some(WidgetValue::Flag(_)) => WidgetValue::Text(raw.to_owned())
                .as_flag()
                .map_or_else(|| WidgetValue::Text(raw.to_owned()), WidgetValue::Flag),
            _ => WidgetValue::Text(raw.to_owned()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Range {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// Whatever shows the panel. Every setter ignores ids it does not know.
pub trait WidgetSurface {
    fn has(&self, id: &str) -> bool;
    fn value(&self, id: &str) -> Option<&WidgetValue>;
    fn set_value(&mut self, id: &str, value: WidgetValue);
    fn set_label(&mut self, id: &str, label: &str);
    fn set_visible(&mut self, id: &str, visible: bool);
    fn set_enabled(&mut self, id: &str, enabled: bool);
    fn set_range(&mut self, id: &str, range: Range);
    fn set_options(&mut self, id: &str, options: Vec<SelectOption>);
    /// Rebuilds the children of container `parent`. Returns false when the
    /// container does not exist.
    fn replace_children(&mut self, parent: &str, children: &[String]) -> bool;
}

/// A pending change produced from a widget.
#[derive(Debug, Clone, PartialEq)]
pub enum Edit {
    SourceType(SourceType),
    Device(String),
    RescanDevices,
    Capture(CaptureSettings),
    Control { name: String, value: i32 },
    Shader(String),
    ShaderParameter { name: String, value: f64 },
    Image(ImageSettings),
    Streaming(StreamingSettings),
    ToggleStreaming,
    ApplyPreset(String),
}

pub trait ViewTrait {
    /// State sections this view renders.
    fn sections(&self) -> &'static [Section];

    /// Static widget ids this view writes to.
    fn widgets(&self) -> Vec<String>;

    fn synchronize(&mut self, state: &DeviceState, surface: &mut dyn WidgetSurface);

    fn read(
        &self,
        id: &str,
        value: &WidgetValue,
        state: &DeviceState,
    ) -> Option<Edit>;
}

pub type View = Box<dyn ViewTrait + Send>;

/// Lowercase, with runs of anything but ASCII alphanumerics turned into `-`.
fn slug(name: &str) -> String {
    name.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(str::to_ascii_lowercase)
        .join("-")
}

/// Ids for a dynamic list of children, in list order. Names that slug the
/// same get `-2`, `-3` and so on, so every entry keeps its own widget.
pub fn child_ids<'a>(
    prefix: &str,
    names: impl IntoIterator<Item = &'a str>,
) -> Vec<String> {
    let mut taken = FxHashSet::default();
    names
        .into_iter()
        .map(|name| {
            let base = format!("{prefix}{}", slug(name));
            let mut id = base.clone();
            let mut n = 1;
            while !taken.insert(id.clone()) {
                n += 1;
                id = format!("{base}-{n}");
            }
            id
        })
        .collect()
}

/// Index of `id` among the [`child_ids`] of `names`.
pub fn child_index<'a>(
    prefix: &str,
    names: impl IntoIterator<Item = &'a str>,
    id: &str,
) -> Option<usize> {
    if !id.starts_with(prefix) {
        return None;
    }
    child_ids(prefix, names).iter().position(|child| child == id)
}

pub struct Views {
    views: Vec<View>,
}

impl Default for Views {
    fn default() -> Self {
        Self {
            views: vec![
                Box::new(status::StatusView),
                Box::new(source::SourceView),
                Box::new(controls::ControlsView::default()),
                Box::new(shader::ShaderView::default()),
                Box::new(image::ImageView),
                Box::new(streaming::StreamingView),
                Box::new(presets::PresetsView::default()),
            ],
        }
    }
}

#[profiling::all_functions]
impl Views {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every static widget id, in panel order.
    pub fn layout(&self) -> Vec<String> {
        self.views.iter().flat_map(|v| v.widgets()).collect()
    }

    pub fn synchronize_all(
        &mut self,
        state: &DeviceState,
        surface: &mut dyn WidgetSurface,
    ) {
        for view in &mut self.views {
            view.synchronize(state, surface);
        }
    }

    pub fn synchronize_section(
        &mut self,
        section: Section,
        state: &DeviceState,
        surface: &mut dyn WidgetSurface,
    ) {
        self.synchronize_filtered(|view| view.sections().contains(&section), state, surface);
    }

    fn synchronize_filtered(
        &mut self,
        filter: impl Fn(&View) -> bool,
        state: &DeviceState,
        surface: &mut dyn WidgetSurface,
    ) {
        for view in self.views.iter_mut().filter(|v| filter(v)) {
            view.synchronize(state, surface);
        }
    }

    pub fn read(
        &self,
        id: &str,
        value: &WidgetValue,
        state: &DeviceState,
    ) -> Option<Edit> {
        self.views.iter().find_map(|v| v.read(id, value, state))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use capdeck_api::types::{
        CaptureDevice, DeviceClass, DeviceControl, PresetSummary,
        ShaderParameter, SourceInfo, VideoCodec,
    };

    use super::*;

    pub(crate) fn loaded_state() -> DeviceState {
        let mut state = DeviceState {
            platform: crate::platform::from_user_agent("capdeck/test (linux)"),
            source: SourceInfo {
                kind: SourceType::V4l2,
                device: "/dev/video0".into(),
            },
            shader: "crt.glsl".into(),
            shaders: vec!["crt.glsl".into(), "scanlines.glsl".into()],
            shader_parameters: vec![ShaderParameter {
                name: "curvature".into(),
                value: 0.25,
                min: 0.0,
                max: 1.0,
                step: 0.0,
                description: Some("Screen curvature".into()),
                default_value: None,
            }],
            capture: CaptureSettings {
                width: 1920,
                height: 1080,
                fps: 60,
            },
            controls: vec![DeviceControl {
                name: "White Balance".into(),
                value: 4600,
                min: 2800,
                max: 6500,
                step: 10,
                available: true,
            }],
            presets: vec![PresetSummary {
                name: "crt".into(),
                display_name: "CRT".into(),
                description: String::new(),
                created: String::new(),
                thumbnail: None,
            }],
            ..DeviceState::default()
        };
        state.device_lists.insert(
            DeviceClass::V4l2,
            vec![CaptureDevice {
                id: "/dev/video0".into(),
                name: "/dev/video0".into(),
                available: true,
            }],
        );
        state.streaming.video_codec = VideoCodec::H264;
        state
    }

    #[test]
    fn missing_widgets_are_skipped() {
        let mut views = Views::new();
        let mut surface = MemorySurface::new();

        views.synchronize_all(&loaded_state(), &mut surface);

        assert!(surface.ids().is_empty());
    }

    #[test]
    fn partial_surface_only_gets_its_widgets() {
        let mut views = Views::new();
        let mut surface = MemorySurface::with(["brightness", "stream-button"]);

        views.synchronize_all(&loaded_state(), &mut surface);

        assert_eq!(surface.value("brightness"), Some(&WidgetValue::Number(0.0)));
        assert_eq!(surface.ids(), vec!["brightness", "stream-button"]);
    }

    #[test]
    fn layout_ids_are_unique() {
        let layout = Views::new().layout();
        let distinct: FxHashSet<&String> = layout.iter().collect();
        assert_eq!(distinct.len(), layout.len());
    }

    #[test]
    fn section_sync_leaves_other_views_alone() {
        let mut views = Views::new();
        let mut surface = MemorySurface::from_layout(&views.layout());
        let state = loaded_state();

        views.synchronize_section(Section::Image, &state, &mut surface);

        assert_eq!(surface.value("contrast"), Some(&WidgetValue::Number(1.0)));
        assert_eq!(surface.value("shader-select"), None);
    }

    #[test]
    fn slugs() {
        assert_eq!(slug("White Balance Temperature"), "white-balance-temperature");
        assert_eq!(slug("  Gain (dB) "), "gain-db");
    }

    #[test]
    fn colliding_names_get_distinct_ids() {
        let names = ["My Preset", "my-preset", "MY PRESET", "my-preset-2"];
        let ids = child_ids("preset-", names);

        assert_eq!(
            ids,
            vec![
                "preset-my-preset",
                "preset-my-preset-2",
                "preset-my-preset-3",
                "preset-my-preset-2-2",
            ]
        );
        assert_eq!(child_index("preset-", names, "preset-my-preset-3"), Some(2));
        assert_eq!(child_index("preset-", names, "shader-param-my-preset"), None);
    }

    #[test]
    fn raw_input_follows_widget_shape() {
        let number = WidgetValue::Number(0.0);
        let flag = WidgetValue::Flag(false);
        assert_eq!(
            WidgetValue::parse_like(Some(&number), "0.4"),
            WidgetValue::Number(0.4)
        );
        assert_eq!(WidgetValue::parse_like(Some(&flag), "on"), WidgetValue::Flag(true));
        assert_eq!(
            WidgetValue::parse_like(None, " crt.glsl "),
            WidgetValue::Text("crt.glsl".into())
        );
    }
}
