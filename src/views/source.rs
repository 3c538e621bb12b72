use capdeck_api::types::{DeviceClass, SourceType};

use super::{Edit, SelectOption, ViewTrait, WidgetSurface, WidgetValue};
use crate::state::{CaptureSettings, DeviceState, Section};

const CLASSES: [DeviceClass; 2] = [DeviceClass::V4l2, DeviceClass::DirectShow];

fn id(class: DeviceClass, widget: &str) -> String {
    format!("{}-{widget}", class.segment())
}

fn class_of(id: &str) -> Option<(DeviceClass, &str)> {
    CLASSES.into_iter().find_map(|class| {
        id.strip_prefix(class.segment())
            .and_then(|rest| rest.strip_prefix('-'))
            .map(|rest| (class, rest))
    })
}

/// Source type selector, per-class device pickers and capture settings.
pub struct SourceView;

impl SourceView {
    fn source_types(state: &DeviceState) -> Vec<SelectOption> {
        let types = &state.platform.available_source_types;
        if types.is_empty() {
            return vec![SelectOption::new("0", "Loading...")];
        }
        types
            .iter()
            .map(|t| SelectOption::new(i64::from(t.value).to_string(), &t.name))
            .collect()
    }

    fn device_options(state: &DeviceState, class: DeviceClass) -> Vec<SelectOption> {
        let mut options = vec![SelectOption::new("", "None (No device)")];
        if let Some(devices) = state.device_lists.get(&class) {
            options.extend(devices.iter().map(|d| {
                let label = if d.available {
                    d.name.clone()
                } else {
                    format!("{} (unavailable)", d.name)
                };
                SelectOption::new(&d.id, label)
            }));
        }
        options
    }
}

impl ViewTrait for SourceView {
    fn sections(&self) -> &'static [Section] {
        &[
            Section::Platform,
            Section::Source,
            Section::Devices,
            Section::Capture,
        ]
    }

    fn widgets(&self) -> Vec<String> {
        let mut ids = vec!["source-type".to_owned(), "none-source-message".to_owned()];
        for class in CLASSES {
            for widget in [
                "container",
                "device",
                "refresh",
                "capture-info",
                "capture-width",
                "capture-height",
                "capture-fps",
            ] {
                ids.push(id(class, widget));
            }
        }
        ids.push("capture-resolution".to_owned());
        ids.push("capture-fps".to_owned());
        ids
    }

    fn synchronize(&mut self, state: &DeviceState, surface: &mut dyn WidgetSurface) {
        let kind = state.source.kind;
        let active_class = kind.device_class();

        surface.set_options("source-type", Self::source_types(state));
        surface.set_value(
            "source-type",
            WidgetValue::Text(i64::from(kind).to_string()),
        );
        surface.set_visible("none-source-message", kind == SourceType::None);

        let capture = state.capture;
        for class in CLASSES {
            let active = active_class == Some(class);
            surface.set_visible(&id(class, "container"), active);
            for widget in ["device", "refresh", "capture-width", "capture-height", "capture-fps"] {
                surface.set_visible(&id(class, widget), active);
            }
            surface.set_label(&id(class, "refresh"), "Refresh devices");
            surface.set_options(&id(class, "device"), Self::device_options(state, class));

            let device = if active { state.source.device.as_str() } else { "" };
            surface.set_value(&id(class, "device"), WidgetValue::Text(device.to_owned()));
            surface.set_visible(&id(class, "capture-info"), active && !device.is_empty());

            for (widget, value) in [
                ("capture-width", capture.width),
                ("capture-height", capture.height),
                ("capture-fps", capture.fps),
            ] {
                surface.set_value(&id(class, widget), WidgetValue::Number(f64::from(value)));
            }
        }

        surface.set_label(
            "capture-resolution",
            &format!("{}x{}", capture.width, capture.height),
        );
        surface.set_label("capture-fps", &format!("{} FPS", capture.fps));
    }

    fn read(
        &self,
        id: &str,
        value: &WidgetValue,
        state: &DeviceState,
    ) -> Option<Edit> {
        if id == "source-type" {
            let kind = value.as_number()? as i64;
            return Some(Edit::SourceType(SourceType::from(kind)));
        }

        let (class, widget) = class_of(id)?;
        if state.source.kind.device_class() != Some(class) {
            return None;
        }

        let dimension = || {
            value
                .as_number()
                .filter(|n| *n >= 0.0)
                .map(|n| n.round() as u32)
        };

        match widget {
            "device" => Some(Edit::Device(value.as_text()?.trim().to_owned())),
            "refresh" => Some(Edit::RescanDevices),
            "capture-width" => Some(Edit::Capture(CaptureSettings {
                width: dimension()?,
                ..state.capture
            })),
            "capture-height" => Some(Edit::Capture(CaptureSettings {
                height: dimension()?,
                ..state.capture
            })),
            "capture-fps" => Some(Edit::Capture(CaptureSettings {
                fps: dimension()?,
                ..state.capture
            })),
            _ => None,
        }
    }
}
