use capdeck_api::types::StreamStatus;

use super::{Edit, ViewTrait, WidgetSurface, WidgetValue};
use crate::state::{DeviceState, Section};

/// The four states of the start/stop button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamButton {
    Startable,
    Cooldown { secs: u64 },
    Active,
    Transitioning,
}

impl StreamButton {
    pub fn new(status: &StreamStatus, transitioning: bool) -> Self {
        if transitioning {
            StreamButton::Transitioning
        } else if status.streaming_active {
            StreamButton::Active
        } else if !status.can_start {
            StreamButton::Cooldown {
                secs: status.cooldown_secs(),
            }
        } else {
            StreamButton::Startable
        }
    }

    pub fn label(self) -> String {
        match self {
            StreamButton::Startable => "Start streaming".to_owned(),
            StreamButton::Cooldown { secs } => format!("Waiting ({secs}s)"),
            StreamButton::Active => "Stop streaming".to_owned(),
            StreamButton::Transitioning => "Working...".to_owned(),
        }
    }

    pub fn enabled(self) -> bool {
        matches!(self, StreamButton::Startable | StreamButton::Active)
    }
}

pub struct StatusView;

impl ViewTrait for StatusView {
    fn sections(&self) -> &'static [Section] {
        &[Section::Status]
    }

    fn widgets(&self) -> Vec<String> {
        ["stream-status", "client-count", "stream-link", "stream-button"]
            .map(str::to_owned)
            .to_vec()
    }

    fn synchronize(&mut self, state: &DeviceState, surface: &mut dyn WidgetSurface) {
        let status = &state.status;
        let active = if status.streaming_active { "Active" } else { "Inactive" };

        surface.set_label("stream-status", active);
        surface.set_value("stream-status", WidgetValue::Flag(status.streaming_active));
        surface.set_value(
            "client-count",
            WidgetValue::Number(f64::from(status.client_count)),
        );

        if let Some(url) = &status.stream_url {
            surface.set_value("stream-link", WidgetValue::Text(url.clone()));
        }
        surface.set_visible("stream-link", status.stream_url.is_some());

        let button = StreamButton::new(status, state.transitioning);
        surface.set_label("stream-button", &button.label());
        surface.set_enabled("stream-button", button.enabled());
    }

    fn read(
        &self,
        id: &str,
        _value: &WidgetValue,
        state: &DeviceState,
    ) -> Option<Edit> {
        if id != "stream-button" {
            return None;
        }
        // a disabled button cannot be pressed
        StreamButton::new(&state.status, state.transitioning)
            .enabled()
            .then_some(Edit::ToggleStreaming)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::views::MemorySurface;

    fn status(active: bool, can_start: bool, cooldown_ms: u64) -> StreamStatus {
        StreamStatus {
            streaming_active: active,
            can_start,
            cooldown_remaining_ms: cooldown_ms,
            ..StreamStatus::default()
        }
    }

    #[test]
    fn button_states_are_exclusive() {
        assert_eq!(
            StreamButton::new(&status(false, true, 0), false),
            StreamButton::Startable
        );
        assert_eq!(
            StreamButton::new(&status(false, false, 7500), false),
            StreamButton::Cooldown { secs: 8 }
        );
        // running streams can always be stopped
        assert_eq!(
            StreamButton::new(&status(true, false, 7500), false),
            StreamButton::Active
        );
        assert_eq!(
            StreamButton::new(&status(true, true, 0), true),
            StreamButton::Transitioning
        );
    }

    #[test]
    fn cooldown_disables_the_button() {
        let mut view = StatusView;
        let mut surface = MemorySurface::from_layout(&view.widgets());
        let state = DeviceState {
            status: status(false, false, 2100),
            ..DeviceState::default()
        };

        view.synchronize(&state, &mut surface);

        let button = surface.widget("stream-button").unwrap();
        assert!(!button.enabled);
        assert_eq!(button.label.as_deref(), Some("Waiting (3s)"));
        assert!(!surface.widget("stream-link").unwrap().visible);
        assert_eq!(
            view.read("stream-button", &WidgetValue::Flag(true), &state),
            None
        );
    }

    #[test]
    fn active_stream_shows_link_and_stop() {
        let mut view = StatusView;
        let mut surface = MemorySurface::from_layout(&view.widgets());
        let state = DeviceState {
            status: StreamStatus {
                streaming_active: true,
                client_count: 3,
                stream_url: Some("http://capture.lan:8080/stream".into()),
                ..StreamStatus::default()
            },
            ..DeviceState::default()
        };

        view.synchronize(&state, &mut surface);

        assert_eq!(
            surface.widget("stream-button").unwrap().label.as_deref(),
            Some("Stop streaming")
        );
        assert_eq!(surface.value("client-count"), Some(&WidgetValue::Number(3.0)));
        assert_eq!(
            surface.value("stream-link"),
            Some(&WidgetValue::Text("http://capture.lan:8080/stream".into()))
        );
        assert_eq!(
            view.read("stream-button", &WidgetValue::Flag(true), &state),
            Some(Edit::ToggleStreaming)
        );
    }
}
