use capdeck_api::types::{AudioCodec, StreamingSettings, VideoCodec};

use super::{Edit, SelectOption, ViewTrait, WidgetSurface, WidgetValue};
use crate::state::{DeviceState, Section};

/// Containers for codec-specific fields and the codec that shows them.
const CODEC_CONTAINERS: [(&str, VideoCodec); 6] = [
    ("h264-preset-container", VideoCodec::H264),
    ("h265-preset-container", VideoCodec::H265),
    ("h265-profile-container", VideoCodec::H265),
    ("h265-level-container", VideoCodec::H265),
    ("vp8-speed-container", VideoCodec::Vp8),
    ("vp9-speed-container", VideoCodec::Vp9),
];

const NUMBERS: [&str; 8] = [
    "streaming-port",
    "streaming-bitrate",
    "streaming-audio-bitrate",
    "streaming-width",
    "streaming-height",
    "streaming-fps",
    "streaming-vp8-speed",
    "streaming-vp9-speed",
];

const TEXTS: [&str; 4] = [
    "streaming-h264-preset",
    "streaming-h265-preset",
    "streaming-h265-profile",
    "streaming-h265-level",
];

fn number(settings: &StreamingSettings, id: &str) -> Option<f64> {
    Some(match id {
        "streaming-port" => f64::from(settings.port),
        "streaming-bitrate" => f64::from(settings.bitrate),
        "streaming-audio-bitrate" => f64::from(settings.audio_bitrate),
        "streaming-width" => f64::from(settings.width),
        "streaming-height" => f64::from(settings.height),
        "streaming-fps" => f64::from(settings.fps),
        "streaming-vp8-speed" => f64::from(settings.vp8_speed),
        "streaming-vp9-speed" => f64::from(settings.vp9_speed),
        _ => return None,
    })
}

fn text<'a>(settings: &'a StreamingSettings, id: &str) -> Option<&'a str> {
    Some(match id {
        "streaming-h264-preset" => settings.h264_preset.as_str(),
        "streaming-h265-preset" => settings.h265_preset.as_str(),
        "streaming-h265-profile" => settings.h265_profile.as_str(),
        "streaming-h265-level" => settings.h265_level.as_str(),
        _ => return None,
    })
}

pub struct StreamingView;

impl ViewTrait for StreamingView {
    fn sections(&self) -> &'static [Section] {
        &[Section::Streaming]
    }

    fn widgets(&self) -> Vec<String> {
        let mut ids = vec![
            "streaming-video-codec".to_owned(),
            "streaming-audio-codec".to_owned(),
        ];
        ids.extend(NUMBERS.iter().take(6).map(|id| (*id).to_owned()));
        for (container, codec) in CODEC_CONTAINERS {
            ids.push(container.to_owned());
            ids.extend(
                NUMBERS
                    .iter()
                    .chain(TEXTS.iter())
                    .filter(|id| field_codec(id) == Some(codec) && field_container(id) == container)
                    .map(|id| (*id).to_owned()),
            );
        }
        ids
    }

    fn synchronize(&mut self, state: &DeviceState, surface: &mut dyn WidgetSurface) {
        let settings = &state.streaming;

        surface.set_options(
            "streaming-video-codec",
            VideoCodec::ALL
                .iter()
                .map(|c| SelectOption::new(c.as_str(), c.as_str().to_uppercase()))
                .collect(),
        );
        surface.set_value(
            "streaming-video-codec",
            WidgetValue::Text(settings.video_codec.as_str().to_owned()),
        );
        surface.set_options(
            "streaming-audio-codec",
            AudioCodec::ALL
                .iter()
                .map(|c| SelectOption::new(c.as_str(), c.as_str().to_uppercase()))
                .collect(),
        );
        surface.set_value(
            "streaming-audio-codec",
            WidgetValue::Text(settings.audio_codec.as_str().to_owned()),
        );

        for id in NUMBERS {
            if let Some(n) = number(settings, id) {
                surface.set_value(id, WidgetValue::Number(n));
            }
        }
        for id in TEXTS {
            if let Some(t) = text(settings, id) {
                surface.set_value(id, WidgetValue::Text(t.to_owned()));
            }
        }

        for (container, codec) in CODEC_CONTAINERS {
            surface.set_visible(container, settings.video_codec == codec);
        }
        for id in NUMBERS.iter().chain(TEXTS.iter()) {
            if let Some(codec) = field_codec(id) {
                surface.set_visible(id, settings.video_codec == codec);
            }
        }
    }

    fn read(
        &self,
        id: &str,
        value: &WidgetValue,
        state: &DeviceState,
    ) -> Option<Edit> {
        let mut s = state.streaming.clone();
        let whole = || {
            value
                .as_number()
                .filter(|n| *n >= 0.0)
                .map(|n| n.round() as u32)
        };

        match id {
            "streaming-video-codec" => {
                s.video_codec = VideoCodec::parse(value.as_text()?)?;
            }
            "streaming-audio-codec" => {
                s.audio_codec = AudioCodec::parse(value.as_text()?)?;
            }
            "streaming-port" => s.port = u16::try_from(whole()?).ok()?,
            "streaming-bitrate" => s.bitrate = whole()?,
            "streaming-audio-bitrate" => s.audio_bitrate = whole()?,
            "streaming-width" => s.width = whole()?,
            "streaming-height" => s.height = whole()?,
            "streaming-fps" => s.fps = whole()?,
            "streaming-vp8-speed" => s.vp8_speed = value.as_number()?.round() as i32,
            "streaming-vp9-speed" => s.vp9_speed = value.as_number()?.round() as i32,
            "streaming-h264-preset" => s.h264_preset = value.as_text()?.trim().to_owned(),
            "streaming-h265-preset" => s.h265_preset = value.as_text()?.trim().to_owned(),
            "streaming-h265-profile" => s.h265_profile = value.as_text()?.trim().to_owned(),
            "streaming-h265-level" => s.h265_level = value.as_text()?.trim().to_owned(),
            _ => return None,
        }
        Some(Edit::Streaming(s))
    }
}

fn field_codec(id: &str) -> Option<VideoCodec> {
    let rest = id.strip_prefix("streaming-")?;
    VideoCodec::ALL
        .into_iter()
        .find(|c| rest.starts_with(c.as_str()))
}

fn field_container(id: &str) -> String {
    format!("{}-container", id.trim_start_matches("streaming-"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::views::{MemorySurface, tests::loaded_state};

    fn rendered(state: &DeviceState) -> MemorySurface {
        let mut view = StreamingView;
        let mut surface = MemorySurface::from_layout(&view.widgets());
        view.synchronize(state, &mut surface);
        surface
    }

    #[test]
    fn codec_fields_nest_under_their_container() {
        let view = StreamingView;
        let widgets = view.widgets();
        let at = |id: &str| widgets.iter().position(|w| w == id).unwrap();

        assert_eq!(at("streaming-h264-preset"), at("h264-preset-container") + 1);
        assert_eq!(at("streaming-vp9-speed"), at("vp9-speed-container") + 1);
        assert_eq!(widgets.len(), 2 + 6 + 6 + 6);
    }

    #[test]
    fn only_selected_codec_fields_are_visible() {
        let mut state = loaded_state();
        let surface = rendered(&state);
        assert!(surface.is_shown("h264-preset-container"));
        assert!(!surface.is_shown("h265-level-container"));
        assert!(!surface.is_shown("vp9-speed-container"));
        assert!(!surface.is_shown("streaming-vp9-speed"));
        assert!(surface.is_shown("streaming-port"));

        state.streaming.video_codec = VideoCodec::H265;
        let surface = rendered(&state);
        assert!(!surface.is_shown("h264-preset-container"));
        assert!(surface.is_shown("h265-preset-container"));
        assert!(surface.is_shown("h265-profile-container"));
        assert!(surface.is_shown("h265-level-container"));
    }

    #[test]
    fn codec_switch_reads_into_settings() {
        let state = loaded_state();
        let view = StreamingView;

        let Some(Edit::Streaming(settings)) = view.read(
            "streaming-video-codec",
            &WidgetValue::Text("VP9".into()),
            &state,
        ) else {
            panic!("expected a streaming edit");
        };
        assert_eq!(settings.video_codec, VideoCodec::Vp9);

        assert_eq!(
            view.read("streaming-video-codec", &WidgetValue::Text("av1".into()), &state),
            None
        );
        assert_eq!(
            view.read("streaming-port", &WidgetValue::Number(70000.0), &state),
            None
        );
    }
}
