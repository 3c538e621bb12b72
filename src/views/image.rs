use super::{Edit, ViewTrait, WidgetSurface, WidgetValue};
use crate::state::{DeviceState, Section};

pub struct ImageView;

impl ViewTrait for ImageView {
    fn sections(&self) -> &'static [Section] {
        &[Section::Image]
    }

    fn widgets(&self) -> Vec<String> {
        [
            "brightness",
            "brightness-value",
            "contrast",
            "contrast-value",
            "maintain-aspect",
            "fullscreen",
            "monitor-index",
        ]
        .map(str::to_owned)
        .to_vec()
    }

    fn synchronize(&mut self, state: &DeviceState, surface: &mut dyn WidgetSurface) {
        let image = &state.image;
        surface.set_value("brightness", WidgetValue::Number(image.brightness));
        surface.set_label("brightness-value", &format!("{:.2}", image.brightness));
        surface.set_value("contrast", WidgetValue::Number(image.contrast));
        surface.set_label("contrast-value", &format!("{:.2}", image.contrast));
        surface.set_value("maintain-aspect", WidgetValue::Flag(image.maintain_aspect));
        surface.set_value("fullscreen", WidgetValue::Flag(image.fullscreen));
        surface.set_value(
            "monitor-index",
            WidgetValue::Number(f64::from(image.monitor_index)),
        );
    }

    fn read(
        &self,
        id: &str,
        value: &WidgetValue,
        state: &DeviceState,
    ) -> Option<Edit> {
        let mut image = state.image.clone();
        match id {
            "brightness" => image.brightness = value.as_number()?,
            "contrast" => image.contrast = value.as_number()?,
            "maintain-aspect" => image.maintain_aspect = value.as_flag()?,
            "fullscreen" => image.fullscreen = value.as_flag()?,
            "monitor-index" => image.monitor_index = value.as_number()?.round() as i32,
            _ => return None,
        }
        Some(Edit::Image(image))
    }
}
