use capdeck_api::types::DeviceControl;

use super::{
    Edit, Range, ViewTrait, WidgetSurface, WidgetValue, child_ids, child_index,
};
use crate::state::{DeviceState, Section};

const CONTAINER: &str = "v4l2-controls";
const EMPTY: &str = "v4l2-controls-empty";
const PREFIX: &str = "v4l2-control-";

fn available(state: &DeviceState) -> Vec<&DeviceControl> {
    state.controls.iter().filter(|c| c.available).collect()
}

/// One slider per available V4L2 control.
#[derive(Default)]
pub struct ControlsView {
    shown: Vec<String>,
}

impl ViewTrait for ControlsView {
    fn sections(&self) -> &'static [Section] {
        &[Section::Controls]
    }

    fn widgets(&self) -> Vec<String> {
        vec![CONTAINER.to_owned(), EMPTY.to_owned()]
    }

    fn synchronize(&mut self, state: &DeviceState, surface: &mut dyn WidgetSurface) {
        let controls = available(state);
        let ids = child_ids(PREFIX, controls.iter().map(|c| c.name.as_str()));

        if ids != self.shown {
            surface.replace_children(CONTAINER, &ids);
            self.shown.clone_from(&ids);
        }
        surface.set_visible(EMPTY, controls.is_empty());

        for (control, id) in controls.iter().zip(&ids) {
            surface.set_range(
                id,
                Range {
                    min: f64::from(control.min),
                    max: f64::from(control.max),
                    step: f64::from(control.step.max(1)),
                },
            );
            surface.set_value(id, WidgetValue::Number(f64::from(control.value)));
            surface.set_label(id, &format!("{}: {}", control.name, control.value));
        }
    }

    fn read(
        &self,
        id: &str,
        value: &WidgetValue,
        state: &DeviceState,
    ) -> Option<Edit> {
        let controls = available(state);
        let at = child_index(PREFIX, controls.iter().map(|c| c.name.as_str()), id)?;
        let control = controls[at];
        Some(Edit::Control {
            name: control.name.clone(),
            value: value.as_number()?.round() as i32,
        })
    }
}
