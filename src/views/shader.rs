use capdeck_api::types::ShaderParameter;

use super::{
    Edit, Range, SelectOption, ViewTrait, WidgetSurface, WidgetValue, child_ids,
    child_index,
};
use crate::state::{DeviceState, Section};

const CONTAINER: &str = "shader-parameters";
const EMPTY: &str = "shader-parameters-empty";
const PREFIX: &str = "shader-param-";

/// Slider caption. Values are shown with two decimals.
pub fn parameter_label(param: &ShaderParameter) -> String {
    match &param.description {
        Some(description) => {
            format!("{}: {description} = {:.2}", param.name, param.value)
        }
        None => format!("{} = {:.2}", param.name, param.value),
    }
}

#[derive(Default)]
pub struct ShaderView {
    shown: Vec<String>,
}

impl ViewTrait for ShaderView {
    fn sections(&self) -> &'static [Section] {
        &[Section::Shader, Section::ShaderParameters]
    }

    fn widgets(&self) -> Vec<String> {
        ["shader-select", "current-shader", CONTAINER, EMPTY]
            .map(str::to_owned)
            .to_vec()
    }

    fn synchronize(&mut self, state: &DeviceState, surface: &mut dyn WidgetSurface) {
        let mut options = vec![SelectOption::new("", "None")];
        options.extend(state.shaders.iter().map(|s| SelectOption::new(s, s)));
        surface.set_options("shader-select", options);
        surface.set_value("shader-select", WidgetValue::Text(state.shader.clone()));

        let current = if state.shader.is_empty() {
            "None"
        } else {
            state.shader.as_str()
        };
        surface.set_label("current-shader", current);

        let ids = child_ids(
            PREFIX,
            state.shader_parameters.iter().map(|p| p.name.as_str()),
        );
        if ids != self.shown {
            surface.replace_children(CONTAINER, &ids);
            self.shown.clone_from(&ids);
        }
        surface.set_visible(EMPTY, ids.is_empty());

        for (param, id) in state.shader_parameters.iter().zip(&ids) {
            surface.set_range(
                id,
                Range {
                    min: param.min,
                    max: param.max,
                    step: param.effective_step(),
                },
            );
            surface.set_value(id, WidgetValue::Number(param.value));
            surface.set_label(id, &parameter_label(param));
        }
    }

    fn read(
        &self,
        id: &str,
        value: &WidgetValue,
        state: &DeviceState,
    ) -> Option<Edit> {
        if id == "shader-select" {
            return Some(Edit::Shader(value.as_text()?.trim().to_owned()));
        }

        let names = state.shader_parameters.iter().map(|p| p.name.as_str());
        let param = &state.shader_parameters[child_index(PREFIX, names, id)?];
        Some(Edit::ShaderParameter {
            name: param.name.clone(),
            value: value.as_number()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::views::{MemorySurface, tests::loaded_state};

    #[test]
    fn parameters_render_with_two_decimals() {
        let state = loaded_state();
        let mut view = ShaderView::default();
        let mut surface = MemorySurface::from_layout(&view.widgets());

        view.synchronize(&state, &mut surface);

        let slider = surface.widget("shader-param-curvature").unwrap();
        assert_eq!(
            slider.label.as_deref(),
            Some("curvature: Screen curvature = 0.25")
        );
        assert_eq!(slider.range.unwrap().step, 0.01);
        assert_eq!(
            surface.widget("current-shader").unwrap().label.as_deref(),
            Some("crt.glsl")
        );
        assert_eq!(surface.widget("shader-select").unwrap().options.len(), 3);
    }

    #[test]
    fn out_of_range_values_pass_through() {
        let state = loaded_state();
        let view = ShaderView::default();

        assert_eq!(
            view.read("shader-param-curvature", &WidgetValue::Number(4.5), &state),
            Some(Edit::ShaderParameter {
                name: "curvature".into(),
                value: 4.5
            })
        );
    }

    #[test]
    fn clashing_parameter_names_stay_apart() {
        let mut state = loaded_state();
        let mut twin = state.shader_parameters[0].clone();
        twin.name = "Curvature".into();
        twin.value = 0.75;
        state.shader_parameters.push(twin);
        let mut view = ShaderView::default();
        let mut surface = MemorySurface::from_layout(&view.widgets());

        view.synchronize(&state, &mut surface);

        assert_eq!(
            surface.children(CONTAINER),
            vec!["shader-param-curvature", "shader-param-curvature-2"]
        );
        assert_eq!(
            surface.widget("shader-param-curvature-2").unwrap().value,
            Some(WidgetValue::Number(0.75))
        );
        assert_eq!(
            view.read("shader-param-curvature-2", &WidgetValue::Number(0.5), &state),
            Some(Edit::ShaderParameter {
                name: "Curvature".into(),
                value: 0.5
            })
        );
    }

    #[test]
    fn shader_change_replaces_sliders() {
        let mut state = loaded_state();
        let mut view = ShaderView::default();
        let mut surface = MemorySurface::from_layout(&view.widgets());
        view.synchronize(&state, &mut surface);

        state.shader = "scanlines.glsl".into();
        state.shader_parameters = vec![ShaderParameter {
            name: "line_weight".into(),
            value: 1.0 / 3.0,
            min: 0.0,
            max: 2.0,
            step: 0.1,
            description: None,
            default_value: Some(0.3),
        }];
        view.synchronize(&state, &mut surface);

        assert_eq!(surface.children(CONTAINER), vec!["shader-param-line-weight"]);
        assert_eq!(
            surface
                .widget("shader-param-line-weight")
                .unwrap()
                .label
                .as_deref(),
            Some("line_weight = 0.33")
        );
    }
}
