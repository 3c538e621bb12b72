use super::{Edit, ViewTrait, WidgetSurface, WidgetValue, child_ids, child_index};
use crate::state::{DeviceState, Section};

const GRID: &str = "presets-grid";
const EMPTY: &str = "presets-empty";
const PREFIX: &str = "preset-";

/// One card per preset. Pressing a card applies it.
#[derive(Default)]
pub struct PresetsView {
    shown: Vec<String>,
}

impl ViewTrait for PresetsView {
    fn sections(&self) -> &'static [Section] {
        &[Section::Presets]
    }

    fn widgets(&self) -> Vec<String> {
        vec![GRID.to_owned(), EMPTY.to_owned()]
    }

    fn synchronize(&mut self, state: &DeviceState, surface: &mut dyn WidgetSurface) {
        let ids = child_ids(PREFIX, state.presets.iter().map(|p| p.name.as_str()));
        if ids != self.shown {
            surface.replace_children(GRID, &ids);
            self.shown.clone_from(&ids);
        }
        surface.set_visible(EMPTY, ids.is_empty());

        for (preset, id) in state.presets.iter().zip(&ids) {
            let label = if preset.description.is_empty() {
                preset.title().to_owned()
            } else {
                format!("{} - {}", preset.title(), preset.description)
            };
            surface.set_label(id, &label);
            surface.set_value(
                id,
                WidgetValue::Text(preset.thumbnail_url().unwrap_or_default()),
            );
        }
    }

    fn read(
        &self,
        id: &str,
        _value: &WidgetValue,
        state: &DeviceState,
    ) -> Option<Edit> {
        let names = state.presets.iter().map(|p| p.name.as_str());
        let at = child_index(PREFIX, names, id)?;
        Some(Edit::ApplyPreset(state.presets[at].name.clone()))
    }
}
