use rustc_hash::FxHashMap;

use super::{Range, SelectOption, WidgetSurface, WidgetValue};

#[derive(Debug, Clone, PartialEq)]
pub struct Widget {
    pub value: Option<WidgetValue>,
    pub label: Option<String>,
    pub visible: bool,
    pub enabled: bool,
    pub range: Option<Range>,
    pub options: Vec<SelectOption>,
    pub parent: Option<String>,
}

impl Default for Widget {
    fn default() -> Self {
        Self {
            value: None,
            label: None,
            visible: true,
            enabled: true,
            range: None,
            options: Vec::new(),
            parent: None,
        }
    }
}

/// Widget surface kept in memory, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct MemorySurface {
    order: Vec<String>,
    widgets: FxHashMap<String, Widget>,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut surface = Self::new();
        for id in ids {
            surface.declare(id);
        }
        surface
    }

    pub fn from_layout(layout: &[String]) -> Self {
        Self::with(layout.iter().cloned())
    }

    pub fn declare(&mut self, id: impl Into<String>) {
        let id = id.into();
        if !self.widgets.contains_key(&id) {
            self.widgets.insert(id.clone(), Widget::default());
            self.order.push(id);
        }
    }

    #[cfg(test)]
    pub fn widget(&self, id: &str) -> Option<&Widget> {
        self.widgets.get(id)
    }

    #[cfg(test)]
    pub fn ids(&self) -> Vec<&str> {
        self.order.iter().map(String::as_str).collect()
    }

    pub fn children(&self, parent: &str) -> Vec<&str> {
        self.order
            .iter()
            .filter(|id| {
                self.widgets
                    .get(*id)
                    .and_then(|w| w.parent.as_deref())
                    == Some(parent)
            })
            .map(String::as_str)
            .collect()
    }

    /// Visible widgets whose containers are visible too.
    pub fn shown(&self) -> impl Iterator<Item = (&str, &Widget)> {
        self.order.iter().filter_map(|id| {
            let widget = self.widgets.get(id)?;
            self.is_shown(id).then_some((id.as_str(), widget))
        })
    }

    pub fn is_shown(&self, id: &str) -> bool {
        let mut current = self.widgets.get(id);
        while let Some(widget) = current {
            if !widget.visible {
                return false;
            }
            current = widget.parent.as_deref().and_then(|p| self.widgets.get(p));
        }
        self.widgets.contains_key(id)
    }

    fn with_widget(&mut self, id: &str, f: impl FnOnce(&mut Widget)) {
        if let Some(widget) = self.widgets.get_mut(id) {
            f(widget);
        }
    }
}

impl WidgetSurface for MemorySurface {
    fn has(&self, id: &str) -> bool {
        self.widgets.contains_key(id)
    }

    fn value(&self, id: &str) -> Option<&WidgetValue> {
        self.widgets.get(id)?.value.as_ref()
    }

    fn set_value(&mut self, id: &str, value: WidgetValue) {
        self.with_widget(id, |w| w.value = Some(value));
    }

    fn set_label(&mut self, id: &str, label: &str) {
        self.with_widget(id, |w| w.label = Some(label.to_owned()));
    }

    fn set_visible(&mut self, id: &str, visible: bool) {
        self.with_widget(id, |w| w.visible = visible);
    }

    fn set_enabled(&mut self, id: &str, enabled: bool) {
        self.with_widget(id, |w| w.enabled = enabled);
    }

    fn set_range(&mut self, id: &str, range: Range) {
        self.with_widget(id, |w| w.range = Some(range));
    }

    fn set_options(&mut self, id: &str, options: Vec<SelectOption>) {
        self.with_widget(id, |w| w.options = options);
    }

    fn replace_children(&mut self, parent: &str, children: &[String]) -> bool {
        let Some(at) = self.order.iter().position(|id| id == parent) else {
            return false;
        };

        let stale: Vec<String> = self
            .children(parent)
            .into_iter()
            .map(str::to_owned)
            .collect();
        for id in &stale {
            self.widgets.remove(id);
        }
        self.order.retain(|id| !stale.contains(id));

        let mut insert_at = at + 1;
        for id in children {
            if self.widgets.contains_key(id) {
                continue;
            }
            self.widgets.insert(
                id.clone(),
                Widget {
                    parent: Some(parent.to_owned()),
                    ..Widget::default()
                },
            );
            self.order.insert(insert_at, id.clone());
            insert_at += 1;
        }
        true
    }
}
