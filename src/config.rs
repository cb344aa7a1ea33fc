use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;

use crate::action::Action;

/// Visual and behavioral configuration for a single key.
///
/// Any subset of fields may be set; the renderer picks a display mode from
/// which of `label`/`icon` are present. Immutable once placed in a [`Layout`].
pub struct KeyConfig {
    pub label: Option<String>,
    pub icon: Option<PathBuf>,
    pub background: Option<Rgb888>,
    pub label_color: Rgb888,
    pub action: Option<Box<dyn Action>>,
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self {
            label: None,
            icon: None,
            background: None,
            label_color: Rgb888::WHITE,
            action: None,
        }
    }
}

impl KeyConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Path to the icon image file. Expected to be already resolved;
    /// a path that fails to load renders as the error color.
    pub fn icon(mut self, path: impl Into<PathBuf>) -> Self {
        self.icon = Some(path.into());
        self
    }

    pub fn background(mut self, color: Rgb888) -> Self {
        self.background = Some(color);
        self
    }

    pub fn label_color(mut self, color: Rgb888) -> Self {
        self.label_color = color;
        self
    }

    pub fn action(mut self, action: impl Action + 'static) -> Self {
        self.action = Some(Box::new(action));
        self
    }
}

/// One named page of the panel: a complete assignment of configs to key
/// indices. Keys absent from the mapping are never rendered and never
/// dispatch.
#[derive(Default)]
pub struct Layout {
    keys: BTreeMap<u8, KeyConfig>,
}

impl Layout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(mut self, key: u8, config: KeyConfig) -> Self {
        self.keys.insert(key, config);
        self
    }

    pub fn key(&self, key: u8) -> Option<&KeyConfig> {
        self.keys.get(&key)
    }

    /// Iterate configured keys in index order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, &KeyConfig)> {
        self.keys.iter().map(|(key, config)| (*key, config))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// The full set of named layouts known at startup. Built once, read-only
/// thereafter.
#[derive(Default)]
pub struct Registry {
    layouts: HashMap<String, Layout>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_layout(mut self, name: impl Into<String>, layout: Layout) -> Self {
        self.layouts.insert(name.into(), layout);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Layout> {
        self.layouts.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.layouts.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.layouts.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.layouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }
}
