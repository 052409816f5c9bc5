//! Per-extension buffer settings applied when a file is opened.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::buffer::EditorBuffer;

/// Called synchronously, in registration order, for every newly created
/// file buffer.
pub trait BufferOpenObserver {
    fn on_open_buffer(&self, location: &Path, buffer: &mut EditorBuffer);
}

/// Overrides for a file type. Absent fields keep the current value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FiletypeSettings {
    pub tabstop: Option<usize>,
    pub shiftwidth: Option<usize>,
    pub expandtab: Option<bool>,
    pub autoindent: Option<bool>,
}

impl FiletypeSettings {
    pub fn apply(&self, buffer: &mut EditorBuffer) {
        let s = &mut buffer.settings;
        if let Some(ts) = self.tabstop.filter(|n| *n > 0) {
            s.tabstop = ts;
        }
        if let Some(sw) = self.shiftwidth.filter(|n| *n > 0) {
            s.shiftwidth = sw;
        }
        if let Some(et) = self.expandtab {
            s.expandtab = et;
        }
        if let Some(ai) = self.autoindent {
            s.autoindent = ai;
        }
    }
}

/// Exact-match dispatch from file extension to settings.
#[derive(Debug, Clone, Default)]
pub struct ExtensionTable {
    entries: HashMap<String, FiletypeSettings>,
}

impl ExtensionTable {
    pub fn builtin() -> Self {
        let mut table = Self::default();
        let no_expand = FiletypeSettings {
            expandtab: Some(false),
            ..Default::default()
        };
        let two_wide = FiletypeSettings {
            tabstop: Some(2),
            shiftwidth: Some(2),
            ..Default::default()
        };
        for ext in ["go", "mk"] {
            table.insert(ext, no_expand);
        }
        for ext in ["js", "json", "yaml", "yml", "html"] {
            table.insert(ext, two_wide);
        }
        table
    }

    pub fn insert(&mut self, extension: &str, settings: FiletypeSettings) {
        self.entries.insert(extension.to_string(), settings);
    }

    pub fn lookup(&self, location: &Path) -> Option<&FiletypeSettings> {
        let ext = location.extension()?.to_str()?;
        self.entries.get(ext)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl BufferOpenObserver for ExtensionTable {
    fn on_open_buffer(&self, location: &Path, buffer: &mut EditorBuffer) {
        if let Some(settings) = self.lookup(location) {
            debug!(target: "config", file = %location.display(), ?settings, "filetype_settings");
            settings.apply(buffer);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::BufferSettings;

    fn opened(name: &str) -> BufferSettings {
        let mut buffer = EditorBuffer::new(BufferSettings::default());
        ExtensionTable::builtin().on_open_buffer(Path::new(name), &mut buffer);
        buffer.settings
    }

    #[test]
    fn every_table_extension_yields_its_settings() {
        let defaults = BufferSettings::default();
        for name in ["main.go", "rules.mk"] {
            assert_eq!(
                opened(name),
                BufferSettings {
                    expandtab: false,
                    ..defaults
                }
            );
        }
        for name in ["a.js", "a.json", "a.yaml", "a.yml", "index.html"] {
            assert_eq!(
                opened(name),
                BufferSettings {
                    tabstop: 2,
                    shiftwidth: 2,
                    ..defaults
                }
            );
        }
    }

    #[test]
    fn other_extensions_keep_defaults() {
        for name in ["x.py", "Makefile", "x.GO", "archive.tar.gz", ".json"] {
            assert_eq!(opened(name), BufferSettings::default(), "{}", name);
        }
    }

    #[test]
    fn inserted_entries_override_builtin() {
        let mut table = ExtensionTable::builtin();
        table.insert(
            "go",
            FiletypeSettings {
                tabstop: Some(8),
                ..Default::default()
            },
        );
        let mut buffer = EditorBuffer::new(BufferSettings::default());
        table.on_open_buffer(Path::new("x.go"), &mut buffer);
        assert_eq!(buffer.settings.tabstop, 8);
        assert!(buffer.settings.expandtab);
    }
}
