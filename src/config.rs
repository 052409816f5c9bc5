//! Startup configuration: the TOML rc file.
//!
//! ```toml
//! colorscheme = "monokai"
//! set = ["number", "tabstop=2", "noexpandtab"]
//!
//! [filetypes.md]
//! tabstop = 2
//!
//! [[bindings]]
//! keys = "<F9>"
//! run = "python3"
//!
//! [lint.rust]
//! program = "cargo"
//! args = ["clippy", "--message-format=short"]
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::editor::Editor;
use crate::error::{EditorError, Result};
use crate::filetype::{ExtensionTable, FiletypeSettings};
use crate::keymap::{Handler, ModeFilter};
use crate::theme::Theme;
use crate::tools::{save_and_execute, LintCommand};

/// Applied once at startup, before any file is opened.
pub trait Configure {
    fn configure(&self, editor: &mut Editor);
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RcFile {
    pub colorscheme: Option<String>,
    /// `:set` arguments, applied in order.
    #[serde(default)]
    pub set: Vec<String>,
    /// Per-extension settings, consulted after the built-in table.
    #[serde(default)]
    pub filetypes: HashMap<String, FiletypeSettings>,
    #[serde(default)]
    pub bindings: Vec<BindingSpec>,
    /// Lint checker per file type.
    #[serde(default)]
    pub lint: HashMap<String, LintCommand>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BindingSpec {
    pub keys: String,
    /// `normal` when absent.
    pub mode: Option<String>,
    /// Save the buffer and run this program on it.
    pub run: Option<String>,
    /// Run this `:` command.
    pub command: Option<String>,
}

impl BindingSpec {
    fn handler(&self) -> Result<Handler> {
        match (&self.run, &self.command) {
            (Some(program), None) => {
                let program = program.clone();
                Ok(Handler::custom(move |event| save_and_execute(event.editor, &program)))
            }
            (None, Some(command)) => {
                let command = command.clone();
                Ok(Handler::custom(move |event| event.editor.execute_command(&command)))
            }
            _ => Err(EditorError::Config(format!(
                "binding {} needs exactly one of run or command",
                self.keys
            ))),
        }
    }

    fn install(&self, editor: &mut Editor) -> Result<()> {
        let filter = match &self.mode {
            Some(mode) => mode.parse()?,
            None => ModeFilter::Normal,
        };
        editor.add_key_binding(&self.keys, filter, self.handler()?)
    }
}

impl RcFile {
    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text)
    }
}

impl Configure for RcFile {
    fn configure(&self, editor: &mut Editor) {
        let mut problems = Vec::new();

        if let Some(name) = &self.colorscheme {
            if Theme::by_name(name).is_some() {
                editor.use_colorscheme(name);
            } else {
                problems.push(format!("Cannot find color scheme: {}", name));
            }
        }

        for entry in &self.set {
            let (option, value) = match entry.split_once('=') {
                Some((option, value)) => (option.trim(), Some(value.trim())),
                None => (entry.trim(), None),
            };
            if let Err(err) = editor.set_default_option(option, value) {
                problems.push(format!("set {}: {}", entry, err));
            }
        }

        let mut table = ExtensionTable::default();
        for (extension, settings) in &self.filetypes {
            table.insert(extension.trim_start_matches('.'), *settings);
        }
        if !table.is_empty() {
            editor.add_open_buffer_observer(Box::new(table));
        }

        for (filetype, command) in &self.lint {
            editor.linter.set(filetype, command.clone());
        }

        for binding in &self.bindings {
            match binding.install(editor) {
                Ok(()) => debug!(target: "config", keys = %binding.keys, "binding_installed"),
                Err(err) => problems.push(err.to_string()),
            }
        }

        if !problems.is_empty() {
            let err = EditorError::Config(problems.join("; "));
            warn!(target: "config", %err, "rc_problems");
            editor.show_message(err.to_string());
        }
    }
}

/// Where the rc file comes from, as chosen with `-u`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RcSource {
    Default,
    Path(PathBuf),
    Disabled,
}

impl RcSource {
    /// `-u NONE` disables configuration.
    pub fn from_arg(arg: Option<&str>) -> Self {
        match arg {
            None => RcSource::Default,
            Some("NONE") => RcSource::Disabled,
            Some(path) => RcSource::Path(PathBuf::from(path)),
        }
    }
}

pub fn default_rc_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("vireo").join("vireorc.toml"))
}

/// Load and apply the rc file. A missing default file is not an error;
/// anything else that goes wrong ends up in the message line.
pub fn run_rc_file(editor: &mut Editor, source: &RcSource) {
    let path = match source {
        RcSource::Disabled => {
            debug!(target: "config", "rc_disabled");
            return;
        }
        RcSource::Default => match default_rc_path() {
            Some(path) if path.exists() => path,
            _ => {
                debug!(target: "config", "no_rc_file");
                return;
            }
        },
        RcSource::Path(path) => path.clone(),
    };

    match RcFile::load(&path) {
        Ok(rc) => {
            info!(target: "config", file = %path.display(), "rc_loaded");
            rc.configure(editor);
        }
        Err(err) => {
            let err = EditorError::Config(format!("{}: {}", path.display(), err));
            warn!(target: "config", %err, "rc_failed");
            editor.show_message(err.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keymap::parse_keys;
    use crate::tools::NO_FILENAME_MESSAGE;

    const RC: &str = r#"
colorscheme = "vim"
set = ["number", "ts=2", "noexpandtab"]

[filetypes.cfg]
tabstop = 8

[[bindings]]
keys = "<F9>"
run = "python3"

[[bindings]]
keys = ",w"
command = "w"

[lint.rust]
program = "cargo"
args = ["clippy"]
"#;

    fn press(editor: &mut Editor, notation: &str) {
        for key in parse_keys(notation).unwrap() {
            editor.handle_key(key);
        }
    }

    #[test]
    fn full_rc_is_applied() {
        let rc = RcFile::parse(RC).unwrap();
        let mut editor = Editor::new();
        rc.configure(&mut editor);

        assert_eq!(editor.message(), None);
        assert_eq!(editor.theme.name, "vim");
        assert!(editor.settings.show_line_numbers);
        assert_eq!(editor.settings.buffer_defaults.tabstop, 2);
        assert!(!editor.settings.buffer_defaults.expandtab);
        // The startup buffer has no location and follows the new defaults.
        assert_eq!(editor.active_buffer().settings.tabstop, 2);
        assert_eq!(
            editor.linter.command_for("rust"),
            Some(&LintCommand {
                program: "cargo".into(),
                args: vec!["clippy".into()]
            })
        );
    }

    #[test]
    fn rc_filetypes_run_after_builtin_table() {
        let dir = tempfile::tempdir().unwrap();
        let rc = RcFile::parse(RC).unwrap();
        let mut editor = Editor::new();
        rc.configure(&mut editor);

        editor.open_location(&dir.path().join("setup.cfg"), true);
        assert_eq!(editor.active_buffer().settings.tabstop, 8);
        assert_eq!(editor.active_buffer().settings.shiftwidth, 4);

        editor.open_location(&dir.path().join("data.json"), true);
        assert_eq!(editor.active_buffer().settings.tabstop, 2);
    }

    #[test]
    fn rc_bindings_run_commands_and_tools() {
        let rc = RcFile::parse(RC).unwrap();
        let mut editor = Editor::new();
        rc.configure(&mut editor);

        press(&mut editor, ",w");
        assert_eq!(editor.message(), Some("No file name"));

        press(&mut editor, "<F9>");
        assert_eq!(editor.message(), Some(NO_FILENAME_MESSAGE));
        assert!(editor.take_jobs().is_empty());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(RcFile::parse("colour = \"vim\"").is_err());
        assert!(RcFile::parse("[[bindings]]\nkeys = \"x\"\nrun = \"sh\"\nextra = 1").is_err());
    }

    #[test]
    fn problems_are_collected_and_the_rest_applies() {
        let rc = RcFile::parse(
            r#"
colorscheme = "nosuch"
set = ["bogus", "sw=3"]

[[bindings]]
keys = "<F5>"
run = "sh"
command = "w"

[[bindings]]
keys = "<F6>"
mode = "visual"
command = "w"
"#,
        )
        .unwrap();
        let mut editor = Editor::new();
        rc.configure(&mut editor);

        assert_eq!(editor.settings.buffer_defaults.shiftwidth, 3);
        assert_eq!(editor.theme.name, "default");
        let message = editor.message().unwrap();
        assert!(message.starts_with("Configuration error: Cannot find color scheme: nosuch"));
        assert!(message.contains("set bogus: Unknown option: bogus"));
        assert!(message.contains("binding <F5> needs exactly one of run or command"));
        assert!(message.contains("Unknown mode: visual"));
    }

    #[test]
    fn duplicate_user_bindings_conflict() {
        let rc = RcFile::parse(
            "[[bindings]]\nkeys = \"<F5>\"\ncommand = \"w\"\n\n[[bindings]]\nkeys = \"<F5>\"\ncommand = \"q\"\n",
        )
        .unwrap();
        let mut editor = Editor::new();
        rc.configure(&mut editor);
        assert!(editor.message().unwrap().contains("already registered"));
    }

    #[test]
    fn rc_sources() {
        assert_eq!(RcSource::from_arg(None), RcSource::Default);
        assert_eq!(RcSource::from_arg(Some("NONE")), RcSource::Disabled);

        let mut editor = Editor::new();
        run_rc_file(&mut editor, &RcSource::Disabled);
        assert_eq!(editor.message(), None);

        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        run_rc_file(&mut editor, &RcSource::Path(missing));
        assert!(editor.message().unwrap().starts_with("Configuration error:"));

        let path = dir.path().join("vireorc.toml");
        fs::write(&path, "set = [\"rnu\"]\n").unwrap();
        let mut editor = Editor::new();
        run_rc_file(&mut editor, &RcSource::from_arg(path.to_str()));
        assert!(editor.settings.relative_number);
        assert_eq!(editor.message(), None);
    }
}
