//! Parsing of `:` command lines.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::error::{EditorError, Result};

/// Commands whose single argument is a location. All of them also work
/// without one.
pub const LOCATION_COMMANDS: &[&str] = &[
    "w", "write", "wq", "wqa", "e", "edit", "o", "open", "n", "next", "p", "previous", "badd",
    "sp", "split", "vsp", "vsplit", "tabe", "tabedit", "tabnew", "cd",
];

/// One end of a line range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineSpec {
    /// One-based line number.
    Number(usize),
    /// `.`
    Current,
    /// `$`
    Last,
    /// `'x`
    Mark(char),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRange {
    pub start: LineSpec,
    pub end: Option<LineSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExCommand {
    Empty,
    /// One-based, as typed.
    GoToLine(usize),
    Shell(String),
    Set {
        option: Option<String>,
        value: Option<String>,
    },
    Colorscheme(Option<String>),
    Substitute {
        range: Option<LineRange>,
        search: String,
        replace: Option<String>,
        global: bool,
    },
    Yank {
        range: Option<LineRange>,
    },
    Delete {
        range: Option<LineRange>,
    },
    Copy {
        range: Option<LineRange>,
        target: LineSpec,
    },
    /// Everything else: `name[!] [argument]`.
    Named {
        name: String,
        force: bool,
        arg: Option<String>,
    },
}

const RANGE: &str = r"(?:(?P<all>%)|(?P<start>\d+|\.|'[a-z])(?:,(?P<end>\d+|\.|'[a-z]|\$))?)?";

fn pattern(body: &str) -> Regex {
    Regex::new(&format!("^{}$", body.replace("{range}", RANGE))).expect("command pattern compiles")
}

static SUBSTITUTE: Lazy<Regex> = Lazy::new(|| {
    pattern(r"{range}(?:s|substitute)\s*/(?P<search>[^/]*)(?:/(?P<replace>[^/]*)(?P<flags>/g?)?)?")
});
static YANK: Lazy<Regex> = Lazy::new(|| pattern(r"{range}ya(?:nk)?"));
static DELETE: Lazy<Regex> = Lazy::new(|| pattern(r"{range}d(?:elete)?"));
static COPY: Lazy<Regex> =
    Lazy::new(|| pattern(r"{range}co(?:py)?\s*(?P<target>\d+|\.|'[a-z]|\$)"));
static LOCATION: Lazy<Regex> =
    Lazy::new(|| pattern(r"(?P<name>[a-z]+)(?P<force>!?)\s+(?P<location>\S+)"));
static BUFFER: Lazy<Regex> = Lazy::new(|| pattern(r"(?:b|buffer)(?P<force>!?)\s+(?P<name>\S+)"));
static GO_TO_LINE: Lazy<Regex> = Lazy::new(|| pattern(r"(?P<line>\d+)"));
static SET: Lazy<Regex> =
    Lazy::new(|| pattern(r"set(?:\s+(?P<option>[^\s=]+)(?:=(?P<value>\S*))?)?"));
static COLORSCHEME: Lazy<Regex> =
    Lazy::new(|| pattern(r"colo(?:rscheme)?(?:\s+(?P<name>\S+))?"));
static SHELL: Lazy<Regex> = Lazy::new(|| pattern(r"!(?P<command>.*)"));
static GENERIC: Lazy<Regex> = Lazy::new(|| pattern(r"(?P<name>[^\s!]+)(?P<force>!?)"));

/// Parse one command line. Leading colons and surrounding whitespace are ignored.
pub fn parse(input: &str) -> Result<ExCommand> {
    let line = input.trim_start().trim_start_matches(':').trim();
    if line.is_empty() {
        return Ok(ExCommand::Empty);
    }

    if let Some(caps) = GO_TO_LINE.captures(line) {
        let n = caps["line"]
            .parse()
            .map_err(|_| EditorError::CommandParse(input.trim().to_string()))?;
        return Ok(ExCommand::GoToLine(n));
    }
    if let Some(caps) = SHELL.captures(line) {
        return Ok(ExCommand::Shell(caps["command"].trim().to_string()));
    }
    if let Some(caps) = SUBSTITUTE.captures(line) {
        return Ok(ExCommand::Substitute {
            range: range(&caps),
            search: caps["search"].to_string(),
            replace: caps.name("replace").map(|m| m.as_str().to_string()),
            global: caps.name("flags").map_or(false, |m| m.as_str() == "/g"),
        });
    }
    if let Some(caps) = YANK.captures(line) {
        return Ok(ExCommand::Yank { range: range(&caps) });
    }
    if let Some(caps) = DELETE.captures(line) {
        return Ok(ExCommand::Delete { range: range(&caps) });
    }
    if let Some(caps) = COPY.captures(line) {
        if let Some(target) = line_spec(&caps["target"]) {
            return Ok(ExCommand::Copy {
                range: range(&caps),
                target,
            });
        }
    }
    if let Some(caps) = SET.captures(line) {
        return Ok(ExCommand::Set {
            option: caps.name("option").map(|m| m.as_str().to_string()),
            value: caps.name("value").map(|m| m.as_str().to_string()),
        });
    }
    if let Some(caps) = COLORSCHEME.captures(line) {
        return Ok(ExCommand::Colorscheme(
            caps.name("name").map(|m| m.as_str().to_string()),
        ));
    }
    if let Some(caps) = BUFFER.captures(line) {
        return Ok(ExCommand::Named {
            name: "b".to_string(),
            force: !caps["force"].is_empty(),
            arg: Some(caps["name"].to_string()),
        });
    }
    if let Some(caps) = LOCATION.captures(line) {
        if LOCATION_COMMANDS.contains(&&caps["name"]) {
            return Ok(ExCommand::Named {
                name: caps["name"].to_string(),
                force: !caps["force"].is_empty(),
                arg: Some(caps["location"].to_string()),
            });
        }
    }
    if let Some(caps) = GENERIC.captures(line) {
        return Ok(ExCommand::Named {
            name: caps["name"].to_string(),
            force: !caps["force"].is_empty(),
            arg: None,
        });
    }
    Err(EditorError::CommandParse(input.trim().to_string()))
}

fn range(caps: &Captures<'_>) -> Option<LineRange> {
    if caps.name("all").is_some() {
        return Some(LineRange {
            start: LineSpec::Number(1),
            end: Some(LineSpec::Last),
        });
    }
    let start = line_spec(caps.name("start")?.as_str())?;
    let end = caps.name("end").and_then(|m| line_spec(m.as_str()));
    Some(LineRange { start, end })
}

fn line_spec(text: &str) -> Option<LineSpec> {
    match text {
        "." => Some(LineSpec::Current),
        "$" => Some(LineSpec::Last),
        _ => match text.strip_prefix('\'') {
            Some(mark) => mark.chars().next().map(LineSpec::Mark),
            None => text.parse().ok().map(LineSpec::Number),
        },
    }
}

/// Turn a `:s` replacement into a `regex` template: `\1` becomes a group
/// reference, `$` is literal.
pub fn replacement_template(replace: &str) -> String {
    let mut out = String::with_capacity(replace.len());
    let mut chars = replace.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '$' => out.push_str("$$"),
            '\\' => match chars.next() {
                Some(d) if d.is_ascii_digit() => {
                    out.push_str("${");
                    out.push(d);
                    out.push('}');
                }
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('$') => out.push_str("$$"),
                Some(other) => out.push(other),
                None => out.push('\\'),
            },
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str, force: bool, arg: Option<&str>) -> ExCommand {
        ExCommand::Named {
            name: name.into(),
            force,
            arg: arg.map(str::to_string),
        }
    }

    #[test]
    fn empty_and_leading_colons() {
        assert_eq!(parse("").unwrap(), ExCommand::Empty);
        assert_eq!(parse("  ").unwrap(), ExCommand::Empty);
        assert_eq!(parse("::  q  ").unwrap(), named("q", false, None));
    }

    #[test]
    fn plain_and_forced_commands() {
        assert_eq!(parse("wq!").unwrap(), named("wq", true, None));
        assert_eq!(parse("w notes.txt").unwrap(), named("w", false, Some("notes.txt")));
        assert_eq!(parse("e! #").unwrap(), named("e", true, Some("#")));
        assert_eq!(parse("b! 2").unwrap(), named("b", true, Some("2")));
        assert_eq!(parse("buffer main.rs").unwrap(), named("b", false, Some("main.rs")));
    }

    #[test]
    fn arguments_only_for_location_commands() {
        assert!(matches!(parse("q foo"), Err(EditorError::CommandParse(s)) if s == "q foo"));
        assert_eq!(parse("tabnew ~/x").unwrap(), named("tabnew", false, Some("~/x")));
    }

    #[test]
    fn go_to_line_and_shell() {
        assert_eq!(parse("42").unwrap(), ExCommand::GoToLine(42));
        assert_eq!(parse("!ls -l").unwrap(), ExCommand::Shell("ls -l".into()));
    }

    #[test]
    fn set_and_colorscheme() {
        assert_eq!(
            parse("set ts=2").unwrap(),
            ExCommand::Set {
                option: Some("ts".into()),
                value: Some("2".into())
            }
        );
        assert_eq!(
            parse("set nonu").unwrap(),
            ExCommand::Set {
                option: Some("nonu".into()),
                value: None
            }
        );
        assert_eq!(parse("set").unwrap(), ExCommand::Set { option: None, value: None });
        assert_eq!(parse("colo vim").unwrap(), ExCommand::Colorscheme(Some("vim".into())));
        assert_eq!(parse("colorscheme").unwrap(), ExCommand::Colorscheme(None));
    }

    #[test]
    fn substitute_forms() {
        assert_eq!(
            parse("s/a/b/").unwrap(),
            ExCommand::Substitute {
                range: None,
                search: "a".into(),
                replace: Some("b".into()),
                global: false
            }
        );
        assert_eq!(
            parse("2,$substitute /x/y/g").unwrap(),
            ExCommand::Substitute {
                range: Some(LineRange {
                    start: LineSpec::Number(2),
                    end: Some(LineSpec::Last)
                }),
                search: "x".into(),
                replace: Some("y".into()),
                global: true
            }
        );
        assert_eq!(
            parse("'a,.s/foo").unwrap(),
            ExCommand::Substitute {
                range: Some(LineRange {
                    start: LineSpec::Mark('a'),
                    end: Some(LineSpec::Current)
                }),
                search: "foo".into(),
                replace: None,
                global: false
            }
        );
        assert!(matches!(
            parse("%s//z/g").unwrap(),
            ExCommand::Substitute { range: Some(LineRange { start: LineSpec::Number(1), end: Some(LineSpec::Last) }), .. }
        ));
    }

    #[test]
    fn line_commands() {
        assert_eq!(parse("d").unwrap(), ExCommand::Delete { range: None });
        assert_eq!(
            parse("3,5yank").unwrap(),
            ExCommand::Yank {
                range: Some(LineRange {
                    start: LineSpec::Number(3),
                    end: Some(LineSpec::Number(5))
                })
            }
        );
        assert_eq!(
            parse(".co$").unwrap(),
            ExCommand::Copy {
                range: Some(LineRange {
                    start: LineSpec::Current,
                    end: None
                }),
                target: LineSpec::Last
            }
        );
        assert_eq!(parse("dw").unwrap(), named("dw", false, None));
    }

    #[test]
    fn replacement_templates() {
        assert_eq!(replacement_template(r"\1-\2"), "${1}-${2}");
        assert_eq!(replacement_template("cost $5"), "cost $$5");
        assert_eq!(replacement_template(r"a\\b\n"), "a\\b\n");
    }
}
