//! File type detection and a small line tokenizer for highlighting.

use std::ffi::OsStr;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Plain,
    Python,
    Rust,
    C,
    Go,
    JavaScript,
    Shell,
}

impl Language {
    pub fn name(self) -> &'static str {
        use Language::*;
        match self {
            Plain => "plain",
            Python => "python",
            Rust => "rust",
            C => "c",
            Go => "go",
            JavaScript => "javascript",
            Shell => "sh",
        }
    }

    fn file_exts(self) -> &'static [&'static str] {
        use Language::*;
        match self {
            Plain => &[],
            Python => &["py", "pyw"],
            Rust => &["rs"],
            C => &["c", "h", "cpp", "hpp", "cc"],
            Go => &["go"],
            JavaScript => &["js", "mjs", "ts"],
            Shell => &["sh", "bash", "zsh"],
        }
    }

    pub fn detect<P: AsRef<Path>>(path: P) -> Language {
        use Language::*;
        if let Some(ext) = path.as_ref().extension().and_then(OsStr::to_str) {
            for lang in [Python, Rust, C, Go, JavaScript, Shell] {
                if lang.file_exts().contains(&ext) {
                    return lang;
                }
            }
        }
        Plain
    }

    /// Language for a `filetype` name, as set by `:set ft=...`.
    pub fn from_name(name: &str) -> Language {
        use Language::*;
        [Python, Rust, C, Go, JavaScript, Shell]
            .into_iter()
            .find(|lang| lang.name() == name)
            .unwrap_or(Plain)
    }

    /// The file type recorded on a buffer; plain text has none.
    pub fn filetype(self) -> Option<String> {
        match self {
            Language::Plain => None,
            lang => Some(lang.name().to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Highlight {
    Normal,
    Keyword,
    Type,
    String,
    Number,
    Comment,
}

struct Syntax {
    string_quotes: &'static [char],
    line_comment: Option<&'static str>,
    block_comment: Option<(&'static str, &'static str)>,
    keywords: &'static [&'static str],
    types: &'static [&'static str],
}

const PLAIN: Syntax = Syntax {
    string_quotes: &[],
    line_comment: None,
    block_comment: None,
    keywords: &[],
    types: &[],
};

const PYTHON: Syntax = Syntax {
    string_quotes: &['"', '\''],
    line_comment: Some("#"),
    block_comment: None,
    keywords: &[
        "and", "as", "assert", "async", "await", "break", "class", "continue", "def", "del",
        "elif", "else", "except", "finally", "for", "from", "global", "if", "import", "in", "is",
        "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try", "while", "with",
        "yield", "None", "True", "False",
    ],
    types: &["int", "float", "str", "bytes", "bool", "list", "dict", "set", "tuple", "object"],
};

const RUST: Syntax = Syntax {
    string_quotes: &['"'],
    line_comment: Some("//"),
    block_comment: Some(("/*", "*/")),
    keywords: &[
        "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum",
        "extern", "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move",
        "mut", "pub", "ref", "return", "self", "Self", "static", "struct", "super", "trait",
        "true", "type", "unsafe", "use", "where", "while",
    ],
    types: &[
        "i8", "i16", "i32", "i64", "i128", "isize", "u8", "u16", "u32", "u64", "u128", "usize",
        "f32", "f64", "bool", "char", "str", "String", "Vec", "Option", "Result", "Box",
    ],
};

const C: Syntax = Syntax {
    string_quotes: &['"', '\''],
    line_comment: Some("//"),
    block_comment: Some(("/*", "*/")),
    keywords: &[
        "break", "case", "const", "continue", "default", "do", "else", "enum", "extern", "for",
        "goto", "if", "inline", "return", "sizeof", "static", "struct", "switch", "typedef",
        "union", "volatile", "while",
    ],
    types: &["char", "double", "float", "int", "long", "short", "signed", "unsigned", "void"],
};

const GO: Syntax = Syntax {
    string_quotes: &['"', '\'', '`'],
    line_comment: Some("//"),
    block_comment: Some(("/*", "*/")),
    keywords: &[
        "break", "case", "chan", "const", "continue", "default", "defer", "else", "fallthrough",
        "for", "func", "go", "goto", "if", "import", "interface", "map", "package", "range",
        "return", "select", "struct", "switch", "type", "var", "nil", "true", "false",
    ],
    types: &[
        "bool", "byte", "error", "float32", "float64", "int", "int32", "int64", "rune", "string",
        "uint", "uint32", "uint64",
    ],
};

const JAVASCRIPT: Syntax = Syntax {
    string_quotes: &['"', '\'', '`'],
    line_comment: Some("//"),
    block_comment: Some(("/*", "*/")),
    keywords: &[
        "async", "await", "break", "case", "catch", "class", "const", "continue", "default",
        "delete", "do", "else", "export", "extends", "finally", "for", "function", "if", "import",
        "in", "instanceof", "let", "new", "of", "return", "switch", "this", "throw", "try",
        "typeof", "var", "while", "yield", "null", "undefined", "true", "false",
    ],
    types: &["Array", "Object", "String", "Number", "Boolean", "Promise", "Map", "Set"],
};

const SHELL: Syntax = Syntax {
    string_quotes: &['"', '\''],
    line_comment: Some("#"),
    block_comment: None,
    keywords: &[
        "if", "then", "else", "elif", "fi", "for", "while", "do", "done", "case", "esac", "in",
        "function", "return", "local", "export",
    ],
    types: &[],
};

impl Syntax {
    fn for_lang(lang: Language) -> &'static Syntax {
        match lang {
            Language::Plain => &PLAIN,
            Language::Python => &PYTHON,
            Language::Rust => &RUST,
            Language::C => &C,
            Language::Go => &GO,
            Language::JavaScript => &JAVASCRIPT,
            Language::Shell => &SHELL,
        }
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Tokenizes lines in order, carrying block comment state across them.
pub struct Highlighter {
    syntax: &'static Syntax,
    plain: bool,
    in_block_comment: bool,
}

impl Highlighter {
    pub fn new(lang: Language) -> Self {
        Self {
            syntax: Syntax::for_lang(lang),
            plain: lang == Language::Plain,
            in_block_comment: false,
        }
    }

    /// One class per char of `line`.
    pub fn line(&mut self, line: &str) -> Vec<Highlight> {
        let chars: Vec<char> = line.chars().collect();
        let mut out = vec![Highlight::Normal; chars.len()];
        if self.plain {
            return out;
        }

        let starts_with = |at: usize, s: &str| {
            let pattern: Vec<char> = s.chars().collect();
            chars[at..].starts_with(&pattern)
        };

        let mut i = 0;
        while i < chars.len() {
            if self.in_block_comment {
                let end = self.syntax.block_comment.map(|(_, e)| e).unwrap_or("*/");
                if starts_with(i, end) {
                    let n = end.chars().count();
                    out[i..i + n].fill(Highlight::Comment);
                    i += n;
                    self.in_block_comment = false;
                } else {
                    out[i] = Highlight::Comment;
                    i += 1;
                }
                continue;
            }

            let c = chars[i];
            if let Some((start, _)) = self.syntax.block_comment {
                if starts_with(i, start) {
                    let n = start.chars().count();
                    out[i..i + n].fill(Highlight::Comment);
                    i += n;
                    self.in_block_comment = true;
                    continue;
                }
            }
            if let Some(leader) = self.syntax.line_comment {
                if starts_with(i, leader) {
                    out[i..].fill(Highlight::Comment);
                    break;
                }
            }
            if self.syntax.string_quotes.contains(&c) {
                let mut j = i + 1;
                while j < chars.len() && chars[j] != c {
                    if chars[j] == '\\' {
                        j += 1;
                    }
                    j += 1;
                }
                let end = (j + 1).min(chars.len());
                out[i..end].fill(Highlight::String);
                i = end;
                continue;
            }
            if c.is_ascii_digit() && (i == 0 || !is_ident_char(chars[i - 1])) {
                let mut j = i;
                while j < chars.len() && (chars[j].is_ascii_alphanumeric() || chars[j] == '.' || chars[j] == '_') {
                    j += 1;
                }
                out[i..j].fill(Highlight::Number);
                i = j;
                continue;
            }
            if is_ident_char(c) {
                let mut j = i;
                while j < chars.len() && is_ident_char(chars[j]) {
                    j += 1;
                }
                let word: String = chars[i..j].iter().collect();
                let hl = if self.syntax.keywords.contains(&word.as_str()) {
                    Highlight::Keyword
                } else if self.syntax.types.contains(&word.as_str()) {
                    Highlight::Type
                } else {
                    Highlight::Normal
                };
                out[i..j].fill(hl);
                i = j;
                continue;
            }
            i += 1;
        }
        out
    }
}
