//! Quoting and path conventions of the supported `make` flavours.

use mkdep_config::DialectKind;

/// The shell and path conventions of one `make` flavour.
///
/// Selected once per generation pass from the directory descriptor and
/// passed by value wherever text is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShellDialect {
    kind: DialectKind,
    unix_paths: bool,
}

impl ShellDialect {
    /// Creates the dialect for `kind`. With `force_unix_paths`, Windows
    /// flavours keep forward slashes and backslash-escaped spaces.
    pub fn new(kind: DialectKind, force_unix_paths: bool) -> Self {
        Self {
            kind,
            unix_paths: kind == DialectKind::Posix || force_unix_paths,
        }
    }

    /// The flavour this dialect was built for.
    pub fn kind(&self) -> DialectKind {
        self.kind
    }

    /// The directory separator written into generated text.
    pub fn path_separator(&self) -> char {
        if self.unix_paths {
            '/'
        } else {
            '\\'
        }
    }

    /// Whether `.PHONY` declarations are understood.
    pub fn supports_phony_targets(&self) -> bool {
        self.kind != DialectKind::WatcomWmake
    }

    /// Operator running a second command only after the first succeeded.
    pub fn command_chain_operator(&self) -> &'static str {
        match self.kind {
            DialectKind::Posix | DialectKind::WindowsCmd => " && ",
            DialectKind::WatcomWmake => " & ",
        }
    }

    /// Quotes one command argument for the shell the recipes run in.
    ///
    /// Arguments without special characters are returned unchanged.
    pub fn quote(&self, arg: &str) -> String {
        match self.kind {
            DialectKind::Posix => {
                const SPECIAL: &[char] = &[
                    ' ', '\t', '"', '\'', '\\', '$', '&', ';', '|', '<', '>', '(', ')', '*',
                    '?', '#', '`', '~', '[', ']', '{', '}', '!',
                ];
                if !arg.is_empty() && !arg.contains(SPECIAL) {
                    return arg.to_string();
                }
                let mut out = String::with_capacity(arg.len() + 2);
                out.push('"');
                for c in arg.chars() {
                    if matches!(c, '"' | '\\' | '`') {
                        out.push('\\');
                    }
                    if c == '$' {
                        // make expands `$` before the shell sees it
                        out.push_str("$$");
                        continue;
                    }
                    out.push(c);
                }
                out.push('"');
                out
            }
            DialectKind::WindowsCmd => {
                const SPECIAL: &[char] = &[' ', '\t', '"', '&', '|', '<', '>', '^', '%'];
                if !arg.is_empty() && !arg.contains(SPECIAL) {
                    return arg.to_string();
                }
                format!("\"{}\"", arg.replace('"', "\"\""))
            }
            DialectKind::WatcomWmake => {
                if !arg.is_empty() && !arg.contains([' ', '\t', '\'']) {
                    return arg.to_string();
                }
                let quoted = format!("'{}'", arg.replace('\'', "''"));
                if self.unix_paths {
                    format!("\"{quoted}\"")
                } else {
                    quoted
                }
            }
        }
    }

    /// Converts a path to the spelling used in rules.
    ///
    /// Unix spelling collapses repeated slashes (except a leading `//`) and
    /// escapes spaces with a backslash. Windows spelling turns slashes into
    /// backslashes, collapses repeated backslashes after the first position,
    /// and double-quotes paths containing spaces.
    pub fn output_path(&self, path: &str) -> String {
        if self.unix_paths {
            unix_output_path(path)
        } else {
            windows_output_path(path)
        }
    }
}

fn unix_output_path(path: &str) -> String {
    let mut collapsed = String::with_capacity(path.len());
    for (i, c) in path.chars().enumerate() {
        if c == '/' && i > 1 && collapsed.ends_with('/') {
            continue;
        }
        collapsed.push(c);
    }
    if !collapsed.contains(' ') {
        return collapsed;
    }
    let mut out = String::with_capacity(collapsed.len() + 4);
    let mut last = '\0';
    for c in collapsed.chars() {
        if c == ' ' && last != '\\' {
            out.push('\\');
        }
        out.push(c);
        last = c;
    }
    out
}

fn windows_output_path(path: &str) -> String {
    let converted = path.replace('/', "\\");
    if converted.len() < 2 {
        return converted;
    }
    let start = if converted.starts_with('"') { 2 } else { 1 };
    let mut out = String::with_capacity(converted.len() + 2);
    for (i, c) in converted.chars().enumerate() {
        if c == '\\' && i > start && out.ends_with('\\') {
            continue;
        }
        out.push(c);
    }
    if out.contains(' ') && !out.starts_with('"') {
        out.insert(0, '"');
        out.push('"');
    }
    out
}
