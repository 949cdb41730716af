//! Discovery of a compiler's predefined preprocessor macros.

use crate::error::ScanError;
use std::collections::BTreeSet;
use std::process::Command;

/// Asks a compiler which macros it predefines.
pub trait MacroQuery {
    /// Runs `command` and returns the names of the macros it reports.
    ///
    /// An empty command yields an empty set.
    fn predefined_macros(&self, command: &[String]) -> Result<BTreeSet<String>, ScanError>;
}

/// Runs the query as a child process and reads `#define NAME ...` lines from
/// its standard output.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessMacroQuery;

impl MacroQuery for ProcessMacroQuery {
    fn predefined_macros(&self, command: &[String]) -> Result<BTreeSet<String>, ScanError> {
        let Some((program, args)) = command.split_first() else {
            return Ok(BTreeSet::new());
        };
        let rendered = command.join(" ");
        tracing::debug!(command = %rendered, "querying predefined macros");
        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|e| ScanError::MacroQuery {
                command: rendered.clone(),
                reason: e.to_string(),
            })?;
        if !output.status.success() {
            return Err(ScanError::MacroQuery {
                command: rendered,
                reason: output.status.to_string(),
            });
        }
        Ok(parse_define_lines(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Extracts macro names from `#define NAME [value]` lines.
///
/// Function-like macros contribute their name without the parameter list.
pub fn parse_define_lines(text: &str) -> BTreeSet<String> {
    text.lines()
        .filter_map(|line| {
            let rest = line.trim_start().strip_prefix('#')?;
            let rest = rest.trim_start().strip_prefix("define")?;
            if !rest.starts_with([' ', '\t']) {
                return None;
            }
            let name: String = rest
                .trim_start()
                .chars()
                .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
                .collect();
            (!name.is_empty()).then_some(name)
        })
        .collect()
}
