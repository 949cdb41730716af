//! Build-time helpers called from generated recipes.

use std::fs::OpenOptions;
use std::time::SystemTime;

use mkdep_depends::{copy_module, ModuleComparison};
use mkdep_diagnostics::code::UNEXPECTED_MODULE_FORMAT;
use mkdep_diagnostics::{Diagnostic, Location};

use crate::report::render_text;
use crate::{CopyModArgs, GlobalArgs, TouchArgs};

/// Runs `mkdep copy-mod`: refreshes the stamp when the module changed.
pub fn copy_mod(args: &CopyModArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    match copy_module(&args.module, &args.stamp, args.compiler_id.as_deref()) {
        Ok(outcome) => {
            if outcome.comparison == ModuleComparison::UnexpectedFormat {
                let compiler = args.compiler_id.as_deref().unwrap_or("unknown");
                render_text(
                    &[Diagnostic::warning(
                        UNEXPECTED_MODULE_FORMAT,
                        format!("module file does not look like {compiler} compiler output"),
                    )
                    .at(Location::file(&outcome.module))
                    .with_note("treated as changed; the stamp was refreshed")],
                    global,
                );
            }
            Ok(0)
        }
        Err(e) => {
            render_text(&[e.to_diagnostic()], global);
            Ok(1)
        }
    }
}

/// Runs `mkdep touch`: creates the file or bumps its modification time.
pub fn touch(args: &TouchArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let path = &args.file;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| format!("cannot touch {}: {e}", path.display()))?;
    file.set_modified(SystemTime::now())
        .map_err(|e| format!("cannot touch {}: {e}", path.display()))?;
    Ok(0)
}
