//! The clean script removing a target's compiled modules.

use std::fmt::Write as _;
use std::path::Path;

use mkdep_make::PathNormalizer;

use crate::resolver::stamp_file;

/// File name of the module clean script.
pub const CLEAN_SCRIPT_FILE: &str = "cmake_clean_Fortran.cmake";

/// Renders a `FILE(REMOVE ...)` script listing, for every provided module,
/// both spellings of its `.mod` file in `module_dir` and its stamp in
/// `stamp_dir`. Paths are relative to `base` where possible.
///
/// Returns `None` when nothing is provided.
pub fn render_clean_script<'a>(
    modules: impl IntoIterator<Item = &'a str>,
    module_dir: &Path,
    stamp_dir: &Path,
    base: &Path,
    normalizer: &PathNormalizer,
) -> Option<String> {
    let mut body = String::new();
    for module in modules {
        let lower = module_dir.join(format!("{}.mod", module.to_lowercase()));
        let upper = module_dir.join(format!("{}.mod", module.to_uppercase()));
        let stamp = stamp_file(stamp_dir, module);
        for path in [&lower, &upper, &stamp] {
            let _ = writeln!(body, "  \"{}\"", normalizer.relativize(base, path));
        }
    }
    if body.is_empty() {
        return None;
    }
    Some(format!(
        "# Remove fortran modules provided by this target.\nFILE(REMOVE\n{body}  )\n"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mkdep_config::DialectKind;
    use mkdep_make::ShellDialect;

    fn normalizer() -> PathNormalizer {
        PathNormalizer::new(
            Path::new("/p/src"),
            Path::new("/p/build"),
            ShellDialect::new(DialectKind::Posix, false),
        )
    }

    #[test]
    fn lists_both_spellings_and_stamp() {
        let script = render_clean_script(
            ["alpha"],
            Path::new("/p/build/mods"),
            Path::new("/p/build/MkdepFiles/app.dir"),
            Path::new("/p/build"),
            &normalizer(),
        )
        .unwrap();
        assert_eq!(
            script,
            "# Remove fortran modules provided by this target.\n\
             FILE(REMOVE\n  \"mods/alpha.mod\"\n  \"mods/ALPHA.mod\"\n  \
             \"MkdepFiles/app.dir/alpha.mod.stamp\"\n  )\n"
        );
    }

    #[test]
    fn nothing_provided_no_script() {
        let script = render_clean_script(
            std::iter::empty(),
            Path::new("/p/build"),
            Path::new("/p/build/app.dir"),
            Path::new("/p/build"),
            &normalizer(),
        );
        assert!(script.is_none());
    }
}
