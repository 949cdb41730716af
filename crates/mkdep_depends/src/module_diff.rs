//! Comparing compiled module files with their stamps.
//!
//! Several compilers write build noise such as timestamps into module files,
//! so two compiles of an unchanged interface differ byte for byte. Each
//! compiler family gets a rule for which leading part to skip before the
//! rest is compared:
//!
//! | family   | rule                                                        |
//! |----------|-------------------------------------------------------------|
//! | `GNU`    | gzip files are compared decompressed; plain text files after their first line |
//! | `Intel`  | skip one version byte, then everything up to `\n\0`          |
//! | `SunPro` | whole file                                                  |
//! | other    | whole file                                                  |
//!
//! A missing module or stamp always counts as different.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;

use crate::error::DependsError;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// A compiler family with its own module file layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompilerFamily {
    /// GNU Fortran.
    Gnu,
    /// Intel Fortran.
    Intel,
    /// Oracle Developer Studio Fortran.
    SunPro,
    /// Anything else; compared byte for byte.
    Other,
}

impl CompilerFamily {
    /// The family for a compiler identifier.
    pub fn from_id(id: Option<&str>) -> Self {
        match id {
            Some("GNU") => CompilerFamily::Gnu,
            Some("Intel") => CompilerFamily::Intel,
            Some("SunPro") => CompilerFamily::SunPro,
            _ => CompilerFamily::Other,
        }
    }
}

/// The result of comparing a module with its stamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleComparison {
    /// The interfaces are the same.
    Same,
    /// The interfaces differ, or a file is missing.
    Differ,
    /// The module does not look like its compiler's output; treated as
    /// different.
    UnexpectedFormat,
}

/// Compares `module` with `stamp` using the rule of `family`.
pub fn compare_modules(module: &Path, stamp: &Path, family: CompilerFamily) -> ModuleComparison {
    let (Ok(module), Ok(stamp)) = (fs::read(module), fs::read(stamp)) else {
        return ModuleComparison::Differ;
    };
    match family {
        CompilerFamily::Gnu if module.starts_with(&GZIP_MAGIC) => {
            let Some(module) = gunzip(&module) else {
                return ModuleComparison::UnexpectedFormat;
            };
            let stamp = if stamp.starts_with(&GZIP_MAGIC) {
                match gunzip(&stamp) {
                    Some(s) => s,
                    None => return ModuleComparison::Differ,
                }
            } else {
                stamp
            };
            same_or_differ(&module, &stamp)
        }
        CompilerFamily::Gnu => compare_after(&module, &stamp, 0, b"\n"),
        CompilerFamily::Intel => compare_after(&module, &stamp, 1, b"\n\0"),
        CompilerFamily::SunPro | CompilerFamily::Other => same_or_differ(&module, &stamp),
    }
}

/// Returns `true` unless `module` and `stamp` hold the same interface.
pub fn modules_differ(module: &Path, stamp: &Path, compiler_id: Option<&str>) -> bool {
    compare_modules(module, stamp, CompilerFamily::from_id(compiler_id)) != ModuleComparison::Same
}

fn same_or_differ(a: &[u8], b: &[u8]) -> ModuleComparison {
    if a == b {
        ModuleComparison::Same
    } else {
        ModuleComparison::Differ
    }
}

fn gunzip(data: &[u8]) -> Option<Vec<u8>> {
    let mut out = Vec::new();
    GzDecoder::new(data).read_to_end(&mut out).ok()?;
    Some(out)
}

/// Skips `skip` bytes of both buffers, then everything up to and including
/// the first `marker`, and compares what remains.
fn compare_after(module: &[u8], stamp: &[u8], skip: usize, marker: &[u8]) -> ModuleComparison {
    let Some(module_rest) = after_marker(module.get(skip..).unwrap_or(&[]), marker) else {
        return ModuleComparison::UnexpectedFormat;
    };
    let Some(stamp_rest) = after_marker(stamp.get(skip..).unwrap_or(&[]), marker) else {
        return ModuleComparison::Differ;
    };
    same_or_differ(module_rest, stamp_rest)
}

fn after_marker<'a>(data: &'a [u8], marker: &[u8]) -> Option<&'a [u8]> {
    data.windows(marker.len())
        .position(|w| w == marker)
        .map(|pos| &data[pos + marker.len()..])
}

/// What [`copy_module`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyOutcome {
    /// The module file that was compared.
    pub module: PathBuf,
    /// How it compared with the stamp.
    pub comparison: ModuleComparison,
    /// Whether the stamp was replaced.
    pub copied: bool,
}

/// Refreshes `stamp` from the module named by `module_base` (a path without
/// the `.mod` extension) when the interface changed.
///
/// The upper-case file name is tried first, then the lower-case one.
pub fn copy_module(
    module_base: &Path,
    stamp: &Path,
    compiler_id: Option<&str>,
) -> Result<CopyOutcome, DependsError> {
    let name = module_base
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let dir = module_base.parent().unwrap_or_else(|| Path::new(""));
    let upper = dir.join(format!("{}.mod", name.to_uppercase()));
    let lower = dir.join(format!("{}.mod", name.to_lowercase()));

    let module = if upper.is_file() {
        upper
    } else if lower.is_file() {
        lower
    } else {
        return Err(DependsError::MissingModule { upper, lower });
    };

    let comparison = compare_modules(&module, stamp, CompilerFamily::from_id(compiler_id));
    let copied = comparison != ModuleComparison::Same;
    if copied {
        fs::copy(&module, stamp).map_err(|e| DependsError::Io {
            path: stamp.to_path_buf(),
            source: e,
        })?;
        tracing::debug!(
            module = %module.display(),
            stamp = %stamp.display(),
            "module interface changed, stamp refreshed"
        );
    }
    Ok(CopyOutcome {
        module,
        comparison,
        copied,
    })
}
