//! Fortran module dependency scanner.
//!
//! Reads a source and every file it includes inline, applying `#define`,
//! `#undef` and conditional directives as it goes, and records:
//!
//! - modules defined with `MODULE name` (outside interface blocks),
//! - modules used with `USE name` and the ancestor of each `SUBMODULE`,
//! - files pulled in with `INCLUDE`, `#include`, `$include` or `??include`.
//!
//! Includes are searched in the directory of the including file first, then
//! in the include path. An include that cannot be found is skipped.
//!
//! A module, submodule, interface block or conditional still open at the end
//! of the source is a parse error. A bare `END` closes an open module.

pub mod lexer;
pub mod parser;
pub mod token;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use mkdep_common::paths::{collapse, join_collapsed};

use crate::error::ScanError;
use crate::include_chain::{FrameId, IncludeChain};
use crate::scanner::Scanner;
use crate::source_info::SourceInfo;
use lexer::{lex, SourceForm};
use parser::{classify, Conditionals, Statement};
use token::{Directive, FortranToken, Token};

/// The Fortran [`Scanner`].
#[derive(Debug, Default)]
pub struct FortranScanner;

impl FortranScanner {
    /// Creates a scanner.
    pub fn new() -> Self {
        Self
    }
}

impl Scanner for FortranScanner {
    fn scan(
        &mut self,
        source: &Path,
        search_paths: &[PathBuf],
        macros: &BTreeSet<String>,
    ) -> Result<SourceInfo, ScanError> {
        let source = collapse(source);
        let (chain, root) = IncludeChain::new(&source);
        let mut pass = Pass {
            search_paths,
            defines: macros.clone(),
            conditionals: Conditionals::default(),
            open_unit: None,
            open_interface: None,
            chain,
            includes: BTreeSet::new(),
            requires: BTreeSet::new(),
            provides: BTreeSet::new(),
        };
        let form = SourceForm::from_path(&source).unwrap_or(SourceForm::Free);
        let last_line = pass.process(root, form)?;
        if pass.conditionals.depth() > 0 {
            return Err(ScanError::Parse {
                path: source,
                line: last_line,
                reason: "unterminated conditional directive at end of file".to_string(),
            });
        }
        if let Some(open) = pass.open_interface.or(pass.open_unit) {
            return Err(ScanError::Parse {
                path: open.path,
                line: open.line,
                reason: format!("{} is never closed", open.what),
            });
        }
        tracing::trace!(
            source = %source.display(),
            provides = pass.provides.len(),
            requires = pass.requires.len(),
            includes = pass.includes.len(),
            "scanned fortran source"
        );
        Ok(SourceInfo::new(
            source,
            pass.includes,
            pass.requires,
            pass.provides,
        ))
    }
}

/// Where a block that needs an `END` statement was opened.
#[derive(Debug)]
struct OpenBlock {
    what: String,
    path: PathBuf,
    line: u32,
}

/// State of one source scan, shared by every file it includes.
struct Pass<'a> {
    search_paths: &'a [PathBuf],
    defines: BTreeSet<String>,
    conditionals: Conditionals,
    open_unit: Option<OpenBlock>,
    open_interface: Option<OpenBlock>,
    chain: IncludeChain,
    includes: BTreeSet<PathBuf>,
    requires: BTreeSet<String>,
    provides: BTreeSet<String>,
}

impl Pass<'_> {
    /// Reads and interprets the file of `frame`, returning its line count.
    fn process(&mut self, frame: FrameId, form: SourceForm) -> Result<u32, ScanError> {
        let path = self.chain.get(frame).path.clone();
        let bytes = std::fs::read(&path).map_err(|e| ScanError::Open {
            path: path.clone(),
            source: e,
        })?;
        let text = String::from_utf8_lossy(&bytes);
        let tokens = lex(&text, form, &path)?;

        for statement in tokens.split(|t| t.kind == FortranToken::EndOfStatement) {
            let Some(first) = statement.first() else {
                continue;
            };
            if let FortranToken::Directive(directive) = &first.kind {
                self.directive(directive, frame, form, &path, first.line)?;
                continue;
            }
            if !self.conditionals.is_active() {
                continue;
            }
            self.statement(statement, frame, form)?;
        }
        Ok(text.lines().count() as u32)
    }

    fn statement(
        &mut self,
        statement: &[Token],
        frame: FrameId,
        form: SourceForm,
    ) -> Result<(), ScanError> {
        let kinds: Vec<FortranToken> = statement.iter().map(|t| t.kind.clone()).collect();
        let line = statement.first().map_or(0, |t| t.line);
        match classify(&kinds) {
            Statement::Use(name) => {
                self.requires.insert(name);
            }
            Statement::Module(name) => {
                if self.open_interface.is_none() {
                    self.open_unit = Some(self.opened(format!("module `{name}`"), frame, line));
                    self.provides.insert(name);
                }
            }
            Statement::Submodule(ancestor) => {
                self.open_unit = Some(self.opened(format!("submodule of `{ancestor}`"), frame, line));
                self.requires.insert(ancestor);
            }
            Statement::ModuleEnd => self.open_unit = None,
            Statement::End => {
                if self.open_interface.is_none() {
                    self.open_unit = None;
                }
            }
            Statement::Include(name) => self.include(&name, frame, form)?,
            Statement::InterfaceStart => {
                self.open_interface = Some(self.opened("interface block".to_string(), frame, line));
            }
            Statement::InterfaceEnd => self.open_interface = None,
            Statement::Ignored => {}
        }
        Ok(())
    }

    fn opened(&self, what: String, frame: FrameId, line: u32) -> OpenBlock {
        OpenBlock {
            what,
            path: self.chain.get(frame).path.clone(),
            line,
        }
    }

    fn directive(
        &mut self,
        directive: &Directive,
        frame: FrameId,
        form: SourceForm,
        path: &Path,
        line: u32,
    ) -> Result<(), ScanError> {
        let parse_error = |reason: &str| ScanError::Parse {
            path: path.to_path_buf(),
            line,
            reason: reason.to_string(),
        };
        match directive {
            Directive::Ifdef(name) => self.conditionals.enter(self.defines.contains(name)),
            Directive::Ifndef(name) => self.conditionals.enter(!self.defines.contains(name)),
            Directive::If => self.conditionals.enter_unevaluated(),
            Directive::Elif | Directive::Else => {
                self.conditionals.alternative().map_err(parse_error)?;
            }
            Directive::Endif => self.conditionals.leave().map_err(parse_error)?,
            _ if !self.conditionals.is_active() => {}
            Directive::Define(name) => {
                self.defines.insert(name.clone());
            }
            Directive::Undef(name) => {
                self.defines.remove(name);
            }
            Directive::Include(name) => self.include(name, frame, form)?,
            Directive::Other => {}
        }
        Ok(())
    }

    fn include(&mut self, name: &str, frame: FrameId, form: SourceForm) -> Result<(), ScanError> {
        let Some(full) = self.find_include(name, frame) else {
            tracing::trace!(include = name, "fortran include not found, skipped");
            return Ok(());
        };
        self.includes.insert(full.clone());
        if self.chain.is_active(frame, &full) {
            return Ok(());
        }
        let child_form = SourceForm::from_path(&full).unwrap_or(form);
        let child = self.chain.push(frame, full);
        self.process(child, child_form)?;
        Ok(())
    }

    fn find_include(&self, name: &str, frame: FrameId) -> Option<PathBuf> {
        let file = Path::new(name);
        if file.is_absolute() {
            let full = collapse(file);
            return full.is_file().then_some(full);
        }
        let including = &self.chain.get(frame).path;
        let dir = including.parent().unwrap_or_else(|| Path::new(""));
        std::iter::once(dir)
            .chain(self.search_paths.iter().map(PathBuf::as_path))
            .map(|d| join_collapsed(d, file))
            .find(|candidate| candidate.is_file())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    struct Tree {
        dir: tempfile::TempDir,
    }

    impl Tree {
        fn new() -> Self {
            Self {
                dir: tempfile::tempdir().unwrap(),
            }
        }

        fn file(&self, rel: &str, content: &str) -> PathBuf {
            let path = self.dir.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, content).unwrap();
            path
        }

        fn path(&self, rel: &str) -> PathBuf {
            self.dir.path().join(rel)
        }
    }

    fn names(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn scan(source: &Path, search: &[PathBuf], macros: &[&str]) -> SourceInfo {
        FortranScanner::new()
            .scan(source, search, &names(macros))
            .unwrap()
    }

    #[test]
    fn provides_and_requires() {
        let tree = Tree::new();
        let src = tree.file(
            "mod_a.f90",
            "module Alpha\n  use iso_c_binding\n  use, intrinsic :: iso_fortran_env\ncontains\nend module alpha\n",
        );
        let info = scan(&src, &[], &[]);
        assert_eq!(info.provides(), &names(&["alpha"]));
        assert_eq!(info.requires(), &names(&["iso_c_binding"]));
    }

    #[test]
    fn self_use_is_filtered() {
        let tree = Tree::new();
        let src = tree.file(
            "two.f90",
            "module a\nend module\nmodule b\n use a\nend module\n",
        );
        let info = scan(&src, &[], &[]);
        assert_eq!(info.provides(), &names(&["a", "b"]));
        assert!(info.requires().is_empty());
    }

    #[test]
    fn interface_module_procedures_are_not_provided() {
        let tree = Tree::new();
        let src = tree.file(
            "iface.f90",
            "program p\ninterface\n module thing\nend interface\nend program\n",
        );
        let info = scan(&src, &[], &[]);
        assert!(info.provides().is_empty());
    }

    #[test]
    fn ifdef_branches_follow_macros() {
        let tree = Tree::new();
        let src = tree.file(
            "cond.F90",
            "#ifdef USE_MPI\nuse mpi\n#else\nuse serial_stub\n#endif\n#ifndef NO_IO\nuse io_mod\n#endif\n",
        );
        let with_mpi = scan(&src, &[], &["USE_MPI"]);
        assert_eq!(with_mpi.requires(), &names(&["io_mod", "mpi"]));
        let without = scan(&src, &[], &["NO_IO"]);
        assert_eq!(without.requires(), &names(&["serial_stub"]));
    }

    #[test]
    fn define_in_source_enables_branch() {
        let tree = Tree::new();
        let src = tree.file(
            "def.F90",
            "#define HAVE_X\n#ifdef HAVE_X\nuse x_mod\n#endif\n#undef HAVE_X\n#ifdef HAVE_X\nuse never\n#endif\n",
        );
        let info = scan(&src, &[], &[]);
        assert_eq!(info.requires(), &names(&["x_mod"]));
    }

    #[test]
    fn if_branches_are_all_considered() {
        let tree = Tree::new();
        let src = tree.file(
            "if.F90",
            "#if defined(A)\nuse one\n#elif defined(B)\nuse two\n#else\nuse three\n#endif\n",
        );
        let info = scan(&src, &[], &[]);
        assert_eq!(info.requires(), &names(&["one", "three", "two"]));
    }

    #[test]
    fn includes_are_parsed_inline() {
        let tree = Tree::new();
        let src = tree.file("main.f90", "program p\ninclude 'uses.inc'\n#include \"more.h\"\nend\n");
        tree.file("uses.inc", "use from_inc\n");
        tree.file("inc/more.h", "use from_header\n");
        let info = scan(&src, &[tree.path("inc")], &[]);
        assert_eq!(info.requires(), &names(&["from_header", "from_inc"]));
        let expected: BTreeSet<_> = [tree.path("uses.inc"), tree.path("inc/more.h")]
            .into_iter()
            .collect();
        assert_eq!(info.includes(), &expected);
    }

    #[test]
    fn recursive_include_terminates() {
        let tree = Tree::new();
        let src = tree.file("main.f90", "include 'a.inc'\n");
        tree.file("a.inc", "include 'b.inc'\nuse a_mod\n");
        tree.file("b.inc", "include 'a.inc'\nuse b_mod\n");
        let info = scan(&src, &[], &[]);
        assert_eq!(info.includes().len(), 2);
        assert_eq!(info.requires(), &names(&["a_mod", "b_mod"]));
    }

    #[test]
    fn missing_include_is_skipped() {
        let tree = Tree::new();
        let src = tree.file("main.f90", "include 'mpif.h'\nuse m\n");
        let info = scan(&src, &[], &[]);
        assert!(info.includes().is_empty());
        assert_eq!(info.requires(), &names(&["m"]));
    }

    #[test]
    fn submodule_requires_parent_module() {
        let tree = Tree::new();
        let src = tree.file("impl.f90", "submodule (shapes) shapes_impl\nend submodule\n");
        let info = scan(&src, &[], &[]);
        assert_eq!(info.requires(), &names(&["shapes"]));
        assert!(info.provides().is_empty());
    }

    #[test]
    fn fixed_form_source() {
        let tree = Tree::new();
        let src = tree.file(
            "old.f",
            "C     legacy code\n      PROGRAM MAIN\n      USE\n     &  LEGACY\n      END\n",
        );
        let info = scan(&src, &[], &[]);
        assert_eq!(info.requires(), &names(&["legacy"]));
    }

    #[test]
    fn unterminated_conditional_fails() {
        let tree = Tree::new();
        let src = tree.file("bad.F90", "#ifdef X\nuse a\n");
        let err = FortranScanner::new()
            .scan(&src, &[], &BTreeSet::new())
            .unwrap_err();
        assert!(matches!(err, ScanError::Parse { line: 2, .. }));
    }

    #[test]
    fn stray_endif_fails() {
        let tree = Tree::new();
        let src = tree.file("bad.F90", "use a\n#endif\n");
        let err = FortranScanner::new()
            .scan(&src, &[], &BTreeSet::new())
            .unwrap_err();
        match err {
            ScanError::Parse { path, line, .. } => {
                assert_eq!(path, src);
                assert_eq!(line, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    fn parse_failure(source: &Path) -> (PathBuf, u32, String) {
        match FortranScanner::new().scan(source, &[], &BTreeSet::new()) {
            Err(ScanError::Parse { path, line, reason }) => (path, line, reason),
            other => panic!("expected a parse error, got {other:?}"),
        }
    }

    #[test]
    fn unterminated_module_fails() {
        let tree = Tree::new();
        let src = tree.file("open.f90", "module alpha
  integer :: x
");
        let (path, line, reason) = parse_failure(&src);
        assert_eq!(path, src);
        assert_eq!(line, 1);
        assert!(reason.contains("alpha"), "{reason}");
    }

    #[test]
    fn unterminated_interface_fails() {
        let tree = Tree::new();
        let src = tree.file(
            "iface.f90",
            "program p
interface
 subroutine s()
 end subroutine
end program
module later
end module later
",
        );
        let (_, line, reason) = parse_failure(&src);
        assert_eq!(line, 2);
        assert!(reason.contains("interface"), "{reason}");
    }

    #[test]
    fn unterminated_submodule_fails() {
        let tree = Tree::new();
        let src = tree.file("impl.f90", "submodule (shapes) impl
contains
");
        assert_eq!(parse_failure(&src).1, 1);
    }

    #[test]
    fn module_closed_in_include_or_by_bare_end() {
        let tree = Tree::new();
        let src = tree.file(
            "split.f90",
            "module a
include 'tail.inc'
module b
interface
 function f()
 end
end interface
end
",
        );
        tree.file("tail.inc", "contains
endmodule
");
        let info = scan(&src, &[], &[]);
        assert_eq!(info.provides(), &names(&["a", "b"]));
    }

    #[test]
    fn missing_source_fails() {
        let tree = Tree::new();
        let err = FortranScanner::new()
            .scan(&tree.path("none.f90"), &[], &BTreeSet::new())
            .unwrap_err();
        assert!(matches!(err, ScanError::Open { .. }));
    }
}
