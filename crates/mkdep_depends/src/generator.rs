//! The per-target generation pass.
//!
//! One pass decides what to rescan, scans each language of the target,
//! resolves modules, and writes `depend.make` and `depend.internal` together.
//! Every output is staged before any is replaced, and the record files are
//! replaced last.
//! Module sources are re-parsed whenever the target is regenerated, since
//! their provides and requires feed rules of other objects. Nothing is
//! written when any step fails.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use mkdep_config::{
    load_directory_info, load_target_info, resolve_target, DirectoryInfo, Language,
    ResolvedTarget, DIRECTORY_INFO_FILE,
};
use mkdep_diagnostics::DiagnosticSink;
use mkdep_make::{PathNormalizer, StagedFile, WriteMode};
use mkdep_scan::{
    CFamilyScanner, FortranScanner, IncludeCache, MacroQuery, Scanner, SourceInfo,
};

use crate::clean::CLEAN_SCRIPT_FILE;
use crate::decider::{decide, FullReason, RescanPlan};
use crate::emitter::{EmitterConfig, RuleEmitter};
use crate::error::DependsError;
use crate::ledger::{ModuleLedger, ModuleLocation};
use crate::record::ObjectRecord;
use crate::resolver::{resolve, ProvidesManifest, MANIFEST_FILE};
use crate::store::DependencyStore;

/// A target together with the directory it is configured in.
#[derive(Debug, Clone)]
pub struct LoadedTarget {
    /// The directory descriptor.
    pub directory: DirectoryInfo,
    /// Path of the directory descriptor; its timestamp invalidates records.
    pub directory_info_file: PathBuf,
    /// The resolved target.
    pub target: ResolvedTarget,
}

impl LoadedTarget {
    /// Loads the target described by `info_file`.
    ///
    /// Without an explicit `directory_info_file`, the directory descriptor is
    /// looked up next to the target directory.
    pub fn load(info_file: &Path, directory_info_file: Option<&Path>) -> Result<Self, DependsError> {
        let directory_info_file = match directory_info_file {
            Some(path) => path.to_path_buf(),
            None => default_directory_info(info_file),
        };
        let directory = load_directory_info(&directory_info_file)?;
        let info = load_target_info(info_file)?;
        let target = resolve_target(&info, &directory, info_file)?;
        Ok(Self {
            directory,
            directory_info_file,
            target,
        })
    }
}

/// `DirectoryInformation.toml` in the parent of the target directory.
pub fn default_directory_info(info_file: &Path) -> PathBuf {
    info_file
        .parent()
        .and_then(Path::parent)
        .unwrap_or_else(|| Path::new(""))
        .join(DIRECTORY_INFO_FILE)
}

/// What a generation pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationReport {
    /// The target name.
    pub target: String,
    /// Nothing was regenerated because every record was fresh.
    pub up_to_date: bool,
    /// Why the whole target was rescanned, if it was.
    pub full_reason: Option<FullReason>,
    /// Sources scanned in this pass.
    pub scanned: usize,
    /// Objects whose previous record was reused.
    pub reused: usize,
    /// `depend.make` was rewritten.
    pub rules_written: bool,
    /// Modules provided by the target.
    pub provided_modules: Vec<String>,
    /// Required modules nothing was found for.
    pub unresolved_modules: Vec<String>,
}

/// Runs generation passes, reporting problems to one sink.
pub struct DependsGenerator<'a> {
    sink: &'a DiagnosticSink,
    macros: &'a dyn MacroQuery,
}

impl<'a> DependsGenerator<'a> {
    /// Creates a generator querying predefined macros through `macros`.
    pub fn new(sink: &'a DiagnosticSink, macros: &'a dyn MacroQuery) -> Self {
        Self { sink, macros }
    }

    /// Decides what a pass over `loaded` would rescan, without writing.
    pub fn check(&self, loaded: &LoadedTarget) -> RescanPlan {
        let store = store_for(loaded);
        decide(&store, &loaded.target, &loaded.directory_info_file, self.sink)
    }

    /// Regenerates the dependency files of `loaded` where needed.
    pub fn generate(&self, loaded: &LoadedTarget) -> Result<GenerationReport, DependsError> {
        let target = &loaded.target;
        let store = store_for(loaded);
        let plan = decide(&store, target, &loaded.directory_info_file, self.sink);
        let languages = target.languages();
        let has_modules = languages.iter().any(|l| l.has_modules());

        let mut report = GenerationReport {
            target: target.name.clone(),
            full_reason: plan.full_reason(),
            ..GenerationReport::default()
        };

        if plan.is_fresh()
            && store.make_file().exists()
            && (!has_modules || target.target_dir.join(MANIFEST_FILE).exists())
        {
            tracing::info!(target = %target.name, "dependencies up to date");
            report.up_to_date = true;
            report.reused = target.sources.len();
            return Ok(report);
        }

        let normalizer = PathNormalizer::for_directory(&loaded.directory);
        let mut emitter =
            RuleEmitter::new(&normalizer, EmitterConfig::for_target(&loaded.directory, target));
        let mut caches = Vec::new();
        let mut ledger = None;
        for language in languages {
            if language.has_modules() {
                ledger = Some(self.scan_modules(target, language, &mut emitter, &mut report)?);
            } else {
                caches.push(self.scan_includes(
                    loaded,
                    language,
                    &plan,
                    &mut emitter,
                    &mut report,
                )?);
            }
        }

        let streams = emitter.finish(ledger.as_ref());
        let clean_script = target.target_dir.join(CLEAN_SCRIPT_FILE);
        let mut extras = Vec::new();
        if let Some(script) = &streams.clean_script {
            extras.push(StagedFile::stage(&clean_script, script, WriteMode::CopyIfDifferent)?);
        }
        if let Some(manifest) = &streams.manifest {
            extras.push(StagedFile::stage(
                &target.target_dir.join(MANIFEST_FILE),
                manifest,
                WriteMode::CopyIfDifferent,
            )?);
        }
        let records = store.stage(&streams.rules, &streams.internal)?;

        if streams.clean_script.is_none() && has_modules {
            remove_if_present(&clean_script)?;
        }
        for staged in extras {
            staged.commit()?;
        }
        report.rules_written = records.commit()?;

        for cache in caches {
            if let Err(e) = cache.save() {
                tracing::warn!(error = %e, "include cache not saved");
            }
        }

        if let Some(ledger) = &ledger {
            report.provided_modules = ledger.target_provides().map(str::to_string).collect();
            report.unresolved_modules = ledger
                .target_requires()
                .filter(|(_, l)| **l == ModuleLocation::Unresolved)
                .map(|(m, _)| m.to_string())
                .collect();
        }
        tracing::info!(
            target = %target.name,
            scanned = report.scanned,
            reused = report.reused,
            rules_written = report.rules_written,
            "dependencies generated"
        );
        Ok(report)
    }

    /// Scans the `#include` dependencies of every source of `language`,
    /// reusing fresh records. Returns the include cache to be saved.
    fn scan_includes(
        &self,
        loaded: &LoadedTarget,
        language: Language,
        plan: &RescanPlan,
        emitter: &mut RuleEmitter<'_>,
        report: &mut GenerationReport,
    ) -> Result<IncludeCache, DependsError> {
        let target = &loaded.target;
        let patterns = loaded.directory.scan_patterns(language);
        let cache = IncludeCache::load(
            &target
                .target_dir
                .join(format!("{}.includecache", language.as_str())),
            &patterns.include_regex_scan,
            &patterns.include_regex_complain,
        );
        let mut scanner = CFamilyScanner::new(
            self.sink,
            &patterns.include_regex_scan,
            &patterns.include_regex_complain,
            cache,
        )?;

        for source in target.sources_for(language) {
            let record = match plan.reusable(&source.object) {
                Some(previous) if previous.source == source.path => {
                    report.reused += 1;
                    previous.clone()
                }
                _ => {
                    let info = scanner.scan(&source.path, &target.include_paths, &target.defines)?;
                    report.scanned += 1;
                    ObjectRecord::from_scan(&source.object, &info)
                }
            };
            emitter.emit_object(&record);
        }
        Ok(scanner.into_cache())
    }

    /// Parses every source of the module language, checks for module name
    /// collisions, resolves required modules and emits their rules.
    fn scan_modules(
        &self,
        target: &ResolvedTarget,
        language: Language,
        emitter: &mut RuleEmitter<'_>,
        report: &mut GenerationReport,
    ) -> Result<ModuleLedger, DependsError> {
        let mut macros = target.defines.clone();
        macros.extend(
            self.macros
                .predefined_macros(&target.predefined_macros_command)?,
        );

        let mut scanner = FortranScanner::new();
        let mut scanned: Vec<(&Path, SourceInfo)> = Vec::new();
        for source in target.sources_for(language) {
            let info = scanner.scan(&source.path, &target.include_paths, &macros)?;
            report.scanned += 1;
            scanned.push((source.object.as_path(), info));
        }

        let mut ledger = ModuleLedger::new();
        for (_, info) in &scanned {
            ledger.add_source(info)?;
        }
        let manifests: Vec<ProvidesManifest> = target
            .linked_info_files
            .iter()
            .filter_map(|file| file.parent())
            .filter_map(ProvidesManifest::load)
            .collect();
        resolve(
            &mut ledger,
            &target.target_dir,
            &manifests,
            &target.include_paths,
            self.sink,
        );

        emitter.begin_module_language();
        for (object, info) in &scanned {
            emitter.emit_object(&ObjectRecord::from_scan(object, info));
            emitter.emit_module_rules(object, info, &ledger)?;
        }
        Ok(ledger)
    }
}

fn store_for(loaded: &LoadedTarget) -> DependencyStore {
    DependencyStore::new(&loaded.target.target_dir, &loaded.directory.binary_dir)
}

fn remove_if_present(path: &Path) -> Result<(), DependsError> {
    match fs::remove_file(path) {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "removed outdated file");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(DependsError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decider::Rescan;
    use crate::store::{DEPEND_INTERNAL_FILE, DEPEND_MAKE_FILE};
    use mkdep_diagnostics::code::UNRESOLVED_MODULE;
    use mkdep_scan::ProcessMacroQuery;
    use std::collections::BTreeSet;
    use std::time::{Duration, SystemTime};

    struct Tree {
        dir: tempfile::TempDir,
    }

    impl Tree {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            fs::create_dir_all(dir.path().join("src")).unwrap();
            fs::create_dir_all(dir.path().join("build/MkdepFiles/app.dir")).unwrap();
            let tree = Self { dir };
            tree.write(
                "build/MkdepFiles/DirectoryInformation.toml",
                &format!(
                    "source_dir = \"{}\"\nbinary_dir = \"{}\"\n",
                    tree.path("src").display(),
                    tree.path("build").display()
                ),
            );
            tree
        }

        fn path(&self, rel: &str) -> PathBuf {
            self.dir.path().join(rel)
        }

        fn write(&self, rel: &str, content: &str) -> PathBuf {
            let path = self.path(rel);
            fs::write(&path, content).unwrap();
            path
        }

        fn target(&self, toml: &str) -> PathBuf {
            self.write("build/MkdepFiles/app.dir/DependInfo.toml", toml)
        }

        fn read(&self, rel: &str) -> String {
            fs::read_to_string(self.path(rel)).unwrap()
        }

        fn load(&self) -> LoadedTarget {
            LoadedTarget::load(&self.path("build/MkdepFiles/app.dir/DependInfo.toml"), None).unwrap()
        }
    }

    fn set_mtime(path: &Path, time: SystemTime) {
        fs::File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(time)
            .unwrap();
    }

    fn age_all(tree: &Tree, rels: &[&str]) {
        let past = SystemTime::now() - Duration::from_secs(3600);
        for rel in rels {
            set_mtime(&tree.path(rel), past);
        }
    }

    const C_TARGET: &str = "name = \"app\"\n\
        [[sources]]\npath = \"a.c\"\nobject = \"MkdepFiles/app.dir/a.o\"\nlanguage = \"C\"\n\
        [[sources]]\npath = \"b.c\"\nobject = \"MkdepFiles/app.dir/b.o\"\nlanguage = \"C\"\n";

    fn c_tree() -> Tree {
        let tree = Tree::new();
        tree.write("src/a.c", "#include \"a.h\"\n");
        tree.write("src/a.h", "#include <stdio.h>\n");
        tree.write("src/b.c", "int b;\n");
        tree.target(C_TARGET);
        tree
    }

    #[test]
    fn default_directory_info_is_beside_target_dir() {
        assert_eq!(
            default_directory_info(Path::new("/b/MkdepFiles/app.dir/DependInfo.toml")),
            PathBuf::from("/b/MkdepFiles/DirectoryInformation.toml")
        );
    }

    #[test]
    fn first_pass_writes_rules_and_records() {
        let tree = c_tree();
        let sink = DiagnosticSink::new();
        let query = ProcessMacroQuery;
        let report = DependsGenerator::new(&sink, &query).generate(&tree.load()).unwrap();

        assert_eq!(report.full_reason, Some(FullReason::NoRecord));
        assert_eq!(report.scanned, 2);
        assert!(report.rules_written);
        let rules = tree.read(&format!("build/MkdepFiles/app.dir/{DEPEND_MAKE_FILE}"));
        let a_c = tree.path("src/a.c");
        let a_h = tree.path("src/a.h");
        assert!(rules.contains(&format!("MkdepFiles/app.dir/a.o: {}\n", a_c.display())));
        assert!(rules.contains(&format!("MkdepFiles/app.dir/a.o: {}\n", a_h.display())));
        assert!(!rules.contains("stdio.h"));
        let internal = tree.read(&format!("build/MkdepFiles/app.dir/{DEPEND_INTERNAL_FILE}"));
        assert!(internal.contains("MkdepFiles/app.dir/b.o\n"));
        assert!(tree.path("build/MkdepFiles/app.dir/C.includecache").exists());
        assert!(!tree.path(&format!("build/MkdepFiles/app.dir/{MANIFEST_FILE}")).exists());
    }

    #[test]
    fn second_pass_is_up_to_date() {
        let tree = c_tree();
        let sink = DiagnosticSink::new();
        let query = ProcessMacroQuery;
        let generator = DependsGenerator::new(&sink, &query);
        age_all(
            &tree,
            &[
                "src/a.c",
                "src/a.h",
                "src/b.c",
                "build/MkdepFiles/DirectoryInformation.toml",
                "build/MkdepFiles/app.dir/DependInfo.toml",
            ],
        );
        generator.generate(&tree.load()).unwrap();
        let report = generator.generate(&tree.load()).unwrap();
        assert!(report.up_to_date);
        assert_eq!(report.scanned, 0);
        assert!(!report.rules_written);
    }

    #[test]
    fn touched_header_rescans_one_object() {
        let tree = c_tree();
        let sink = DiagnosticSink::new();
        let query = ProcessMacroQuery;
        let generator = DependsGenerator::new(&sink, &query);
        age_all(
            &tree,
            &[
                "src/a.c",
                "src/a.h",
                "src/b.c",
                "build/MkdepFiles/DirectoryInformation.toml",
                "build/MkdepFiles/app.dir/DependInfo.toml",
            ],
        );
        generator.generate(&tree.load()).unwrap();
        set_mtime(&tree.path("src/a.h"), SystemTime::now() + Duration::from_secs(3600));

        let plan = generator.check(&tree.load());
        assert_eq!(plan.state(&tree.path("build/MkdepFiles/app.dir/a.o")), Rescan::Partial);
        assert_eq!(plan.state(&tree.path("build/MkdepFiles/app.dir/b.o")), Rescan::Fresh);

        let report = generator.generate(&tree.load()).unwrap();
        assert_eq!(report.scanned, 1);
        assert_eq!(report.reused, 1);
    }

    #[test]
    fn scan_failure_leaves_previous_files() {
        let tree = c_tree();
        let sink = DiagnosticSink::new();
        let query = ProcessMacroQuery;
        let generator = DependsGenerator::new(&sink, &query);
        generator.generate(&tree.load()).unwrap();
        let before = tree.read("build/MkdepFiles/app.dir/depend.make");

        fs::remove_file(tree.path("src/b.c")).unwrap();
        // The target descriptor is rewritten so the whole target is rescanned.
        tree.target(C_TARGET);
        set_mtime(
            &tree.path("build/MkdepFiles/app.dir/DependInfo.toml"),
            SystemTime::now() + Duration::from_secs(3600),
        );
        let err = generator.generate(&tree.load()).unwrap_err();
        assert!(matches!(err, DependsError::Scan(_)));
        assert_eq!(tree.read("build/MkdepFiles/app.dir/depend.make"), before);
    }

    const F_TARGET: &str = "name = \"app\"\n\
        [[sources]]\npath = \"mod_a.f90\"\nobject = \"MkdepFiles/app.dir/mod_a.o\"\nlanguage = \"Fortran\"\n\
        [[sources]]\npath = \"uses_a.f90\"\nobject = \"MkdepFiles/app.dir/uses_a.o\"\nlanguage = \"Fortran\"\n\
        [fortran]\ncompiler_id = \"GNU\"\n";

    #[test]
    fn fortran_target_writes_module_rules_and_side_files() {
        let tree = Tree::new();
        tree.write("src/mod_a.f90", "module alpha\nend module alpha\n");
        tree.write("src/uses_a.f90", "program p\n  use alpha\n  use iso_c_binding\nend program p\n");
        tree.target(F_TARGET);

        let sink = DiagnosticSink::new();
        let query = ProcessMacroQuery;
        let report = DependsGenerator::new(&sink, &query).generate(&tree.load()).unwrap();
        assert_eq!(report.provided_modules, vec!["alpha".to_string()]);
        assert_eq!(report.unresolved_modules, vec!["iso_c_binding".to_string()]);
        assert_eq!(sink.warning_count(), 1);
        assert_eq!(sink.diagnostics()[0].code, UNRESOLVED_MODULE);

        let rules = tree.read("build/MkdepFiles/app.dir/depend.make");
        for line in [
            "MkdepFiles/app.dir/alpha.mod.proxy: MkdepFiles/app.dir/mod_a.o.provides\n",
            "\t$(MKDEP) copy-mod alpha MkdepFiles/app.dir/alpha.mod.stamp GNU\n",
            "MkdepFiles/app.dir/build: MkdepFiles/app.dir/mod_a.o.provides.build\n",
            "MkdepFiles/app.dir/uses_a.o.requires: MkdepFiles/app.dir/alpha.mod.proxy\n",
            "MkdepFiles/app.dir/uses_a.o: MkdepFiles/app.dir/alpha.mod.stamp\n",
        ] {
            assert!(rules.contains(line), "missing {line:?} in\n{rules}");
        }
        let manifest = tree.read("build/MkdepFiles/app.dir/fortran.internal");
        assert!(manifest.ends_with("provides\n alpha\n"));
        let clean = tree.read("build/MkdepFiles/app.dir/cmake_clean_Fortran.cmake");
        assert!(clean.contains("\"alpha.mod\""));
        assert!(clean.contains("\"ALPHA.mod\""));
    }

    #[test]
    fn module_collision_writes_nothing() {
        let tree = Tree::new();
        tree.write("src/mod_a.f90", "module foo\nend module foo\n");
        tree.write("src/uses_a.f90", "module foo\nend module foo\n");
        tree.target(F_TARGET);

        let sink = DiagnosticSink::new();
        let query = ProcessMacroQuery;
        let err = DependsGenerator::new(&sink, &query)
            .generate(&tree.load())
            .unwrap_err();
        assert!(matches!(err, DependsError::NameCollision { ref module, .. } if module == "foo"));
        assert!(!tree.path("build/MkdepFiles/app.dir/depend.make").exists());
        assert!(!tree.path("build/MkdepFiles/app.dir/depend.internal").exists());
        assert!(!tree.path("build/MkdepFiles/app.dir/fortran.internal").exists());
    }

    #[test]
    fn linked_target_manifest_resolves_module() {
        let tree = Tree::new();
        fs::create_dir_all(tree.path("build/MkdepFiles/lib.dir")).unwrap();
        tree.write(
            "build/MkdepFiles/lib.dir/fortran.internal",
            &ProvidesManifest::render(["beta"]),
        );
        tree.write("src/mod_a.f90", "module alpha\nend module alpha\n");
        tree.write("src/uses_a.f90", "program p\n  use beta\nend program p\n");
        tree.target(&format!(
            "linked_info_files = [\"MkdepFiles/lib.dir/DependInfo.toml\"]\n{F_TARGET}"
        ));

        let sink = DiagnosticSink::new();
        let query = ProcessMacroQuery;
        let report = DependsGenerator::new(&sink, &query).generate(&tree.load()).unwrap();
        assert!(report.unresolved_modules.is_empty());
        assert!(!sink.has_errors());
        let rules = tree.read("build/MkdepFiles/app.dir/depend.make");
        assert!(rules.contains("MkdepFiles/app.dir/uses_a.o: MkdepFiles/lib.dir/beta.mod.stamp\n"));
        assert!(!rules.contains("uses_a.o.requires"));
    }

    #[test]
    fn clean_script_removed_when_modules_go_away() {
        let tree = Tree::new();
        tree.write("src/mod_a.f90", "module alpha\nend module alpha\n");
        tree.write("src/uses_a.f90", "program p\nend program p\n");
        tree.target(F_TARGET);
        let sink = DiagnosticSink::new();
        let query = ProcessMacroQuery;
        let generator = DependsGenerator::new(&sink, &query);
        generator.generate(&tree.load()).unwrap();
        let clean = tree.path("build/MkdepFiles/app.dir/cmake_clean_Fortran.cmake");
        assert!(clean.exists());

        tree.write("src/mod_a.f90", "subroutine s\nend subroutine s\n");
        set_mtime(
            &tree.path("build/MkdepFiles/app.dir/DependInfo.toml"),
            SystemTime::now() + Duration::from_secs(3600),
        );
        let report = generator.generate(&tree.load()).unwrap();
        assert!(report.provided_modules.is_empty());
        assert!(!clean.exists());
        let manifest = tree.read("build/MkdepFiles/app.dir/fortran.internal");
        assert!(manifest.ends_with("provides\n"));
    }

    struct FixedMacros(BTreeSet<String>);

    impl MacroQuery for FixedMacros {
        fn predefined_macros(
            &self,
            _command: &[String],
        ) -> Result<BTreeSet<String>, mkdep_scan::ScanError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn predefined_macros_steer_conditional_uses() {
        let tree = Tree::new();
        tree.write("src/mod_a.f90", "module alpha\nend module alpha\n");
        tree.write(
            "src/uses_a.F90",
            "program p\n#ifdef __GFORTRAN__\n  use alpha\n#endif\nend program p\n",
        );
        tree.target(
            "name = \"app\"\n\
             [[sources]]\npath = \"mod_a.f90\"\nobject = \"MkdepFiles/app.dir/mod_a.o\"\nlanguage = \"Fortran\"\n\
             [[sources]]\npath = \"uses_a.F90\"\nobject = \"MkdepFiles/app.dir/uses_a.o\"\nlanguage = \"Fortran\"\n",
        );
        let sink = DiagnosticSink::new();
        let query = FixedMacros(BTreeSet::from(["__GFORTRAN__".to_string()]));
        DependsGenerator::new(&sink, &query).generate(&tree.load()).unwrap();
        let rules = tree.read("build/MkdepFiles/app.dir/depend.make");
        assert!(rules.contains("MkdepFiles/app.dir/uses_a.o.requires: MkdepFiles/app.dir/alpha.mod.proxy\n"));
    }
}
