//! Module ordering rules of Fortran targets and the build-time stamp flow.

use std::fs;

use mkdep_conformance::{source_entry, target_toml, BuildTree};
use mkdep_depends::{copy_module, DependsError};
use mkdep_diagnostics::code::{MODULE_COLLISION, UNRESOLVED_MODULE};

fn fortran_target(name: &str, sources: &[&str], extra: &str) -> String {
    let sources: Vec<(&str, &str)> = sources.iter().map(|s| (*s, "Fortran")).collect();
    let mut out = extra.to_string();
    out.push_str(&target_toml(name, &sources));
    out.push_str("[fortran]\ncompiler_id = \"GNU\"\n");
    out
}

fn lines_of(text: &str) -> Vec<&str> {
    text.lines().collect()
}

#[test]
fn consumer_waits_for_provider_through_proxy_and_stamp() {
    let tree = BuildTree::new();
    tree.source("mod_a.f90", "module alpha\n  integer :: x\nend module alpha\n");
    tree.source("uses_a.f90", "program main\n  use alpha\nend program main\n");
    tree.target("app", &fortran_target("app", &["mod_a.f90", "uses_a.f90"], ""));
    let pass = tree.generate("app");
    assert!(pass.diagnostics.is_empty(), "{:?}", pass.diagnostics);
    let report = pass.report();
    assert_eq!(report.provided_modules, vec!["alpha".to_string()]);

    let rules = tree.read_target_file("app", "depend.make");
    let lines = lines_of(&rules);
    let has = |line: &str| lines.contains(&line);
    assert!(has("MkdepFiles/app.dir/uses_a.o.requires: MkdepFiles/app.dir/alpha.mod.proxy"));
    assert!(has("MkdepFiles/app.dir/uses_a.o: MkdepFiles/app.dir/alpha.mod.stamp"));
    assert!(has("MkdepFiles/app.dir/alpha.mod.proxy: MkdepFiles/app.dir/mod_a.o.provides"));
    assert!(has("MkdepFiles/app.dir/mod_a.o.provides.build:"));
    assert!(has("\t$(MKDEP) copy-mod alpha MkdepFiles/app.dir/alpha.mod.stamp GNU"));
    assert!(has("\t$(MKDEP) touch MkdepFiles/app.dir/mod_a.o.provides.build"));
    assert!(has("MkdepFiles/app.dir/build: MkdepFiles/app.dir/mod_a.o.provides.build"));
    assert!(has(".PHONY : MkdepFiles/app.dir/build"));
    // The provider does not wait on itself.
    assert!(!rules.contains("mod_a.o.requires"));

    let manifest = tree.read_target_file("app", "fortran.internal");
    assert_eq!(
        lines_of(&manifest)
            .into_iter()
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .collect::<Vec<_>>(),
        vec!["provides", " alpha"]
    );
    let clean = tree.read_target_file("app", "cmake_clean_Fortran.cmake");
    for name in ["alpha.mod", "ALPHA.mod", "alpha.mod.stamp"] {
        assert!(clean.contains(name), "clean script misses {name}:\n{clean}");
    }
}

#[test]
fn duplicate_module_names_abort_without_writing() {
    let tree = BuildTree::new();
    tree.source("one.f90", "module foo\nend module foo\n");
    tree.source("two.f90", "MODULE Foo\nEND MODULE Foo\n");
    tree.target("app", &fortran_target("app", &["one.f90", "two.f90"], ""));

    let err = match tree.generate("app").result {
        Err(e) => e,
        Ok(_) => panic!("expected a module collision"),
    };
    assert!(matches!(err, DependsError::NameCollision { ref module, .. } if module == "foo"));
    assert_eq!(err.to_diagnostic().code, MODULE_COLLISION);
    for file in ["depend.make", "depend.internal", "fortran.internal", "cmake_clean_Fortran.cmake"] {
        assert!(!tree.target_dir("app").join(file).exists(), "{file} was written");
    }
}

#[test]
fn modules_of_linked_targets_resolve_first_manifest_first() {
    let tree = BuildTree::new();
    tree.source("lib1/gamma.f90", "module gamma\nend module gamma\n");
    tree.source("lib2/gamma.f90", "module gamma\nend module gamma\n");
    tree.source("app/main.f90", "program main\n  use gamma\nend program main\n");
    tree.target("lib1", &fortran_target("lib1", &["lib1/gamma.f90"], ""));
    tree.target("lib2", &fortran_target("lib2", &["lib2/gamma.f90"], ""));
    tree.generate("lib1").report();
    tree.generate("lib2").report();

    let linked = "linked_info_files = [\"MkdepFiles/lib2.dir/DependInfo.toml\", \"MkdepFiles/lib1.dir/DependInfo.toml\"]\n";
    tree.target("app", &fortran_target("app", &["app/main.f90"], linked));
    let report = tree.generate("app").report();
    assert!(report.unresolved_modules.is_empty());

    let rules = tree.read_target_file("app", "depend.make");
    assert!(rules.contains("MkdepFiles/app.dir/app/main.o: MkdepFiles/lib2.dir/gamma.mod.stamp\n"));
    assert!(!rules.contains("lib1.dir"));
    assert!(!rules.contains(".requires"));
}

#[test]
fn prebuilt_module_in_include_path_becomes_a_dependency() {
    let tree = BuildTree::new();
    tree.write("build/extmods/EXT.mod", "GFORTRAN module version '15'\n");
    tree.source("main.f90", "program main\n  use ext\n  use iso_fortran_env\nend program main\n");
    tree.target(
        "app",
        &format!(
            "name = \"app\"\ninclude_paths = [\"extmods\"]\n{}",
            source_entry("main.f90", "MkdepFiles/app.dir/main.o", "Fortran"),
        ),
    );
    let pass = tree.generate("app");
    let unresolved: Vec<_> = pass
        .diagnostics
        .iter()
        .filter(|d| d.code == UNRESOLVED_MODULE)
        .collect();
    assert_eq!(unresolved.len(), 1);
    let report = pass.report();
    assert_eq!(report.unresolved_modules, vec!["iso_fortran_env".to_string()]);

    let rules = tree.read_target_file("app", "depend.make");
    assert!(rules.contains("MkdepFiles/app.dir/main.o: extmods/EXT.mod\n"));
    assert!(!tree.target_dir("app").join("cmake_clean_Fortran.cmake").exists());
}

#[test]
fn stamp_follows_interface_not_build_noise() {
    let tree = BuildTree::new();
    tree.source("mod_a.f90", "module alpha\nend module alpha\n");
    tree.target("app", &fortran_target("app", &["mod_a.f90"], ""));
    tree.generate("app").report();

    // What the recipe of mod_a.o.provides.build runs after each compile.
    let module = tree.binary_dir().join("alpha");
    let stamp = tree.target_dir("app").join("alpha.mod.stamp");
    let compile = |header: &str, body: &str| {
        fs::write(tree.binary_dir().join("alpha.mod"), format!("{header}\n{body}")).unwrap();
        copy_module(&module, &stamp, Some("GNU")).unwrap()
    };

    assert!(compile("GFORTRAN module created 10:00", "x integer\n").copied);
    assert_eq!(fs::read_to_string(&stamp).unwrap(), "GFORTRAN module created 10:00\nx integer\n");
    assert!(!compile("GFORTRAN module created 10:05", "x integer\n").copied);
    assert_eq!(fs::read_to_string(&stamp).unwrap(), "GFORTRAN module created 10:00\nx integer\n");
    assert!(compile("GFORTRAN module created 10:10", "x real\n").copied);
}

#[test]
fn preprocessed_source_follows_target_defines() {
    let tree = BuildTree::new();
    tree.source("mod_a.f90", "module alpha\nend module alpha\n");
    tree.source(
        "uses_a.F90",
        "program main\n#ifdef WITH_ALPHA\n  use alpha\n#endif\nend program main\n",
    );
    let toml = |defines: &str| {
        fortran_target(
            "app",
            &["mod_a.f90", "uses_a.F90"],
            &format!("defines = [{defines}]\n"),
        )
    };

    tree.target("app", &toml(""));
    tree.generate("app").report();
    assert!(!tree.read_target_file("app", "depend.make").contains("uses_a.o.requires"));

    tree.target("app", &toml("\"WITH_ALPHA=1\""));
    tree.touch_future("build/MkdepFiles/app.dir/DependInfo.toml");
    tree.generate("app").report();
    assert!(tree
        .read_target_file("app", "depend.make")
        .contains("MkdepFiles/app.dir/uses_a.o.requires: MkdepFiles/app.dir/alpha.mod.proxy\n"));
}

#[test]
fn failed_rerun_keeps_previous_files() {
    let tree = BuildTree::new();
    tree.source("mod_a.f90", "module alpha\nend module alpha\n");
    tree.target("app", &fortran_target("app", &["mod_a.f90"], ""));
    tree.generate("app").report();
    tree.age_everything();

    let files = ["depend.make", "depend.internal", "fortran.internal"];
    let before: Vec<String> = files.iter().map(|f| tree.read_target_file("app", f)).collect();

    // A directory in place of the clean script cannot be replaced.
    let clean = tree.target_dir("app").join("cmake_clean_Fortran.cmake");
    fs::remove_file(&clean).unwrap();
    fs::create_dir_all(clean.join("blocker")).unwrap();
    tree.source("mod_b.f90", "module beta\nend module beta\n");
    tree.target("app", &fortran_target("app", &["mod_a.f90", "mod_b.f90"], ""));

    assert!(tree.generate("app").result.is_err());
    for (file, old) in files.iter().zip(&before) {
        assert_eq!(&tree.read_target_file("app", file), old, "{file} changed");
    }

    fs::remove_dir_all(&clean).unwrap();
    let report = tree.generate("app").report();
    assert_eq!(report.provided_modules, vec!["alpha".to_string(), "beta".to_string()]);
    assert!(tree.read_target_file("app", "depend.make").contains("beta.mod.stamp"));
    assert!(tree.read_target_file("app", "cmake_clean_Fortran.cmake").contains("beta.mod"));
}
