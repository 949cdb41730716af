//! Writing the rule stream, internal stream and module side files.
//!
//! For a source providing modules the rule stream gets, per module, a proxy
//! target depending on the object's `.provides` step, plus one
//! `<object>.provides.build` rule that refreshes every stamp and then
//! touches itself. The target's `build` driver depends on that sentinel. A
//! source requiring a module of its own target depends on the module's
//! proxy through `<object>.requires`, and on the module's stamp directly:
//!
//! ```text
//! app.dir/uses_a.o.requires: app.dir/alpha.mod.proxy
//! app.dir/uses_a.o: app.dir/alpha.mod.stamp
//! app.dir/alpha.mod.proxy: app.dir/mod_a.o.provides
//! # Module stamps refreshed after app.dir/mod_a.o is built
//! app.dir/mod_a.o.provides.build:
//! 	$(MKDEP) copy-mod alpha app.dir/alpha.mod.stamp GNU
//! 	$(MKDEP) touch app.dir/mod_a.o.provides.build
//! app.dir/build: app.dir/mod_a.o.provides.build
//! .PHONY : app.dir/build
//! ```

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use mkdep_config::{DirectoryInfo, ResolvedTarget};
use mkdep_make::{disclaimer, MakeRule, PathNormalizer, RuleWriter};
use mkdep_scan::SourceInfo;

use crate::clean::render_clean_script;
use crate::error::DependsError;
use crate::ledger::{ModuleLedger, ModuleLocation};
use crate::record::{write_internal_entry, ObjectRecord};
use crate::resolver::{proxy_target, stamp_file, ProvidesManifest};

/// Where generated text refers to.
#[derive(Debug, Clone)]
pub struct EmitterConfig {
    /// Directory paths are written relative to.
    pub base: PathBuf,
    /// The target directory; also holds the module stamps.
    pub target_dir: PathBuf,
    /// Command prefix calling back into mkdep from recipes.
    pub tool_command: String,
    /// Directory the compiler writes `.mod` files to.
    pub module_dir: PathBuf,
    /// Compiler family passed on to `copy-mod`.
    pub compiler_id: Option<String>,
}

impl EmitterConfig {
    /// The configuration of `target` in `dir`.
    pub fn for_target(dir: &DirectoryInfo, target: &ResolvedTarget) -> Self {
        Self {
            base: dir.binary_dir.clone(),
            target_dir: target.target_dir.clone(),
            tool_command: dir.tool_command.clone(),
            module_dir: target.module_dir.clone(),
            compiler_id: target.compiler_id.clone(),
        }
    }
}

/// The text of every file one pass produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmittedStreams {
    /// `depend.make`.
    pub rules: String,
    /// `depend.internal`.
    pub internal: String,
    /// The module export manifest, for targets with module sources.
    pub manifest: Option<String>,
    /// The module clean script, when modules are provided.
    pub clean_script: Option<String>,
}

/// Accumulates the generated text of one target.
pub struct RuleEmitter<'n> {
    writer: RuleWriter<'n>,
    config: EmitterConfig,
    rules: String,
    internal: String,
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut s = OsString::from(path.as_os_str());
    s.push(suffix);
    PathBuf::from(s)
}

impl<'n> RuleEmitter<'n> {
    /// Starts both streams with the generated-file header.
    pub fn new(normalizer: &'n PathNormalizer, config: EmitterConfig) -> Self {
        Self {
            writer: RuleWriter::new(normalizer, &config.base),
            config,
            rules: disclaimer(),
            internal: disclaimer(),
        }
    }

    /// Writes the note preceding the module-language rules.
    pub fn begin_module_language(&mut self) {
        self.rules.push_str(
            "# Note that incremental build could trigger a call to copy-mod on each re-build\n",
        );
    }

    /// Writes the source and dependency lines of one object to both streams.
    pub fn emit_object(&mut self, record: &ObjectRecord) {
        self.writer
            .write_dependency_lines(&mut self.rules, &record.object, record.inputs());
        self.rules.push('\n');
        let object = self.writer.relative(&record.object);
        write_internal_entry(&mut self.internal, &object, record);
    }

    /// Writes the module rules of one object compiled from `info`.
    pub fn emit_module_rules(
        &mut self,
        object: &Path,
        info: &SourceInfo,
        ledger: &ModuleLedger,
    ) -> Result<(), DependsError> {
        let stamp_dir = self.config.target_dir.clone();

        let requires_step = with_suffix(object, ".requires");
        for module in info.requires() {
            if ledger.provides_locally(module) {
                let proxy = proxy_target(&stamp_dir, module);
                self.writer
                    .write_dependency_lines(&mut self.rules, &requires_step, [proxy.as_path()]);
            }
            match ledger.location(module) {
                Some(ModuleLocation::Stamp(path)) | Some(ModuleLocation::ModuleFile(path)) => {
                    self.writer
                        .write_dependency_lines(&mut self.rules, object, [path.as_path()]);
                }
                Some(ModuleLocation::Unresolved) | None => {}
            }
        }

        if info.provides().is_empty() {
            return Ok(());
        }
        let provides_step = with_suffix(object, ".provides");
        for module in info.provides() {
            let proxy = proxy_target(&stamp_dir, module);
            self.writer
                .write_dependency_lines(&mut self.rules, &proxy, [provides_step.as_path()]);
        }

        let sentinel = with_suffix(object, ".provides.build");
        let tool = &self.config.tool_command;
        let mut rule = MakeRule::new(sentinel.clone()).comment(format!(
            "Module stamps refreshed after {} is built",
            self.writer.relative(object)
        ));
        for module in info.provides() {
            let module_file = self.writer.shell_path(&self.config.module_dir.join(module));
            let stamp = self.writer.shell_path(&stamp_file(&stamp_dir, module));
            let mut command = format!("{tool} copy-mod {module_file} {stamp}");
            if let Some(id) = &self.config.compiler_id {
                command.push(' ');
                command.push_str(id);
            }
            rule = rule.command(command);
        }
        rule = rule.command(format!("{tool} touch {}", self.writer.shell_path(&sentinel)));
        self.writer.write_rule(&mut self.rules, &rule)?;

        let driver = MakeRule::new(stamp_dir.join("build"))
            .depend(sentinel)
            .symbolic();
        self.writer.write_rule(&mut self.rules, &driver)?;
        Ok(())
    }

    /// Finishes the pass. With a ledger, the module manifest and, if any
    /// module is provided, the clean script are produced too.
    pub fn finish(self, ledger: Option<&ModuleLedger>) -> EmittedStreams {
        tracing::trace!(paths = self.writer.converted_paths(), "rule paths converted");
        let manifest = ledger.map(|l| {
            let mut text = disclaimer();
            text.push_str(&ProvidesManifest::render(l.target_provides()));
            text
        });
        let clean_script = ledger
            .and_then(|l| {
                render_clean_script(
                    l.target_provides(),
                    &self.config.module_dir,
                    &self.config.target_dir,
                    &self.config.base,
                    self.writer.normalizer(),
                )
            })
            .map(|script| disclaimer() + &script);
        EmittedStreams {
            rules: self.rules,
            internal: self.internal,
            manifest,
            clean_script,
        }
    }
}
