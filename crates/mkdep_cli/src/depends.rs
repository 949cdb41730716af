//! `mkdep depends`: regenerate target dependency files.
//!
//! Each target is processed on its own: a failing target reports its error
//! and keeps its previous files, and the remaining targets still run.

use std::path::Path;

use mkdep_depends::{DependsGenerator, GenerationReport, LoadedTarget};
use mkdep_diagnostics::{Diagnostic, DiagnosticSink};
use mkdep_scan::ProcessMacroQuery;
use serde_json::json;

use crate::report::{counts, render_text};
use crate::{DependsArgs, GlobalArgs, ReportFormat};

/// Runs the `mkdep depends` command.
///
/// Returns exit code 0 if every target was generated, 1 otherwise.
pub fn run(args: &DependsArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let query = ProcessMacroQuery;
    let mut diagnostics: Vec<Diagnostic> = Vec::new();
    let mut reports = Vec::new();
    let mut failed = 0usize;

    for info_file in &args.targets {
        let sink = DiagnosticSink::new();
        match generate_one(info_file, args.directory_info.as_deref(), &sink, &query) {
            Ok(report) => {
                if !global.quiet && args.format == ReportFormat::Text {
                    eprintln!("{}", summary_line(&report));
                }
                reports.push(report);
            }
            Err(e) => {
                tracing::debug!(target_info = %info_file.display(), error = %e, "generation failed");
                sink.emit(e.to_diagnostic());
                failed += 1;
            }
        }
        diagnostics.extend(sink.take_all());
    }

    match args.format {
        ReportFormat::Text => {
            render_text(&diagnostics, global);
            let (errors, warnings) = counts(&diagnostics);
            if !global.quiet && (errors > 0 || warnings > 0) {
                eprintln!("   Result: {errors} error(s), {warnings} warning(s)");
            }
        }
        ReportFormat::Json => {
            let targets: Vec<_> = reports.iter().map(report_json).collect();
            let out = json!({
                "targets": targets,
                "diagnostics": serde_json::to_value(&diagnostics)?,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
    }

    Ok(if failed == 0 { 0 } else { 1 })
}

fn generate_one(
    info_file: &Path,
    directory_info: Option<&Path>,
    sink: &DiagnosticSink,
    query: &ProcessMacroQuery,
) -> Result<GenerationReport, mkdep_depends::DependsError> {
    let loaded = LoadedTarget::load(info_file, directory_info)?;
    DependsGenerator::new(sink, query).generate(&loaded)
}

/// One status line per target.
fn summary_line(report: &GenerationReport) -> String {
    if report.up_to_date {
        return format!("  Up to date {}", report.target);
    }
    format!(
        "  Generated {} ({} scanned, {} reused)",
        report.target, report.scanned, report.reused
    )
}

fn report_json(report: &GenerationReport) -> serde_json::Value {
    json!({
        "target": report.target,
        "up_to_date": report.up_to_date,
        "full_rescan": report.full_reason.map(|r| format!("{r:?}")),
        "scanned": report.scanned,
        "reused": report.reused,
        "rules_written": report.rules_written,
        "provided_modules": report.provided_modules,
        "unresolved_modules": report.unresolved_modules,
    })
}
