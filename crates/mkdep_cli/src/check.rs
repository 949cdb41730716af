//! `mkdep check`: show what a generation pass would rescan.

use mkdep_depends::{DependsGenerator, FullReason, LoadedTarget, RescanPlan};
use mkdep_diagnostics::DiagnosticSink;
use mkdep_scan::ProcessMacroQuery;
use serde_json::json;

use crate::report::render_text;
use crate::{CheckArgs, GlobalArgs, ReportFormat};

/// Runs the `mkdep check` command. Nothing is written.
///
/// Returns exit code 0 when the target is up to date, 2 when a pass would
/// rescan something, and 1 when the target cannot be loaded.
pub fn run(args: &CheckArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let sink = DiagnosticSink::new();
    let loaded = match LoadedTarget::load(&args.target, args.directory_info.as_deref()) {
        Ok(loaded) => loaded,
        Err(e) => {
            render_text(&[e.to_diagnostic()], global);
            return Ok(1);
        }
    };
    let query = ProcessMacroQuery;
    let plan = DependsGenerator::new(&sink, &query).check(&loaded);

    match args.format {
        ReportFormat::Text => {
            render_text(&sink.take_all(), global);
            if !global.quiet {
                print!("{}", plan_text(&loaded.target.name, &plan));
            }
        }
        ReportFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&plan_json(&loaded.target.name, &plan))?);
        }
    }
    Ok(if plan.is_fresh() { 0 } else { 2 })
}

fn reason_text(reason: FullReason) -> &'static str {
    match reason {
        FullReason::NoRecord => "no previous records",
        FullReason::TargetInfoNewer => "target descriptor changed",
        FullReason::DirectoryInfoNewer => "directory descriptor changed",
    }
}

fn plan_text(target: &str, plan: &RescanPlan) -> String {
    let mut out = match plan.full_reason() {
        Some(reason) => format!("{target}: full rescan ({})\n", reason_text(reason)),
        None if plan.is_fresh() => format!("{target}: up to date\n"),
        None => format!("{target}: partial rescan\n"),
    };
    for (object, state) in plan.objects() {
        out.push_str(&format!("  {:<8} {}\n", state.to_string(), object.display()));
    }
    for object in plan.removed() {
        out.push_str(&format!("  {:<8} {}\n", "removed", object.display()));
    }
    out
}

fn plan_json(target: &str, plan: &RescanPlan) -> serde_json::Value {
    let objects: Vec<_> = plan
        .objects()
        .map(|(object, state)| {
            json!({ "object": object.display().to_string(), "state": state.to_string() })
        })
        .collect();
    let removed: Vec<String> = plan
        .removed()
        .iter()
        .map(|o| o.display().to_string())
        .collect();
    json!({
        "target": target,
        "fresh": plan.is_fresh(),
        "full_rescan": plan.full_reason().map(reason_text),
        "objects": objects,
        "removed": removed,
    })
}
