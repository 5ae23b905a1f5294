use super::{
    colorize_issue, default_output_path, json_pretty, spin_fail, spin_ok, spinner, EXIT_SUCCESS,
};
use packfix_core::{Engine, RepairOutcome};
use packfix_schema::ValidationResult;
use std::path::Path;
use tracing::debug;

pub fn run(
    engine: &Engine,
    archive: &Path,
    output: Option<&Path>,
    force: bool,
    json: bool,
) -> Result<u8, String> {
    let validation = engine.validate(&archive).map_err(|e| e.to_string())?;
    if validation.is_valid {
        if json {
            let payload = serde_json::json!({
                "status": "unchanged",
                "input": archive.display().to_string(),
            });
            println!("{}", json_pretty(&payload)?);
        } else {
            println!("{} is already valid, nothing to fix", archive.display());
        }
        return Ok(EXIT_SUCCESS);
    }

    let output = output.map_or_else(|| default_output_path(archive), Path::to_path_buf);
    if output.exists() && !force {
        return Err(format!(
            "{} already exists (use --force to overwrite)",
            output.display()
        ));
    }
    debug!("repairing {} into {}", archive.display(), output.display());

    let pb = if json {
        None
    } else {
        Some(spinner("repairing pack..."))
    };
    let report = match engine.repair_to_file(&archive, &validation, &output) {
        Ok(RepairOutcome::Repaired(report)) => {
            if let Some(ref pb) = pb {
                spin_ok(pb, &format!("wrote {}", output.display()));
            }
            report
        }
        Ok(RepairOutcome::Unchanged) => {
            if let Some(ref pb) = pb {
                spin_ok(pb, "nothing to repair");
            }
            return Ok(EXIT_SUCCESS);
        }
        Err(e) => {
            if let Some(ref pb) = pb {
                spin_fail(pb, "repair failed");
            }
            return Err(e.to_string());
        }
    };

    if json {
        let payload = serde_json::json!({
            "status": "repaired",
            "input": archive.display().to_string(),
            "output": output.display().to_string(),
            "issues": validation.issues,
            "changes": report.notes.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "entries_copied": report.summary.copied,
            "entries_written": report.summary.output_entries(),
            "entries_replaced": report.summary.dropped,
            "manifest": report.manifest,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        print_fixed_issues(&validation);
        for note in &report.notes {
            println!("  {note}");
        }
        println!(
            "{} entries copied into {}",
            report.summary.copied,
            output.display()
        );
    }
    Ok(EXIT_SUCCESS)
}

fn print_fixed_issues(validation: &ValidationResult) {
    println!("fixed {} issue(s):", validation.issues.len());
    for issue in &validation.issues {
        println!("{}", colorize_issue(&issue.to_string()));
    }
}
