use super::{colorize_issue, colorize_verdict, json_pretty, EXIT_INVALID_PACK, EXIT_SUCCESS};
use packfix_core::Engine;
use std::path::Path;

pub fn run(engine: &Engine, archive: &Path, json: bool) -> Result<u8, String> {
    let result = engine.validate(&archive).map_err(|e| e.to_string())?;

    if json {
        println!("{}", json_pretty(&result)?);
    } else {
        println!("{}: {}", archive.display(), colorize_verdict(result.is_valid));
        if let Some(path) = &result.manifest_path {
            println!("manifest: {path}");
        }
        if !result.issues.is_empty() {
            println!("{} issue(s):", result.issues.len());
            for issue in &result.issues {
                println!("{}", colorize_issue(&issue.to_string()));
            }
        }
        if !result.has_pack_icon {
            println!("note: pack has no pack_icon.png");
        }
    }

    Ok(if result.is_valid {
        EXIT_SUCCESS
    } else {
        EXIT_INVALID_PACK
    })
}
