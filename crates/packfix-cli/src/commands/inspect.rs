use super::{colorize_issue, json_pretty, EXIT_INVALID_PACK, EXIT_SUCCESS};
use packfix_core::{CoreError, Engine};
use std::path::Path;

pub fn run(engine: &Engine, archive: &Path, json: bool) -> Result<u8, String> {
    let info = match engine.try_extract(&archive) {
        Ok(info) => info,
        Err(CoreError::Unrepairable { issues }) => {
            if json {
                let payload = serde_json::json!({
                    "usable": false,
                    "issues": issues,
                });
                println!("{}", json_pretty(&payload)?);
            } else {
                eprintln!("pack is unusable even after repair:");
                for issue in &issues {
                    eprintln!("{}", colorize_issue(&issue.to_string()));
                }
            }
            return Ok(EXIT_INVALID_PACK);
        }
        Err(e) => return Err(e.to_string()),
    };

    if json {
        println!("{}", json_pretty(&info)?);
    } else {
        println!("name:        {}", info.name);
        println!("description: {}", info.description);
        println!("version:     {}", info.version_string());
        println!("uuid:        {}", info.uuid);
        println!(
            "manifest:    {}",
            if info.was_fixed {
                "repaired (run `packfix fix` to save the corrected pack)"
            } else {
                "ok"
            }
        );
    }
    Ok(EXIT_SUCCESS)
}
