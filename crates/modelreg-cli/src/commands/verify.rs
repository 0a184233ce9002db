use super::{json_pretty, spin_fail, spin_ok, spinner, status_ok, CommandError, EXIT_SUCCESS};
use modelreg_core::Registry;

pub fn run(registry: &Registry, task: &str, model_ref: &str, json: bool) -> Result<u8, CommandError> {
    let pb = if json {
        None
    } else {
        Some(spinner(&format!("verifying {model_ref}...")))
    };
    match registry.verify(task, model_ref) {
        Ok(()) => {
            if let Some(ref pb) = pb {
                spin_ok(pb, "integrity verification passed");
            }
        }
        Err(e) => {
            if let Some(ref pb) = pb {
                spin_fail(pb, "integrity verification failed");
            }
            return Err(e.into());
        }
    }
    if json {
        let payload = serde_json::json!({ "ok": true, "ref": model_ref });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("{}: integrity verification passed for {model_ref}", status_ok("ok"));
    }
    Ok(EXIT_SUCCESS)
}
