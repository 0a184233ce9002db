use super::{json_pretty, CommandError, EXIT_SUCCESS};
use modelreg_core::Registry;

pub fn run(
    registry: &Registry,
    task: &str,
    model_ref: &str,
    verify: bool,
    json: bool,
) -> Result<u8, CommandError> {
    let path = registry.resolve(task, model_ref, verify)?;
    if json {
        let payload = serde_json::json!({ "ok": true, "path": path });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("{}", path.display());
    }
    Ok(EXIT_SUCCESS)
}
