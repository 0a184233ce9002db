use super::{json_pretty, CommandError, EXIT_SUCCESS};
use modelreg_core::Registry;

pub fn run(registry: &Registry, task: &str, model: &str, json: bool) -> Result<u8, CommandError> {
    let versions = registry.list_versions(task, model)?;
    if json {
        println!("{}", json_pretty(&versions)?);
    } else if versions.is_empty() {
        println!("no versions registered for {task}/{model}");
    } else {
        for v in &versions {
            println!("{v}");
        }
    }
    Ok(EXIT_SUCCESS)
}
