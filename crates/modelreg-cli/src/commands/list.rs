use super::{json_pretty, CommandError, EXIT_SUCCESS};
use modelreg_core::Registry;

pub fn run(registry: &Registry, task: &str, json: bool) -> Result<u8, CommandError> {
    let models = registry.list_models(task)?;
    if json {
        println!("{}", json_pretty(&models)?);
    } else if models.is_empty() {
        println!("no models found for task '{task}'");
    } else {
        for name in &models {
            println!("{name}");
        }
    }
    Ok(EXIT_SUCCESS)
}
