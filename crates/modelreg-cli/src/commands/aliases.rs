use super::{colorize_alias, json_pretty, CommandError, EXIT_SUCCESS};
use modelreg_core::Registry;

pub fn run(registry: &Registry, task: &str, model: &str, json: bool) -> Result<u8, CommandError> {
    let aliases = registry.list_aliases(task, model)?;
    if json {
        println!("{}", json_pretty(&aliases)?);
    } else if aliases.is_empty() {
        println!("no aliases for {task}/{model}");
    } else {
        println!("{:<14} {:<24} {:<34} ACTOR", "ALIAS", "VERSION", "UPDATED_AT");
        for doc in &aliases {
            println!(
                "{:<14} {:<24} {:<34} {}",
                colorize_alias(&doc.alias),
                doc.version,
                doc.updated_at,
                doc.actor.as_deref().unwrap_or("-")
            );
        }
    }
    Ok(EXIT_SUCCESS)
}
