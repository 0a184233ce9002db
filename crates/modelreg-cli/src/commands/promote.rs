use super::{colorize_alias, json_pretty, status_ok, CommandError, EXIT_SUCCESS};
use modelreg_core::Registry;

pub struct PromoteArgs<'a> {
    pub task: &'a str,
    pub model: &'a str,
    pub version: &'a str,
    pub alias: &'a str,
    pub actor: Option<&'a str>,
    pub reason: Option<&'a str>,
}

pub fn run(registry: &Registry, args: &PromoteArgs<'_>, json: bool) -> Result<u8, CommandError> {
    let doc = registry.promote(
        args.task,
        args.model,
        args.alias,
        args.version,
        args.actor,
        args.reason,
    )?;
    if json {
        println!("{}", json_pretty(&doc)?);
    } else {
        println!(
            "{} {}@{} → {}",
            status_ok("promoted"),
            doc.model_name,
            doc.version,
            colorize_alias(&doc.alias)
        );
    }
    Ok(EXIT_SUCCESS)
}
