use super::{colorize_alias, json_pretty, CommandError, EXIT_SUCCESS};
use modelreg_core::Registry;
use std::fmt::Write as _;

pub fn run(registry: &Registry, task: &str, model: &str, json: bool) -> Result<u8, CommandError> {
    let events = registry.promotion_history(task, model)?;
    if json {
        println!("{}", json_pretty(&events)?);
        return Ok(EXIT_SUCCESS);
    }
    if events.is_empty() {
        println!("no promotions recorded for {task}/{model}");
        return Ok(EXIT_SUCCESS);
    }
    for e in &events {
        let mut line = format!(
            "{}  {} -> {}",
            e.ts_utc,
            colorize_alias(&e.alias),
            e.version
        );
        if let Some(actor) = &e.actor {
            let _ = write!(line, "  by {actor}");
        }
        if let Some(reason) = &e.reason {
            let _ = write!(line, "  ({reason})");
        }
        println!("{line}");
    }
    Ok(EXIT_SUCCESS)
}
