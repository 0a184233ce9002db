use super::{
    colorize_alias, json_pretty, spin_fail, spin_ok, spinner, status_ok, CommandError,
    EXIT_SUCCESS,
};
use modelreg_core::{RegisterOptions, Registry};
use modelreg_store::Metadata;
use serde_json::Value;
use std::path::Path;

pub struct RegisterArgs<'a> {
    pub task: &'a str,
    pub model: &'a str,
    pub version: &'a str,
    pub artifacts: &'a Path,
    pub set_alias: &'a str,
    pub actor: Option<&'a str>,
    pub reason: Option<&'a str>,
    pub metadata_json: Option<&'a Path>,
    pub metadata_inline: Option<&'a str>,
}

pub fn run(registry: &Registry, args: &RegisterArgs<'_>, json: bool) -> Result<u8, CommandError> {
    let metadata = collect_metadata(args.metadata_json, args.metadata_inline)?;
    let alias = args.set_alias.trim();
    let options = RegisterOptions {
        set_alias: (!alias.is_empty()).then(|| alias.to_owned()),
        actor: args.actor.map(str::to_owned),
        reason: args.reason.map(str::to_owned),
    };

    let pb = if json {
        None
    } else {
        Some(spinner(&format!(
            "registering {}/{}@{}...",
            args.task, args.model, args.version
        )))
    };
    let result = match registry.register(
        args.task,
        args.model,
        args.version,
        args.artifacts,
        metadata,
        &options,
    ) {
        Ok(r) => {
            if let Some(ref pb) = pb {
                spin_ok(pb, "model registered");
            }
            r
        }
        Err(e) => {
            if let Some(ref pb) = pb {
                spin_fail(pb, "registration failed");
            }
            return Err(e.into());
        }
    };

    if json {
        println!("{}", json_pretty(&result)?);
    } else {
        println!(
            "{}: {}/{}/{}",
            status_ok("registered"),
            result.task, result.model_name, result.version
        );
        println!("path: {}", result.package_path.display());
        if let Some(alias) = &result.alias_set {
            println!("alias set: {}", colorize_alias(alias));
        }
    }
    Ok(EXIT_SUCCESS)
}

/// File metadata first, then inline JSON overriding it key by key.
fn collect_metadata(
    file: Option<&Path>,
    inline: Option<&str>,
) -> Result<Metadata, CommandError> {
    let mut meta = Metadata::new();
    if let Some(path) = file {
        if !path.exists() {
            return Err(CommandError::Input(format!(
                "JSON file not found: {}",
                path.display()
            )));
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| CommandError::Input(format!("failed to read {}: {e}", path.display())))?;
        meta.extend(parse_object(&text, &path.display().to_string())?);
    }
    if let Some(text) = inline {
        meta.extend(parse_object(text, "--metadata-inline")?);
    }
    Ok(meta)
}

fn parse_object(text: &str, origin: &str) -> Result<Metadata, CommandError> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(CommandError::Input(format!(
            "metadata from {origin} must be a JSON object"
        ))),
        Err(e) => Err(CommandError::Input(format!(
            "invalid metadata JSON from {origin}: {e}"
        ))),
    }
}
