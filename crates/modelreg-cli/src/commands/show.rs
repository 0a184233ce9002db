use super::{json_pretty, CommandError, EXIT_SUCCESS};
use modelreg_core::{CoreError, Registry};
use modelreg_store::{PackagePaths, META_FILE};
use serde_json::Value;

pub fn run(
    registry: &Registry,
    task: &str,
    model_ref: &str,
    verify: bool,
    raw: bool,
    json: bool,
) -> Result<u8, CommandError> {
    if raw {
        let dir = registry.resolve(task, model_ref, verify)?;
        let meta_path = PackagePaths::new(&dir).meta_path();
        if !meta_path.exists() {
            return Err(
                CoreError::NotFound(format!("{META_FILE} not found in {}", dir.display())).into(),
            );
        }
        let text = std::fs::read_to_string(&meta_path).map_err(CoreError::from)?;
        if text.ends_with('\n') {
            print!("{text}");
        } else {
            println!("{text}");
        }
        return Ok(EXIT_SUCCESS);
    }

    let pkg = registry.read_metadata(task, model_ref, verify)?;
    if json {
        println!("{}", json_pretty(&pkg.meta)?);
        return Ok(EXIT_SUCCESS);
    }

    let field = |key: &str| display_value(pkg.meta.get(key));
    let task_shown = match pkg.meta.get("task") {
        Some(v) if !v.is_null() => display_value(Some(v)),
        _ => task.to_owned(),
    };
    println!("task:        {task_shown}");
    println!("model:       {}", field("model_name"));
    println!("version:     {}", field("version"));
    println!("created_at:  {}", field("created_at"));
    println!("framework:   {}", field("framework"));
    println!("model_type:  {}", field("model_type"));

    if let Some(Value::Object(prov)) = pkg.meta.get("provenance") {
        if !prov.is_empty() {
            println!("provenance:");
            for key in ["git_commit", "training_data_ref", "trainer_version"] {
                if let Some(v) = prov.get(key).filter(|v| !v.is_null()) {
                    println!("  {key}: {}", display_value(Some(v)));
                }
            }
        }
    }
    println!("package_dir: {}", pkg.package_dir.display());
    Ok(EXIT_SUCCESS)
}

fn display_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "-".to_owned(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
