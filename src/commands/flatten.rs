//! # Flatten Command Implementation
//!
//! Prints every leaf of the resolved configuration as a dotted key path.
//! Lists are leaves; with YAML output each line is `key: value`.

use anyhow::Result;
use clap::Args;

use uniconf::value::{display_scalar, Map, Value};
use uniconf::Uniconf;

use super::{emit, render_value, GlobalArgs, OutputFormat};

/// Print the configuration as dotted key paths
#[derive(Args, Debug, Default)]
pub struct FlattenArgs {
    /// Only print keys starting with this prefix
    #[arg(short, long, value_name = "PREFIX")]
    pub prefix: Option<String>,
}

fn matches(key: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_matches('.');
    prefix.is_empty()
        || key == prefix
        || key
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('.'))
}

pub fn render(uniconf: &Uniconf, args: &FlattenArgs, format: OutputFormat) -> Result<String> {
    let prefix = args.prefix.as_deref().unwrap_or("");
    let entries = uniconf
        .flat_config()
        .iter()
        .filter(|(key, _)| matches(key, prefix));

    match format {
        OutputFormat::Yaml => Ok(entries
            .map(|(key, value)| format!("{}: {}\n", key, display_scalar(value)))
            .collect()),
        OutputFormat::Json => {
            let map: Map<String, Value> = entries
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();
            render_value(&Value::Object(map), format)
        }
    }
}

/// Execute the `flatten` command.
pub fn execute(args: FlattenArgs, global: &GlobalArgs) -> Result<()> {
    let uniconf = global.load()?;
    emit(&render(&uniconf, &args, global.output)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::test_support::Project;
    use super::*;
    use serde_json::json;

    const CONFIG: &str = "db:\n  host: localhost\n  port: 5432\ndbx: 1\nname: app\n";

    #[test]
    fn test_flatten_json() {
        let project = Project::new(CONFIG);
        let uniconf = project.global(OutputFormat::Json).load().unwrap();

        let out = render(&uniconf, &FlattenArgs::default(), OutputFormat::Json).unwrap();
        let value: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["db.host"], json!("localhost"));
        assert_eq!(value["db.port"], json!(5432));
        assert_eq!(value["name"], json!("app"));
    }

    #[test]
    fn test_flatten_prefix_respects_segments() {
        let project = Project::new(CONFIG);
        let uniconf = project.global(OutputFormat::Yaml).load().unwrap();

        let args = FlattenArgs {
            prefix: Some("db".to_string()),
        };
        let out = render(&uniconf, &args, OutputFormat::Yaml).unwrap();
        assert!(out.contains("db.host: localhost\n"));
        assert!(out.contains("db.port: 5432\n"));
        assert!(!out.contains("dbx"));
    }
}
