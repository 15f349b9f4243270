//! # Collect Command Implementation
//!
//! Merges the block named `--key` found at every prefix of `--jsonpath`,
//! so parameters defined higher up are overridden by more specific ones.

use anyhow::Result;
use clap::Args;

use uniconf::value::Value;
use uniconf::Uniconf;

use super::{emit, render_value, GlobalArgs, OutputFormat};

/// Merge a named block found at every prefix of a path
#[derive(Args, Debug)]
pub struct CollectArgs {
    /// Dotted path to collect along
    #[arg(short, long, value_name = "PATH", default_value = ".")]
    pub jsonpath: String,

    /// Name of the block to collect at each prefix
    #[arg(short, long, value_name = "KEY", default_value = "params")]
    pub key: String,
}

pub fn render(uniconf: &Uniconf, args: &CollectArgs, format: OutputFormat) -> Result<String> {
    let params = uniconf.collect_params(&args.jsonpath, &args.key);
    render_value(&Value::Object(params), format)
}

/// Execute the `collect` command.
pub fn execute(args: CollectArgs, global: &GlobalArgs) -> Result<()> {
    let uniconf = global.load()?;
    emit(&render(&uniconf, &args, global.output)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::test_support::Project;
    use super::*;
    use serde_json::json;

    const CONFIG: &str = "\
params:
  ignored: true
prod:
  params:
    region: eu
    replicas: 3
  db:
    params:
      size: large
";

    #[test]
    fn test_collect_along_path() {
        let project = Project::new(CONFIG);
        let uniconf = project.global(OutputFormat::Json).load().unwrap();

        let args = CollectArgs {
            jsonpath: "prod.db".to_string(),
            key: "params".to_string(),
        };
        let out = render(&uniconf, &args, OutputFormat::Json).unwrap();
        let value: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value, json!({"region": "eu", "replicas": 3, "size": "large"}));
    }

    #[test]
    fn test_collect_empty_path_collects_nothing() {
        let project = Project::new(CONFIG);
        let uniconf = project.global(OutputFormat::Json).load().unwrap();

        let args = CollectArgs {
            jsonpath: ".".to_string(),
            key: "params".to_string(),
        };
        let out = render(&uniconf, &args, OutputFormat::Json).unwrap();
        let value: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value, json!({}));
    }
}
