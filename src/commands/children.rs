//! # Children Command Implementation
//!
//! Computes the effective parameters of an entity nested in a container
//! hierarchy, e.g. the job `prod.install` stored as `jobs.prod.jobs.install`.

use anyhow::Result;
use clap::Args;

use uniconf::value::Value;
use uniconf::Uniconf;

use super::{emit, render_value, GlobalArgs, OutputFormat};

/// Merge the levels of a nested container hierarchy
#[derive(Args, Debug)]
pub struct ChildrenArgs {
    /// Dotted name of the nested entity
    #[arg(short, long, value_name = "PATH", default_value = ".")]
    pub jsonpath: String,

    /// Container key repeated before every path segment
    #[arg(short, long, value_name = "KEY", default_value = "jobs")]
    pub key: String,
}

pub fn render(uniconf: &Uniconf, args: &ChildrenArgs, format: OutputFormat) -> Result<String> {
    let params = uniconf.collect_children(&args.jsonpath, &args.key);
    render_value(&Value::Object(params), format)
}

/// Execute the `children` command.
pub fn execute(args: ChildrenArgs, global: &GlobalArgs) -> Result<()> {
    let uniconf = global.load()?;
    emit(&render(&uniconf, &args, global.output)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::test_support::Project;
    use super::*;
    use serde_json::json;

    #[test]
    fn test_children_of_nested_job() {
        let project = Project::new("from: [jobs]\n");
        project.write(
            "scenarios/jobs.yaml",
            "jobs:\n  prod:\n    params: {branch: master}\n    jobs:\n      install:\n        params:\n          pipeline: {name: x}\n",
        );
        let uniconf = project.global(OutputFormat::Json).load().unwrap();

        let args = ChildrenArgs {
            jsonpath: "prod.install".to_string(),
            key: "jobs".to_string(),
        };
        let out = render(&uniconf, &args, OutputFormat::Json).unwrap();
        let value: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(
            value,
            json!({"params": {"branch": "master", "pipeline": {"name": "x"}}})
        );
    }
}
