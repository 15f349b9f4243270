//! Benchmarks for merging, path search, and parameter collection.
//!
//! Trees are shaped like CI/CD configurations: a few hundred jobs nested in
//! `jobs` containers, each with a `params` block and a step list.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::json;

use uniconf::collect::{collect_children, collect_params};
use uniconf::merge::merged;
use uniconf::path::{flatten, search_prefixes};
use uniconf::value::{Map, Value};

/// Builds a `jobs.<env>.jobs.<job>` tree with `envs * jobs` leaf jobs.
fn create_jobs_tree(envs: usize, jobs: usize, tag: &str) -> Value {
    let mut env_map = Map::new();
    for e in 0..envs {
        let mut job_map = Map::new();
        for j in 0..jobs {
            job_map.insert(
                format!("job{}", j),
                json!({
                    "params": {"timeout": j, "image": format!("{}-{}", tag, j)},
                    "steps": ["checkout", format!("build-{}", j), "publish"],
                }),
            );
        }
        env_map.insert(
            format!("env{}", e),
            json!({"params": {"branch": tag, "region": "eu"}, "jobs": job_map}),
        );
    }
    json!({"params": {"owner": "platform"}, "jobs": env_map})
}

fn bench_merge(c: &mut Criterion) {
    let base = create_jobs_tree(10, 30, "base");
    let overlay = create_jobs_tree(10, 30, "overlay");

    c.bench_function("merge_jobs_tree_300", |b| {
        b.iter(|| merged(black_box(base.clone()), black_box(&overlay)))
    });
}

fn bench_search(c: &mut Criterion) {
    let tree = create_jobs_tree(10, 30, "base");

    c.bench_function("search_prefixes_deep", |b| {
        b.iter(|| search_prefixes(black_box(&tree), black_box("jobs.env7.jobs.job23.params.image")))
    });

    c.bench_function("search_prefixes_miss", |b| {
        b.iter(|| search_prefixes(black_box(&tree), black_box("jobs.env7.jobs.nope.params")))
    });
}

fn bench_collect(c: &mut Criterion) {
    let tree = create_jobs_tree(10, 30, "base");

    c.bench_function("collect_children_job", |b| {
        b.iter(|| collect_children(black_box(&tree), black_box("env7.job23"), "jobs"))
    });

    c.bench_function("collect_params_path", |b| {
        b.iter(|| collect_params(black_box(&tree), black_box("jobs.env7.jobs.job23"), "params"))
    });
}

fn bench_flatten(c: &mut Criterion) {
    let tree = create_jobs_tree(10, 30, "base");

    c.bench_function("flatten_jobs_tree_300", |b| b.iter(|| flatten(black_box(&tree))));
}

criterion_group!(benches, bench_merge, bench_search, bench_collect, bench_flatten);
criterion_main!(benches);
