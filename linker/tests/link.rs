//! Driver pass behavior: policy evaluation, per-dependency reports, file
//! side effects, and loader injection.

mod common;

use std::fs;
use std::path::Path;

use common::module;
use modfold_format::{Module, QualifiedName};
use modfold_linker::{
    DependencyDescriptor, DependencyStatus, LOADER_TYPE_NAME, Linker, parse_directives,
};

fn write_dep(dir: &Path, name: &str) -> DependencyDescriptor {
    let dep = module(name);
    let path = dir.join(format!("{name}.mfm"));
    dep.write(&path).unwrap();
    DependencyDescriptor {
        simple_name: name.to_string(),
        private: true,
        path,
        identity: dep.identity(),
        load_error: None,
    }
}

#[test]
fn pass_applies_policy_and_reports_each_dependency() {
    let dir = tempfile::tempdir().unwrap();
    let host_path = dir.path().join("app.mfm");

    let mut host = module("app");

    let mut deps = vec![
        write_dep(dir.path(), "keepme"),
        write_dep(dir.path(), "mergeme"),
        write_dep(dir.path(), "embedme"),
    ];
    // a non-private dependency no rule speaks about
    let mut public_dep = write_dep(dir.path(), "publicdep");
    public_dep.private = false;
    deps.push(public_dep);
    // a dependency the build pipeline already failed to load
    deps.push(DependencyDescriptor {
        simple_name: "broken".to_string(),
        private: true,
        path: dir.path().join("broken.mfm"),
        identity: "broken/1.0.0".to_string(),
        load_error: Some("file is corrupt".to_string()),
    });

    let directives = parse_directives("keep*: None\nmergeme: Merge\n");
    let linker = Linker::new("Release", directives);
    let outcome = linker.process(&mut host, &host_path, &deps);

    let statuses: Vec<_> = outcome.reports.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        vec![
            DependencyStatus::ExcludedByRule,
            DependencyStatus::Merged,
            // no user rule, so the implicit private/Release default applies
            DependencyStatus::Embedded,
            DependencyStatus::ExcludedNoRule,
            DependencyStatus::Failed,
        ]
    );
    assert!(outcome.changed);

    // embedding deletes the copy-local file right away
    assert!(!dir.path().join("embedme.mfm").exists());
    // merged inputs stay on disk until the host has been written
    assert!(dir.path().join("mergeme.mfm").exists());
    assert_eq!(outcome.delete_after_write, vec![dir.path().join("mergeme.mfm")]);

    // the runtime loader was injected exactly once
    assert!(host.find_type(&QualifiedName::global(LOADER_TYPE_NAME)).is_some());
}

#[test]
fn pass_without_work_leaves_the_host_alone() {
    let dir = tempfile::tempdir().unwrap();
    let host_path = dir.path().join("app.mfm");
    let mut host = module("app");
    let before = host.to_bytes().unwrap();

    let mut dep = write_dep(dir.path(), "dep");
    dep.private = false; // the default rule only covers private dependencies

    let outcome = Linker::new("Release", Vec::new()).process(&mut host, &host_path, &[dep]);

    assert!(!outcome.changed);
    assert_eq!(outcome.reports[0].status, DependencyStatus::ExcludedNoRule);
    assert_eq!(host.to_bytes().unwrap(), before);
    assert!(host.find_type(&QualifiedName::global(LOADER_TYPE_NAME)).is_none());
}

#[test]
fn missing_dependency_file_fails_just_that_dependency() {
    let dir = tempfile::tempdir().unwrap();
    let host_path = dir.path().join("app.mfm");
    let mut host = module("app");

    let missing = DependencyDescriptor {
        simple_name: "ghost".to_string(),
        private: true,
        path: dir.path().join("ghost.mfm"),
        identity: "ghost/1.0.0".to_string(),
        load_error: None,
    };
    let good = write_dep(dir.path(), "good");

    let outcome =
        Linker::new("Release", Vec::new()).process(&mut host, &host_path, &[missing, good]);

    assert_eq!(outcome.reports[0].status, DependencyStatus::Failed);
    assert!(outcome.reports[0].detail.is_some());
    // the pass continued with the remaining dependency
    assert_eq!(outcome.reports[1].status, DependencyStatus::Embedded);
    assert!(outcome.changed);
}

#[test]
fn corrupt_dependency_file_fails_just_that_dependency() {
    let dir = tempfile::tempdir().unwrap();
    let host_path = dir.path().join("app.mfm");
    let mut host = module("app");

    let path = dir.path().join("junk.mfm");
    fs::write(&path, b"definitely not a module container").unwrap();
    let junk = DependencyDescriptor {
        simple_name: "junk".to_string(),
        private: true,
        path,
        identity: "junk/1.0.0".to_string(),
        load_error: None,
    };

    let outcome = Linker::new("Release", Vec::new()).process(&mut host, &host_path, &[junk]);
    assert_eq!(outcome.reports[0].status, DependencyStatus::Failed);
    assert!(!outcome.changed);
}

#[test]
fn linked_host_round_trips_through_the_container() {
    let dir = tempfile::tempdir().unwrap();
    let host_path = dir.path().join("app.mfm");
    let mut host = module("app");

    let deps = [write_dep(dir.path(), "payload")];
    let outcome = Linker::new("Release", Vec::new()).process(&mut host, &host_path, &deps);
    assert!(outcome.changed);

    host.write(&host_path).unwrap();
    let reloaded = Module::load(&host_path).unwrap();
    assert_eq!(reloaded.identity(), "app/1.0.0");

    // the embedded payload is reachable from the written artifact
    let resolved = modfold_runtime::resolve_in(&reloaded, "payload/1.0.0").unwrap();
    assert_eq!(resolved.identity(), "payload/1.0.0");
}
