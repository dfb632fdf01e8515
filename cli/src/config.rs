// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use modfold_format::Module;
use modfold_linker::{DependencyDescriptor, Directive, parse_directives};
use serde::Deserialize;

/// A fully resolved link configuration: the host artifact, the build
/// configuration, the parsed policy, and one descriptor per dependency.
#[derive(Debug)]
pub struct LinkConfig {
    /// The build configuration directives are evaluated against.
    pub configuration: String,
    /// Path to the host module that gets linked in place.
    pub host: PathBuf,
    /// Policy rules, in declaration order.
    pub directives: Vec<Directive>,
    /// Dependencies, in declaration order.
    pub dependencies: Vec<DependencyDescriptor>,
}

fn default_configuration() -> String {
    "Release".to_string()
}

fn default_private() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RawConfig {
    /// The host module to link
    host: PathBuf,
    /// The active build configuration
    #[serde(default = "default_configuration")]
    configuration: String,
    /// Path to the directives file, if any
    directives: Option<PathBuf>,
    /// The host's dependencies
    #[serde(default, rename = "dependency")]
    dependencies: Vec<RawDependency>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RawDependency {
    name: String,
    path: PathBuf,
    /// Copy-local dependencies not meant to be referenced by consumers of
    /// the host. This is what the implicit embed rule applies to.
    #[serde(default = "default_private")]
    private: bool,
}

impl LinkConfig {
    /// Reads and resolves a link configuration file.
    ///
    /// Relative paths are resolved against the configuration file's
    /// directory. Each dependency module is probed once for its identity;
    /// probe failures are recorded on the descriptor, not raised, so the
    /// pass can report them per dependency.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path).context("failed to read configuration file")?;
        let raw: RawConfig = toml::from_str(&text).context("failed to parse configuration")?;

        let base = path.parent().unwrap_or(Path::new("."));

        let directives = match &raw.directives {
            Some(directives_path) => {
                let directives_path = resolve(base, directives_path);
                let text = fs::read_to_string(&directives_path).with_context(|| {
                    format!("failed to read directives file {}", directives_path.display())
                })?;
                parse_directives(&text)
            }
            None => Vec::new(),
        };

        let dependencies = raw
            .dependencies
            .into_iter()
            .map(|dep| {
                let path = resolve(base, &dep.path);
                let (identity, load_error) = match Module::load(&path) {
                    Ok(module) => (module.identity(), None),
                    Err(e) => (dep.name.clone(), Some(e.to_string())),
                };
                DependencyDescriptor {
                    simple_name: dep.name,
                    private: dep.private,
                    path,
                    identity,
                    load_error,
                }
            })
            .collect();

        Ok(Self {
            configuration: raw.configuration,
            host: resolve(base, &raw.host),
            directives,
            dependencies,
        })
    }
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_full_configuration() {
        let dir = tempfile::tempdir().unwrap();

        let dep = Module::new("acme-util", "0.3.0");
        dep.write(&dir.path().join("acme-util.mfm")).unwrap();

        fs::write(dir.path().join("app.directives"), "acme-*: Merge\n").unwrap();
        fs::write(
            dir.path().join("link.toml"),
            "host = \"app.mfm\"\n\
             configuration = \"Debug\"\n\
             directives = \"app.directives\"\n\
             \n\
             [[dependency]]\n\
             name = \"acme-util\"\n\
             path = \"acme-util.mfm\"\n\
             \n\
             [[dependency]]\n\
             name = \"missing\"\n\
             path = \"missing.mfm\"\n\
             private = false\n",
        )
        .unwrap();

        let cfg = LinkConfig::from_file(&dir.path().join("link.toml")).unwrap();

        assert_eq!(cfg.configuration, "Debug");
        assert_eq!(cfg.host, dir.path().join("app.mfm"));
        assert_eq!(cfg.directives.len(), 1);

        assert_eq!(cfg.dependencies.len(), 2);
        assert_eq!(cfg.dependencies[0].identity, "acme-util/0.3.0");
        assert!(cfg.dependencies[0].load_error.is_none());
        assert!(cfg.dependencies[0].private);

        assert!(!cfg.dependencies[1].private);
        assert!(cfg.dependencies[1].load_error.is_some());
    }

    #[test]
    fn rejects_unknown_fields() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("link.toml"), "host = \"a\"\ntypo = 1\n").unwrap();
        assert!(LinkConfig::from_file(&dir.path().join("link.toml")).is_err());
    }
}
