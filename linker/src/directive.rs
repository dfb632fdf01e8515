// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Directive policy: which action to take for which dependency.
//!
//! Directives come from an ordered text file, one rule per line:
//!
//! ```text
//! # [(configuration)] [+|-]name-pattern: action
//! (Release) Acme.*: Merge
//! +PublicApi: None
//! Legacy?Compat: Embed
//! ```
//!
//! `+` scopes a rule to non-private dependencies, `-` or nothing to private
//! ones. Rules are evaluated in file order and the last match wins; an
//! implicit `(Release) -*: Embed` rule sits in front of them all, so private
//! dependencies of a release build are embedded unless a user rule says
//! otherwise.

/// What to do with one dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Leave the dependency alone.
    None,
    /// Fold the dependency's definitions into the host.
    Merge,
    /// Store the dependency as a compressed resource in the host.
    Embed,
}

/// One policy rule. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub configuration: Option<String>,
    pub private: bool,
    pub pattern: String,
    pub action: Action,
}

impl Directive {
    fn default_rule() -> Self {
        Self {
            configuration: Some("Release".to_string()),
            private: true,
            pattern: "*".to_string(),
            action: Action::Embed,
        }
    }

    /// Returns the directive's action if it applies to the given dependency
    /// under the given build configuration.
    pub fn matches(&self, simple_name: &str, private: bool, configuration: &str) -> Option<Action> {
        if self.private != private {
            return None;
        }
        if let Some(cfg) = &self.configuration
            && cfg != configuration
        {
            return None;
        }
        glob_match(&self.pattern, simple_name).then_some(self.action)
    }
}

/// Evaluates the policy for one dependency. `None` means no rule matched at
/// all, which callers report separately from an explicit [`Action::None`].
pub fn evaluate(
    directives: &[Directive],
    simple_name: &str,
    private: bool,
    configuration: &str,
) -> Option<Action> {
    let mut action = Directive::default_rule().matches(simple_name, private, configuration);
    for directive in directives {
        if let Some(matched) = directive.matches(simple_name, private, configuration) {
            action = Some(matched);
        }
    }
    action
}

/// Parses a directive file. Malformed lines are skipped, never fatal; lines
/// that look like directives (they contain a `:`) are warned about.
pub fn parse_directives(text: &str) -> Vec<Directive> {
    text.lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                return None;
            }
            let parsed = parse_directive(line);
            if parsed.is_none() && line.contains(':') {
                log::warn!("ignoring malformed directive: {line}");
            }
            parsed
        })
        .collect()
}

/// Parses a single `[(configuration)] [+|-]pattern: action` line.
pub fn parse_directive(line: &str) -> Option<Directive> {
    let mut rest = line.trim();

    let configuration = match rest.strip_prefix('(') {
        Some(tail) => {
            let (cfg, tail) = tail.split_once(')')?;
            rest = tail.trim_start();
            Some(cfg.trim().to_string())
        }
        None => None,
    };

    let (pattern, action) = rest.split_once(':')?;
    let action = match action.trim().to_ascii_lowercase().as_str() {
        "none" => Action::None,
        "merge" => Action::Merge,
        "embed" => Action::Embed,
        _ => return None,
    };

    let mut pattern = pattern.trim();
    let private = if let Some(tail) = pattern.strip_prefix('+') {
        pattern = tail.trim_start();
        false
    } else if let Some(tail) = pattern.strip_prefix('-') {
        pattern = tail.trim_start();
        true
    } else {
        true
    };
    if pattern.is_empty() {
        return None;
    }

    Some(Directive {
        configuration,
        private,
        pattern: pattern.to_string(),
        action,
    })
}

/// Case-insensitive wildcard match: `*` matches any run of characters, `?`
/// exactly one.
fn glob_match(pattern: &str, input: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().flat_map(char::to_lowercase).collect();
    let input: Vec<char> = input.chars().flat_map(char::to_lowercase).collect();

    let mut pi = 0;
    let mut si = 0;
    let mut star: Option<usize> = None;
    let mut mark = 0;

    while si < input.len() {
        if pi < pattern.len() && (pattern[pi] == '?' || pattern[pi] == input[si]) {
            pi += 1;
            si += 1;
        } else if pi < pattern.len() && pattern[pi] == '*' {
            star = Some(pi);
            mark = si;
            pi += 1;
        } else if let Some(sp) = star {
            // backtrack: let the last `*` swallow one more character
            pi = sp + 1;
            mark += 1;
            si = mark;
        } else {
            return false;
        }
    }
    while pi < pattern.len() && pattern[pi] == '*' {
        pi += 1;
    }
    pi == pattern.len()
}
