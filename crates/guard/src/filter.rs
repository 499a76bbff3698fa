//! Action filtering — the ordered blocklist/allow-regex rule chain.
//!
//! Rules are evaluated in order, first match wins, default allow:
//! 1. Prefix blocklist: interactively dangerous commands (full-screen
//!    editors, pagers, REPLs, process managers) blocked unconditionally.
//! 2. Standalone blocklist: blocked only when the entire action equals the
//!    bare command; the same command with arguments passes this rule.
//! 3. Allow-unless-regex: for specific command names, blocked unless the
//!    action matches a required pattern.

use std::collections::HashMap;

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::GuardError;

/// Static filtering configuration. Read-only for the duration of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolFilterConfig {
    /// Actions starting with any of these are blocked unconditionally.
    #[serde(default = "default_blocklist")]
    pub blocklist: Vec<String>,

    /// Actions equal to any of these (bare, no arguments) are blocked.
    #[serde(default = "default_blocklist_standalone")]
    pub blocklist_standalone: Vec<String>,

    /// Command name → required pattern. An action whose first word is a
    /// key here is blocked unless the whole action matches the pattern.
    #[serde(default = "default_block_unless_regex")]
    pub block_unless_regex: HashMap<String, String>,

    /// Message template for blocked actions; `{action}` is substituted.
    #[serde(default = "default_error_template")]
    pub blocklist_error_template: String,
}

fn default_blocklist() -> Vec<String> {
    [
        "vim",
        "vi",
        "emacs",
        "nano",
        "nohup",
        "gdb",
        "less",
        "tail -f",
        "python -m venv",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_blocklist_standalone() -> Vec<String> {
    [
        "python",
        "python3",
        "ipython",
        "bash",
        "sh",
        "/bin/bash",
        "/bin/sh",
        "nohup",
        "vi",
        "vim",
        "emacs",
        "nano",
        "su",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_block_unless_regex() -> HashMap<String, String> {
    let pattern = r"\b(?:radare2|r2)\b.*\s+-c\s+.*".to_string();
    HashMap::from([
        ("radare2".to_string(), pattern.clone()),
        ("r2".to_string(), pattern),
    ])
}

fn default_error_template() -> String {
    "Operation '{action}' is not supported by this environment.".into()
}

impl Default for ToolFilterConfig {
    fn default() -> Self {
        Self {
            blocklist: default_blocklist(),
            blocklist_standalone: default_blocklist_standalone(),
            block_unless_regex: default_block_unless_regex(),
            blocklist_error_template: default_error_template(),
        }
    }
}

impl ToolFilterConfig {
    /// Load a filter configuration from a TOML string.
    ///
    /// Omitted fields fall back to the shipped defaults.
    pub fn from_toml(toml_str: &str) -> Result<Self, GuardError> {
        let config: ToolFilterConfig = toml::from_str(toml_str)?;
        Ok(config)
    }
}

/// Which rule matched an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum FilterRule {
    /// Matched an entry of the prefix blocklist.
    Prefix { entry: String },
    /// Equal to an entry of the standalone blocklist.
    Standalone { entry: String },
    /// First word has a required pattern the action did not match.
    AllowUnless { command: String },
}

/// The outcome of filtering one action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterVerdict {
    /// Whether the action must not be executed.
    pub blocked: bool,

    /// The rule that fired, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<FilterRule>,

    /// Rendered message explaining the block (empty when allowed).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

impl FilterVerdict {
    fn allow() -> Self {
        Self {
            blocked: false,
            rule: None,
            message: String::new(),
        }
    }
}

/// The compiled action filter.
pub struct ToolFilter {
    config: ToolFilterConfig,
    /// Compiled allow-unless patterns, keyed by command name.
    allow_unless: Vec<(String, Regex)>,
}

impl ToolFilter {
    /// Compile a filter from its configuration.
    ///
    /// A malformed allow-unless pattern is a construction-time error, not
    /// a runtime panic.
    pub fn new(config: ToolFilterConfig) -> Result<Self, GuardError> {
        let mut allow_unless = Vec::with_capacity(config.block_unless_regex.len());
        for (command, pattern) in &config.block_unless_regex {
            let regex = Regex::new(pattern).map_err(|e| GuardError::InvalidPattern {
                command: command.clone(),
                detail: e.to_string(),
            })?;
            allow_unless.push((command.clone(), regex));
        }
        Ok(Self {
            config,
            allow_unless,
        })
    }

    /// Whether the action must be blocked. First matching rule wins;
    /// an action matching no rule is allowed.
    pub fn should_block(&self, action: &str) -> bool {
        self.check(action).blocked
    }

    /// Evaluate the rule chain and return the full verdict, including the
    /// rendered message used for the synthetic observation.
    pub fn check(&self, action: &str) -> FilterVerdict {
        let trimmed = action.trim();

        if let Some(entry) = self
            .config
            .blocklist
            .iter()
            .find(|b| trimmed.starts_with(b.as_str()))
        {
            return self.blocked(trimmed, FilterRule::Prefix {
                entry: entry.clone(),
            });
        }

        if let Some(entry) = self
            .config
            .blocklist_standalone
            .iter()
            .find(|b| b.as_str() == trimmed)
        {
            return self.blocked(trimmed, FilterRule::Standalone {
                entry: entry.clone(),
            });
        }

        let name = trimmed.split_whitespace().next().unwrap_or("");
        if let Some((command, regex)) = self.allow_unless.iter().find(|(c, _)| c.as_str() == name)
            && !regex.is_match(trimmed)
        {
            return self.blocked(trimmed, FilterRule::AllowUnless {
                command: command.clone(),
            });
        }

        FilterVerdict::allow()
    }

    fn blocked(&self, action: &str, rule: FilterRule) -> FilterVerdict {
        let message = self
            .config
            .blocklist_error_template
            .replace("{action}", action);
        debug!(action, ?rule, "Action blocked");
        FilterVerdict {
            blocked: true,
            rule: Some(rule),
            message,
        }
    }
}

impl Default for ToolFilter {
    fn default() -> Self {
        // The shipped defaults always compile.
        Self::new(ToolFilterConfig::default()).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_blocklist_blocks_with_arguments() {
        let filter = ToolFilter::default();
        assert!(filter.should_block("vim file.txt"));
        assert!(filter.should_block("emacs -nw config.rs"));
    }

    #[test]
    fn unlisted_command_allowed() {
        let filter = ToolFilter::default();
        assert!(!filter.should_block("cat file.txt"));
        assert!(!filter.should_block("grep -r pattern src/"));
    }

    #[test]
    fn standalone_blocks_bare_form_only() {
        let filter = ToolFilter::default();
        assert!(filter.should_block("bash"));
        assert!(!filter.should_block("bash -c ls"));
    }

    #[test]
    fn standalone_ignores_surrounding_whitespace() {
        let filter = ToolFilter::default();
        assert!(filter.should_block("  python3  "));
    }

    #[test]
    fn allow_unless_requires_pattern() {
        let filter = ToolFilter::default();
        assert!(filter.should_block("radare2 ./binary"));
        assert!(!filter.should_block("radare2 -c 'pdf @ main' ./binary"));
    }

    #[test]
    fn first_match_wins_reports_prefix_rule() {
        // "vim" appears in both lists; the prefix rule is evaluated first.
        let filter = ToolFilter::default();
        let verdict = filter.check("vim");
        assert!(verdict.blocked);
        assert!(matches!(verdict.rule, Some(FilterRule::Prefix { .. })));
    }

    #[test]
    fn blocked_message_renders_action() {
        let filter = ToolFilter::default();
        let verdict = filter.check("vim notes.md");
        assert!(verdict.message.contains("vim notes.md"));
    }

    #[test]
    fn allowed_verdict_is_empty() {
        let filter = ToolFilter::default();
        let verdict = filter.check("ls -la");
        assert!(!verdict.blocked);
        assert!(verdict.rule.is_none());
        assert!(verdict.message.is_empty());
    }

    #[test]
    fn config_loads_from_toml() {
        let toml_str = r#"
            blocklist = ["top"]
            blocklist_standalone = ["zsh"]
            blocklist_error_template = "blocked: {action}"

            [block_unless_regex]
            strace = "-o\\s+\\S+"
        "#;
        let config = ToolFilterConfig::from_toml(toml_str).unwrap();
        let filter = ToolFilter::new(config).unwrap();

        assert!(filter.should_block("top -b"));
        assert!(filter.should_block("zsh"));
        assert!(!filter.should_block("zsh -c true"));
        assert!(filter.should_block("strace ls"));
        assert!(!filter.should_block("strace -o trace.log ls"));
        assert_eq!(filter.check("zsh").message, "blocked: zsh");
    }

    #[test]
    fn toml_omitted_fields_use_defaults() {
        let config = ToolFilterConfig::from_toml("").unwrap();
        let filter = ToolFilter::new(config).unwrap();
        assert!(filter.should_block("vim file.txt"));
    }

    #[test]
    fn invalid_allow_unless_pattern_rejected() {
        let mut config = ToolFilterConfig::default();
        config
            .block_unless_regex
            .insert("broken".into(), "(unclosed".into());
        let err = ToolFilter::new(config).unwrap_err();
        assert!(matches!(err, GuardError::InvalidPattern { .. }));
    }
}
