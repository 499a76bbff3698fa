//! Compiled command-form matchers.
//!
//! For every registered command we build one matcher: multi-line commands
//! match `name … end-marker` with a non-greedy body, single-line commands
//! match `name <rest-of-line>`. The designated submit command is always
//! compiled as a multi-line form with its own end-marker, whether or not
//! it was registered with one.

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use strider_core::Command;

use crate::GuardError;

/// A compiled matcher for one command form.
#[derive(Debug)]
struct CompiledCommand {
    name: String,
    multi_line: bool,
    regex: Regex,
}

/// Where a command form matched inside an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionMatch {
    /// The matched command name
    pub name: String,
    /// Whether the matched form is multi-line
    pub multi_line: bool,
    /// Byte offset where the match starts
    pub start: usize,
    /// Byte offset where the match ends
    pub end: usize,
}

/// Result of the multi-line input guard.
///
/// The guard signals applicability without transforming the action; hosts
/// that need to normalize heredoc-style bodies before execution hook in
/// here. Extension point, intentionally a pass-through today.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultilineGuard {
    /// Whether the action begins a registered multi-line form
    pub multi_line: bool,

    /// The command that matched, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    /// The action, returned unchanged
    pub action: String,
}

/// The compiled matcher set for one run's registered commands.
pub struct CommandPatterns {
    patterns: Vec<CompiledCommand>,
    submit_name: String,
    submit_end_marker: String,
}

impl CommandPatterns {
    /// Compile matchers for the registered commands.
    ///
    /// `submit_name` designates the completion command; `submit_end_marker`
    /// is used for it when the registration carries no end-marker of its
    /// own.
    pub fn compile(
        commands: &[Command],
        submit_name: &str,
        submit_end_marker: &str,
    ) -> Result<Self, GuardError> {
        let mut patterns = Vec::with_capacity(commands.len() + 1);

        for command in commands {
            if command.name == submit_name {
                // Handled below with the forced multi-line form.
                continue;
            }
            let compiled = match &command.end_marker {
                Some(marker) => Self::multi_line_pattern(&command.name, marker)?,
                None => Self::single_line_pattern(&command.name)?,
            };
            patterns.push(compiled);
        }

        let marker = commands
            .iter()
            .find(|c| c.name == submit_name)
            .and_then(|c| c.end_marker.as_deref())
            .unwrap_or(submit_end_marker);
        patterns.push(Self::multi_line_pattern(submit_name, marker)?);

        Ok(Self {
            patterns,
            submit_name: submit_name.to_string(),
            submit_end_marker: marker.to_string(),
        })
    }

    fn multi_line_pattern(name: &str, marker: &str) -> Result<CompiledCommand, GuardError> {
        let pattern = format!(
            r"(?ms)^{}\s*(.*?)^{}\s*$",
            regex_lite::escape(name),
            regex_lite::escape(marker)
        );
        let regex = Regex::new(&pattern).map_err(|e| GuardError::InvalidCommandForm {
            command: name.to_string(),
            detail: e.to_string(),
        })?;
        Ok(CompiledCommand {
            name: name.to_string(),
            multi_line: true,
            regex,
        })
    }

    fn single_line_pattern(name: &str) -> Result<CompiledCommand, GuardError> {
        let pattern = format!(r"(?m)^{}([ \t][^\n]*)?$", regex_lite::escape(name));
        let regex = Regex::new(&pattern).map_err(|e| GuardError::InvalidCommandForm {
            command: name.to_string(),
            detail: e.to_string(),
        })?;
        Ok(CompiledCommand {
            name: name.to_string(),
            multi_line: false,
            regex,
        })
    }

    /// The earliest command-form match in the action, if any.
    pub fn first_match(&self, action: &str) -> Option<ActionMatch> {
        self.patterns
            .iter()
            .filter_map(|p| {
                p.regex.find(action).map(|m| ActionMatch {
                    name: p.name.clone(),
                    multi_line: p.multi_line,
                    start: m.start(),
                    end: m.end(),
                })
            })
            .min_by_key(|m| m.start)
    }

    /// Detect whether the action begins a registered multi-line form.
    ///
    /// The action is returned unchanged: this is the hook where body
    /// normalization would happen. No transformation is applied today.
    pub fn guard_multiline_input(&self, action: &str) -> MultilineGuard {
        let hit = self.first_match(action).filter(|m| m.multi_line);
        MultilineGuard {
            multi_line: hit.is_some(),
            command: hit.map(|m| m.name),
            action: action.to_string(),
        }
    }

    /// The designated submit command name.
    pub fn submit_name(&self) -> &str {
        &self.submit_name
    }

    /// The end-marker compiled for the submit command.
    pub fn submit_end_marker(&self) -> &str {
        &self.submit_end_marker
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commands() -> Vec<Command> {
        vec![
            Command::new("ls", "list files"),
            Command::new("edit", "replace a line range").with_end_marker("end_of_edit"),
            Command::new("submit", "submit the result"),
        ]
    }

    fn patterns() -> CommandPatterns {
        CommandPatterns::compile(&commands(), "submit", "end_submit").unwrap()
    }

    #[test]
    fn single_line_form_matches() {
        let p = patterns();
        let m = p.first_match("ls -la").unwrap();
        assert_eq!(m.name, "ls");
        assert!(!m.multi_line);
        assert_eq!(m.start, 0);
    }

    #[test]
    fn single_line_form_requires_word_boundary() {
        let p = patterns();
        // "lsof" is not "ls".
        assert!(p.first_match("lsof -i").is_none());
    }

    #[test]
    fn multi_line_form_matches_non_greedy_body() {
        let p = patterns();
        let action = "edit 1:3\nnew line one\nnew line two\nend_of_edit";
        let m = p.first_match(action).unwrap();
        assert_eq!(m.name, "edit");
        assert!(m.multi_line);
    }

    #[test]
    fn multi_line_form_without_marker_does_not_match() {
        let p = patterns();
        assert!(p.first_match("edit 1:3\ndangling body").is_none());
    }

    #[test]
    fn submit_is_forced_multi_line() {
        let p = patterns();
        assert!(p.first_match("submit").is_none());
        let m = p.first_match("submit\npayload\nend_submit").unwrap();
        assert_eq!(m.name, "submit");
        assert!(m.multi_line);
        assert_eq!(p.submit_end_marker(), "end_submit");
    }

    #[test]
    fn registered_submit_marker_takes_precedence() {
        let cmds = vec![
            Command::new("submit", "submit the result").with_end_marker("done_submitting"),
        ];
        let p = CommandPatterns::compile(&cmds, "submit", "end_submit").unwrap();
        assert_eq!(p.submit_end_marker(), "done_submitting");
        assert!(p.first_match("submit\nx\ndone_submitting").is_some());
    }

    #[test]
    fn earliest_match_wins() {
        let p = patterns();
        let action = "ls\nedit 1:1\nbody\nend_of_edit";
        let m = p.first_match(action).unwrap();
        assert_eq!(m.name, "ls");
    }

    #[test]
    fn guard_is_pass_through() {
        let p = patterns();
        let action = "edit 1:3\nbody\nend_of_edit";
        let guard = p.guard_multiline_input(action);
        assert!(guard.multi_line);
        assert_eq!(guard.command.as_deref(), Some("edit"));
        // No transformation is applied.
        assert_eq!(guard.action, action);
    }

    #[test]
    fn guard_reports_single_line_as_not_multi() {
        let p = patterns();
        let guard = p.guard_multiline_input("ls -la");
        assert!(!guard.multi_line);
        assert!(guard.command.is_none());
    }
}
