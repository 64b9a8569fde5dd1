//! Shell escaping, quoting and command construction.
//!
//! Remote commands are built from program words and operators rather than
//! string concatenation, so every interpolated value passes through
//! [`quote_arg`] exactly once.

use std::fmt;

/// Escape a value for use inside single quotes.
/// Replaces `'` with `'\''` (end quote, escaped quote, start quote).
pub fn escape_single_quote_content(value: &str) -> String {
    value.replace('\'', "'\\''")
}

/// Quote a single argument for shell execution.
/// - Empty strings become `''`
/// - Strings with shell metacharacters are wrapped in single quotes
/// - Embedded single quotes are escaped
pub fn quote_arg(arg: &str) -> String {
    if arg.is_empty() {
        return "''".to_string();
    }

    // Characters that require quoting
    const SHELL_META: &[char] = &[
        ' ', '\t', '\n', '\'', '"', '\\', '$', '`', '!', '*', '?', '[', ']', '(', ')', '{', '}',
        '<', '>', '|', '&', ';', '#', '~',
    ];

    if !arg.contains(SHELL_META) {
        return arg.to_string();
    }

    format!("'{}'", escape_single_quote_content(arg))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    And,
    Pipe,
}

impl Operator {
    fn as_str(self) -> &'static str {
        match self {
            Operator::And => "&&",
            Operator::Pipe => "|",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Stage {
    joined_by: Option<Operator>,
    words: Vec<String>,
}

/// A shell command line assembled from quoted words.
///
/// ```ignore
/// let cmd = ShellCommand::new("mkdir").arg("-p").arg("/srv/my app/repo");
/// assert_eq!(cmd.to_string(), "mkdir -p '/srv/my app/repo'");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCommand {
    stages: Vec<Stage>,
}

impl ShellCommand {
    pub fn new(program: &str) -> Self {
        Self {
            stages: vec![Stage {
                joined_by: None,
                words: vec![quote_arg(program)],
            }],
        }
    }

    /// Wrap a user-supplied command line verbatim (pre-task commands, hooks).
    pub fn raw(command: impl Into<String>) -> Self {
        Self {
            stages: vec![Stage {
                joined_by: None,
                words: vec![command.into()],
            }],
        }
    }

    pub fn arg(mut self, arg: impl AsRef<str>) -> Self {
        self.current_words().push(quote_arg(arg.as_ref()));
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words = self.current_words();
        words.extend(args.into_iter().map(|a| quote_arg(a.as_ref())));
        self
    }

    /// Append the output of another command as a single argument: `"$(...)"`.
    pub fn substitute(mut self, inner: ShellCommand) -> Self {
        let rendered = format!("\"$({})\"", inner.render());
        self.current_words().push(rendered);
        self
    }

    /// Run `next` only if this command succeeds.
    pub fn and(self, next: ShellCommand) -> Self {
        self.chain(Operator::And, next)
    }

    /// Feed this command's stdout into `next`.
    pub fn pipe(self, next: ShellCommand) -> Self {
        self.chain(Operator::Pipe, next)
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for stage in &self.stages {
            if let Some(op) = stage.joined_by {
                out.push(' ');
                out.push_str(op.as_str());
                out.push(' ');
            }
            out.push_str(&stage.words.join(" "));
        }
        out
    }

    fn chain(mut self, op: Operator, next: ShellCommand) -> Self {
        let mut stages = next.stages.into_iter();
        if let Some(mut first) = stages.next() {
            first.joined_by = Some(op);
            self.stages.push(first);
        }
        self.stages.extend(stages);
        self
    }

    fn current_words(&mut self) -> &mut Vec<String> {
        let last = self.stages.len() - 1;
        &mut self.stages[last].words
    }
}

impl fmt::Display for ShellCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_arg_simple() {
        assert_eq!(quote_arg("checkout"), "checkout");
        assert_eq!(quote_arg("/var/www/app"), "/var/www/app");
    }

    #[test]
    fn quote_arg_with_spaces() {
        assert_eq!(quote_arg("hello world"), "'hello world'");
    }

    #[test]
    fn quote_arg_with_single_quote() {
        assert_eq!(quote_arg("it's"), "'it'\\''s'");
    }

    #[test]
    fn quote_arg_empty() {
        assert_eq!(quote_arg(""), "''");
    }

    #[test]
    fn command_chains_with_operators() {
        let cmd = ShellCommand::new("mkdir")
            .arg("-p")
            .arg("/srv/app/repo")
            .and(ShellCommand::new("ls").arg("-A").arg("/srv/app/repo"))
            .pipe(ShellCommand::new("wc").arg("-l"));
        assert_eq!(
            cmd.render(),
            "mkdir -p /srv/app/repo && ls -A /srv/app/repo | wc -l"
        );
    }

    #[test]
    fn injected_branch_name_stays_one_word() {
        let cmd = ShellCommand::new("git").arg("checkout").arg("main; rm -rf /");
        assert_eq!(cmd.render(), "git checkout 'main; rm -rf /'");
    }

    #[test]
    fn substitution_is_double_quoted() {
        let cmd = ShellCommand::new("basename").substitute(
            ShellCommand::new("readlink").arg("-f").arg("/srv/app/current"),
        );
        assert_eq!(cmd.render(), "basename \"$(readlink -f /srv/app/current)\"");
    }

    #[test]
    fn raw_command_is_untouched() {
        let cmd = ShellCommand::raw("cd /srv && echo $HOME");
        assert_eq!(cmd.to_string(), "cd /srv && echo $HOME");
    }
}
