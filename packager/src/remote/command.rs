//! Structured remote shell commands.
//!
//! A [`RemoteCommand`] is a sequence of words. Fixed words (operators, flags,
//! tool names) are emitted verbatim; values that may come from configuration
//! are added with [`RemoteCommand::arg`] and single-quoted when rendered, so
//! a path such as `/srv/acme; rm -rf /` stays a single inert word.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Word {
    Raw(String),
    Quoted(String),
}

/// A shell command line assembled from raw and quoted words.
///
/// # Examples
///
/// ```
/// use release_packager::remote::RemoteCommand;
///
/// let cmd = RemoteCommand::new()
///     .raw("cd")
///     .arg("/srv/my repo")
///     .raw("&&")
///     .raw("ls");
/// assert_eq!(cmd.render(), "cd '/srv/my repo' && ls");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteCommand {
    words: Vec<Word>,
}

impl RemoteCommand {
    /// Create an empty command.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a word that is emitted exactly as given.
    ///
    /// Only use this for fixed text that is part of the program, never for
    /// values taken from configuration or user input.
    #[must_use]
    pub fn raw(mut self, word: impl Into<String>) -> Self {
        self.words.push(Word::Raw(word.into()));
        self
    }

    /// Append several fixed words.
    #[must_use]
    pub fn raws<I, S>(self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        words.into_iter().fold(self, |cmd, word| cmd.raw(word))
    }

    /// Append a value that is shell-quoted when rendered.
    #[must_use]
    pub fn arg(mut self, value: impl Into<String>) -> Self {
        self.words.push(Word::Quoted(value.into()));
        self
    }

    /// Return `true` if no words have been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Render the command as a single POSIX shell string.
    #[must_use]
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for RemoteCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, word) in self.words.iter().enumerate() {
            if index > 0 {
                f.write_str(" ")?;
            }
            match word {
                Word::Raw(text) => f.write_str(text)?,
                Word::Quoted(value) => f.write_str(&shell_quote(value))?,
            }
        }
        Ok(())
    }
}

/// Quote `value` for a POSIX shell.
///
/// Values made only of characters that are never special to the shell are
/// returned unchanged; anything else is wrapped in single quotes with
/// embedded single quotes written as `'\''`.
///
/// # Examples
///
/// ```
/// use release_packager::remote::shell_quote;
///
/// assert_eq!(shell_quote("/srv/acme/1.0.0"), "/srv/acme/1.0.0");
/// assert_eq!(shell_quote("*.rpm"), "'*.rpm'");
/// assert_eq!(shell_quote("it's"), r"'it'\''s'");
/// ```
#[must_use]
pub fn shell_quote(value: &str) -> String {
    if !value.is_empty() && value.chars().all(is_shell_safe) {
        return value.to_owned();
    }
    format!("'{}'", value.replace('\'', r"'\''"))
}

fn is_shell_safe(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(c, '/' | '.' | '_' | '-' | '+' | ',' | ':' | '@' | '%' | '=')
}
