//! Token-level variable substitution.
//!
//! Commands are split into shell words with `shlex`, which also drops
//! unquoted `#` comments, and every word is rewritten independently:
//!
//! - a word starting with the escape sigil loses that character and is
//!   otherwise left alone;
//! - a word starting with the variable sigil is replaced by the scope value
//!   bound to the rest of the word;
//! - a word containing `/` is split into segments, each rewritten by the two
//!   rules above, then joined again.
//!
//! ```
//! use qsubgraph::scope::Scope;
//! use qsubgraph::substitute::{Sigils, substitute_command};
//!
//! let scope = Scope::from_iter([("name", "alice")]);
//! let cmd = substitute_command("echo hello $name ^$HOME", &scope, Sigils::default())
//!     .expect("substitute");
//! assert_eq!(cmd, "echo hello alice $HOME");
//! ```

use crate::error::ModelError;
use crate::scope::Scope;

const PATH_SEPARATOR: char = '/';

/// Characters marking variable references and escaped words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sigils {
    /// Prefix of a variable reference.
    pub variable: char,
    /// Prefix that suppresses substitution for the rest of a word.
    pub escape: char,
}

impl Default for Sigils {
    fn default() -> Self {
        Self {
            variable: '$',
            escape: '^',
        }
    }
}

/// Substitute every token, preserving length and order.
///
/// # Errors
///
/// Returns [`ModelError::VariableNotFound`] for the first variable reference
/// that `scope` does not bind.
pub fn substitute_tokens<S: AsRef<str>>(
    tokens: &[S],
    scope: &Scope,
    sigils: Sigils,
) -> Result<Vec<String>, ModelError> {
    tokens
        .iter()
        .map(|token| substitute_token(token.as_ref(), scope, sigils))
        .collect()
}

/// Split `command` into shell words, substitute, and rejoin with single
/// spaces.
///
/// An unquoted `#` starting a word begins a comment that runs to the end of
/// the line. A quoted `#` is an ordinary argument.
///
/// # Errors
///
/// Returns [`ModelError::UnbalancedQuotes`] when `command` cannot be split and
/// [`ModelError::VariableNotFound`] for unbound variables.
pub fn substitute_command(
    command: &str,
    scope: &Scope,
    sigils: Sigils,
) -> Result<String, ModelError> {
    let words = shlex::split(command).ok_or_else(|| ModelError::UnbalancedQuotes {
        command: command.to_owned(),
    })?;
    Ok(substitute_tokens(&words, scope, sigils)?.join(" "))
}

/// Substitute a path-like string such as a working directory.
///
/// # Errors
///
/// Returns [`ModelError::VariableNotFound`] for unbound variables.
pub fn substitute_path(path: &str, scope: &Scope, sigils: Sigils) -> Result<String, ModelError> {
    substitute_token(path, scope, sigils)
}

fn substitute_token(token: &str, scope: &Scope, sigils: Sigils) -> Result<String, ModelError> {
    if token.contains(PATH_SEPARATOR) {
        let segments = token
            .split(PATH_SEPARATOR)
            .map(|segment| substitute_word(segment, scope, sigils))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(segments.join("/"))
    } else {
        substitute_word(token, scope, sigils)
    }
}

fn substitute_word(word: &str, scope: &Scope, sigils: Sigils) -> Result<String, ModelError> {
    if let Some(literal) = word.strip_prefix(sigils.escape) {
        return Ok(literal.to_owned());
    }
    word.strip_prefix(sigils.variable)
        .map_or_else(|| Ok(word.to_owned()), |name| lookup(name, scope))
}

fn lookup(name: &str, scope: &Scope) -> Result<String, ModelError> {
    scope
        .get(name)
        .map(str::to_owned)
        .ok_or_else(|| ModelError::VariableNotFound {
            name: name.to_owned(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn scope() -> Scope {
        Scope::from_iter([("HOME", "/x"), ("myhome", "/y"), ("name", "alice")])
    }

    #[rstest]
    #[case("$HOME/pbstmp", "/x/pbstmp")]
    #[case("$myhome/pbstmp", "/y/pbstmp")]
    #[case("/data/$name/out", "/data/alice/out")]
    #[case("plain", "plain")]
    #[case("/abs/path/", "/abs/path/")]
    fn paths_resolve_per_segment(scope: Scope, #[case] input: &str, #[case] expected: &str) {
        let out = substitute_path(input, &scope, Sigils::default()).expect("substitute");
        assert_eq!(out, expected);
    }

    #[rstest]
    fn escaped_tokens_skip_lookup(scope: Scope) {
        let out = substitute_tokens(&["^$MISSING", "^^x"], &scope, Sigils::default())
            .expect("escaped tokens never fail");
        assert_eq!(out, vec!["$MISSING".to_owned(), "^x".to_owned()]);
    }

    #[rstest]
    fn escape_applies_inside_paths(scope: Scope) {
        let out = substitute_path("^$HOME/$name", &scope, Sigils::default()).expect("path");
        assert_eq!(out, "$HOME/alice");
    }

    #[rstest]
    fn missing_variable_is_reported(scope: Scope) {
        let err = substitute_tokens(&["echo", "$nope"], &scope, Sigils::default())
            .expect_err("unbound variable");
        assert_eq!(
            err,
            ModelError::VariableNotFound {
                name: "nope".to_owned()
            }
        );
    }

    #[rstest]
    fn tokens_keep_length_and_order(scope: Scope) {
        let out = substitute_tokens(&["a", "$name", "b"], &scope, Sigils::default())
            .expect("substitute");
        assert_eq!(out, vec!["a", "alice", "b"]);
    }

    #[rstest]
    fn custom_sigils_are_honoured(scope: Scope) {
        let sigils = Sigils {
            variable: '@',
            escape: '!',
        };
        let out = substitute_tokens(&["@name", "!@name", "$name"], &scope, sigils)
            .expect("substitute");
        assert_eq!(out, vec!["alice", "@name", "$name"]);
    }

    #[rstest]
    #[case("echo hello $name", "echo hello alice")]
    #[case("echo 'a  b'   $name", "echo a  b alice")]
    #[case("echo $name # trailing $nope", "echo alice")]
    #[case("cp $HOME/in $myhome/out", "cp /x/in /y/out")]
    #[case("grep '#include' main.c", "grep #include main.c")]
    #[case("echo '#literal' $name", "echo #literal alice")]
    fn commands_are_split_and_rejoined(
        scope: Scope,
        #[case] command: &str,
        #[case] expected: &str,
    ) {
        let out = substitute_command(command, &scope, Sigils::default()).expect("command");
        assert_eq!(out, expected);
    }

    #[rstest]
    fn unbalanced_quotes_are_rejected(scope: Scope) {
        let err = substitute_command("echo 'oops", &scope, Sigils::default())
            .expect_err("unbalanced");
        assert!(matches!(err, ModelError::UnbalancedQuotes { .. }));
    }
}
