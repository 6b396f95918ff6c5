//! `{{name}}` placeholder resolution against layered variable scopes

use std::borrow::Cow;
use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::models::KeyValuePair;

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\{\{([^}]+)\}\}").expect("placeholder pattern is valid"))
}

/// Variable scopes consulted in order: active environment first, then globals.
///
/// Borrowed from whatever the caller holds at the moment of resolution; no
/// snapshot is taken.
#[derive(Clone, Copy, Debug, Default)]
pub struct VariableScopes<'a> {
    pub environment: Option<&'a [KeyValuePair]>,
    pub globals: &'a [KeyValuePair],
}

impl<'a> VariableScopes<'a> {
    pub fn new(environment: Option<&'a [KeyValuePair]>, globals: &'a [KeyValuePair]) -> Self {
        VariableScopes {
            environment,
            globals,
        }
    }

    /// Look a trimmed name up, first enabled match wins
    pub fn lookup(&self, name: &str) -> Option<&'a str> {
        let find = |vars: &'a [KeyValuePair]| {
            vars.iter()
                .find(|v| v.enabled && v.key == name)
                .map(|v| v.value.as_str())
        };
        self.environment.and_then(find).or_else(|| find(self.globals))
    }

    /// Substitutes every `{{name}}` token in a single left-to-right pass.
    ///
    /// Unknown names are left verbatim and substituted values are not scanned again.
    pub fn resolve<'t>(&self, text: &'t str) -> Cow<'t, str> {
        if text.is_empty() {
            return Cow::Borrowed(text);
        }
        placeholder_regex().replace_all(text, |caps: &Captures| match self.lookup(caps[1].trim()) {
            Some(value) => value.to_string(),
            None => caps[0].to_string(),
        })
    }

    /// Owned convenience wrapper around [`VariableScopes::resolve`]
    pub fn resolve_owned(&self, text: &str) -> String {
        self.resolve(text).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(key: &str, value: &str) -> KeyValuePair {
        KeyValuePair::new(key, value)
    }

    #[test]
    fn test_environment_wins_over_globals() {
        let env = vec![var("host", "env.example.com")];
        let globals = vec![var("host", "glob.example.com")];
        let scopes = VariableScopes::new(Some(&env), &globals);
        assert_eq!(scopes.resolve("{{host}}"), "env.example.com");
    }

    #[test]
    fn test_falls_back_to_globals() {
        let env = vec![var("token", "t")];
        let globals = vec![var("host", "glob.example.com")];
        let scopes = VariableScopes::new(Some(&env), &globals);
        assert_eq!(
            scopes.resolve("https://{{host}}/{{token}}"),
            "https://glob.example.com/t"
        );
    }

    #[test]
    fn test_disabled_variables_are_skipped() {
        let env = vec![var("host", "env.example.com").disabled()];
        let globals = vec![var("host", "glob.example.com")];
        let scopes = VariableScopes::new(Some(&env), &globals);
        assert_eq!(scopes.resolve("{{host}}"), "glob.example.com");
    }

    #[test]
    fn test_name_is_trimmed_but_case_sensitive() {
        let globals = vec![var("host", "h")];
        let scopes = VariableScopes::new(None, &globals);
        assert_eq!(scopes.resolve("{{  host }}"), "h");
        assert_eq!(scopes.resolve("{{Host}}"), "{{Host}}");
    }

    #[test]
    fn test_unknown_tokens_pass_through() {
        let scopes = VariableScopes::default();
        let text = "{{missing}}/a/{{other}}";
        assert_eq!(scopes.resolve(text), text);
        let once = scopes.resolve_owned(text);
        assert_eq!(scopes.resolve(&once), once);
    }

    #[test]
    fn test_no_recursive_expansion() {
        let globals = vec![var("a", "{{b}}"), var("b", "deep")];
        let scopes = VariableScopes::new(None, &globals);
        assert_eq!(scopes.resolve("{{a}}-{{b}}"), "{{b}}-deep");
    }

    #[test]
    fn test_empty_text_short_circuits() {
        let scopes = VariableScopes::default();
        assert!(matches!(scopes.resolve(""), Cow::Borrowed("")));
    }

    #[test]
    fn test_malformed_syntax_is_left_alone() {
        let globals = vec![var("a", "1")];
        let scopes = VariableScopes::new(None, &globals);
        assert_eq!(scopes.resolve("{{a} {a}} {{}} {{a}}"), "{{a} {a}} {{}} 1");
    }
}
