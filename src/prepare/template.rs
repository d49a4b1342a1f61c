use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use toml::Value;

/// A substitutable token: one or more non-brace characters wrapped in
/// braces, never spanning a line break.
static PARAMETER_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([^}]+)\}").expect("parameter token pattern is valid"));

/// Flattens the parameter table for one environment. When the table has a
/// sub-table named after the environment, its scalars win; otherwise the
/// top-level scalars apply to every environment. Non-scalar entries are
/// skipped.
pub fn parameter_scope(environment: &str, params: &Value) -> HashMap<String, String> {
    if let Some(scoped) = params.get(environment).and_then(Value::as_table) {
        return flatten(scoped);
    }
    match params.as_table() {
        Some(table) => flatten(table),
        None => HashMap::new(),
    }
}

fn flatten(table: &toml::value::Table) -> HashMap<String, String> {
    table
        .iter()
        .filter_map(|(key, value)| scalar_to_string(value).map(|rendered| (key.clone(), rendered)))
        .collect()
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Integer(number) => Some(number.to_string()),
        Value::Float(number) => Some(number.to_string()),
        Value::Boolean(flag) => Some(flag.to_string()),
        _ => None,
    }
}

/// Replaces `{name}` tokens with their scope values. Unknown tokens are
/// left untouched, braces included, and everything outside a token is
/// carried through byte for byte.
pub fn render_content(content: &str, scope: &HashMap<String, String>) -> String {
    content
        .split_inclusive('\n')
        .map(|line| render_line(line, scope))
        .collect()
}

fn render_line(line: &str, scope: &HashMap<String, String>) -> String {
    PARAMETER_TOKEN
        .replace_all(line, |caps: &Captures| match scope.get(&caps[1]) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn replaces_known_tokens_and_keeps_unknown_ones() {
        let rendered = render_content(
            "SELECT {rate} * amount FROM dues WHERE tier = {tier};\n",
            &scope(&[("rate", "0.07")]),
        );
        assert_eq!(rendered, "SELECT 0.07 * amount FROM dues WHERE tier = {tier};\n");
    }

    #[test]
    fn replaces_every_token_on_a_line() {
        let rendered = render_content("{a}{b}{a}", &scope(&[("a", "1"), ("b", "2")]));
        assert_eq!(rendered, "121");
    }

    #[test]
    fn tokens_never_span_lines() {
        let content = "BEGIN {un\nclosed} END";
        assert_eq!(render_content(content, &scope(&[("un\nclosed", "x")])), content);
    }

    #[test]
    fn untouched_content_is_byte_identical() {
        let content = "line one\r\nline two\nno trailing newline";
        assert_eq!(render_content(content, &HashMap::new()), content);
    }

    #[test]
    fn environment_subtable_wins_over_flat_params() {
        let params: Value = "rate = \"1.0\"\n[prod]\nrate = \"0.07\"\n".parse().unwrap();
        let scoped = parameter_scope("prod", &params);
        assert_eq!(scoped.get("rate"), Some(&"0.07".to_string()));

        let fallback = parameter_scope("staging", &params);
        assert_eq!(fallback.get("rate"), Some(&"1.0".to_string()));
    }

    #[test]
    fn scalars_render_in_plain_form() {
        let params: Value = "rate = 0.07\nretries = 3\nenabled = true\nname = \"x\"\n[nested]\nskipped = 1\n"
            .parse()
            .unwrap();
        let scoped = parameter_scope("", &params);
        assert_eq!(scoped.get("rate"), Some(&"0.07".to_string()));
        assert_eq!(scoped.get("retries"), Some(&"3".to_string()));
        assert_eq!(scoped.get("enabled"), Some(&"true".to_string()));
        assert_eq!(scoped.get("name"), Some(&"x".to_string()));
        assert!(!scoped.contains_key("nested"));
    }
}
