//! Notification template rendering.
//!
//! Subject and body templates are plain strings with `${field}` placeholders,
//! rendered against the enumerated field map the dispatcher assembles for
//! each event. Both `${field}` and `$field` forms are accepted, and `$$`
//! produces a literal dollar sign.
//!
//! Rendering is strict: a placeholder that names no field fails with
//! [`TemplateError::UnknownField`] instead of being left literal or replaced
//! by an empty string, so a misconfigured template surfaces on the first
//! matching event rather than silently mailing garbage.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

/// Matches one `$` introducer: `$$`, `$name`, `${name}`, or a bare `$`
/// (no capture group set) for anything else.
static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$(?:(\$)|([A-Za-z_][A-Za-z0-9_]*)|\{([A-Za-z_][A-Za-z0-9_]*)\})?")
        .expect("placeholder pattern is valid")
});

/// Errors that can occur while rendering a notification template.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TemplateError {
    /// The template references a field that is not in the substitution map.
    #[error("unresolved template placeholder: {0}")]
    UnknownField(String),

    /// A `$` is followed by neither an identifier, `{`…`}`, nor another `$`.
    #[error("dangling '$' in template (use '$$' for a literal dollar)")]
    DanglingDollar,
}

/// Renders `template`, substituting `${field}` placeholders from `fields`.
///
/// # Errors
///
/// Returns [`TemplateError::UnknownField`] for a placeholder with no
/// corresponding field, and [`TemplateError::DanglingDollar`] for a `$` that
/// introduces no valid placeholder.
pub fn render(template: &str, fields: &HashMap<String, String>) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    let mut last = 0;

    for caps in PLACEHOLDER.captures_iter(template) {
        let matched = caps.get(0).expect("match always has group 0");
        out.push_str(&template[last..matched.start()]);
        last = matched.end();

        if caps.get(1).is_some() {
            out.push('$');
        } else if let Some(name) = caps.get(2).or_else(|| caps.get(3)) {
            let value = fields
                .get(name.as_str())
                .ok_or_else(|| TemplateError::UnknownField(name.as_str().to_string()))?;
            out.push_str(value);
        } else {
            return Err(TemplateError::DanglingDollar);
        }
    }

    out.push_str(&template[last..]);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn substitutes_braced_placeholders() {
        let out = render(
            "Changed: ${name} at ${path}",
            &fields(&[("name", "a.txt"), ("path", "/tmp")]),
        )
        .unwrap();
        assert_eq!(out, "Changed: a.txt at /tmp");
    }

    #[test]
    fn bare_and_braced_forms_are_equivalent() {
        let map = fields(&[("name", "a.txt")]);
        assert_eq!(render("$name", &map).unwrap(), "a.txt");
        assert_eq!(render("${name}", &map).unwrap(), "a.txt");
    }

    #[test]
    fn bare_placeholder_ends_at_non_identifier() {
        let out = render("$name!", &fields(&[("name", "a.txt")])).unwrap();
        assert_eq!(out, "a.txt!");
    }

    #[test]
    fn braced_placeholder_allows_adjacent_text() {
        let out = render("${name}s", &fields(&[("name", "file")])).unwrap();
        assert_eq!(out, "files");
    }

    #[test]
    fn double_dollar_escapes_literal() {
        let out = render("cost: $$5 for ${name}", &fields(&[("name", "a.txt")])).unwrap();
        assert_eq!(out, "cost: $5 for a.txt");
    }

    #[test]
    fn template_without_placeholders_is_unchanged() {
        let out = render("no placeholders here", &fields(&[])).unwrap();
        assert_eq!(out, "no placeholders here");
    }

    #[test]
    fn unknown_field_fails_and_names_the_placeholder() {
        let err = render("hello ${missing}", &fields(&[("name", "a.txt")])).unwrap_err();
        assert_eq!(err, TemplateError::UnknownField("missing".to_string()));
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn dangling_dollar_fails() {
        let map = fields(&[("name", "a.txt")]);
        assert_eq!(
            render("50% off: $ today", &map).unwrap_err(),
            TemplateError::DanglingDollar
        );
        assert_eq!(
            render("trailing $", &map).unwrap_err(),
            TemplateError::DanglingDollar
        );
    }

    #[test]
    fn unclosed_brace_is_a_dangling_dollar() {
        let err = render("${name", &fields(&[("name", "a.txt")])).unwrap_err();
        assert_eq!(err, TemplateError::DanglingDollar);
    }

    #[test]
    fn adjacent_placeholders_substitute_in_order() {
        let out = render(
            "${path}/${name}",
            &fields(&[("path", "/data"), ("name", "f.txt")]),
        )
        .unwrap();
        assert_eq!(out, "/data/f.txt");
    }
}
