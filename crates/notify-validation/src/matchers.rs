//! Label matcher parsing, formatting and evaluation.
//!
//! Matcher lists are comma-separated terms of the form `name<op>value`,
//! e.g. `severity="critical, urgent",team=~"db|infra"`.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ValidationError;

const FIELD: &str = "matchers";

/// Characters that may not appear in a label name.
const RESERVED_NAME_CHARS: &[char] = &[',', '=', '!', '~', '"', '{', '}'];

/// Matcher comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchOperator {
    /// `=`, exact equality.
    #[serde(rename = "=")]
    Equal,
    /// `!=`, inequality.
    #[serde(rename = "!=")]
    NotEqual,
    /// `=~`, anchored regular expression match.
    #[serde(rename = "=~")]
    Regex,
    /// `!~`, negated anchored regular expression match.
    #[serde(rename = "!~")]
    NotRegex,
}

impl MatchOperator {
    /// Operators in the order they must be tried when scanning text, longest
    /// first so `=` never matches the start of `=~`.
    pub const SCAN_ORDER: [Self; 4] = [Self::Regex, Self::NotRegex, Self::NotEqual, Self::Equal];

    /// Returns the operator symbol.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::Equal => "=",
            Self::NotEqual => "!=",
            Self::Regex => "=~",
            Self::NotRegex => "!~",
        }
    }

    /// Returns true for `=~` and `!~`.
    #[must_use]
    pub const fn is_regex(&self) -> bool {
        matches!(self, Self::Regex | Self::NotRegex)
    }

    /// Returns true for `!=` and `!~`.
    #[must_use]
    pub const fn is_negative(&self) -> bool {
        matches!(self, Self::NotEqual | Self::NotRegex)
    }
}

impl fmt::Display for MatchOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for MatchOperator {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::SCAN_ORDER
            .into_iter()
            .find(|op| op.symbol() == s)
            .ok_or_else(|| ValidationError::invalid_matcher(FIELD, s, "unknown operator"))
    }
}

/// A single label constraint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Matcher {
    /// Label name.
    pub name: String,
    /// Comparison operator.
    pub operator: MatchOperator,
    /// Value or regular expression.
    pub value: String,
}

impl Matcher {
    /// Creates a matcher, checking the name and, for regex operators, that
    /// the value compiles.
    ///
    /// # Errors
    ///
    /// Returns `InvalidMatcherSyntax` for a bad name or regular expression.
    pub fn new(
        name: impl Into<String>,
        operator: MatchOperator,
        value: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let matcher = Self {
            name: name.into(),
            operator,
            value: value.into(),
        };
        matcher.validate()?;
        Ok(matcher)
    }

    /// Checks the name and regular expression.
    ///
    /// # Errors
    ///
    /// Returns `InvalidMatcherSyntax` describing the problem.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_label_name(&self.name)?;
        if self.operator.is_regex() {
            anchored_regex(&self.value).map_err(|e| {
                ValidationError::invalid_matcher(FIELD, self.to_string(), format!("invalid regex: {e}"))
            })?;
        }
        Ok(())
    }

    /// Returns true if the label set satisfies this matcher.
    ///
    /// A missing label is treated as an empty value, so `team!="db"` matches
    /// alerts without a `team` label. A regex that does not compile matches
    /// nothing.
    #[must_use]
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        let actual = labels.get(&self.name).map_or("", String::as_str);
        match self.operator {
            MatchOperator::Equal => actual == self.value,
            MatchOperator::NotEqual => actual != self.value,
            MatchOperator::Regex => anchored_regex(&self.value).is_ok_and(|re| re.is_match(actual)),
            MatchOperator::NotRegex => {
                anchored_regex(&self.value).is_ok_and(|re| !re.is_match(actual))
            }
        }
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.operator)?;
        if needs_quotes(&self.value) {
            f.write_str("\"")?;
            for c in self.value.chars() {
                if c == '"' || c == '\\' {
                    f.write_str("\\")?;
                }
                write!(f, "{c}")?;
            }
            f.write_str("\"")
        } else {
            f.write_str(&self.value)
        }
    }
}

impl FromStr for Matcher {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_matcher(s)
    }
}

fn anchored_regex(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{pattern})$"))
}

fn validate_label_name(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::invalid_matcher(
            FIELD,
            name,
            "label name cannot be empty",
        ));
    }
    if name
        .chars()
        .any(|c| c.is_whitespace() || RESERVED_NAME_CHARS.contains(&c))
    {
        return Err(ValidationError::invalid_matcher(
            FIELD,
            name,
            "label name contains a reserved character",
        ));
    }
    Ok(())
}

fn needs_quotes(value: &str) -> bool {
    value.is_empty()
        || value.trim() != value
        || value
            .chars()
            .any(|c| matches!(c, ',' | '=' | '!' | '~' | '"' | '\\' | '{' | '}'))
}

/// Parse a quoted value, returning the unescaped content.
fn unquote(term: &str, quoted: &str) -> Result<String, ValidationError> {
    let inner = quoted
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .filter(|_| quoted.len() >= 2)
        .ok_or_else(|| ValidationError::invalid_matcher(FIELD, term, "unterminated quoted value"))?;

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(escaped @ ('"' | '\\')) => out.push(escaped),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => {
                    return Err(ValidationError::invalid_matcher(
                        FIELD,
                        term,
                        "dangling escape in quoted value",
                    ));
                }
            },
            '"' => {
                return Err(ValidationError::invalid_matcher(
                    FIELD,
                    term,
                    "unescaped quote inside quoted value",
                ));
            }
            c => out.push(c),
        }
    }
    Ok(out)
}

/// Parse one `name<op>value` term.
///
/// # Errors
///
/// Returns `InvalidMatcherSyntax` if there is no operator, the name is
/// invalid, a quoted value is malformed, or a regex does not compile.
pub fn parse_matcher(term: &str) -> Result<Matcher, ValidationError> {
    let term = term.trim();
    let op_start = term
        .find(['=', '!', '~'])
        .ok_or_else(|| ValidationError::invalid_matcher(FIELD, term, "missing operator"))?;

    let (name, rest) = term.split_at(op_start);
    let operator = MatchOperator::SCAN_ORDER
        .into_iter()
        .find(|op| rest.starts_with(op.symbol()))
        .ok_or_else(|| ValidationError::invalid_matcher(FIELD, term, "unknown operator"))?;

    let raw_value = rest[operator.symbol().len()..].trim();
    let value = if raw_value.starts_with('"') {
        unquote(term, raw_value)?
    } else if raw_value.contains('"') {
        return Err(ValidationError::invalid_matcher(
            FIELD,
            term,
            "quote inside unquoted value",
        ));
    } else {
        raw_value.to_string()
    };

    let matcher = Matcher {
        name: name.trim().to_string(),
        operator,
        value,
    };
    matcher.validate().map_err(|e| match e.kind {
        crate::error::ValidationErrorKind::InvalidMatcherSyntax { reason, .. } => {
            ValidationError::invalid_matcher(FIELD, term, reason)
        }
        _ => e,
    })?;
    Ok(matcher)
}

/// Split matcher list text on commas outside double quotes.
fn split_terms(text: &str) -> Result<Vec<&str>, ValidationError> {
    let mut terms = Vec::new();
    let mut in_quotes = false;
    let mut escaped = false;
    let mut start = 0;

    for (i, c) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                terms.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if in_quotes {
        return Err(ValidationError::invalid_matcher(
            FIELD,
            text,
            "unterminated quoted value",
        ));
    }
    terms.push(&text[start..]);

    // A single trailing comma is tolerated.
    if terms.len() > 1 && terms.last().is_some_and(|t| t.trim().is_empty()) {
        terms.pop();
    }
    Ok(terms)
}

/// Parse a comma-separated matcher list.
///
/// Values may be double-quoted to embed commas. Empty input is an empty
/// list. Repeated label names are kept, in input order, as independent
/// constraints. Surrounding braces (`{a="1"}`) are accepted.
///
/// # Errors
///
/// Returns `InvalidMatcherSyntax` for the first malformed term.
///
/// # Example
///
/// ```
/// use notify_validation::{parse_matcher_list, MatchOperator};
///
/// let matchers = parse_matcher_list(r#"severity="critical, urgent""#)?;
/// assert_eq!(matchers.len(), 1);
/// assert_eq!(matchers[0].operator, MatchOperator::Equal);
/// assert_eq!(matchers[0].value, "critical, urgent");
/// # Ok::<(), notify_validation::ValidationError>(())
/// ```
pub fn parse_matcher_list(text: &str) -> Result<Vec<Matcher>, ValidationError> {
    let mut body = text.trim();
    match (body.strip_prefix('{'), body.ends_with('}')) {
        (Some(inner), true) => body = inner[..inner.len() - 1].trim(),
        (None, false) => {}
        _ => {
            return Err(ValidationError::invalid_matcher(
                FIELD,
                text,
                "unbalanced braces",
            ));
        }
    }

    if body.is_empty() {
        return Ok(Vec::new());
    }

    let result = split_terms(body).and_then(|terms| {
        terms
            .into_iter()
            .map(|term| {
                if term.trim().is_empty() {
                    Err(ValidationError::invalid_matcher(FIELD, text, "empty matcher"))
                } else {
                    parse_matcher(term)
                }
            })
            .collect()
    });

    if let Err(e) = &result {
        debug!(input = %text, error = %e, "rejected matcher list");
    }
    result
}

/// Format one matcher as `name<op>value`, quoting the value when needed to
/// parse back unchanged.
#[must_use]
pub fn matcher_to_display_string(matcher: &Matcher) -> String {
    matcher.to_string()
}

/// Format matchers as a comma-separated list that
/// [`parse_matcher_list`] reads back unchanged.
#[must_use]
pub fn matchers_to_display_string(matchers: &[Matcher]) -> String {
    matchers
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Returns true if every matcher matches the label set. An empty matcher
/// list matches everything.
#[must_use]
pub fn matchers_match(matchers: &[Matcher], labels: &BTreeMap<String, String>) -> bool {
    matchers.iter().all(|m| m.matches(labels))
}

/// Returns the label sets matched by every matcher, preserving order.
pub fn find_matching<'a, I>(label_sets: I, matchers: &'a [Matcher]) -> impl Iterator<Item = I::Item> + 'a
where
    I: IntoIterator<Item = &'a BTreeMap<String, String>>,
    I::IntoIter: 'a,
{
    label_sets
        .into_iter()
        .filter(move |labels| matchers_match(matchers, labels))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use test_case::test_case;

    fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn m(name: &str, operator: MatchOperator, value: &str) -> Matcher {
        Matcher::new(name, operator, value).unwrap()
    }

    #[test]
    fn test_quoted_comma_is_not_a_delimiter() {
        let matchers = parse_matcher_list(r#"severity="critical, urgent""#).unwrap();
        assert_eq!(
            matchers,
            vec![m("severity", MatchOperator::Equal, "critical, urgent")]
        );
    }

    #[test]
    fn test_all_operators_in_order() {
        let matchers = parse_matcher_list("a=1,b!=2,c=~3.*").unwrap();
        assert_eq!(
            matchers,
            vec![
                m("a", MatchOperator::Equal, "1"),
                m("b", MatchOperator::NotEqual, "2"),
                m("c", MatchOperator::Regex, "3.*"),
            ]
        );
    }

    #[test]
    fn test_whitespace_braces_and_trailing_comma() {
        let matchers = parse_matcher_list(r#" { team !~ "db|infra" , env = prod, } "#).unwrap();
        assert_eq!(
            matchers,
            vec![
                m("team", MatchOperator::NotRegex, "db|infra"),
                m("env", MatchOperator::Equal, "prod"),
            ]
        );
    }

    #[test]
    fn test_empty_input_is_empty_list() {
        assert!(parse_matcher_list("").unwrap().is_empty());
        assert!(parse_matcher_list("  {} ").unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_names_are_kept() {
        let matchers = parse_matcher_list("a=~.+,a!=x").unwrap();
        assert_eq!(matchers.len(), 2);
        assert!(matchers_match(&matchers, &labels(&[("a", "y")])));
        assert!(!matchers_match(&matchers, &labels(&[("a", "x")])));
    }

    #[test]
    fn test_escaped_quotes() {
        let matchers = parse_matcher_list(r#"msg="say \"hi\", \\o/""#).unwrap();
        assert_eq!(matchers[0].value, r#"say "hi", \o/"#);
        assert_eq!(
            matcher_to_display_string(&matchers[0]),
            r#"msg="say \"hi\", \\o/""#
        );
    }

    #[test_case("severity" ; "missing operator")]
    #[test_case("=value" ; "missing name")]
    #[test_case("a b=1" ; "space in name")]
    #[test_case("a=1,,b=2" ; "empty term")]
    #[test_case("a=1,," ; "two trailing commas")]
    #[test_case(r#"a="unterminated"# ; "unterminated quote")]
    #[test_case(r#"a=x"y"# ; "stray quote")]
    #[test_case("a=~(" ; "bad regex")]
    #[test_case("{a=1" ; "unbalanced brace")]
    #[test_case("a~1" ; "tilde alone")]
    fn test_invalid_matcher_lists(text: &str) {
        let err = parse_matcher_list(text).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidMatcherSyntax);
    }

    #[test_case(MatchOperator::Equal, "critical", "severity=critical" ; "plain")]
    #[test_case(MatchOperator::Equal, "a,b", r#"severity="a,b""# ; "comma")]
    #[test_case(MatchOperator::NotEqual, "x=y", r#"severity!="x=y""# ; "operator char")]
    #[test_case(MatchOperator::Equal, "", r#"severity="""# ; "empty")]
    #[test_case(MatchOperator::Regex, " padded", r#"severity=~" padded""# ; "edge whitespace")]
    fn test_display(op: MatchOperator, value: &str, expected: &str) {
        let matcher = m("severity", op, value);
        assert_eq!(matcher_to_display_string(&matcher), expected);
        assert_eq!(parse_matcher(expected).unwrap(), matcher);
    }

    #[test]
    fn test_list_display_round_trip() {
        let matchers = parse_matcher_list(r#"a="1, 2",b!~x.*,c="""#).unwrap();
        let text = matchers_to_display_string(&matchers);
        assert_eq!(text, r#"a="1, 2",b!~x.*,c="""#);
        assert_eq!(parse_matcher_list(&text).unwrap(), matchers);
    }

    #[test]
    fn test_regex_is_anchored() {
        let matcher = m("instance", MatchOperator::Regex, "web-[0-9]");
        assert!(matcher.matches(&labels(&[("instance", "web-1")])));
        assert!(!matcher.matches(&labels(&[("instance", "web-10")])));
        assert!(!matcher.matches(&labels(&[("instance", "xweb-1")])));
    }

    #[test]
    fn test_missing_label_reads_as_empty() {
        let not_db = m("team", MatchOperator::NotEqual, "db");
        assert!(not_db.matches(&labels(&[])));

        let empty = m("team", MatchOperator::Equal, "");
        assert!(empty.matches(&labels(&[("env", "prod")])));

        let any = m("team", MatchOperator::Regex, ".+");
        assert!(!any.matches(&labels(&[])));
    }

    #[test]
    fn test_find_matching() {
        let alerts = [
            labels(&[("severity", "critical"), ("team", "db")]),
            labels(&[("severity", "warning"), ("team", "db")]),
            labels(&[("severity", "critical"), ("team", "web")]),
        ];
        let matchers = parse_matcher_list("severity=critical").unwrap();
        let found: Vec<_> = find_matching(&alerts, &matchers).collect();
        assert_eq!(found.len(), 2);
        assert_eq!(found[1]["team"], "web");
    }

    #[test]
    fn test_operator_serde_uses_symbols() {
        let json = serde_json::to_string(&m("a", MatchOperator::NotRegex, "b")).unwrap();
        assert_eq!(json, r#"{"name":"a","operator":"!~","value":"b"}"#);
    }
}
