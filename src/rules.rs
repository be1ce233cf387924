//! Validation rules run against a field after it has been converted.
//!
//! A rule returns `None` when the value is acceptable, or a violation message.
//! The built-in rules ignore values of kinds they do not apply to, so `min`
//! on a string field never fires.

use crate::dates::DateValue;
use crate::value::Parsed;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$",
    )
    .expect("email regex")
});

/// A validation rule.
pub type Rule = Arc<dyn Fn(&Parsed) -> Option<String> + Send + Sync>;

/// Wrap a custom check as a rule.
pub fn rule<F>(check: F) -> Rule
where
    F: Fn(&Parsed) -> Option<String> + Send + Sync + 'static,
{
    Arc::new(check)
}

pub fn min(bound: f64) -> Rule {
    rule(move |value| match value.as_f64() {
        Some(n) if n < bound => Some(format!("Value cannot be smaller than {}", bound)),
        _ => None,
    })
}

pub fn max(bound: f64) -> Rule {
    rule(move |value| match value.as_f64() {
        Some(n) if n > bound => Some(format!("Value cannot be greater than {}", bound)),
        _ => None,
    })
}

/// Lower bound on the length of a string (in characters) or an array.
pub fn min_length(bound: usize) -> Rule {
    rule(move |value| match length(value) {
        Some(len) if len < bound => Some(format!("Value cannot be shorter than {}", bound)),
        _ => None,
    })
}

/// Upper bound on the length of a string (in characters) or an array.
pub fn max_length(bound: usize) -> Rule {
    rule(move |value| match length(value) {
        Some(len) if len > bound => Some(format!("Value cannot be longer than {}", bound)),
        _ => None,
    })
}

pub fn regexp(pattern: Regex) -> Rule {
    rule(move |value| match value.as_str() {
        Some(s) if !pattern.is_match(s) => Some(format!(
            "Value must match regular expression {}",
            pattern.as_str()
        )),
        _ => None,
    })
}

/// The string must be an email address of the form `local@domain.tld`.
pub fn email() -> Rule {
    rule(|value| match value.as_str() {
        Some(s) if !EMAIL_RE.is_match(s) => Some("Value must be an email address".to_owned()),
        _ => None,
    })
}

/// The date must be strictly later than `bound`.
pub fn after(bound: DateValue) -> Rule {
    let instant = bound.to_utc();
    rule(move |value| match value.as_date() {
        Some(date) if date.to_utc() <= instant => Some(format!("Value must be after {}", bound)),
        _ => None,
    })
}

/// The date must be strictly earlier than `bound`.
pub fn before(bound: DateValue) -> Rule {
    let instant = bound.to_utc();
    rule(move |value| match value.as_date() {
        Some(date) if date.to_utc() >= instant => Some(format!("Value must be before {}", bound)),
        _ => None,
    })
}

fn length(value: &Parsed) -> Option<usize> {
    match value {
        Parsed::String(s) => Some(s.chars().count()),
        Parsed::Array(items) => Some(items.len()),
        _ => None,
    }
}

/// Run `rules` in order against `value`, stopping at the first violation.
pub(crate) fn first_violation(rules: &[Rule], value: &Parsed) -> Option<String> {
    rules.iter().find_map(|rule| rule(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::parse_date;
    use pretty_assertions::assert_eq;

    fn date(s: &str) -> Parsed {
        Parsed::Date(parse_date(s).unwrap())
    }

    #[test]
    fn email_addresses() {
        for ok in &["ada@example.com", "first.last+tag@mail.example.org"] {
            assert_eq!(email()(&Parsed::from(*ok)), None, "{}", ok);
        }
        for bad in &["ada", "ada@", "@example.com", "ada@example", "a b@example.com"] {
            assert_eq!(
                email()(&Parsed::from(*bad)),
                Some("Value must be an email address".to_owned()),
                "{}",
                bad
            );
        }
        assert_eq!(email()(&Parsed::from(3)), None);
    }

    #[test]
    fn numeric_bounds() {
        assert_eq!(min(3.0)(&Parsed::from(4)), None);
        assert_eq!(min(3.0)(&Parsed::from(3)), None);
        assert_eq!(
            min(3.0)(&Parsed::from(2)),
            Some("Value cannot be smaller than 3".to_owned())
        );
        assert_eq!(max(3.0)(&Parsed::from(2)), None);
        assert_eq!(
            max(3.0)(&Parsed::from(4.5)),
            Some("Value cannot be greater than 3".to_owned())
        );

        // not a number: ignored
        assert_eq!(min(3.0)(&Parsed::from("a")), None);
    }

    #[test]
    fn lengths() {
        assert_eq!(min_length(3)(&Parsed::from("abcd")), None);
        assert_eq!(
            min_length(3)(&Parsed::from("ab")),
            Some("Value cannot be shorter than 3".to_owned())
        );
        assert_eq!(max_length(3)(&Parsed::from("ab")), None);
        assert_eq!(
            max_length(3)(&Parsed::from("abcd")),
            Some("Value cannot be longer than 3".to_owned())
        );

        // characters, not bytes
        assert_eq!(max_length(3)(&Parsed::from("äöü")), None);

        let items = Parsed::Array(vec![Parsed::from(1), Parsed::from(2)]);
        assert!(min_length(3)(&items).is_some());
    }

    #[test]
    fn regular_expressions() {
        let rule = regexp(Regex::new(r"^\d+$").unwrap());
        assert_eq!(rule(&Parsed::from("123")), None);
        assert_eq!(
            rule(&Parsed::from("12a")),
            Some(r"Value must match regular expression ^\d+$".to_owned())
        );
    }

    #[test]
    fn date_bounds() {
        let bound = parse_date("2018-02-03T12:00:00Z").unwrap();

        assert_eq!(after(bound)(&date("2018-02-03T12:00:01Z")), None);
        assert_eq!(
            after(bound)(&date("2018-02-03T12:00:00Z")),
            Some("Value must be after 2018-02-03T12:00:00+00:00".to_owned())
        );
        assert_eq!(before(bound)(&date("2018-02-03T11:59:59Z")), None);
        assert!(before(bound)(&date("2018-02-03T13:00:00+01:00")).is_some());
    }

    #[test]
    fn stops_at_first_violation() {
        let rules = vec![min(1.0), max(3.0), min(0.5)];
        assert_eq!(first_violation(&rules, &Parsed::from(2)), None);
        assert_eq!(
            first_violation(&rules, &Parsed::from(0)),
            Some("Value cannot be smaller than 1".to_owned())
        );
        assert_eq!(
            first_violation(&rules, &Parsed::from(5)),
            Some("Value cannot be greater than 3".to_owned())
        );
    }
}
