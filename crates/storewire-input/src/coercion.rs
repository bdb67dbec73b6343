#![forbid(unsafe_code)]

//! Conversion between typed field values and what a control displays.
//!
//! Every binding resolves its control type once, at bind time, into a
//! [`Coercion`]. After that the two directions are plain method calls:
//!
//! | Coercion | state → element | element → state |
//! |---|---|---|
//! | `Checkbox` | truthiness → checked | checked → `Bool` |
//! | `Radio` | `value == option` → checked | checked → the option value |
//! | `Numeric` | decimal string, `""` for `Null`/NaN | finite `f64`, `""` → `Null` |
//! | `DateTime` | local wall-clock time in the configured zone | local timestamp, `""` → `Null` |
//! | `Text` | display string, `""` for `Null` | unchanged, unless the field already holds a number or date (blank keeps it) |
//!
//! Text-to-state conversion can fail ([`CoercionError`]); what happens then is
//! decided by the binding's [`InvalidInputPolicy`](storewire_core::InvalidInputPolicy).

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use storewire_core::{TimeZoneSetting, Value, format_number};

use crate::element::ElementKind;

/// Wall-clock format used by `datetime-local` controls.
pub const DATETIME_LOCAL_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

const LOCAL_INPUT_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// A display string that cannot become the field's type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoercionError {
    #[error("{0:?} is not a number")]
    InvalidNumber(String),
    #[error("{0:?} is not a date")]
    InvalidDate(String),
}

/// The `type` of a form control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ControlKind {
    #[default]
    Text,
    Email,
    Password,
    Search,
    Tel,
    Url,
    Color,
    Date,
    Time,
    Week,
    Month,
    DateTimeLocal,
    Number,
    Range,
    Checkbox,
    Radio,
    Hidden,
    Textarea,
    Select,
}

impl ControlKind {
    /// Parse an HTML-style `type` attribute. Unknown types behave as text.
    #[must_use]
    pub fn from_type_attr(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "email" => Self::Email,
            "password" => Self::Password,
            "search" => Self::Search,
            "tel" => Self::Tel,
            "url" => Self::Url,
            "color" => Self::Color,
            "date" => Self::Date,
            "time" => Self::Time,
            "week" => Self::Week,
            "month" => Self::Month,
            "datetime-local" => Self::DateTimeLocal,
            "number" => Self::Number,
            "range" => Self::Range,
            "checkbox" => Self::Checkbox,
            "radio" => Self::Radio,
            "hidden" => Self::Hidden,
            "textarea" => Self::Textarea,
            "select" => Self::Select,
            _ => Self::Text,
        }
    }

    /// The control kind implied by an element with no explicit type.
    #[must_use]
    pub const fn for_element(kind: ElementKind) -> Self {
        match kind {
            ElementKind::Input => Self::Text,
            ElementKind::Select => Self::Select,
            ElementKind::Textarea => Self::Textarea,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Email => "email",
            Self::Password => "password",
            Self::Search => "search",
            Self::Tel => "tel",
            Self::Url => "url",
            Self::Color => "color",
            Self::Date => "date",
            Self::Time => "time",
            Self::Week => "week",
            Self::Month => "month",
            Self::DateTimeLocal => "datetime-local",
            Self::Number => "number",
            Self::Range => "range",
            Self::Checkbox => "checkbox",
            Self::Radio => "radio",
            Self::Hidden => "hidden",
            Self::Textarea => "textarea",
            Self::Select => "select",
        }
    }

    /// Whether the control is driven by its checked flag.
    #[must_use]
    pub const fn is_checkable(self) -> bool {
        matches!(self, Self::Checkbox | Self::Radio)
    }
}

impl fmt::Display for ControlKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Conversion rules for one binding.
#[derive(Debug, Clone, PartialEq)]
pub enum Coercion {
    Checkbox,
    /// A radio button standing for `option`. Without an option the button
    /// never shows as checked and never writes.
    Radio { option: Option<Value> },
    Numeric,
    DateTime,
    Text,
}

impl Coercion {
    /// Resolve the rules for a control. `option` is only used by radios.
    #[must_use]
    pub fn for_control(kind: ControlKind, option: Option<Value>) -> Self {
        match kind {
            ControlKind::Checkbox => Self::Checkbox,
            ControlKind::Radio => Self::Radio { option },
            ControlKind::Number | ControlKind::Range => Self::Numeric,
            ControlKind::DateTimeLocal => Self::DateTime,
            _ => Self::Text,
        }
    }

    #[must_use]
    pub const fn is_checkable(&self) -> bool {
        matches!(self, Self::Checkbox | Self::Radio { .. })
    }

    /// The checked flag for a field value.
    #[must_use]
    pub fn to_checked(&self, value: Option<&Value>) -> bool {
        match self {
            Self::Radio { option } => match (option, value) {
                (Some(option), Some(value)) => option == value,
                _ => false,
            },
            _ => value.is_some_and(Value::is_truthy),
        }
    }

    /// The display string for a field value.
    #[must_use]
    pub fn to_display(&self, value: Option<&Value>, zone: &TimeZoneSetting) -> String {
        let Some(value) = value else {
            return String::new();
        };
        match (self, value) {
            (_, Value::Null) => String::new(),
            (Self::Numeric, Value::Number(n)) if n.is_nan() => String::new(),
            (Self::Numeric, Value::Number(n)) => format_number(*n),
            (Self::DateTime, Value::Date(instant)) => zone.format(instant, DATETIME_LOCAL_FORMAT),
            (Self::DateTime, Value::String(raw)) => parse_timestamp(raw, zone)
                .map(|instant| zone.format(&instant, DATETIME_LOCAL_FORMAT))
                .unwrap_or_default(),
            (_, other) => other.to_display_string(),
        }
    }

    /// The field value for a display string.
    ///
    /// `current` is the field's existing value; text controls use it to keep
    /// numeric and date fields typed. A blank text control over a numeric or
    /// date field keeps the current value, so the next edit still parses
    /// against the field's type.
    pub fn to_state(
        &self,
        raw: &str,
        current: Option<&Value>,
        zone: &TimeZoneSetting,
    ) -> Result<Value, CoercionError> {
        match self {
            Self::Numeric => parse_number(raw),
            Self::DateTime => parse_date(raw, zone),
            Self::Text => match current {
                Some(typed @ (Value::Number(_) | Value::Date(_))) if raw.trim().is_empty() => {
                    Ok(typed.clone())
                }
                Some(Value::Number(_)) => parse_number(raw),
                Some(Value::Date(_)) => parse_date(raw, zone),
                _ => Ok(Value::from(raw)),
            },
            Self::Checkbox | Self::Radio { .. } => Ok(Value::from(raw)),
        }
    }

    /// The field value a checked flag writes, or `None` when the edit
    /// writes nothing (a radio being unchecked).
    #[must_use]
    pub fn checked_to_state(&self, checked: bool) -> Option<Value> {
        match self {
            Self::Checkbox => Some(Value::Bool(checked)),
            Self::Radio { option } if checked => option.clone(),
            _ => None,
        }
    }
}

fn parse_number(raw: &str) -> Result<Value, CoercionError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Value::Null);
    }
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .map(Value::Number)
        .ok_or_else(|| CoercionError::InvalidNumber(raw.to_owned()))
}

fn parse_date(raw: &str, zone: &TimeZoneSetting) -> Result<Value, CoercionError> {
    if raw.trim().is_empty() {
        return Ok(Value::Null);
    }
    parse_timestamp(raw, zone)
        .map(Value::Date)
        .ok_or_else(|| CoercionError::InvalidDate(raw.to_owned()))
}

/// Parse an instant from RFC 3339, a local wall-clock timestamp in `zone`,
/// or a bare date (UTC midnight).
fn parse_timestamp(raw: &str, zone: &TimeZoneSetting) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Some(instant.with_timezone(&Utc));
    }
    for format in LOCAL_INPUT_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return zone.resolve(&naive);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const UTC: TimeZoneSetting = TimeZoneSetting::Utc;
    const PLUS_TWO: TimeZoneSetting = TimeZoneSetting::FixedOffset(2 * 3600);

    fn instant(raw: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(raw).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn type_attr_parsing() {
        assert_eq!(
            ControlKind::from_type_attr("datetime-local"),
            ControlKind::DateTimeLocal
        );
        assert_eq!(ControlKind::from_type_attr(" Range "), ControlKind::Range);
        assert_eq!(ControlKind::from_type_attr("frobnicate"), ControlKind::Text);
        assert_eq!(ControlKind::Checkbox.to_string(), "checkbox");
        assert!(ControlKind::Radio.is_checkable());
        assert!(!ControlKind::Number.is_checkable());
        assert_eq!(
            ControlKind::for_element(ElementKind::Select),
            ControlKind::Select
        );
    }

    #[test]
    fn control_resolution() {
        assert_eq!(
            Coercion::for_control(ControlKind::Range, None),
            Coercion::Numeric
        );
        assert_eq!(
            Coercion::for_control(ControlKind::Email, None),
            Coercion::Text
        );
        assert_eq!(
            Coercion::for_control(ControlKind::Textarea, None),
            Coercion::Text
        );
        assert_eq!(
            Coercion::for_control(ControlKind::Radio, Some(Value::from("a"))),
            Coercion::Radio {
                option: Some(Value::from("a"))
            }
        );
    }

    #[test]
    fn checkbox_truthiness() {
        let c = Coercion::Checkbox;
        assert!(c.to_checked(Some(&Value::Bool(true))));
        assert!(c.to_checked(Some(&Value::from("yes"))));
        assert!(!c.to_checked(Some(&Value::from(0))));
        assert!(!c.to_checked(None));
        assert_eq!(c.checked_to_state(false), Some(Value::Bool(false)));
    }

    #[test]
    fn radio_matches_option() {
        let r = Coercion::Radio {
            option: Some(Value::from("b")),
        };
        assert!(r.to_checked(Some(&Value::from("b"))));
        assert!(!r.to_checked(Some(&Value::from("a"))));
        assert!(!r.to_checked(None));
        assert_eq!(r.checked_to_state(true), Some(Value::from("b")));
        assert_eq!(r.checked_to_state(false), None);

        let bare = Coercion::Radio { option: None };
        assert!(!bare.to_checked(Some(&Value::Null)));
        assert_eq!(bare.checked_to_state(true), None);
    }

    #[test]
    fn numeric_both_ways() {
        let n = Coercion::Numeric;
        assert_eq!(n.to_display(Some(&Value::from(75)), &UTC), "75");
        assert_eq!(n.to_display(Some(&Value::from(0.5)), &UTC), "0.5");
        assert_eq!(n.to_display(Some(&Value::Number(f64::NAN)), &UTC), "");
        assert_eq!(n.to_display(Some(&Value::Null), &UTC), "");
        assert_eq!(n.to_state("75", None, &UTC), Ok(Value::Number(75.0)));
        assert_eq!(n.to_state(" -3.25 ", None, &UTC), Ok(Value::Number(-3.25)));
        assert_eq!(n.to_state("", None, &UTC), Ok(Value::Null));
        assert_eq!(
            n.to_state("12abc", None, &UTC),
            Err(CoercionError::InvalidNumber("12abc".to_owned()))
        );
        assert!(n.to_state("NaN", None, &UTC).is_err());
        assert_eq!(
            n.to_state("inf", None, &UTC),
            Err(CoercionError::InvalidNumber("inf".to_owned()))
        );
        assert!(n.to_state("-infinity", None, &UTC).is_err());
        assert!(n.to_state("1e999", None, &UTC).is_err());
    }

    #[test]
    fn datetime_display_in_zone() {
        let d = Coercion::DateTime;
        let value = Value::Date(instant("2024-05-01T10:30:00Z"));
        assert_eq!(d.to_display(Some(&value), &UTC), "2024-05-01T10:30:00");
        assert_eq!(d.to_display(Some(&value), &PLUS_TWO), "2024-05-01T12:30:00");
        let text = Value::from("2024-05-01T10:30:00Z");
        assert_eq!(d.to_display(Some(&text), &PLUS_TWO), "2024-05-01T12:30:00");
        assert_eq!(d.to_display(Some(&Value::from("not a date")), &UTC), "");
    }

    #[test]
    fn datetime_parse_in_zone() {
        let d = Coercion::DateTime;
        assert_eq!(
            d.to_state("2024-05-01T12:30:00", None, &PLUS_TWO),
            Ok(Value::Date(instant("2024-05-01T10:30:00Z")))
        );
        assert_eq!(
            d.to_state("2024-05-01T12:30", None, &UTC),
            Ok(Value::Date(instant("2024-05-01T12:30:00Z")))
        );
        assert_eq!(d.to_state("", None, &UTC), Ok(Value::Null));
        assert!(matches!(
            d.to_state("yesterday", None, &UTC),
            Err(CoercionError::InvalidDate(_))
        ));
    }

    #[test]
    fn text_keeps_existing_types() {
        let t = Coercion::Text;
        assert_eq!(
            t.to_state("hi", Some(&Value::from("x")), &UTC),
            Ok(Value::from("hi"))
        );
        assert_eq!(
            t.to_state("42", Some(&Value::from(1)), &UTC),
            Ok(Value::from(42))
        );
        assert_eq!(
            t.to_state("2024-05-01", Some(&Value::Date(instant("2020-01-01T00:00:00Z"))), &UTC),
            Ok(Value::Date(instant("2024-05-01T00:00:00Z")))
        );
        assert_eq!(t.to_state("42", None, &UTC), Ok(Value::from("42")));
        assert_eq!(
            t.to_state(" ", Some(&Value::from(7)), &UTC),
            Ok(Value::from(7))
        );
        assert_eq!(
            t.to_state("", Some(&Value::from("x")), &UTC),
            Ok(Value::from(""))
        );
        assert_eq!(t.to_display(Some(&Value::from(true)), &UTC), "true");
        assert_eq!(t.to_display(None, &UTC), "");
    }

    proptest! {
        #[test]
        fn numeric_display_parses_back(n in proptest::num::f64::NORMAL | proptest::num::f64::ZERO) {
            let c = Coercion::Numeric;
            let shown = c.to_display(Some(&Value::Number(n)), &UTC);
            prop_assert_eq!(c.to_state(&shown, None, &UTC), Ok(Value::Number(n)));
        }

        #[test]
        fn text_passes_strings_through(raw in "[^\\x00]{0,32}") {
            let c = Coercion::Text;
            let current = Value::from("old");
            prop_assert_eq!(
                c.to_state(&raw, Some(&current), &UTC),
                Ok(Value::from(raw.as_str()))
            );
        }
    }
}
