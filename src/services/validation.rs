use chrono::{DateTime, NaiveDateTime};
use serde_json::Value;

use crate::services::error::{FieldErrors, ServiceResult};

pub const MAX_CHAR_LENGTH: usize = 255;

pub const REQUIRED: &str = "This field is required.";
pub const BLANK: &str = "This field may not be blank.";
pub const INVALID_STRING: &str = "Not a valid string.";
pub const INVALID_INTEGER: &str = "A valid integer is required.";
pub const INVALID_DATETIME: &str =
    "Datetime has wrong format. Use one of these formats instead: YYYY-MM-DDThh:mm[:ss[.uuuuuu]][+HH:MM|-HH:MM|Z].";

/// A write-body field exactly as the client sent it. `null` reads as absent.
///
/// Typed values are recovered by [`Validator`], so a badly typed field is
/// reported next to the other field errors instead of failing the whole body.
pub type Input = Option<Value>;

/// How much of a record a write supplies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// POST: every field must be present
    Create,
    /// PUT: every field must be present
    Replace,
    /// PATCH: absent fields keep their stored value
    Partial,
}

impl WriteMode {
    pub fn requires_all(self) -> bool {
        !matches!(self, WriteMode::Partial)
    }
}

pub fn does_not_exist(id: i64) -> String {
    format!("Invalid pk \"{id}\" - object does not exist.")
}

/// Name of a JSON value's type as it appears in error messages.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "NoneType",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

pub fn not_a_list(value: &Value) -> String {
    format!(
        "Expected a list of items but got type \"{}\".",
        type_name(value)
    )
}

pub fn not_a_dict(value: &Value) -> String {
    format!(
        "Invalid data. Expected a dictionary, but got {}.",
        type_name(value)
    )
}

fn incorrect_pk_type(value: &Value) -> String {
    format!(
        "Incorrect type. Expected pk value, received {}.",
        type_name(value)
    )
}

/// Text from a string or a number. Other JSON types are rejected.
pub fn coerce_string(value: &Value) -> Result<String, String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(INVALID_STRING.to_string()),
    }
}

/// An `i32` from a number or a numeric string. Integral floats such as `10.0`
/// and `"10.00"` are accepted.
pub fn coerce_integer(value: &Value) -> Result<i32, String> {
    let wide: i128 = match value {
        Value::Number(n) => match (n.as_i64(), n.as_u64(), n.as_f64()) {
            (Some(i), _, _) => i128::from(i),
            (None, Some(u), _) => i128::from(u),
            (None, None, Some(f)) if f.is_finite() && f.fract() == 0.0 => {
                if f.abs() > 1e30 {
                    return Err(INVALID_INTEGER.to_string());
                }
                f as i128
            }
            _ => return Err(INVALID_INTEGER.to_string()),
        },
        Value::String(s) => parse_integer_text(s).ok_or_else(|| INVALID_INTEGER.to_string())?,
        _ => return Err(INVALID_INTEGER.to_string()),
    };

    if wide > i128::from(i32::MAX) {
        return Err(format!(
            "Ensure this value is less than or equal to {}.",
            i32::MAX
        ));
    }
    if wide < i128::from(i32::MIN) {
        return Err(format!(
            "Ensure this value is greater than or equal to {}.",
            i32::MIN
        ));
    }
    Ok(wide as i32)
}

/// `" 12 "`, `"-3"`, `"10.000"`. A trailing `.0…` is dropped, any other fraction fails.
fn parse_integer_text(text: &str) -> Option<i128> {
    let text = text.trim();
    let digits = match text.split_once('.') {
        Some((whole, fraction)) if fraction.trim_end_matches('0').is_empty() => whole,
        Some(_) => return None,
        None => text,
    };
    digits.parse().ok()
}

/// A primary key from an integer or a numeric string.
pub fn coerce_pk(value: &Value) -> Result<i64, String> {
    let id = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    id.ok_or_else(|| incorrect_pk_type(value))
}

/// ISO 8601 date and time with `T` or a space between them. Seconds, fractions
/// and a `Z`/`±HH:MM` offset are optional; offsets are converted to UTC.
pub fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    let normalized = match text.as_bytes().get(10) {
        Some(b' ') | Some(b't') => format!("{}T{}", &text[..10], &text[11..]),
        _ => text.to_string(),
    };
    let normalized = match normalized.strip_suffix(['Z', 'z']) {
        Some(rest) => format!("{rest}+00:00"),
        None => normalized,
    };

    const NAIVE: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];
    const OFFSET: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M%#z"];

    NAIVE
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(&normalized, format).ok())
        .or_else(|| {
            OFFSET.iter().find_map(|format| {
                DateTime::parse_from_str(&normalized, format)
                    .ok()
                    .map(|datetime| datetime.naive_utc())
            })
        })
}

pub fn coerce_datetime(value: &Value) -> Result<NaiveDateTime, String> {
    value
        .as_str()
        .and_then(parse_datetime)
        .ok_or_else(|| INVALID_DATETIME.to_string())
}

/// Collects field errors while checking one input record.
pub struct Validator {
    mode: WriteMode,
    errors: FieldErrors,
}

impl Validator {
    pub fn new(mode: WriteMode) -> Self {
        Self {
            mode,
            errors: FieldErrors::new(),
        }
    }

    /// The raw value, or `None` with "required" recorded when a full write omits it.
    pub fn required(&mut self, field: &str, value: Input) -> Option<Value> {
        if value.is_none() && self.mode.requires_all() {
            self.errors.add(field, REQUIRED);
        }
        value
    }

    /// Run `coerce` on a present value, recording its message on failure.
    pub fn typed<T>(
        &mut self,
        field: &str,
        value: Input,
        coerce: impl FnOnce(&Value) -> Result<T, String>,
    ) -> Option<T> {
        let value = self.required(field, value)?;
        match coerce(&value) {
            Ok(typed) => Some(typed),
            Err(message) => {
                self.errors.add(field, message);
                None
            }
        }
    }

    /// Required (per mode), trimmed, non-blank and at most [`MAX_CHAR_LENGTH`] characters.
    pub fn char_field(&mut self, field: &str, value: Input) -> Option<String> {
        let value = self.text_field(field, value)?;
        if value.chars().count() > MAX_CHAR_LENGTH {
            self.errors.add(
                field,
                format!("Ensure this field has no more than {MAX_CHAR_LENGTH} characters."),
            );
            return None;
        }
        Some(value)
    }

    /// Required (per mode), trimmed and non-blank, no length limit.
    pub fn text_field(&mut self, field: &str, value: Input) -> Option<String> {
        let value = self.typed(field, value, coerce_string)?;
        let value = value.trim();
        if value.is_empty() {
            self.errors.add(field, BLANK);
            return None;
        }
        Some(value.to_string())
    }

    pub fn integer(&mut self, field: &str, value: Input) -> Option<i32> {
        self.typed(field, value, coerce_integer)
    }

    pub fn non_negative(&mut self, field: &str, value: Input) -> Option<i32> {
        let value = self.integer(field, value)?;
        if value < 0 {
            self.errors
                .add(field, "Ensure this value is greater than or equal to 0.");
            return None;
        }
        Some(value)
    }

    pub fn datetime(&mut self, field: &str, value: Input) -> Option<NaiveDateTime> {
        self.typed(field, value, coerce_datetime)
    }

    /// A single related id. Existence is checked by the caller.
    pub fn pk(&mut self, field: &str, value: Input) -> Option<i64> {
        self.typed(field, value, coerce_pk)
    }

    /// A list of related ids. Only the first bad item is reported.
    pub fn pk_list(&mut self, field: &str, value: Input) -> Option<Vec<i64>> {
        self.typed(field, value, |value| {
            let Value::Array(items) = value else {
                return Err(not_a_list(value));
            };
            items.iter().map(coerce_pk).collect()
        })
    }

    /// A list of nested records, each left raw for its own validation.
    pub fn list(&mut self, field: &str, value: Input) -> Option<Vec<Value>> {
        self.typed(field, value, |value| match value {
            Value::Array(items) => Ok(items.clone()),
            other => Err(not_a_list(other)),
        })
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors.add(field, message);
    }

    pub fn add_items(&mut self, field: &str, items: Vec<FieldErrors>) {
        self.errors.add_items(field, items);
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_errors(self) -> FieldErrors {
        self.errors
    }

    pub fn finish(self) -> ServiceResult<()> {
        self.errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    #[test]
    fn test_missing_fields_only_fail_full_writes() {
        let mut create = Validator::new(WriteMode::Create);
        assert_eq!(create.char_field("name", None), None);
        assert_eq!(create.into_errors().messages("name"), [REQUIRED]);

        let mut patch = Validator::new(WriteMode::Partial);
        assert_eq!(patch.char_field("name", None), None);
        assert!(patch.finish().is_ok());
    }

    #[test]
    fn test_char_field_trims_and_rejects_blank_and_long_values() {
        let mut validator = Validator::new(WriteMode::Partial);
        assert_eq!(validator.char_field("name", Some(json!("   "))), None);
        assert_eq!(validator.char_field("title", Some(json!("x".repeat(256)))), None);
        assert_eq!(
            validator.char_field("ok", Some(json!(format!("  {}  ", "x".repeat(255))))),
            Some("x".repeat(255))
        );
        assert_eq!(
            validator.char_field("padded", Some(json!("  Drama  "))),
            Some("Drama".to_string())
        );
        assert_eq!(validator.char_field("number", Some(json!(42))), Some("42".into()));
        assert_eq!(validator.char_field("flag", Some(json!(true))), None);

        let errors = validator.into_errors();
        assert_eq!(errors.messages("name"), [BLANK]);
        assert_eq!(
            errors.messages("title"),
            ["Ensure this field has no more than 255 characters."]
        );
        assert_eq!(errors.messages("flag"), [INVALID_STRING]);
        assert!(errors.messages("ok").is_empty());
        assert!(errors.messages("padded").is_empty());
    }

    #[test]
    fn test_non_negative() {
        let mut validator = Validator::new(WriteMode::Replace);
        assert_eq!(validator.non_negative("rows", Some(json!(0))), Some(0));
        assert_eq!(validator.non_negative("seats_in_row", Some(json!(-1))), None);
        assert_eq!(
            validator.into_errors().messages("seats_in_row"),
            ["Ensure this value is greater than or equal to 0."]
        );
    }

    #[test]
    fn test_integer_coercion() {
        assert_eq!(coerce_integer(&json!(10)), Ok(10));
        assert_eq!(coerce_integer(&json!("10")), Ok(10));
        assert_eq!(coerce_integer(&json!(" -4 ")), Ok(-4));
        assert_eq!(coerce_integer(&json!("10.00")), Ok(10));
        assert_eq!(coerce_integer(&json!(12.0)), Ok(12));

        for bad in [json!("abc"), json!("10.5"), json!(10.5), json!(true), json!([1])] {
            assert_eq!(coerce_integer(&bad), Err(INVALID_INTEGER.to_string()), "{bad}");
        }
        assert_eq!(
            coerce_integer(&json!(3_000_000_000u64)),
            Err("Ensure this value is less than or equal to 2147483647.".to_string())
        );
    }

    #[test]
    fn test_pk_coercion() {
        assert_eq!(coerce_pk(&json!(3)), Ok(3));
        assert_eq!(coerce_pk(&json!("3")), Ok(3));
        assert_eq!(
            coerce_pk(&json!("three")),
            Err("Incorrect type. Expected pk value, received str.".to_string())
        );
        assert_eq!(
            coerce_pk(&json!(false)),
            Err("Incorrect type. Expected pk value, received bool.".to_string())
        );
    }

    #[test]
    fn test_pk_list_reports_shape_and_first_bad_item() {
        let mut validator = Validator::new(WriteMode::Create);
        assert_eq!(
            validator.pk_list("genres", Some(json!(["1", 2]))),
            Some(vec![1, 2])
        );
        assert_eq!(validator.pk_list("actors", Some(json!(5))), None);
        assert_eq!(validator.pk_list("tags", Some(json!([1, "x", {}]))), None);

        let errors = validator.into_errors();
        assert_eq!(
            errors.messages("actors"),
            ["Expected a list of items but got type \"int\"."]
        );
        assert_eq!(
            errors.messages("tags"),
            ["Incorrect type. Expected pk value, received str."]
        );
    }

    #[test]
    fn test_datetime_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 5, 1)
            .and_then(|date| date.and_hms_opt(18, 0, 0))
            .unwrap();

        for text in [
            "2024-05-01T18:00:00",
            "2024-05-01T18:00",
            "2024-05-01 18:00",
            "2024-05-01 18:00:00.000",
            "2024-05-01T18:00:00Z",
            "2024-05-01T20:00+02:00",
        ] {
            assert_eq!(parse_datetime(text), Some(expected), "{text}");
        }

        for text in ["2024-05-01", "18:00", "tomorrow", "2024-13-01T18:00"] {
            assert_eq!(parse_datetime(text), None, "{text}");
        }
        assert_eq!(
            coerce_datetime(&json!(1714586400)),
            Err(INVALID_DATETIME.to_string())
        );
    }
}
