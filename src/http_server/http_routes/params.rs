//! Query string parsing shared by the list endpoints.

use chrono::NaiveDate;

use crate::services::error::FieldErrors;

pub const INVALID_NUMBER: &str = "Enter a whole number.";
pub const INVALID_DATE: &str = "Enter a valid date.";

/// Parse a comma-separated id list such as `1,2,3`. An absent or empty value yields `None`.
pub fn parse_id_list(
    errors: &mut FieldErrors,
    field: &str,
    raw: Option<&str>,
) -> Option<Vec<i64>> {
    let raw = raw.map(str::trim).filter(|raw| !raw.is_empty())?;

    let ids: Result<Vec<i64>, _> = raw.split(',').map(|id| id.trim().parse::<i64>()).collect();
    match ids {
        Ok(ids) => Some(ids),
        Err(_) => {
            errors.add(field, INVALID_NUMBER);
            None
        }
    }
}

pub fn parse_id(errors: &mut FieldErrors, field: &str, raw: Option<&str>) -> Option<i64> {
    let raw = raw.map(str::trim).filter(|raw| !raw.is_empty())?;
    match raw.parse() {
        Ok(id) => Some(id),
        Err(_) => {
            errors.add(field, INVALID_NUMBER);
            None
        }
    }
}

/// `YYYY-MM-DD`
pub fn parse_date(errors: &mut FieldErrors, field: &str, raw: Option<&str>) -> Option<NaiveDate> {
    let raw = raw.map(str::trim).filter(|raw| !raw.is_empty())?;
    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(_) => {
            errors.add(field, INVALID_DATE);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id_list() {
        let mut errors = FieldErrors::new();
        assert_eq!(parse_id_list(&mut errors, "genres", Some("1, 2,3")), Some(vec![1, 2, 3]));
        assert_eq!(parse_id_list(&mut errors, "genres", Some("")), None);
        assert_eq!(parse_id_list(&mut errors, "genres", None), None);
        assert!(errors.is_empty());

        assert_eq!(parse_id_list(&mut errors, "actors", Some("1,x")), None);
        assert_eq!(errors.messages("actors"), [INVALID_NUMBER]);
    }

    #[test]
    fn test_parse_date() {
        let mut errors = FieldErrors::new();
        assert_eq!(
            parse_date(&mut errors, "date", Some("2024-05-01")),
            NaiveDate::from_ymd_opt(2024, 5, 1)
        );
        assert_eq!(parse_date(&mut errors, "date", Some("01/05/2024")), None);
        assert_eq!(errors.messages("date"), [INVALID_DATE]);
    }

    #[test]
    fn test_parse_id() {
        let mut errors = FieldErrors::new();
        assert_eq!(parse_id(&mut errors, "movie", Some("7")), Some(7));
        assert_eq!(parse_id(&mut errors, "movie", Some("seven")), None);
        assert_eq!(errors.messages("movie"), [INVALID_NUMBER]);
    }
}
