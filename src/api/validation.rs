use super::ApiError;

pub const MIN_YEAR: i32 = 1900;
pub const MAX_YEAR: i32 = 2100;
const MAX_SEARCH_LEN: usize = 100;

pub fn validate_id(kind: &str, id: i32) -> Result<i32, ApiError> {
    if id <= 0 {
        return Err(ApiError::validation(format!(
            "Invalid {kind} ID: {id}. ID must be a positive integer"
        )));
    }
    Ok(id)
}

pub fn validate_year(year: Option<i32>) -> Result<Option<i32>, ApiError> {
    match year {
        Some(y) if !(MIN_YEAR..=MAX_YEAR).contains(&y) => Err(ApiError::validation(format!(
            "Invalid year: {y}. Year must be between {MIN_YEAR} and {MAX_YEAR}"
        ))),
        _ => Ok(year),
    }
}

/// Blank text is allowed and means no filter.
pub fn validate_search_text(text: Option<&str>) -> Result<Option<&str>, ApiError> {
    if let Some(t) = text
        && t.trim().chars().count() > MAX_SEARCH_LEN
    {
        return Err(ApiError::validation(format!(
            "Search text must be {MAX_SEARCH_LEN} characters or less"
        )));
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_id() {
        assert!(validate_id("brand", 1).is_ok());
        assert!(validate_id("brand", 0).is_err());
        assert!(validate_id("model", -4).is_err());
    }

    #[test]
    fn test_validate_year() {
        assert_eq!(validate_year(None).unwrap(), None);
        assert_eq!(validate_year(Some(2012)).unwrap(), Some(2012));
        assert!(validate_year(Some(1899)).is_err());
        assert!(validate_year(Some(20120)).is_err());
    }

    #[test]
    fn test_validate_search_text() {
        assert!(validate_search_text(None).is_ok());
        assert!(validate_search_text(Some("   ")).is_ok());
        assert!(validate_search_text(Some(&"a".repeat(101))).is_err());
    }
}
