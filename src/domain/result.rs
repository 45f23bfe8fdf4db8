//! Result type alias for Quarry

use super::errors::QuarryError;

/// Result type alias for Quarry operations
///
/// # Examples
///
/// ```
/// use quarry::domain::result::Result;
/// use quarry::domain::errors::QuarryError;
///
/// fn failing_function() -> Result<()> {
///     Err(QuarryError::Validation("Invalid input".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, QuarryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_with_question_mark() -> Result<()> {
        fn inner() -> Result<u64> {
            Ok(7)
        }

        let value = inner()?;
        assert_eq!(value, 7);
        Ok(())
    }
}
