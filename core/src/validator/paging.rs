use crate::error::ValidationError;
use crate::policy::{QueryOptionKind, ValidationPolicy};
use crate::query::{SkipQueryOption, TopQueryOption};

pub fn validate_skip(option: &SkipQueryOption, policy: &ValidationPolicy) -> Result<(), ValidationError> {
    if !policy.allowed_query_options().contains(QueryOptionKind::Skip) {
        return Err(ValidationError::QueryOptionNotAllowed(QueryOptionKind::Skip));
    }
    match policy.max_skip() {
        Some(max) if option.value() > max => Err(ValidationError::SkipTooLarge { skip: option.value(), max }),
        _ => Ok(()),
    }
}

pub fn validate_top(option: &TopQueryOption, policy: &ValidationPolicy) -> Result<(), ValidationError> {
    if !policy.allowed_query_options().contains(QueryOptionKind::Top) {
        return Err(ValidationError::QueryOptionNotAllowed(QueryOptionKind::Top));
    }
    match policy.max_top() {
        Some(max) if option.value() > max => Err(ValidationError::TopTooLarge { top: option.value(), max }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds() {
        let mut policy = ValidationPolicy::default();
        policy.set_max_skip(Some(10)).unwrap().set_max_top(Some(0)).unwrap();

        assert!(validate_skip(&SkipQueryOption::new("10").unwrap(), &policy).is_ok());
        assert_eq!(
            validate_skip(&SkipQueryOption::new("11").unwrap(), &policy),
            Err(ValidationError::SkipTooLarge { skip: 11, max: 10 })
        );
        assert!(validate_top(&TopQueryOption::new("0").unwrap(), &policy).is_ok());
        assert_eq!(validate_top(&TopQueryOption::new("1").unwrap(), &policy), Err(ValidationError::TopTooLarge { top: 1, max: 0 }));
    }

    #[test]
    fn test_unbounded_by_default() {
        let policy = ValidationPolicy::default();
        assert!(validate_skip(&SkipQueryOption::new("18446744073709551615").unwrap(), &policy).is_ok());
        assert!(validate_top(&TopQueryOption::new("1000000").unwrap(), &policy).is_ok());
    }
}
