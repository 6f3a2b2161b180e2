use thiserror::Error;

pub const MAX_PROJECTION_MONTHS: u32 = 1_200;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProjectionError {
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

impl ProjectionError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }

    pub fn parameter(&self) -> &'static str {
        match self {
            Self::InvalidParameter { name, .. } => name,
        }
    }
}

pub(crate) fn require_finite(name: &'static str, value: f64) -> Result<f64, ProjectionError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ProjectionError::invalid(name, "must be a finite number"))
    }
}

pub(crate) fn require_non_negative(name: &'static str, value: f64) -> Result<f64, ProjectionError> {
    let value = require_finite(name, value)?;
    if value < 0.0 {
        return Err(ProjectionError::invalid(name, format!("must be >= 0, got {value}")));
    }
    Ok(value)
}

pub(crate) fn require_positive(name: &'static str, value: f64) -> Result<f64, ProjectionError> {
    let value = require_finite(name, value)?;
    if value <= 0.0 {
        return Err(ProjectionError::invalid(name, format!("must be > 0, got {value}")));
    }
    Ok(value)
}

pub(crate) fn require_percent(name: &'static str, value: f64) -> Result<f64, ProjectionError> {
    let value = require_finite(name, value)?;
    if !(0.0..=100.0).contains(&value) {
        return Err(ProjectionError::invalid(
            name,
            format!("must be between 0 and 100, got {value}"),
        ));
    }
    Ok(value)
}

pub(crate) fn require_horizon(name: &'static str, months: u32) -> Result<u32, ProjectionError> {
    if months > MAX_PROJECTION_MONTHS {
        return Err(ProjectionError::invalid(
            name,
            format!("must be at most {MAX_PROJECTION_MONTHS} months, got {months}"),
        ));
    }
    Ok(months)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_parameter_message_names_the_field() {
        let err = require_positive("reinvestment_price", 0.0).expect_err("zero must be rejected");
        assert_eq!(err.parameter(), "reinvestment_price");
        assert!(err.to_string().contains("reinvestment_price"));
        assert!(err.to_string().contains("> 0"));
    }

    #[test]
    fn non_finite_values_are_rejected() {
        assert!(require_non_negative("shares", f64::NAN).is_err());
        assert!(require_positive("price", f64::INFINITY).is_err());
        assert!(require_percent("federal_tax_rate_pct", f64::NEG_INFINITY).is_err());
    }

    #[test]
    fn percent_bounds_are_inclusive() {
        assert!(require_percent("rate", 0.0).is_ok());
        assert!(require_percent("rate", 100.0).is_ok());
        assert!(require_percent("rate", 100.5).is_err());
        assert!(require_percent("rate", -0.1).is_err());
    }

    #[test]
    fn horizon_bound_is_inclusive() {
        assert!(require_horizon("months", MAX_PROJECTION_MONTHS).is_ok());
        let err = require_horizon("months", u32::MAX).expect_err("u32::MAX months");
        assert_eq!(err.parameter(), "months");
    }
}
