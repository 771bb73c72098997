use crate::errors::GasteError;

/// Create a string of all available items.
pub fn items_to_strings(items: Vec<&str>) -> String {
    items.join(", ")
}

pub fn fmt_vec_output(v: &[f64]) -> String {
    let mut res = String::new();
    if let Some(last) = v.len().checked_sub(1) {
        if last == 0 {
            return format!("{:.4}", v[0]);
        }
        for n in &v[..last] {
            res.push_str(format!("{:.4}", n).as_str());
            res.push_str(", ");
        }
        res.push_str(format!("{:.4}", &v[last]).as_str());
    }
    res
}

// Validation
pub fn validate_float_parameter(value: f64, min: f64, max: f64, parameter: &str) -> Result<(), GasteError> {
    if value.is_nan() || value <= min || max <= value {
        let ex_msg = format!("real value strictly between {} and {}", min, max);
        Err(GasteError::InvalidParameter(
            parameter.to_string(),
            ex_msg,
            value.to_string(),
        ))
    } else {
        Ok(())
    }
}

pub fn validate_probability_parameter(value: f64, parameter: &str) -> Result<(), GasteError> {
    validate_float_parameter(value, 0.0, 1.0, parameter)
}

/// Clamp an accumulated probability into the unit interval.
#[inline]
pub fn clamp_probability(p: f64) -> f64 {
    p.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_items_to_strings() {
        assert_eq!(items_to_strings(vec!["less", "greater"]), "less, greater");
    }

    #[test]
    fn test_fmt_vec_output() {
        assert_eq!(fmt_vec_output(&[]), "");
        assert_eq!(fmt_vec_output(&[0.5]), "0.5000");
        assert_eq!(fmt_vec_output(&[0.1, 0.25]), "0.1000, 0.2500");
    }

    #[test]
    fn test_validate_probability_parameter() {
        assert!(validate_probability_parameter(0.95, "confidence_level").is_ok());
        assert!(validate_probability_parameter(1.0, "confidence_level").is_err());
        assert!(validate_probability_parameter(0.0, "confidence_level").is_err());
        assert!(validate_probability_parameter(f64::NAN, "confidence_level").is_err());
    }

    #[test]
    fn test_clamp_probability() {
        assert_eq!(clamp_probability(1.0000000001), 1.0);
        assert_eq!(clamp_probability(-1e-17), 0.0);
        assert_eq!(clamp_probability(0.3), 0.3);
    }
}
