/// Returns an [`InvalidConfiguration`](crate::error::Error::InvalidConfiguration) error from the
/// enclosing function if a numerical value is not in the interval `[a,b]`
///
/// ### Example
/// ```ignore
/// let gamma = 2.0;
/// ensure_interval!(gamma, 0.0, 1.0);
/// ```
/// This fails with the message "Invalid value for \`gamma\`: 2. Must be in the interval \[0, 1\]."
#[macro_export]
macro_rules! ensure_interval {
    ($var:expr, $a:expr, $b:expr) => {
        if !($var >= $a && $var <= $b) {
            return Err($crate::error::Error::InvalidConfiguration {
                message: format!(
                    "Invalid value for `{}`: {}. Must be in the interval [{}, {}].",
                    stringify!($var),
                    $var,
                    $a,
                    $b,
                ),
            });
        }
    };
}

/// Index of the largest value, ties going to the first one seen
///
/// Returns 0 for an empty slice.
pub fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &value) in values.iter().enumerate().skip(1) {
        if value > values[best] {
            best = i;
        }
    }
    best
}

/// Largest value, or `None` for an empty iterator
pub fn max_value(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    values.into_iter().reduce(f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argmax_prefers_first() {
        assert_eq!(argmax(&[1.0, 3.0, 3.0, 2.0]), 1);
        assert_eq!(argmax(&[0.0, 0.0]), 0);
        assert_eq!(argmax(&[]), 0);
        assert_eq!(argmax(&[f64::NEG_INFINITY, -5.0]), 1);
    }

    #[test]
    fn max_value_functional() {
        assert_eq!(max_value([1.0, -2.0, 4.0]), Some(4.0));
        assert_eq!(max_value(std::iter::empty()), None);
    }

    fn check(gamma: f64) -> crate::error::Result<()> {
        ensure_interval!(gamma, 0.0, 1.0);
        Ok(())
    }

    #[test]
    fn ensure_interval_functional() {
        assert!(check(0.5).is_ok());
        assert!(check(1.0).is_ok());
        let err = check(1.5).unwrap_err().to_string();
        assert!(err.contains("`gamma`"), "{err}");
        assert!(check(f64::NAN).is_err());
    }
}
