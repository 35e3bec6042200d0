//! Validation helpers for ACF vectors and operand shapes.
//!
//! Entry-point validation is concentrated here so the numerical modules can
//! assume well-formed inputs: an ACF is finite with a strictly positive
//! leading value, and operands match the bound order. All checks return
//! [`ToeplitzResult`] rather than panicking.

use crate::toeplitz::errors::{ToeplitzError, ToeplitzResult};
use ndarray::ArrayView1;

/// Validate an ACF against a fixed order `n`.
///
/// Checks, in order:
/// 1. `acf` is non-empty (callers that derive `n` from `acf.len()` would
///    otherwise pass the length check with an order-0 vector)
/// 2. `acf.len() == n`
/// 3. every entry is finite
/// 4. `γ₀ > 0`
///
/// Positive definiteness of the implied Toeplitz matrix is **not** checked
/// here; it is detected during factorization so that `multiply` keeps working
/// on indefinite but well-formed ACFs.
///
/// # Errors
/// - [`ToeplitzError::InvalidLength`] on an empty ACF or a length mismatch
/// - [`ToeplitzError::NonFiniteAcf`] on the first NaN/±inf entry
/// - [`ToeplitzError::InvalidLeadingAcf`] if `γ₀ ≤ 0`
pub fn validate_acf(acf: &ArrayView1<f64>, n: usize) -> ToeplitzResult<()> {
    if acf.is_empty() {
        return Err(ToeplitzError::InvalidLength { expected: n.max(1), actual: 0 });
    }
    if acf.len() != n {
        return Err(ToeplitzError::InvalidLength { expected: n, actual: acf.len() });
    }
    for (index, &value) in acf.iter().enumerate() {
        if !value.is_finite() {
            return Err(ToeplitzError::NonFiniteAcf { index, value });
        }
    }
    if acf[0] <= 0.0 {
        return Err(ToeplitzError::InvalidLeadingAcf { value: acf[0] });
    }
    Ok(())
}

/// Validate that an operand length matches the handle order.
///
/// # Errors
/// - [`ToeplitzError::InvalidLength`] if `len != n`
pub fn validate_len(len: usize, n: usize) -> ToeplitzResult<()> {
    if len != n {
        return Err(ToeplitzError::InvalidLength { expected: n, actual: len });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array1};

    #[test]
    // Purpose
    // -------
    // Verify the validation rules fire in order and that a well-formed
    // ACF passes.
    //
    // Given
    // -----
    // - A valid ACF, an empty ACF, a short ACF, one with a NaN, and one
    //   with γ₀ = 0.
    //
    // Expect
    // ------
    // - Ok for the valid input; the matching error variant for each bad
    //   one, including the empty ACF checked against its own (zero) length.
    fn validate_acf_enforces_length_finiteness_and_leading_value() {
        // Arrange
        let good = array![2.0, 1.0, 0.5];
        let empty = Array1::<f64>::zeros(0);
        let short = array![2.0, 1.0];
        let nan = array![2.0, f64::NAN, 0.5];
        let flat = array![0.0, 1.0, 0.5];

        // Act / Assert
        assert!(validate_acf(&good.view(), 3).is_ok());
        // The degenerate case every free function can hit: n derived from
        // the input itself, so the length comparison alone would pass.
        assert_eq!(
            validate_acf(&empty.view(), 0),
            Err(ToeplitzError::InvalidLength { expected: 1, actual: 0 })
        );
        assert_eq!(
            validate_acf(&short.view(), 3),
            Err(ToeplitzError::InvalidLength { expected: 3, actual: 2 })
        );
        assert!(matches!(
            validate_acf(&nan.view(), 3),
            Err(ToeplitzError::NonFiniteAcf { index: 1, .. })
        ));
        assert_eq!(
            validate_acf(&flat.view(), 3),
            Err(ToeplitzError::InvalidLeadingAcf { value: 0.0 })
        );
    }

    #[test]
    // Purpose
    // -------
    // Confirm operand-length validation reports the expected/actual pair.
    //
    // Given
    // -----
    // - An operand of length 4 against an order-3 handle.
    //
    // Expect
    // ------
    // - `InvalidLength { expected: 3, actual: 4 }`.
    fn validate_len_reports_expected_and_actual() {
        assert_eq!(
            validate_len(4, 3),
            Err(ToeplitzError::InvalidLength { expected: 3, actual: 4 })
        );
        assert!(validate_len(3, 3).is_ok());
    }
}
