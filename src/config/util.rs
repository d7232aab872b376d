//! Utility functions for serde serialization.
//!
//! Helpers used with serde's `skip_serializing_if` and `default` attributes
//! so that zero-valued optional fields are left out of the output document.

// ============================================================================
// Boolean Helpers
// ============================================================================

/// Returns `true` if the boolean value is `false`.
///
/// Used with `#[serde(skip_serializing_if = "is_false")]` to omit false values.
#[inline]
pub fn is_false(b: &bool) -> bool {
    !*b
}

// ============================================================================
// Numeric Zero Helpers
// ============================================================================

/// Returns `true` if the u32 value is zero.
///
/// Used with `#[serde(skip_serializing_if = "is_zero_u32")]` to omit zero values.
#[inline]
pub fn is_zero_u32(v: &u32) -> bool {
    *v == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_false() {
        assert!(is_false(&false));
        assert!(!is_false(&true));
    }

    #[test]
    fn test_is_zero_u32() {
        assert!(is_zero_u32(&0));
        assert!(!is_zero_u32(&1));
    }
}
