// ===== Numeric helpers =====

/// Exact integer check, used to decide when `powi` is safe
#[inline]
pub(crate) fn as_small_integer(n: f64) -> Option<i32> {
    if n.fract() == 0.0 && n.abs() <= f64::from(i32::MAX) {
        Some(n as i32)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_small_integer() {
        assert_eq!(as_small_integer(2.0), Some(2));
        assert_eq!(as_small_integer(-3.0), Some(-3));
        assert_eq!(as_small_integer(0.5), None);
        assert_eq!(as_small_integer(1e20), None);
    }
}
