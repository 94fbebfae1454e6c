//! Admission gate enforcing the maximum concurrent sandbox count.

/// Decide whether one more sandbox may be admitted.
///
/// `current` must include both live sandboxes and outstanding slot
/// reservations; callers evaluate this inside the pool's critical section
/// so two concurrent admissions can never both claim the last slot.
pub fn try_admit(current: usize, max: usize) -> bool {
    current < max
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admit_below_max() {
        assert!(try_admit(0, 1));
        assert!(try_admit(4, 5));
    }

    #[test]
    fn test_deny_at_max() {
        assert!(!try_admit(1, 1));
        assert!(!try_admit(5, 5));
    }

    #[test]
    fn test_deny_above_max() {
        // Can happen after recovery registers orphans past the cap.
        assert!(!try_admit(7, 5));
    }
}
