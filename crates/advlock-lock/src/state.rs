//! Lock mode and per-handle lock state.

use std::fmt;

/// Which kind of advisory lock an operation asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockMode {
    /// Many holders allowed; excludes exclusive holders.
    Shared,
    /// Single holder; excludes both shared and exclusive holders.
    Exclusive,
}

impl fmt::Display for LockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shared => write!(f, "shared"),
            Self::Exclusive => write!(f, "exclusive"),
        }
    }
}

/// What a single handle currently believes it holds.
///
/// This is local bookkeeping only. The OS lock table is the authority on who
/// actually holds the lock, and two handles on the same path never share this
/// value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockState {
    #[default]
    Unlocked,
    Shared,
    Exclusive,
}

impl LockState {
    /// True when a request for `mode` can be answered without a syscall.
    #[must_use]
    pub const fn holds(self, mode: LockMode) -> bool {
        matches!(
            (self, mode),
            (Self::Shared, LockMode::Shared) | (Self::Exclusive, LockMode::Exclusive)
        )
    }

    #[must_use]
    pub const fn is_held(self) -> bool {
        !matches!(self, Self::Unlocked)
    }

    #[must_use]
    pub const fn is_exclusive(self) -> bool {
        matches!(self, Self::Exclusive)
    }

    #[must_use]
    pub const fn is_shared(self) -> bool {
        matches!(self, Self::Shared)
    }
}

impl From<LockMode> for LockState {
    fn from(mode: LockMode) -> Self {
        match mode {
            LockMode::Shared => Self::Shared,
            LockMode::Exclusive => Self::Exclusive,
        }
    }
}

impl fmt::Display for LockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unlocked => write!(f, "unlocked"),
            Self::Shared => write!(f, "shared"),
            Self::Exclusive => write!(f, "exclusive"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_is_unlocked() {
        let state = LockState::default();
        assert_eq!(state, LockState::Unlocked);
        assert!(!state.is_held());
        assert!(!state.is_shared());
        assert!(!state.is_exclusive());
    }

    #[test]
    fn test_holds_only_matching_mode() {
        assert!(LockState::Exclusive.holds(LockMode::Exclusive));
        assert!(!LockState::Exclusive.holds(LockMode::Shared));
        assert!(LockState::Shared.holds(LockMode::Shared));
        assert!(!LockState::Shared.holds(LockMode::Exclusive));
        assert!(!LockState::Unlocked.holds(LockMode::Shared));
        assert!(!LockState::Unlocked.holds(LockMode::Exclusive));
    }

    #[test]
    fn test_shared_and_exclusive_are_disjoint() {
        for state in [LockState::Unlocked, LockState::Shared, LockState::Exclusive] {
            assert!(!(state.is_shared() && state.is_exclusive()), "{state}");
        }
    }

    #[test]
    fn test_state_from_mode() {
        assert_eq!(LockState::from(LockMode::Shared), LockState::Shared);
        assert_eq!(LockState::from(LockMode::Exclusive), LockState::Exclusive);
    }

    #[test]
    fn test_display() {
        assert_eq!(LockMode::Shared.to_string(), "shared");
        assert_eq!(LockMode::Exclusive.to_string(), "exclusive");
        assert_eq!(LockState::Unlocked.to_string(), "unlocked");
    }
}
