//! Optional capability state.

/// An optional capability, decided once at environment construction.
///
/// `Disabled` is not an error: suites that need the capability should skip
/// (or report "not available for this run") rather than fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capability<T> {
    /// The capability was not requested for this run.
    Disabled,

    /// The capability was requested and activated.
    Enabled(T),
}

impl<T> Capability<T> {
    /// Whether the capability is active.
    pub fn is_enabled(&self) -> bool {
        matches!(self, Capability::Enabled(_))
    }

    /// Borrow the active implementation, if any.
    pub fn enabled(&self) -> Option<&T> {
        match self {
            Capability::Enabled(inner) => Some(inner),
            Capability::Disabled => None,
        }
    }
}

impl<T> From<Option<T>> for Capability<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Capability::Disabled, Capability::Enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_option() {
        assert_eq!(Capability::from(Some(3)), Capability::Enabled(3));
        assert_eq!(Capability::<u8>::from(None), Capability::Disabled);
    }

    #[test]
    fn test_enabled_accessors() {
        let on = Capability::Enabled("queue");
        let off: Capability<&str> = Capability::Disabled;

        assert!(on.is_enabled());
        assert_eq!(on.enabled(), Some(&"queue"));
        assert!(!off.is_enabled());
        assert_eq!(off.enabled(), None);
    }
}
