use std::fmt;
use std::num::{NonZeroU64, NonZeroUsize};

use crate::error::ValidationError;

/// Declares a strictly positive integer newtype used for rates, budgets and pool sizes.
macro_rules! positive_int {
    ($(#[$meta:meta])* $name:ident, $nonzero:ty, $int:ty) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
        pub struct $name($nonzero);

        impl $name {
            #[must_use]
            pub const fn get(self) -> $int {
                self.0.get()
            }
        }

        impl TryFrom<$int> for $name {
            type Error = ValidationError;

            fn try_from(value: $int) -> Result<Self, Self::Error> {
                <$nonzero>::new(value)
                    .map($name)
                    .ok_or(ValidationError::ValueTooSmall { min: 1 })
            }
        }

        impl std::str::FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let value: $int = s
                    .trim()
                    .parse()
                    .map_err(|source| ValidationError::InvalidNumber { source })?;
                $name::try_from(value)
            }
        }

        impl From<$name> for $int {
            fn from(value: $name) -> Self {
                value.get()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

positive_int!(
    /// Requests per second, request budgets and rate limits.
    PositiveU64,
    NonZeroU64,
    u64
);

positive_int!(
    /// Concurrency, pool sizes and byte limits.
    PositiveUsize,
    NonZeroUsize,
    usize
);
