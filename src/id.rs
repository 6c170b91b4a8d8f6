/*!
A common identifier type used for every model element. Purposefully opaque — callers never
parse structure out of it beyond the `Display` string — but it supports a random form and a
prefixed form so generated diagrams and logs can carry a human-readable hint.

# Example

```rust
use uml_hsm::id::ID;

let first_id = ID::random_with_prefix("state").unwrap();
let _next_id = first_id.append_random();
```
*/

use std::fmt::Display;
use std::str::FromStr;

// ------------------------------------------------------------------------------------------------
// Public Types
// ------------------------------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ID(String);

///
/// Error kind and result type for `ID` parsing.
///
pub mod error {
    error_chain! {
        errors {
            #[doc = "`ID` may not be an empty string."]
            EmptyString {
                description("an ID may not be an empty string")
                display("an ID may not be an empty string")
            }
            #[doc = "`ID` contains invalid character(s)."]
            InvalidCharacter {
                description("an ID may only contain alphanumerics, '-', '_' and ':'")
                display("an ID may only contain alphanumerics, '-', '_' and ':'")
            }
        }
    }
}

const INVALID_ID_VALUE: &str = "<invalid-id>";
const ID_SEPARATOR: &str = "::";

// ------------------------------------------------------------------------------------------------
// Implementations
// ------------------------------------------------------------------------------------------------

impl Display for ID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ID {
    type Err = error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::validate(s)?;
        Ok(Self(s.to_string()))
    }
}

impl ID {
    /// A fresh, globally unique identifier.
    pub fn random() -> Self {
        Self(blob_uuid::random_blob())
    }

    /// A fresh identifier carrying `prefix` as a path segment, e.g. `state::<uuid>`.
    pub fn random_with_prefix(prefix: &str) -> error::Result<Self> {
        Self::validate(prefix)?;
        Ok(Self(format!("{}{}{}", prefix, ID_SEPARATOR, Self::random())))
    }

    /// The sentinel value used where a vertex reference has not yet been resolved.
    pub fn invalid() -> Self {
        Self(INVALID_ID_VALUE.to_string())
    }

    pub fn is_invalid(&self) -> bool {
        self.0 == INVALID_ID_VALUE
    }

    /// Appends a random suffix, e.g. to derive a child id from a parent's.
    pub fn append_random(&self) -> Self {
        Self(format!("{}{}{}", self.0, ID_SEPARATOR, Self::random()))
    }

    fn validate(s: &str) -> error::Result<()> {
        if s.is_empty() {
            Err(error::ErrorKind::EmptyString.into())
        } else if !s
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == ':')
        {
            Err(error::ErrorKind::InvalidCharacter.into())
        } else {
            Ok(())
        }
    }
}

// ------------------------------------------------------------------------------------------------
// Unit Tests
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_ids_are_distinct() {
        assert_ne!(ID::random(), ID::random());
    }

    #[test]
    fn prefixed_id_round_trips() {
        let id = ID::random_with_prefix("thing").unwrap();
        assert!(id.to_string().starts_with("thing::"));
        let _child = id.append_random();
    }

    #[test]
    fn invalid_sentinel_is_recognised() {
        assert!(ID::invalid().is_invalid());
        assert!(!ID::random().is_invalid());
    }

    #[test]
    fn rejects_bad_characters() {
        assert!(ID::from_str("").is_err());
        assert!(ID::from_str("has space").is_err());
        assert!(ID::from_str("valid-id_1:2").is_ok());
    }
}
