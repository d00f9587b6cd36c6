//! Common error types used across the workspace.
//!
//! Each layer owns typed errors and converts into [`DayluxError`] via
//! `#[from]`. Adapters wrap their library errors in the boxed `source` slots
//! rather than flattening them into strings.

use crate::bulb::BulbId;

/// Boxed error used to carry adapter-specific failures across port boundaries.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Top-level error for the controller.
#[derive(Debug, thiserror::Error)]
pub enum DayluxError {
    #[error("policy error")]
    Policy(#[from] PolicyError),

    #[error("lookup error")]
    Lookup(#[from] LookupError),

    #[error("transport error")]
    Transport(#[from] TransportError),
}

/// A policy document that cannot be interpreted.
///
/// Missing fields are not errors: entries without bulbs and rules without
/// both markers are dropped during compilation. These variants cover values
/// that are present but unusable.
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    #[error("unrecognised time marker {value:?}")]
    InvalidMarker { value: String },

    #[error("brightness {value:?} is not a number")]
    InvalidBrightness { value: String },
}

/// Failure of a solar-time or geolocation lookup.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("lookup service unreachable")]
    Unreachable(#[source] BoxError),

    #[error("lookup service answered with status {status}")]
    Status { status: String },

    #[error("lookup response has a missing or invalid `{field}`")]
    Malformed { field: &'static str },
}

/// Failure of a bulb command.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("bulb {id} is not known to the transport")]
    UnknownBulb { id: BulbId },

    #[error("bulb command failed")]
    Command(#[source] BoxError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_display_invalid_marker() {
        let err = PolicyError::InvalidMarker {
            value: "noon".to_string(),
        };
        assert_eq!(err.to_string(), "unrecognised time marker \"noon\"");
    }

    #[test]
    fn should_display_malformed_lookup_field() {
        let err = LookupError::Malformed { field: "sunrise" };
        assert_eq!(
            err.to_string(),
            "lookup response has a missing or invalid `sunrise`"
        );
    }

    #[test]
    fn should_display_unknown_bulb() {
        let err = TransportError::UnknownBulb {
            id: BulbId::new("0x0000000002dfb19a"),
        };
        assert_eq!(
            err.to_string(),
            "bulb 0x0000000002dfb19a is not known to the transport"
        );
    }

    #[test]
    fn should_convert_lookup_error_into_top_level() {
        let err: DayluxError = LookupError::Status {
            status: "INVALID_DATE".to_string(),
        }
        .into();
        assert!(matches!(err, DayluxError::Lookup(_)));
    }

    #[test]
    fn should_keep_source_of_unreachable_lookup() {
        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "timed out");
        let err = LookupError::Unreachable(Box::new(io));
        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "timed out");
    }
}
