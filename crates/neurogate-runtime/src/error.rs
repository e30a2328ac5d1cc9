//! Error types for the simulation runtime

use thiserror::Error;

/// Result type for runtime operations
pub type Result<T> = std::result::Result<T, RuntimeError>;

/// Status code reported to callers for any failed command
pub const STATUS_ERROR: i32 = -1;

/// Status code reported to callers for a successful command
pub const STATUS_OK: i32 = 0;

/// Errors that can occur in the simulation runtime
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuntimeError {
    /// Operation issued before `init` or after teardown
    #[error("Runtime not initialized")]
    NotInitialized,

    /// Operation issued after the shutdown command
    #[error("Runtime not running")]
    NotRunning,

    /// Neuron lookup miss
    #[error("Neuron {neuron_id} not found")]
    NeuronNotFound {
        /// Neuron ID that was not found
        neuron_id: u32,
    },

    /// Synapse lookup miss
    #[error("Synapse {synapse_id} not found")]
    SynapseNotFound {
        /// Synapse ID that was not found
        synapse_id: u32,
    },

    /// Neuron creation with an id that is already live
    #[error("Neuron {neuron_id} already exists")]
    DuplicateNeuron {
        /// Duplicate neuron ID
        neuron_id: u32,
    },

    /// Synapse creation with an id that is already live
    #[error("Synapse {synapse_id} already exists")]
    DuplicateSynapse {
        /// Duplicate synapse ID
        synapse_id: u32,
    },

    /// Required command parameter absent
    #[error("Missing parameter {parameter} for {command}")]
    MissingParameter {
        /// Command name
        command: String,
        /// Parameter name
        parameter: String,
    },

    /// Invalid parameter value
    #[error("Invalid parameter {parameter}: {value} (expected {constraint})")]
    InvalidParameter {
        /// Parameter name
        parameter: String,
        /// Invalid value
        value: String,
        /// Constraint description
        constraint: String,
    },

    /// Growth or allocation could not be satisfied
    #[error("Resource exhausted: {resource} (requested {requested} bytes)")]
    CapacityExhausted {
        /// Resource name
        resource: String,
        /// Requested size in bytes
        requested: usize,
    },

    /// Zero-byte allocation request
    #[error("Refusing to allocate zero bytes")]
    ZeroSizeAllocation,

    /// Arena tag or generation mismatch on release
    #[error("Corrupted or stale arena block {index}:{generation}")]
    Corruption {
        /// Slot index of the offending handle
        index: u32,
        /// Generation carried by the offending handle
        generation: u32,
    },

    /// Malformed binary frame
    #[error("Invalid frame: {reason}")]
    InvalidFrame {
        /// Reason the frame was rejected
        reason: String,
    },

    /// Frame checksum did not match its contents
    #[error("Checksum verification failed: expected {expected:08x}, computed {computed:08x}")]
    ChecksumMismatch {
        /// Checksum carried by the frame
        expected: u32,
        /// Checksum computed over the frame
        computed: u32,
    },
}

impl RuntimeError {
    /// Create a missing parameter error
    pub fn missing_parameter(command: impl Into<String>, parameter: impl Into<String>) -> Self {
        Self::MissingParameter {
            command: command.into(),
            parameter: parameter.into(),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(
        parameter: impl Into<String>,
        value: impl Into<String>,
        constraint: impl Into<String>,
    ) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            value: value.into(),
            constraint: constraint.into(),
        }
    }

    /// Create a capacity exhaustion error
    pub fn capacity_exhausted(resource: impl Into<String>, requested: usize) -> Self {
        Self::CapacityExhausted {
            resource: resource.into(),
            requested,
        }
    }

    /// Create an invalid frame error
    pub fn invalid_frame(reason: impl Into<String>) -> Self {
        Self::InvalidFrame {
            reason: reason.into(),
        }
    }

    /// Status code surfaced to the caller
    pub fn status(&self) -> i32 {
        STATUS_ERROR
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = RuntimeError::missing_parameter("create_neuron", "id");
        assert!(matches!(err, RuntimeError::MissingParameter { .. }));

        let err = RuntimeError::invalid_parameter("parameter", "9", "1..=4");
        assert!(matches!(err, RuntimeError::InvalidParameter { .. }));
    }

    #[test]
    fn test_error_display() {
        let err = RuntimeError::NeuronNotFound { neuron_id: 42 };
        assert!(err.to_string().contains("Neuron 42 not found"));

        let err = RuntimeError::ChecksumMismatch {
            expected: 0xdead_beef,
            computed: 1,
        };
        assert!(err.to_string().contains("deadbeef"));
    }

    #[test]
    fn test_all_failures_share_status() {
        assert_eq!(RuntimeError::NotInitialized.status(), STATUS_ERROR);
        assert_eq!(RuntimeError::ZeroSizeAllocation.status(), STATUS_ERROR);
        assert!(STATUS_ERROR < STATUS_OK);
    }
}
