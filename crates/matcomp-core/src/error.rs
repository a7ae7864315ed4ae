//! Error types for matrix compression.

use thiserror::Error;

/// Result type alias for compression operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Compression error types.
#[derive(Debug, Error)]
pub enum Error {
    /// Reader constructed over an empty column selection.
    #[error("empty column selection: a reader needs at least one column")]
    EmptyColumnSelection,

    /// Column index outside the block's column range.
    #[error("column index {index} out of range for {num_cols} columns")]
    ColumnOutOfRange { index: usize, num_cols: usize },

    /// Duplicate column in a column index set.
    #[error("duplicate column index {0} in column selection")]
    DuplicateColumn(usize),

    /// Row range that does not fit the block.
    #[error("invalid row range [{low}, {high}) for {num_rows} rows")]
    InvalidRowRange {
        low: usize,
        high: usize,
        num_rows: usize,
    },

    /// Scale-factor vector whose length is neither 1 nor the row count.
    #[error("scale factor vector has {actual} entries, expected 1 or {num_rows}")]
    ScaleFactorLength { actual: usize, num_rows: usize },

    /// Matrix payload inconsistent with its declared shape.
    #[error("invalid matrix shape: {0}")]
    InvalidShape(String),

    /// Workload tree rejected at construction.
    #[error("malformed workload tree: {0}")]
    MalformedWorkload(String),

    /// Registry ran out of keys.
    #[error("registry key space exhausted after {0} registrations")]
    RegistryExhausted(u32),

    /// Registry key that was never registered.
    #[error("no artifact registered under key {0}")]
    UnknownRegistryKey(u32),

    /// Instruction text that cannot be parsed.
    #[error("malformed instruction: {0}")]
    MalformedInstruction(String),

    /// Named variable missing from the execution context.
    #[error("variable not found: {0}")]
    VariableNotFound(String),

    /// Encoder could not represent a column group.
    #[error("encoder failure for columns {columns:?}: {message}")]
    EncoderFailure {
        columns: Vec<u32>,
        message: String,
    },

    /// Settings outside their valid range.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// Failure of a compression instruction, naming opcode and operands.
    #[error("instruction {opcode} [{}] failed: {source}", operands.join(", "))]
    Instruction {
        opcode: String,
        operands: Vec<String>,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create an invalid shape error.
    pub fn shape(message: impl Into<String>) -> Self {
        Error::InvalidShape(message.into())
    }

    /// Create a malformed workload error.
    pub fn workload(message: impl Into<String>) -> Self {
        Error::MalformedWorkload(message.into())
    }

    /// Create a malformed instruction error.
    pub fn instruction(message: impl Into<String>) -> Self {
        Error::MalformedInstruction(message.into())
    }

    /// Create an encoder failure for a set of columns.
    pub fn encoder(columns: &[u32], message: impl Into<String>) -> Self {
        Error::EncoderFailure {
            columns: columns.to_vec(),
            message: message.into(),
        }
    }

    /// Wrap an error with the instruction that was executing.
    pub fn in_instruction(self, opcode: impl Into<String>, operands: Vec<String>) -> Self {
        Error::Instruction {
            opcode: opcode.into(),
            operands,
            source: Box::new(self),
        }
    }

    /// Check if error comes from bad configuration rather than runtime state.
    pub fn is_configuration(&self) -> bool {
        match self {
            Error::Instruction { source, .. } => source.is_configuration(),
            Error::EmptyColumnSelection
            | Error::ColumnOutOfRange { .. }
            | Error::DuplicateColumn(_)
            | Error::InvalidRowRange { .. }
            | Error::ScaleFactorLength { .. }
            | Error::InvalidShape(_)
            | Error::MalformedWorkload(_)
            | Error::MalformedInstruction(_)
            | Error::InvalidSettings(_) => true,
            _ => false,
        }
    }

    /// Check if error is the execution context failing to supply a variable.
    pub fn is_resource(&self) -> bool {
        matches!(self, Error::VariableNotFound(_))
    }

    /// Get error category for diagnostics.
    pub fn category(&self) -> &'static str {
        match self {
            Error::EmptyColumnSelection => "empty_column_selection",
            Error::ColumnOutOfRange { .. } => "column_out_of_range",
            Error::DuplicateColumn(_) => "duplicate_column",
            Error::InvalidRowRange { .. } => "invalid_row_range",
            Error::ScaleFactorLength { .. } => "scale_factor_length",
            Error::InvalidShape(_) => "invalid_shape",
            Error::MalformedWorkload(_) => "malformed_workload",
            Error::RegistryExhausted(_) => "registry_exhausted",
            Error::UnknownRegistryKey(_) => "unknown_registry_key",
            Error::MalformedInstruction(_) => "malformed_instruction",
            Error::VariableNotFound(_) => "variable_not_found",
            Error::EncoderFailure { .. } => "encoder_failure",
            Error::InvalidSettings(_) => "invalid_settings",
            Error::Instruction { .. } => "instruction",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instruction_error_names_opcode_and_operands() {
        let err = Error::ScaleFactorLength {
            actual: 3,
            num_rows: 4,
        }
        .in_instruction("floor_compress", vec!["X".into(), "S".into(), "Y".into()]);

        let msg = err.to_string();
        assert!(msg.contains("floor_compress"));
        assert!(msg.contains("X, S, Y"));
        assert!(msg.contains("3 entries"));
        assert!(err.is_configuration());
        assert_eq!(err.category(), "instruction");
    }

    #[test]
    fn test_runtime_errors_are_not_configuration() {
        assert!(!Error::VariableNotFound("X".into()).is_configuration());
        assert!(!Error::encoder(&[0, 1], "too many tuples").is_configuration());
        assert!(Error::EmptyColumnSelection.is_configuration());
    }

    #[test]
    fn test_resource_errors() {
        assert!(Error::VariableNotFound("X".into()).is_resource());
        assert!(!Error::UnknownRegistryKey(3).is_resource());
        assert!(!Error::VariableNotFound("X".into())
            .in_instruction("floor_compress", vec![])
            .is_resource());
    }
}
