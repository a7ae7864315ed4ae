//! Execution context consumed by runtime instructions.

use super::operand::Operand;
use crate::compressed::MatrixValue;
use matcomp_core::{Error, MatrixBlock, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Variable storage of the hosting engine.
///
/// Every successful `get_matrix_input` pins the variable until the matching
/// `release_matrix_input`.
pub trait ExecutionContext {
    /// Acquire a matrix input.
    fn get_matrix_input(&mut self, name: &str) -> Result<Arc<MatrixBlock>>;

    /// Value of a scalar operand (literal or variable).
    fn get_scalar_input(&mut self, operand: &Operand) -> Result<f64>;

    /// Release a matrix acquired with `get_matrix_input`.
    fn release_matrix_input(&mut self, name: &str) -> Result<()>;

    /// Publish an instruction result.
    fn set_matrix_output(&mut self, name: &str, value: MatrixValue) -> Result<()>;
}

/// In-memory execution context with pin counting.
#[derive(Debug, Default)]
pub struct LocalExecutionContext {
    matrices: HashMap<String, Arc<MatrixBlock>>,
    scalars: HashMap<String, f64>,
    outputs: HashMap<String, MatrixValue>,
    pins: HashMap<String, usize>,
    acquisitions: usize,
    releases: usize,
}

impl LocalExecutionContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a matrix variable.
    pub fn set_matrix(&mut self, name: impl Into<String>, block: impl Into<Arc<MatrixBlock>>) {
        self.matrices.insert(name.into(), block.into());
    }

    /// Bind a scalar variable.
    pub fn set_scalar(&mut self, name: impl Into<String>, value: f64) {
        self.scalars.insert(name.into(), value);
    }

    /// Published output, if any.
    pub fn output(&self, name: &str) -> Option<&MatrixValue> {
        self.outputs.get(name)
    }

    /// Outstanding pins of a variable.
    pub fn pin_count(&self, name: &str) -> usize {
        self.pins.get(name).copied().unwrap_or(0)
    }

    /// Whether no variable is pinned.
    pub fn all_released(&self) -> bool {
        self.pins.values().all(|&n| n == 0)
    }

    /// Total acquisitions and releases so far.
    pub fn pin_activity(&self) -> (usize, usize) {
        (self.acquisitions, self.releases)
    }
}

impl ExecutionContext for LocalExecutionContext {
    fn get_matrix_input(&mut self, name: &str) -> Result<Arc<MatrixBlock>> {
        let block = self
            .matrices
            .get(name)
            .cloned()
            .ok_or_else(|| Error::VariableNotFound(name.to_string()))?;
        *self.pins.entry(name.to_string()).or_insert(0) += 1;
        self.acquisitions += 1;
        Ok(block)
    }

    fn get_scalar_input(&mut self, operand: &Operand) -> Result<f64> {
        if operand.literal {
            return operand.literal_value();
        }
        self.scalars
            .get(&operand.name)
            .copied()
            .ok_or_else(|| Error::VariableNotFound(operand.name.clone()))
    }

    fn release_matrix_input(&mut self, name: &str) -> Result<()> {
        match self.pins.get_mut(name) {
            Some(n) if *n > 0 => {
                *n -= 1;
                self.releases += 1;
                Ok(())
            }
            _ => Err(Error::instruction(format!(
                "release of '{}' which is not pinned",
                name
            ))),
        }
    }

    fn set_matrix_output(&mut self, name: &str, value: MatrixValue) -> Result<()> {
        self.outputs.insert(name.to_string(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::operand::ValueType;

    #[test]
    fn test_pin_counting() {
        let mut ec = LocalExecutionContext::new();
        ec.set_matrix("X", MatrixBlock::zeros(2, 2));

        ec.get_matrix_input("X").unwrap();
        ec.get_matrix_input("X").unwrap();
        assert_eq!(ec.pin_count("X"), 2);
        ec.release_matrix_input("X").unwrap();
        ec.release_matrix_input("X").unwrap();
        assert!(ec.all_released());
        assert!(ec.release_matrix_input("X").is_err());
        assert_eq!(ec.pin_activity(), (2, 2));
    }

    #[test]
    fn test_missing_variables() {
        let mut ec = LocalExecutionContext::new();
        assert!(matches!(
            ec.get_matrix_input("nope"),
            Err(Error::VariableNotFound(_))
        ));
        assert!(ec
            .get_scalar_input(&Operand::scalar("s", ValueType::Fp64))
            .is_err());
        ec.set_scalar("s", 2.0);
        assert_eq!(
            ec.get_scalar_input(&Operand::scalar("s", ValueType::Fp64))
                .unwrap(),
            2.0
        );
        assert_eq!(ec.get_scalar_input(&Operand::literal(0.5)).unwrap(), 0.5);
    }
}
