//! Runtime quantized compression instruction.

use super::context::ExecutionContext;
use super::lop::OPCODE;
use super::operand::{DataType, ExecType, Operand, OPERAND_DELIMITER};
use super::InstructionType;
use crate::compressed::MatrixValue;
use crate::factory::{CompressedMatrixFactory, QuantizationOperand};
use crate::registry::{RegistryKey, WorkloadRegistry};
use crate::workload::WorkloadTree;
use matcomp_core::{CompressionStatistics, Error, Result};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Parsed `floor_compress` instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantizedCompressionInstruction {
    exec_type: ExecType,
    input1: Operand,
    input2: Operand,
    output: Operand,
    registry_key: RegistryKey,
    threads: usize,
    text: String,
}

impl QuantizedCompressionInstruction {
    /// Parse an instruction descriptor.
    ///
    /// In-process targets carry a trailing thread count; the registry key
    /// sits before it and is present only when non-zero.
    pub fn parse(text: &str) -> Result<Self> {
        let fields: Vec<&str> = text.split(OPERAND_DELIMITER).collect();
        if fields.len() < 5 {
            return Err(Error::instruction(format!(
                "expected at least 5 fields, got {} in '{}'",
                fields.len(),
                text
            )));
        }

        let exec_type: ExecType = fields[0].parse()?;
        if fields[1] != OPCODE {
            return Err(Error::instruction(format!(
                "unexpected opcode '{}', expected '{}'",
                fields[1], OPCODE
            )));
        }
        let input1: Operand = fields[2].parse()?;
        let input2: Operand = fields[3].parse()?;
        let output: Operand = fields[4].parse()?;

        let (registry_key, threads) = match (exec_type.runs_in_process(), &fields[5..]) {
            (true, [threads]) => (RegistryKey::NONE, parse_threads(threads)?),
            (true, [key, threads]) => (parse_key(key)?, parse_threads(threads)?),
            (false, []) => (RegistryKey::NONE, 0),
            (false, [key]) => (parse_key(key)?, 0),
            (_, trailing) => {
                return Err(Error::instruction(format!(
                    "{} trailing fields are invalid for exec type {}",
                    trailing.len(),
                    exec_type
                )));
            }
        };

        if !input1.is_matrix() || input1.literal {
            return Err(Error::instruction(format!(
                "first input '{}' must be a matrix variable",
                input1.name
            )));
        }
        if input2.is_matrix() && input2.literal {
            return Err(Error::instruction(format!(
                "second input '{}' cannot be a matrix literal",
                input2.name
            )));
        }
        if !output.is_matrix() || output.literal {
            return Err(Error::instruction(format!(
                "output '{}' must be a matrix variable",
                output.name
            )));
        }

        Ok(Self {
            exec_type,
            input1,
            input2,
            output,
            registry_key,
            threads,
            text: text.to_string(),
        })
    }

    /// Instruction family.
    pub fn instruction_type(&self) -> InstructionType {
        InstructionType::QuantizeCompression
    }

    /// Execution target.
    pub fn exec_type(&self) -> ExecType {
        self.exec_type
    }

    /// Matrix to compress.
    pub fn input1(&self) -> &Operand {
        &self.input1
    }

    /// Quantization scale factors.
    pub fn input2(&self) -> &Operand {
        &self.input2
    }

    /// Output variable.
    pub fn output(&self) -> &Operand {
        &self.output
    }

    /// Workload registry key.
    pub fn registry_key(&self) -> RegistryKey {
        self.registry_key
    }

    /// Requested threads (0 = factory default).
    pub fn threads(&self) -> usize {
        self.threads
    }

    fn operand_names(&self) -> Vec<String> {
        vec![
            self.input1.name.clone(),
            self.input2.name.clone(),
            self.output.name.clone(),
        ]
    }

    /// Execute against an execution context.
    ///
    /// Every input acquired from `ec` is released exactly once, whether
    /// compression succeeds or fails. Missing variables are returned as the
    /// context reported them; every other error names this instruction. The workload entry stays in the
    /// registry so the instruction can run again.
    pub fn process<E: ExecutionContext + ?Sized>(
        &self,
        ec: &mut E,
        registry: &WorkloadRegistry,
        factory: &CompressedMatrixFactory,
    ) -> Result<CompressionStatistics> {
        self.execute(ec, registry, factory).map_err(|e| {
            if e.is_resource() {
                e
            } else {
                e.in_instruction(OPCODE, self.operand_names())
            }
        })
    }

    fn execute<E: ExecutionContext + ?Sized>(
        &self,
        ec: &mut E,
        registry: &WorkloadRegistry,
        factory: &CompressedMatrixFactory,
    ) -> Result<CompressionStatistics> {
        let workload = self.lookup_workload(registry)?;

        let mut acquired: Vec<&str> = Vec::with_capacity(2);
        let compressed = self.compress_inputs(ec, &mut acquired, workload.as_deref(), factory);
        let released = release_all(ec, &acquired);
        let (value, stats) = compressed?;
        released?;

        info!("Compression output class: {}", value.kind_name());
        ec.set_matrix_output(&self.output.name, value)?;
        Ok(stats)
    }

    fn lookup_workload(&self, registry: &WorkloadRegistry) -> Result<Option<Arc<WorkloadTree>>> {
        if self.registry_key.is_none() {
            return Ok(None);
        }
        registry
            .lookup(self.registry_key)
            .map(Some)
            .ok_or(Error::UnknownRegistryKey(self.registry_key.0))
    }

    fn compress_inputs<'s, E: ExecutionContext + ?Sized>(
        &'s self,
        ec: &mut E,
        acquired: &mut Vec<&'s str>,
        workload: Option<&WorkloadTree>,
        factory: &CompressedMatrixFactory,
    ) -> Result<(MatrixValue, CompressionStatistics)> {
        let input = ec.get_matrix_input(&self.input1.name)?;
        acquired.push(&self.input1.name);

        let quant = match self.input2.data_type {
            DataType::Scalar => QuantizationOperand::Scalar(ec.get_scalar_input(&self.input2)?),
            DataType::Matrix => {
                let scales = ec.get_matrix_input(&self.input2.name)?;
                acquired.push(&self.input2.name);
                QuantizationOperand::Matrix(scales)
            }
        };
        debug!(
            "Compressing '{}' ({}x{}) with {} threads",
            self.input1.name,
            input.rows(),
            input.cols(),
            self.threads
        );
        factory.compress(&input, Some(&quant), self.threads, workload)
    }
}

/// Release every name, reporting the first failure.
fn release_all<E: ExecutionContext + ?Sized>(ec: &mut E, names: &[&str]) -> Result<()> {
    let mut first = None;
    for name in names {
        if let Err(e) = ec.release_matrix_input(name) {
            first.get_or_insert(e);
        }
    }
    first.map_or(Ok(()), Err)
}

fn parse_key(field: &str) -> Result<RegistryKey> {
    match field.parse::<u32>() {
        Ok(0) => Err(Error::instruction("registry key 0 must be omitted")),
        Ok(key) => Ok(RegistryKey(key)),
        Err(_) => Err(Error::instruction(format!("bad registry key '{}'", field))),
    }
}

fn parse_threads(field: &str) -> Result<usize> {
    field
        .parse()
        .map_err(|_| Error::instruction(format!("bad thread count '{}'", field)))
}

impl fmt::Display for QuantizedCompressionInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
