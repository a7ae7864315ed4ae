//! Instruction bridge between the compiler and the compression factory.
//!
//! ```text
//!  compile time                              run time
//!  ────────────                              ────────
//!  WorkloadTree ──register──► registry ◄──lookup── QuantizedCompressionInstruction
//!                                 │                         ▲
//!  FlooredCompressionLop ── key ──┘                         │ parse
//!         │                                                 │
//!         └──────────────── descriptor text ────────────────┘
//! ```
//!
//! A descriptor looks like
//! `CP°floor_compress°X·MATRIX·FP64°0.5·SCALAR·FP64·true°Y·MATRIX·FP64°3°8`:
//! exec type, opcode, two inputs, output, the registry key when non-zero and
//! the thread count for in-process exec types.

mod context;
mod cp;
mod lop;
mod operand;

pub use context::{ExecutionContext, LocalExecutionContext};
pub use cp::QuantizedCompressionInstruction;
pub use lop::{FlooredCompressionLop, FunctionCallProducer, Producer, VariableProducer, OPCODE};
pub use operand::{DataType, ExecType, Operand, ValueType, OPERAND_DELIMITER, VALUETYPE_DELIMITER};

use std::fmt;

/// Family of a runtime instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstructionType {
    /// Plain compression.
    Compression,
    /// Decompression of a compressed block.
    DeCompression,
    /// Compression of quantized values.
    QuantizeCompression,
}

impl fmt::Display for InstructionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InstructionType::Compression => "Compression",
            InstructionType::DeCompression => "DeCompression",
            InstructionType::QuantizeCompression => "QuantizeCompression",
        };
        f.write_str(name)
    }
}
