//! Compile-time emission of compression instructions.

use super::operand::{ExecType, Operand, OPERAND_DELIMITER};
use crate::registry::RegistryKey;
use std::fmt;
use std::sync::Arc;

/// Opcode of the quantized compression instruction.
pub const OPCODE: &str = "floor_compress";

/// A compiled operation whose output feeds another instruction.
pub trait Producer: fmt::Debug + Send + Sync {
    /// Label of the produced variable.
    fn output_label(&self) -> &str;

    /// Label consumers must read instead of the usual operand, when the
    /// producer's real output lives under another name.
    fn redirected_output(&self) -> Option<&str> {
        None
    }
}

/// Any producer that writes its result to a plain variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableProducer {
    label: String,
}

impl VariableProducer {
    /// Producer of `label`.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

impl Producer for VariableProducer {
    fn output_label(&self) -> &str {
        &self.label
    }
}

/// Call of a builtin or user function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionCallProducer {
    function: String,
    outputs: Vec<String>,
}

impl FunctionCallProducer {
    /// Builtin whose outputs are bound to variables by the call itself.
    pub const TRANSFORM_ENCODE: &'static str = "transformencode";

    /// Call of `function` binding `outputs`.
    pub fn new(function: impl Into<String>, outputs: Vec<String>) -> Self {
        Self {
            function: function.into(),
            outputs,
        }
    }

    /// Called function name.
    pub fn function(&self) -> &str {
        &self.function
    }
}

impl Producer for FunctionCallProducer {
    fn output_label(&self) -> &str {
        self.outputs.first().map(String::as_str).unwrap_or_default()
    }

    fn redirected_output(&self) -> Option<&str> {
        if self.function.eq_ignore_ascii_case(Self::TRANSFORM_ENCODE) {
            self.outputs.first().map(String::as_str)
        } else {
            None
        }
    }
}

/// Compile-time node of a floored (quantized) compression.
#[derive(Debug, Clone)]
pub struct FlooredCompressionLop {
    input: Arc<dyn Producer>,
    exec_type: ExecType,
    registry_key: RegistryKey,
    threads: usize,
}

impl FlooredCompressionLop {
    /// Create the node.
    ///
    /// # Arguments
    /// * `input` - Producer of the matrix to compress
    /// * `exec_type` - Execution target
    /// * `registry_key` - Key of the site's workload tree, or [`RegistryKey::NONE`]
    /// * `threads` - Thread count for in-process targets
    pub fn new(
        input: Arc<dyn Producer>,
        exec_type: ExecType,
        registry_key: RegistryKey,
        threads: usize,
    ) -> Self {
        Self {
            input,
            exec_type,
            registry_key,
            threads,
        }
    }

    /// Execution target.
    pub fn exec_type(&self) -> ExecType {
        self.exec_type
    }

    /// Registry key of the workload tree.
    pub fn registry_key(&self) -> RegistryKey {
        self.registry_key
    }

    /// Emit the instruction descriptor.
    ///
    /// When the input producer redirects its output, the redirected label
    /// replaces the names of both `input1` and `output`.
    pub fn instructions(&self, input1: &Operand, input2: &Operand, output: &Operand) -> String {
        let (input1, output) = match self.input.redirected_output() {
            Some(label) => (input1.renamed(label), output.renamed(label)),
            None => (input1.clone(), output.clone()),
        };

        let mut fields = vec![
            self.exec_type.to_string(),
            OPCODE.to_string(),
            input1.to_string(),
            input2.to_string(),
            output.to_string(),
        ];
        if !self.registry_key.is_none() {
            fields.push(self.registry_key.to_string());
        }
        if self.exec_type.runs_in_process() {
            fields.push(self.threads.to_string());
        }
        fields.join(&*OPERAND_DELIMITER.encode_utf8(&mut [0; 4]))
    }
}

impl fmt::Display for FlooredCompressionLop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(OPCODE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lop(producer: Arc<dyn Producer>, exec: ExecType, key: u32) -> FlooredCompressionLop {
        FlooredCompressionLop::new(producer, exec, RegistryKey(key), 8)
    }

    #[test]
    fn test_emit_cp_with_key() {
        let lop = lop(Arc::new(VariableProducer::new("X")), ExecType::Cp, 3);
        let text = lop.instructions(
            &Operand::matrix("X"),
            &Operand::literal(0.5),
            &Operand::matrix("Y"),
        );
        assert_eq!(
            text,
            "CP°floor_compress°X·MATRIX·FP64°0.5·SCALAR·FP64·true°Y·MATRIX·FP64°3°8"
        );
    }

    #[test]
    fn test_emit_omits_zero_key_and_remote_threads() {
        let producer: Arc<dyn Producer> = Arc::new(VariableProducer::new("X"));
        let args = (
            Operand::matrix("X"),
            Operand::matrix("S"),
            Operand::matrix("Y"),
        );

        let cp = lop(producer.clone(), ExecType::Cp, 0).instructions(&args.0, &args.1, &args.2);
        assert_eq!(cp.split(OPERAND_DELIMITER).count(), 6);
        assert!(cp.ends_with("°8"));

        let spark = lop(producer.clone(), ExecType::Spark, 0).instructions(&args.0, &args.1, &args.2);
        assert_eq!(spark.split(OPERAND_DELIMITER).count(), 5);

        let spark = lop(producer, ExecType::Spark, 4).instructions(&args.0, &args.1, &args.2);
        assert!(spark.ends_with("°4"));
    }

    #[test]
    fn test_transformencode_redirects() {
        let call = FunctionCallProducer::new("TransformEncode", vec!["enc_out".into(), "meta".into()]);
        assert_eq!(call.redirected_output(), Some("enc_out"));
        let text = lop(Arc::new(call), ExecType::Cp, 0).instructions(
            &Operand::matrix("_mVar1"),
            &Operand::literal(1.0),
            &Operand::matrix("_mVar2"),
        );
        let fields: Vec<&str> = text.split(OPERAND_DELIMITER).collect();
        assert_eq!(fields[2], "enc_out·MATRIX·FP64");
        assert_eq!(fields[4], "enc_out·MATRIX·FP64");
    }

    #[test]
    fn test_other_calls_do_not_redirect() {
        let call = FunctionCallProducer::new("scale", vec!["out".into()]);
        assert_eq!(call.redirected_output(), None);
        assert_eq!(call.output_label(), "out");
        assert_eq!(VariableProducer::new("X").redirected_output(), None);
    }
}
