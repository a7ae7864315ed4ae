//! Operand references and the descriptor text format.

use matcomp_core::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Separates the fields of an instruction descriptor.
pub const OPERAND_DELIMITER: char = '°';

/// Separates name, data type, value type and literal flag of an operand.
pub const VALUETYPE_DELIMITER: char = '·';

macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// Descriptor text of the tag.
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(Error::instruction(format!(
                        concat!("unknown ", stringify!($name), " '{}'"),
                        other
                    ))),
                }
            }
        }
    };
}

text_enum! {
    /// Where an instruction executes.
    ExecType {
        Cp => "CP",
        Spark => "SPARK",
        Gpu => "GPU",
        Fed => "FED",
    }
}

impl ExecType {
    /// Whether the instruction runs in-process and carries a thread count.
    pub fn runs_in_process(self) -> bool {
        matches!(self, ExecType::Cp | ExecType::Fed)
    }
}

text_enum! {
    /// Shape class of an operand.
    DataType {
        Matrix => "MATRIX",
        Scalar => "SCALAR",
    }
}

text_enum! {
    /// Element type of an operand.
    ValueType {
        Fp64 => "FP64",
        Int64 => "INT64",
        Boolean => "BOOLEAN",
    }
}

/// A named operand of an instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct Operand {
    /// Variable name, or the literal text for literals.
    pub name: String,
    /// Shape class.
    pub data_type: DataType,
    /// Element type.
    pub value_type: ValueType,
    /// Whether `name` is a scalar literal rather than a variable.
    pub literal: bool,
}

impl Operand {
    /// A double matrix variable.
    pub fn matrix(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: DataType::Matrix,
            value_type: ValueType::Fp64,
            literal: false,
        }
    }

    /// A scalar variable.
    pub fn scalar(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            data_type: DataType::Scalar,
            value_type,
            literal: false,
        }
    }

    /// A double scalar literal.
    pub fn literal(value: f64) -> Self {
        Self {
            name: value.to_string(),
            data_type: DataType::Scalar,
            value_type: ValueType::Fp64,
            literal: true,
        }
    }

    /// Same operand under another name.
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }

    /// Whether this operand is a scalar.
    pub fn is_scalar(&self) -> bool {
        self.data_type == DataType::Scalar
    }

    /// Whether this operand is a matrix.
    pub fn is_matrix(&self) -> bool {
        self.data_type == DataType::Matrix
    }

    /// Value of a scalar literal.
    pub fn literal_value(&self) -> Result<f64> {
        if !self.literal {
            return Err(Error::instruction(format!(
                "operand '{}' is not a literal",
                self.name
            )));
        }
        match self.value_type {
            ValueType::Boolean => match self.name.to_ascii_lowercase().as_str() {
                "true" => Ok(1.0),
                "false" => Ok(0.0),
                _ => Err(Error::instruction(format!(
                    "bad boolean literal '{}'",
                    self.name
                ))),
            },
            ValueType::Fp64 | ValueType::Int64 => self.name.parse().map_err(|_| {
                Error::instruction(format!("bad numeric literal '{}'", self.name))
            }),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{d}{}{d}{}",
            self.name,
            self.data_type,
            self.value_type,
            d = VALUETYPE_DELIMITER
        )?;
        if self.literal {
            write!(f, "{}true", VALUETYPE_DELIMITER)?;
        }
        Ok(())
    }
}

impl FromStr for Operand {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(VALUETYPE_DELIMITER).collect();
        let (name, data_type, value_type, literal) = match parts.as_slice() {
            [name, dt, vt] => (*name, dt.parse()?, vt.parse()?, false),
            [name, dt, vt, lit] => {
                let literal = lit.parse::<bool>().map_err(|_| {
                    Error::instruction(format!("bad literal flag '{}' in operand '{}'", lit, s))
                })?;
                (*name, dt.parse()?, vt.parse()?, literal)
            }
            _ => {
                return Err(Error::instruction(format!("malformed operand '{}'", s)));
            }
        };
        if name.is_empty() {
            return Err(Error::instruction(format!("operand '{}' has no name", s)));
        }
        if literal && data_type != DataType::Scalar {
            return Err(Error::instruction(format!(
                "literal operand '{}' must be a scalar",
                s
            )));
        }
        Ok(Self {
            name: name.to_string(),
            data_type,
            value_type,
            literal,
        })
    }
}
