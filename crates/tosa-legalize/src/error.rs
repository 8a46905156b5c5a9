use thiserror::Error;

use crate::spec::DataType;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LegalizeError {
    #[error("{operator}: {message}")]
    Argument {
        operator: &'static str,
        message: String,
    },
    #[error(
        "{operator}: data type {dtype} is not supported; supported types: {}",
        format_types(.supported)
    )]
    UnsupportedType {
        operator: &'static str,
        dtype: DataType,
        supported: Vec<DataType>,
    },
    #[error(
        "{operator}: data type {dtype} is not implemented yet; supported types: {}",
        format_types(.supported)
    )]
    NotYetImplemented {
        operator: &'static str,
        dtype: DataType,
        supported: Vec<DataType>,
    },
    #[error("invalid basic block: {0}")]
    InvalidBlock(String),
}

impl LegalizeError {
    pub fn argument(operator: &'static str, message: impl Into<String>) -> Self {
        LegalizeError::Argument {
            operator,
            message: message.into(),
        }
    }

    pub fn invalid_block(message: impl Into<String>) -> Self {
        LegalizeError::InvalidBlock(message.into())
    }

    pub fn is_argument(&self) -> bool {
        matches!(self, LegalizeError::Argument { .. })
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(
            self,
            LegalizeError::UnsupportedType { .. } | LegalizeError::NotYetImplemented { .. }
        )
    }
}

fn format_types(types: &[DataType]) -> String {
    if types.is_empty() {
        return "none".to_string();
    }
    types
        .iter()
        .map(|dtype| dtype.name())
        .collect::<Vec<_>>()
        .join(", ")
}

pub type LegalizeResult<T> = Result<T, LegalizeError>;
