mod function;
mod template;

pub use function::{function_names, load_abi, param_source, FunctionCall, ParamSource};
pub use template::{classify_segment, PayloadTemplate, SegmentKind, SELECTOR_LEN, WORD_LEN};

use alloy::{
    dyn_abi::{self, DynSolType},
    hex::{self, FromHexError},
    json_abi::Param,
    primitives::{Address, Bytes},
};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("failed to read ABI file {path}: {source}")]
    AbiRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse ABI json: {0}")]
    AbiParse(#[from] serde_json::Error),

    #[error("address slot {slot} is out of range; input data has {words} full word(s)")]
    AddressSlotOutOfRange { slot: usize, words: usize },

    #[error("failed to encode function arguments: {0}")]
    Encode(#[from] dyn_abi::Error),

    #[error("function '{0}' not found in ABI")]
    FunctionNotFound(String),

    #[error("invalid argument '{value}' for type {ty}: {reason}")]
    InvalidArgument {
        value: String,
        ty: String,
        reason: String,
    },

    #[error("input data is not valid hex: {0}")]
    InvalidHex(#[from] FromHexError),

    #[error("failed to parse function signature '{0}'")]
    InvalidSignature(String),

    #[error("missing argument for parameter '{name}' ({ty})")]
    MissingArgument { name: String, ty: String },

    #[error("no address-shaped argument found in input data")]
    NoAddressSlot,

    #[error("input data is {0} byte(s); a 4-byte function selector is required")]
    TooShort(usize),

    #[error("unsupported parameter type '{0}'")]
    UnsupportedType(String),
}

impl PayloadError {
    pub fn missing_argument(param: &Param, ty: &DynSolType) -> Self {
        Self::MissingArgument {
            name: param.name.to_owned(),
            ty: ty.sol_type_name().into_owned(),
        }
    }

    pub fn invalid_argument(value: impl ToString, ty: &DynSolType, reason: impl ToString) -> Self {
        Self::InvalidArgument {
            value: value.to_string(),
            ty: ty.sol_type_name().into_owned(),
            reason: reason.to_string(),
        }
    }
}

/// How the calldata for each wallet is produced.
#[derive(Clone, Debug)]
pub enum PayloadSpec {
    Function(FunctionCall),
    Template(PayloadTemplate),
}

/// Target contract and payload for every send in a run.
#[derive(Clone, Debug)]
pub struct CallSpec {
    pub to: Address,
    pub payload: PayloadSpec,
}

impl CallSpec {
    pub fn function(to: Address, call: FunctionCall) -> Self {
        Self {
            to,
            payload: PayloadSpec::Function(call),
        }
    }

    pub fn template(to: Address, template: PayloadTemplate) -> Self {
        Self {
            to,
            payload: PayloadSpec::Template(template),
        }
    }

    /// Produces the exact calldata `wallet` should send.
    pub fn resolve(&self, wallet: Address) -> Result<Bytes, PayloadError> {
        match &self.payload {
            PayloadSpec::Function(call) => call.encode(wallet),
            PayloadSpec::Template(template) => Ok(template.substitute(wallet)),
        }
    }

    /// Short human-readable description, used in reports.
    pub fn describe(&self) -> String {
        match &self.payload {
            PayloadSpec::Function(call) => {
                if call.args().is_empty() {
                    call.signature()
                } else {
                    format!("{} [{}]", call.signature(), call.args().join(", "))
                }
            }
            PayloadSpec::Template(template) => hex::encode_prefixed(template.raw()),
        }
    }
}
