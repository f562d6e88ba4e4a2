use std::path::Path;

use alloy::{
    dyn_abi::{DynSolType, DynSolValue, JsonAbiExt},
    json_abi::{Function, JsonAbi, Param},
    primitives::{Address, Bytes},
};
use tracing::warn;

use super::PayloadError;

/// How a declared function input gets its value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParamSource {
    /// `address`, `address[]` or `address[N]`; filled with the sending wallet.
    Wallet,
    /// Consumes the next operator-supplied argument.
    Argument,
}

/// A named contract function plus the arguments that aren't derived from the wallet.
#[derive(Clone, Debug)]
pub struct FunctionCall {
    function: Function,
    args: Vec<String>,
}

impl FunctionCall {
    pub fn new(function: Function, args: Vec<String>) -> Self {
        Self { function, args }
    }

    /// Parses a human-readable signature, e.g. `mint(address to, uint256 amount)`.
    pub fn from_signature(signature: &str, args: Vec<String>) -> Result<Self, PayloadError> {
        let function = Function::parse(signature)
            .map_err(|_| PayloadError::InvalidSignature(signature.to_owned()))?;
        Ok(Self::new(function, args))
    }

    /// Looks up `name` in `abi`. Overloads resolve to the first declaration.
    pub fn from_abi(abi: &JsonAbi, name: &str, args: Vec<String>) -> Result<Self, PayloadError> {
        let function = abi
            .function(name)
            .and_then(|overloads| overloads.first())
            .ok_or_else(|| PayloadError::FunctionNotFound(name.to_owned()))?;
        Ok(Self::new(function.to_owned(), args))
    }

    pub fn function(&self) -> &Function {
        &self.function
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn signature(&self) -> String {
        self.function.signature()
    }

    /// Inputs that must be supplied by the operator, in declaration order.
    pub fn argument_params(function: &Function) -> Result<Vec<&Param>, PayloadError> {
        let mut params = vec![];
        for param in &function.inputs {
            if param_source(param)? == ParamSource::Argument {
                params.push(param);
            }
        }
        Ok(params)
    }

    /// ABI-encodes the call with every address input set to `wallet`.
    pub fn encode(&self, wallet: Address) -> Result<Bytes, PayloadError> {
        let mut args = self.args.iter();
        let mut values = Vec::with_capacity(self.function.inputs.len());
        for param in &self.function.inputs {
            let ty = param_type(param)?;
            let value = match &ty {
                DynSolType::Address => DynSolValue::Address(wallet),
                DynSolType::Array(inner) if **inner == DynSolType::Address => {
                    DynSolValue::Array(vec![DynSolValue::Address(wallet)])
                }
                DynSolType::FixedArray(inner, len) if **inner == DynSolType::Address => {
                    DynSolValue::FixedArray(vec![DynSolValue::Address(wallet); *len])
                }
                _ => {
                    let arg = args
                        .next()
                        .ok_or_else(|| PayloadError::missing_argument(param, &ty))?;
                    ty.coerce_str(arg)
                        .map_err(|e| PayloadError::invalid_argument(arg, &ty, e))?
                }
            };
            values.push(value);
        }

        let unused = args.count();
        if unused > 0 {
            warn!(
                "{unused} unused argument(s) supplied for {}",
                self.signature()
            );
        }

        let input = self.function.abi_encode_input(&values)?;
        Ok(input.into())
    }
}

fn param_type(param: &Param) -> Result<DynSolType, PayloadError> {
    let mut ty = String::new();
    param.full_selector_type_raw(&mut ty);
    DynSolType::parse(&ty).map_err(|_| PayloadError::UnsupportedType(ty))
}

pub fn param_source(param: &Param) -> Result<ParamSource, PayloadError> {
    Ok(match param_type(param)? {
        DynSolType::Address => ParamSource::Wallet,
        DynSolType::Array(inner) | DynSolType::FixedArray(inner, _)
            if *inner == DynSolType::Address =>
        {
            ParamSource::Wallet
        }
        _ => ParamSource::Argument,
    })
}

/// Reads a JSON ABI (an array of function/event/error items).
pub fn load_abi(path: impl AsRef<Path>) -> Result<JsonAbi, PayloadError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|source| PayloadError::AbiRead {
        path: path.to_owned(),
        source,
    })?;
    Ok(serde_json::from_str(&contents)?)
}

/// Callable function names in `abi`, sorted and deduplicated.
pub fn function_names(abi: &JsonAbi) -> Vec<String> {
    let mut names: Vec<String> = abi.functions().map(|f| f.name.to_owned()).collect();
    names.sort();
    names.dedup();
    names
}
