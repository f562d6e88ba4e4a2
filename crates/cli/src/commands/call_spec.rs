//! Turns run arguments (or operator answers) into a [`CallSpec`].

use alloy::{json_abi::Function, primitives::Address};
use batchcall_core::payload::{
    function_names, load_abi, CallSpec, FunctionCall, PayloadError, PayloadTemplate, SegmentKind,
};
use nu_ansi_term::Color;

use super::error::ArgsError;
use crate::{
    config::RunConfig,
    error::CliError,
    util::{bold, prompt_cli, prompt_continue, prompt_select},
};

/// Where the calldata comes from.
#[derive(Clone, Debug, PartialEq)]
pub enum CallSource {
    Signature(String),
    Abi(std::path::PathBuf),
    InputData(String),
}

impl CallSource {
    pub fn from_config(config: &RunConfig) -> Result<Option<Self>, ArgsError> {
        let sources = [
            config.signature.to_owned().map(CallSource::Signature),
            config.abi.to_owned().map(CallSource::Abi),
            config.input_data.to_owned().map(CallSource::InputData),
        ];
        let mut sources = sources.into_iter().flatten();
        let source = sources.next();
        if sources.next().is_some() {
            return Err(ArgsError::CallSourceConflict);
        }
        if config.function.is_some() && !matches!(source, Some(CallSource::Abi(_))) {
            return Err(ArgsError::MissingValue {
                flag: "--function",
                required: "--abi",
            });
        }
        Ok(source)
    }

    fn prompt() -> std::io::Result<Self> {
        let options = [
            "JSON ABI file".to_owned(),
            "function signature, e.g. mint(address,uint256)".to_owned(),
            "raw input data (0x...)".to_owned(),
        ];
        Ok(
            match prompt_select("How do you want to describe the call?", &options)? {
                0 => CallSource::Abi(prompt_cli("Path to the ABI file:")?.into()),
                1 => CallSource::Signature(prompt_cli("Function signature:")?),
                _ => CallSource::InputData(prompt_cli("Input data:")?),
            },
        )
    }
}

pub fn resolve_call_spec(
    config: &RunConfig,
    contract: Address,
    assume_yes: bool,
) -> Result<CallSpec, CliError> {
    let source = match CallSource::from_config(config)? {
        Some(source) => source,
        None if assume_yes => {
            return Err(ArgsError::MissingValue {
                flag: "--yes",
                required: "--signature, --abi or --input-data",
            }
            .into())
        }
        None => CallSource::prompt()?,
    };

    let spec = match source {
        CallSource::Signature(signature) => {
            let function = FunctionCall::from_signature(&signature, vec![])?
                .function()
                .to_owned();
            let args = collect_args(&function, config.args.to_owned(), assume_yes)?;
            CallSpec::function(contract, FunctionCall::new(function, args))
        }
        CallSource::Abi(path) => {
            let abi = load_abi(&path)?;
            let name = match &config.function {
                Some(name) => name.to_owned(),
                None => {
                    let names = function_names(&abi);
                    if names.is_empty() {
                        return Err(ArgsError::NoFunctions.into());
                    }
                    if assume_yes {
                        return Err(ArgsError::MissingValue {
                            flag: "--yes",
                            required: "--function",
                        }
                        .into());
                    }
                    let choice = prompt_select("Select a function:", &names)?;
                    names[choice].to_owned()
                }
            };
            let function = FunctionCall::from_abi(&abi, &name, vec![])?
                .function()
                .to_owned();
            let args = collect_args(&function, config.args.to_owned(), assume_yes)?;
            CallSpec::function(contract, FunctionCall::new(function, args))
        }
        CallSource::InputData(input) => {
            let mut template = PayloadTemplate::parse(&input)?;
            if let Some(slot) = config.address_slot {
                template = template.with_address_slot(slot)?;
            }
            print_template_preview(&template);
            if !assume_yes && !prompt_continue(Some("Use this input data? [y/N]"))? {
                return Err(ArgsError::Aborted.into());
            }
            CallSpec::template(contract, template)
        }
    };

    // fail on bad arguments now rather than once per wallet
    spec.resolve(Address::ZERO)?;
    Ok(spec)
}

/// Uses `args` when given, otherwise asks for every parameter that isn't filled from the wallet.
fn collect_args(
    function: &Function,
    args: Option<Vec<String>>,
    assume_yes: bool,
) -> Result<Vec<String>, CliError> {
    let params = FunctionCall::argument_params(function)?;
    if let Some(args) = args {
        return Ok(args);
    }
    if params.is_empty() {
        return Ok(vec![]);
    }
    if assume_yes {
        let param = params[0];
        return Err(PayloadError::MissingArgument {
            name: param.name.to_owned(),
            ty: param.ty.to_owned(),
        }
        .into());
    }

    println!(
        "{} takes {} argument(s); address parameters are set to each wallet's address.",
        bold(function.signature()),
        params.len()
    );
    let mut args = Vec::with_capacity(params.len());
    for param in params {
        let name = if param.name.is_empty() {
            "arg"
        } else {
            param.name.as_str()
        };
        args.push(prompt_cli(format!("{name} ({}):", param.ty))?);
    }
    Ok(args)
}

pub fn print_template_preview(template: &PayloadTemplate) {
    println!("{}", bold("Input data"));
    println!("  selector  {}", template.selector());
    for (i, (segment, kind)) in template
        .segments()
        .zip(template.classify())
        .enumerate()
    {
        let line = format!(
            "  word {i:<4} {}  {kind}",
            alloy::hex::encode_prefixed(segment)
        );
        if i == template.address_slot() {
            println!("{}", Color::Green.paint(format!("{line}  <- wallet address")));
        } else {
            println!("{line}");
        }
    }
    if !matches!(
        template.classify().get(template.address_slot()),
        Some(SegmentKind::Address(_))
    ) {
        println!(
            "{}",
            Color::Yellow.paint("warning: the selected word does not look like an address")
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RunConfig {
        RunConfig::default()
    }

    #[test]
    fn only_one_call_source_allowed() {
        let cfg = RunConfig {
            signature: Some("mint(address)".to_owned()),
            input_data: Some("0xabcdef12".to_owned()),
            ..config()
        };
        assert!(matches!(
            CallSource::from_config(&cfg),
            Err(ArgsError::CallSourceConflict)
        ));
        assert_eq!(CallSource::from_config(&config()).unwrap(), None);
    }

    #[test]
    fn function_requires_abi() {
        let cfg = RunConfig {
            signature: Some("mint(address)".to_owned()),
            function: Some("mint".to_owned()),
            ..config()
        };
        assert!(matches!(
            CallSource::from_config(&cfg),
            Err(ArgsError::MissingValue { .. })
        ));
    }

    #[test]
    fn signature_with_args_needs_no_prompt() {
        let cfg = RunConfig {
            signature: Some("transfer(address,uint256)".to_owned()),
            args: Some(vec!["1000".to_owned()]),
            ..config()
        };
        let spec = resolve_call_spec(&cfg, Address::repeat_byte(0x42), true).unwrap();
        assert_eq!(spec.to, Address::repeat_byte(0x42));
        assert_eq!(spec.describe(), "transfer(address,uint256) [1000]");
    }

    #[test]
    fn non_interactive_run_reports_missing_argument() {
        let cfg = RunConfig {
            signature: Some("transfer(address,uint256)".to_owned()),
            ..config()
        };
        assert!(matches!(
            resolve_call_spec(&cfg, Address::ZERO, true),
            Err(CliError::Payload(PayloadError::MissingArgument { .. }))
        ));
    }

    #[test]
    fn bad_argument_is_caught_before_dispatch() {
        let cfg = RunConfig {
            signature: Some("transfer(address,uint256)".to_owned()),
            args: Some(vec!["lots".to_owned()]),
            ..config()
        };
        assert!(matches!(
            resolve_call_spec(&cfg, Address::ZERO, true),
            Err(CliError::Payload(PayloadError::InvalidArgument { .. }))
        ));
    }

    #[test]
    fn input_data_with_yes_skips_confirmation() {
        let cfg = RunConfig {
            input_data: Some(format!(
                "0xabcdef12{:0>64}",
                "2222222222222222222222222222222222222222"
            )),
            ..config()
        };
        let spec = resolve_call_spec(&cfg, Address::ZERO, true).unwrap();
        let data = spec.resolve(Address::repeat_byte(0x11)).unwrap();
        assert_eq!(&data[16..], Address::repeat_byte(0x11).as_slice());
    }

    #[test]
    fn abi_function_selected_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("abi.json");
        std::fs::write(
            &path,
            r#"[{"type":"function","name":"claim","inputs":[{"name":"to","type":"address"}],"outputs":[],"stateMutability":"nonpayable"}]"#,
        )
        .unwrap();
        let cfg = RunConfig {
            abi: Some(path),
            function: Some("claim".to_owned()),
            ..config()
        };
        let spec = resolve_call_spec(&cfg, Address::ZERO, true).unwrap();
        assert_eq!(spec.describe(), "claim(address)");
    }
}
