mod addresses;
mod batchcall_subcommand;
mod call_spec;
pub mod error;
mod networks;
mod run;

use clap::Parser;

pub use addresses::addresses;
pub use batchcall_subcommand::BatchCallSubcommand;
pub use networks::networks;
pub use run::run;

#[derive(Parser, Debug)]
#[command(
    name = "batchcall",
    version,
    about = "Send the same contract call from every wallet in a key file"
)]
pub struct BatchCallCli {
    #[command(subcommand)]
    pub command: BatchCallSubcommand,
}

impl BatchCallCli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
