use clap::Subcommand;

use super::{addresses::AddressesCliArgs, run::RunCliArgs};

#[derive(Debug, Subcommand)]
pub enum BatchCallSubcommand {
    #[command(
        name = "run",
        long_about = "Call a contract from every wallet in the key file, write a results file and print a summary."
    )]
    Run {
        #[command(flatten)]
        args: Box<RunCliArgs>,
    },

    #[command(
        name = "addresses",
        long_about = "Derive the address of every key in the wallet file and write them to address.txt."
    )]
    Addresses {
        #[command(flatten)]
        args: AddressesCliArgs,
    },

    #[command(name = "networks", about = "List the built-in networks")]
    Networks,
}
