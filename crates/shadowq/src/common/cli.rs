use clap::Parser;

use crate::commands::run::RunOpts;
use crate::commands::simulate::SimulateOpts;

/// Defines a newtype around `$wrapped_type` that clap can parse with `$parser`.
#[macro_export]
macro_rules! arg_wrapper {
    ($name:ident, $wrapped_type:ty, $parser:expr) => {
        #[derive(Debug, Clone)]
        pub struct $name($wrapped_type);

        impl ::std::str::FromStr for $name {
            type Err = ::anyhow::Error;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                ::std::result::Result::Ok(Self($parser(s)?))
            }
        }

        impl $name {
            pub fn get(&self) -> &$wrapped_type {
                &self.0
            }
            pub fn unpack(self) -> $wrapped_type {
                self.0
            }
        }
    };
}

// Common CLI options
#[derive(Parser)]
pub struct CommonOpts {
    /// Enables more detailed log output
    #[arg(
        long,
        env = "SHADOWQ_DEBUG",
        global = true,
        help_heading("GLOBAL OPTIONS"),
        hide_short_help(true)
    )]
    pub debug: bool,
}

// Root CLI options
#[derive(Parser)]
#[command(
    author,
    about,
    version,
    disable_help_subcommand(true),
    help_expected(true)
)]
pub struct RootOptions {
    #[clap(flatten)]
    pub common: CommonOpts,

    #[clap(subcommand)]
    pub subcmd: SubCommand,
}

#[allow(clippy::large_enum_variant)]
#[derive(Parser)]
pub enum SubCommand {
    /// Monitor a running workflow and provision resources so that it meets its deadline
    Run(RunOpts),
    /// Project the finish time of a workflow offline for the given slot counts
    Simulate(SimulateOpts),
}
