use clap::{CommandFactory, FromArgMatches};

use shadowq::commands::run::command_run;
use shadowq::commands::simulate::command_simulate;
use shadowq::common::cli::{RootOptions, SubCommand};
use shadowq::common::setup::setup_logging;

#[tokio::main(flavor = "current_thread")]
async fn main() -> shadowq::Result<()> {
    let matches = RootOptions::command().get_matches();
    let top_opts = match RootOptions::from_arg_matches(&matches) {
        Ok(opts) => opts,
        Err(error) => error.exit(),
    };

    setup_logging(top_opts.common.debug);

    let result = match top_opts.subcmd {
        SubCommand::Run(opts) => command_run(opts).await,
        SubCommand::Simulate(opts) => command_simulate(opts).await,
    };

    if let Err(error) = result {
        log::error!("{error:?}");
        std::process::exit(1);
    }

    Ok(())
}
