//! Create the asset directory and the template files read by `user_sync`

use clap::Parser;
use std::process::ExitCode;
use tenant_user_sync::cli::{self, InitCli};

fn main() -> ExitCode {
    cli::init_tracing();
    ExitCode::from(cli::run_init(InitCli::parse()))
}
