//! Binary entrypoint for the EnterpriseGPT console client.

use std::process::ExitCode;

use enterprisegpt_client::start_client;

/// Start the client with configuration taken from the environment.
fn main() -> ExitCode {
    start_client::run()
}
