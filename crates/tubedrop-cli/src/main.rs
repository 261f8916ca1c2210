#![forbid(unsafe_code)]

//! Binary entrypoint for the Tubedrop CLI.

use std::process;

#[tokio::main]
async fn main() {
    let exit_code = tubedrop_cli::run().await;
    if exit_code != 0 {
        process::exit(exit_code);
    }
}
