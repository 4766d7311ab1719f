//! `snapctl` operator CLI entry point.

use std::process;

use partition_snapshot::cli::{run_command, Cli};

fn main() {
    let cli = Cli::parse_args();

    if let Err(e) = run_command(cli.command) {
        let error_json = serde_json::json!({
            "status": "error",
            "code": e.code_str(),
            "message": e.message()
        });

        eprintln!("{}", error_json);
        process::exit(1);
    }
}
