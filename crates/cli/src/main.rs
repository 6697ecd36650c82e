use std::process::ExitCode;

fn main() -> ExitCode {
    taskmint_cli::run()
}
