use std::process::ExitCode;

fn main() -> ExitCode {
    otifly_cli::run()
}
