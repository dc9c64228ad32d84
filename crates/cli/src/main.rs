use std::process::ExitCode;

fn main() -> ExitCode {
    rapport_cli::run()
}
