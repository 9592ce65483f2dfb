use std::process::ExitCode;

fn main() -> ExitCode {
    callcart_cli::run()
}
