use std::process::ExitCode;

fn main() -> ExitCode {
    session_recorder_lib::run()
}
