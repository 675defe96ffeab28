use std::process::ExitCode;

fn main() -> ExitCode {
    match viperc_drv::run(std::env::args().skip(1)) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("viperc: {:#}", error);
            ExitCode::FAILURE
        }
    }
}
