use std::process;

fn main() {
    match exampledoc_cli::run() {
        Ok(code) => process::exit(code),
        Err(err) => {
            eprintln!("exampledoc error: {err:#}");
            process::exit(1);
        }
    }
}
