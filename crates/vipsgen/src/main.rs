//! `vipsgen` binary.

fn main() {
    let code = vipsgen_cli::run(std::env::args().collect());
    std::process::exit(code);
}
