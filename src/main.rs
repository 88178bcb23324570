//! recordshape CLI entry point
//!
//! Parses arguments and dispatches through `cli::run`. The command has
//! already written its JSON error object; the error is repeated on stderr
//! and the process exits non-zero.

use recordshape::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
