use std::{env, process};

use bizsim_core::{cli::run_cli, init};

fn main() {
    init();

    let args: Vec<String> = env::args().skip(1).collect();
    if let Err(err) = run_cli(&args[..]) {
        eprintln!("Error: {err}");
        process::exit(1);
    }
}
