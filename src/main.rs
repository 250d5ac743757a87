use ldrshrink::Converter;
use log::debug;
use std::env;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};

fn main() {
    // Initialize logging
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 3 {
        eprintln!("{} <input_ldr> <output_ldr>", args[0]);
        std::process::exit(1);
    }

    let input_path = &args[1];
    let output_path = &args[2];

    debug!("simplifying {} into {}", input_path, output_path);

    let input = match File::open(input_path) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("ERROR: unable to open input file '{}': {}", input_path, e);
            std::process::exit(1);
        }
    };

    let output = match File::create(output_path) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("ERROR: unable to open output file '{}': {}", output_path, e);
            std::process::exit(1);
        }
    };
    let mut writer = BufWriter::new(output);

    let stats = match Converter::new().run(BufReader::new(input), &mut writer) {
        Ok(stats) => stats,
        Err(e) => {
            // a failure mid-stream leaves a truncated output file behind
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = writer.flush() {
        eprintln!("ERROR: unable to finish output file: {}", e);
        std::process::exit(1);
    }

    // metrics on how much the loader image has been simplified
    println!("---");
    println!(
        "{} blocks read; {} blocks written",
        stats.blocks_read, stats.blocks_written
    );
}
