use std::{error, fs::File, io::BufReader};

use revsynth::config::{Config, IniValues};

mod cli;
mod modes;

fn main() {
    let args = cli::CliArgs::new();

    match run(&args) {
        Ok(()) => {}
        Err(error) => {
            eprintln!("Exception: {}", error);
            std::process::exit(-1);
        }
    }
}

fn run(args: &cli::CliArgs) -> Result<(), Box<dyn error::Error>> {
    let values = match &args.config {
        Some(path) => IniValues::parse(BufReader::new(File::open(path)?))?,
        None => IniValues::new(),
    };

    let config = Config::from_values(&values)?;
    let work_mode = values.get_string("work-mode", "")?;

    match work_mode.as_str() {
        "general-synthesis" => modes::general_synthesis(&values, &config)?,
        "post-processing" => modes::post_processing(&values, &config)?,
        "memory-synthesis" => modes::memory_synthesis(&values, &config)?,
        "random-check" => modes::random_check(&values, &config)?,
        other => {
            if other.is_empty() {
                eprintln!("Error: work mode is not specified, valid values are:");
            } else {
                eprintln!("Error: unknown work mode \"{}\", valid values are:", other);
            }

            eprintln!("    general-synthesis");
            eprintln!("    post-processing");
            eprintln!("    memory-synthesis");
            eprintln!("    random-check");
        }
    }

    Ok(())
}
