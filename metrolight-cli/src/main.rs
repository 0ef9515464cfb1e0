mod argparse;

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::ArgMatches;
use flexi_logger::FileSpec;

use metrolight_core::config::Config;
use metrolight_core::renderer::{Algorithm, Renderer};
use metrolight_core::scenes;

fn main() {
    println!("metrolight 0.1 [Detected {} cores]", num_cpus::get());
    let matches = argparse::parse_args();

    flexi_logger::Logger::try_with_str("metrolight=info,metrolight_core=info")
        .unwrap()
        .log_to_file(FileSpec::default().suppress_timestamp().directory("/tmp"))
        .duplicate_to_stderr(flexi_logger::Duplicate::Warn)
        .format(flexi_logger::opt_format)
        .start()
        .unwrap_or_else(|e| panic!("Failed to initialize logger: {}", e));

    if let Err(ref e) = run(&matches) {
        eprintln!("Application error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(matches: &ArgMatches<'_>) -> Result<()> {
    let mut config = Config::default();

    if let Some(defines) = matches.values_of("define") {
        for define in defines {
            let (key, value) = define
                .split_once('=')
                .ok_or_else(|| anyhow!("expected key=value, got \"{}\"", define))?;
            config.set(key, value)?;
        }
    }
    if let Some(nthreads) = matches.value_of("nthreads") {
        config.set("noRenderThreads", nthreads)?;
    }
    config.validate()?;

    let algorithm = match matches.value_of("algorithm").unwrap_or("bdpt") {
        "mlt" => Algorithm::Metropolis,
        _ => Algorithm::Bidirectional,
    };

    let scene_name = matches.value_of("scene").unwrap_or("cornell");
    let (scene, camera) = scenes::create(scene_name, config.width, config.height)?;

    let output = PathBuf::from(matches.value_of("output").unwrap_or("out.png"));
    let renderer = Renderer { config, algorithm };
    renderer.render(&scene, &camera, output)
}
