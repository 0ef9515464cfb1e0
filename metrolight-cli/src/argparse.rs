use clap::{App, Arg, ArgMatches};

pub fn parse_args() -> ArgMatches<'static> {
    App::new("metrolight")
        .version("0.1")
        .about("Unbiased bidirectional / Metropolis light transport renderer")
        .arg(
            Arg::with_name("scene")
                .short("s")
                .long("scene")
                .takes_value(true)
                .default_value("cornell")
                .help("Built-in scene name (cornell, caustic, mirror, empty, triangle)"),
        )
        .arg(
            Arg::with_name("algorithm")
                .short("a")
                .long("algorithm")
                .takes_value(true)
                .possible_values(&["bdpt", "mlt"])
                .default_value("bdpt")
                .help("Rendering algorithm"),
        )
        .arg(
            Arg::with_name("output")
                .short("o")
                .long("output")
                .takes_value(true)
                .default_value("out.png")
                .help("Output image path; the format follows the extension"),
        )
        .arg(
            Arg::with_name("nthreads")
                .short("t")
                .long("nthreads")
                .takes_value(true)
                .help("Number of render threads (default: one per CPU)"),
        )
        .arg(
            Arg::with_name("define")
                .short("D")
                .long("define")
                .takes_value(true)
                .multiple(true)
                .number_of_values(1)
                .value_name("key=value")
                .help("Override a renderer configuration key"),
        )
        .get_matches()
}
