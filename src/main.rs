use anyhow::Result;
use clap::{crate_version, App, AppSettings, Arg, ArgMatches, SubCommand};
use neruda::build::{build_indexes, customize_files, html_files, Report};
use neruda::config::Config;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() {
    let matches = app().get_matches();
    let (name, sub) = matches.subcommand();
    let sub = sub.unwrap_or(&matches);

    let verbosity = matches.occurrences_of("verbose").max(sub.occurrences_of("verbose"));
    if let Err(e) = init_logging(verbosity) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    match run(name, &matches, sub) {
        Ok(report) if report.succeeded() => {}
        Ok(report) => {
            eprintln!("{} of {} units failed", report.failed, report.processed);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn app() -> App<'static, 'static> {
    App::new("neruda")
        .version(crate_version!())
        .about("Customizes generated HTML and builds tag indexes and Atom feeds")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .value_name("FILE")
                .help("Project file to use instead of searching for neruda.yml")
                .takes_value(true)
                .global(true),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .multiple(true)
                .help("Raises the log level (-v info, -vv debug)")
                .global(true),
        )
        .subcommand(
            SubCommand::with_name("customize")
                .about("Applies the configured template rules to HTML files")
                .arg(
                    Arg::with_name("all")
                        .long("all")
                        .help("Customizes every .html file under the public folder"),
                )
                .arg(Arg::with_name("FILES").multiple(true)),
        )
        .subcommand(
            SubCommand::with_name("index")
                .about("Writes tag pages and Atom feeds for the articles in a manifest")
                .arg(Arg::with_name("MANIFEST").required(true)),
        )
}

fn run(name: &str, matches: &ArgMatches, sub: &ArgMatches) -> Result<Report> {
    let all = name == "customize" && sub.is_present("all");
    if name == "customize" && !all && !sub.is_present("FILES") {
        eprintln!("No source file given");
        return Ok(Report::default());
    }

    let config = load_config(sub.value_of("config").or_else(|| matches.value_of("config")))?;
    match name {
        "customize" => {
            let files: Vec<PathBuf> = match all {
                true => html_files(&config.public_folder)?,
                false => sub
                    .values_of("FILES")
                    .map(|values| values.map(PathBuf::from).collect())
                    .unwrap_or_default(),
            };
            if files.is_empty() {
                eprintln!("No source file given");
                return Ok(Report::default());
            }
            Ok(customize_files(&config, &files))
        }
        "index" => {
            let manifest = sub.value_of("MANIFEST").unwrap_or_default();
            build_indexes(&config, Path::new(manifest))
        }
        _ => Ok(Report::default()),
    }
}

fn load_config(path: Option<&str>) -> Result<Config> {
    match path {
        Some(path) => Config::from_project_file(Path::new(path)),
        None => Config::from_directory(&std::env::current_dir()?),
    }
}

fn init_logging(verbosity: u64) -> Result<()> {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();

    Ok(())
}
