use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use log::{error, info};
use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::process;

use luma::extract::{check_precision, extract_family, extract_level, ExtractMode};
use luma::patch::{patch_batch, patch_level};
use luma::registry::{Family, Registry};
use luma::settings::Settings;
use luma::tone_curve::{self, ToneCurve};
use luma::values::{build_requests, load_values, FieldOverride};
use lumabin::args::{parse_number, parse_point, read_blob};
use lumabin::{pathutils, report};

type CmdResult = Result<bool, Box<dyn Error>>;

fn main() {
    let matches = App::new("luma")
        .about("Patches and reads tuning blobs")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name("config")
                .long("config")
                .takes_value(true)
                .help("Settings file (JSON)"),
        )
        .arg(
            Arg::with_name("registry")
                .long("registry")
                .takes_value(true)
                .help("Template registry to use instead of the builtin one"),
        )
        .arg(Arg::with_name("verbose").short("v").multiple(true))
        .subcommand(
            SubCommand::with_name("levels")
                .about("Lists families, levels and defaults")
                .arg(Arg::with_name("check").long("check")),
        )
        .subcommand(
            SubCommand::with_name("generate")
                .about("Patches levels into a blob")
                .arg(family_arg())
                .arg(level_arg())
                .arg(
                    Arg::with_name("set")
                        .long("set")
                        .short("s")
                        .takes_value(true)
                        .multiple(true)
                        .number_of_values(1)
                        .help("[LEVEL:]FIELD=VALUE"),
                )
                .arg(Arg::with_name("values").long("values").takes_value(true))
                .arg(
                    Arg::with_name("output")
                        .long("output")
                        .short("o")
                        .takes_value(true)
                        .conflicts_with("save"),
                )
                .arg(Arg::with_name("save").long("save")),
        )
        .subcommand(
            SubCommand::with_name("parse")
                .about("Reads fields back out of a blob")
                .arg(family_arg())
                .arg(
                    Arg::with_name("level")
                        .long("level")
                        .short("l")
                        .takes_value(true),
                )
                .arg(Arg::with_name("scan").long("scan"))
                .arg(Arg::with_name("precision").long("precision").takes_value(true))
                .arg(Arg::with_name("input").long("input").short("i").takes_value(true))
                .arg(Arg::with_name("BLOB").index(1).conflicts_with("input")),
        )
        .subcommand(
            SubCommand::with_name("curve")
                .about("Edits a tone curve")
                .arg(
                    Arg::with_name("level")
                        .long("level")
                        .short("l")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("point")
                        .long("point")
                        .short("p")
                        .takes_value(true)
                        .multiple(true)
                        .number_of_values(1)
                        .help("INDEX=VALUE"),
                )
                .arg(Arg::with_name("radius").long("radius").takes_value(true))
                .arg(Arg::with_name("decay").long("decay").takes_value(true))
                .arg(Arg::with_name("monotonic").long("monotonic"))
                .arg(Arg::with_name("emit").long("emit")),
        )
        .subcommand(SubCommand::with_name("registry").about("Dumps the registry as JSON"))
        .get_matches();

    init_logging(matches.occurrences_of("verbose"));

    match run(&matches) {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            error!("{}", e);
            eprintln!("luma: {}", e);
            process::exit(2);
        }
    }
}

fn family_arg<'a, 'b>() -> Arg<'a, 'b> {
    Arg::with_name("family")
        .long("family")
        .short("f")
        .takes_value(true)
        .required(true)
}

fn level_arg<'a, 'b>() -> Arg<'a, 'b> {
    Arg::with_name("level")
        .long("level")
        .short("l")
        .takes_value(true)
        .multiple(true)
        .number_of_values(1)
}

fn init_logging(verbosity: u64) {
    let default = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default)).init();
}

fn run(matches: &ArgMatches) -> CmdResult {
    let mut settings = match matches.value_of("config") {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    if let Some(path) = matches.value_of("registry") {
        settings.registry = Some(PathBuf::from(path));
    }

    let loaded;
    let registry: &Registry = match &settings.registry {
        Some(path) => {
            loaded = Registry::load(path)?;
            &loaded
        }
        None => Registry::builtin()?,
    };
    info!("Using registry {}", registry.version());

    match matches.subcommand() {
        ("levels", Some(sub)) => levels(registry, sub),
        ("generate", Some(sub)) => generate(registry, &settings, sub),
        ("parse", Some(sub)) => parse(registry, &settings, sub),
        ("curve", Some(sub)) => curve(registry, &settings, sub),
        ("registry", Some(_)) => {
            println!("{}", registry.to_json()?);
            Ok(true)
        }
        _ => unreachable!(),
    }
}

fn find_family<'r>(registry: &'r Registry, name: &str) -> Result<&'r Family, Box<dyn Error>> {
    registry
        .family(name)
        .ok_or_else(|| format!("no family called {:?}", name).into())
}

fn levels(registry: &Registry, matches: &ArgMatches) -> CmdResult {
    println!("{}", report::levels(registry));
    if !matches.is_present("check") {
        return Ok(true);
    }
    let issues = registry.check();
    println!("{}", report::drift(&issues));
    Ok(issues.is_empty())
}

fn generate(registry: &Registry, settings: &Settings, matches: &ArgMatches) -> CmdResult {
    let family = find_family(registry, matches.value_of("family").unwrap())?;
    let levels: Vec<String> = matches
        .values_of("level")
        .map(|values| values.map(str::to_string).collect())
        .unwrap_or_default();
    let overrides = matches
        .values_of("set")
        .map(|values| values.map(|v| v.parse::<FieldOverride>()).collect::<Result<Vec<_>, _>>())
        .transpose()?
        .unwrap_or_default();
    let values = matches.value_of("values").map(load_values).transpose()?;

    let requests = build_requests(family, &levels, values.as_ref(), &overrides)?;
    let batch = patch_batch(family, &requests);
    for err in &batch.errors {
        eprintln!("error: {}", err);
    }
    if batch.levels.is_empty() {
        return Ok(false);
    }

    let label = match batch.levels.as_slice() {
        [only] => only.level.as_str(),
        _ => family.name(),
    };
    if let Some(path) = matches.value_of("output") {
        fs::write(path, format!("{}\n", batch.blob))?;
        println!("Saved to {}", path);
    } else if matches.is_present("save") {
        let path = pathutils::get_output_path(label, settings.output_dir.as_deref())?;
        fs::write(&path, format!("{}\n", batch.blob))?;
        pathutils::set_readonly(&path)?;
        println!("Saved to {}", path.display());
    } else {
        println!("{}", batch.blob);
    }
    Ok(batch.is_complete())
}

fn parse(registry: &Registry, settings: &Settings, matches: &ArgMatches) -> CmdResult {
    let family = find_family(registry, matches.value_of("family").unwrap())?;
    let mut options = settings.extract_options();
    if matches.is_present("scan") {
        options.mode = ExtractMode::Scan;
    }
    if let Some(text) = matches.value_of("precision") {
        options.precision = check_precision(parse_number("precision", text)?)?;
    }
    let blob = read_blob(matches.value_of("BLOB"), matches.value_of("input"))?;

    let extractions = match matches.value_of("level") {
        Some(name) => {
            let level = family
                .level(name)
                .ok_or_else(|| format!("{:?} has no level called {:?}", family.name(), name))?;
            vec![extract_level(&blob, family, level, &options)]
        }
        None => extract_family(&blob, family, &options),
    };
    for extraction in &extractions {
        println!("{}", report::extraction(extraction, options.precision));
    }
    Ok(extractions.iter().all(|e| e.is_complete()))
}

fn curve(registry: &Registry, settings: &Settings, matches: &ArgMatches) -> CmdResult {
    let family = find_family(registry, tone_curve::FAMILY)?;
    let level = match matches.value_of("level") {
        Some(name) => Some(
            family
                .level(name)
                .ok_or_else(|| format!("{:?} has no level called {:?}", family.name(), name))?,
        ),
        None => None,
    };
    let mut curve = match level {
        Some(level) => ToneCurve::from_values(level.defaults())?,
        None => ToneCurve::linear(),
    };

    let mut smoothing = settings.smoothing;
    if let Some(text) = matches.value_of("radius") {
        smoothing.radius = parse_number("radius", text)?;
    }
    if let Some(text) = matches.value_of("decay") {
        smoothing.decay = parse_number("decay", text)?;
    }
    if matches.is_present("monotonic") {
        smoothing.monotonic = true;
    }
    for text in matches.values_of("point").into_iter().flatten() {
        let (index, value) = parse_point(text)?;
        curve.set_point(index, value, &smoothing)?;
    }

    println!("{}", report::curve(&curve));
    if matches.is_present("emit") {
        let level = level
            .or_else(|| family.levels().first())
            .ok_or("the tone curve family has no levels")?;
        println!("{}", patch_level(family, level, curve.points())?);
    }
    Ok(true)
}
