extern crate clap;
extern crate darkshowers;

use clap::{App, Arg, ArgMatches};
use darkshowers::controller::{RunController, RunPolicy, RunSettings};
use darkshowers::detector::{DetectorSimulator, FastDetector};
use darkshowers::detector_card::DetectorCard;
use darkshowers::error::{ConfigError, Error};
use darkshowers::output::{EventDump, OutputWriter};
use darkshowers::run_card::{RunCard, RunMode};
use darkshowers::selection::ObjectSelector;
use darkshowers::source::hidden_valley::TChannel;
use darkshowers::source::{EventSource, HiddenValleyGenerator, LheSource};
use std::process;
use std::str::FromStr;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn parse<T: FromStr>(matches: &ArgMatches, name: &str) -> Result<Option<T>, ConfigError> {
    match matches.value_of(name) {
        None => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidArgument {
                name: name.to_owned(),
                value: value.to_owned(),
            }),
    }
}

/// Apply command-line overrides on top of the run card.
fn configure(matches: &ArgMatches) -> Result<RunCard, ConfigError> {
    let mut card = match matches.value_of("card") {
        Some(path) => RunCard::from_file(path)?,
        None => RunCard::default(),
    };

    macro_rules! set {
        ($field: expr, $name: expr) => {
            if let Some(x) = parse(matches, $name)? {
                $field = x;
            }
        };
    }

    set!(card.mode, "mode");
    set!(card.nevents, "nevents");
    set!(card.output, "output");
    set!(card.seed, "seed");
    set!(card.ecm, "ecm");
    set!(card.nmatch, "nmatch");
    set!(card.mphi, "mphi");
    set!(card.ptcut, "ptcut");
    set!(card.detector, "detector");
    set!(card.record, "record");
    set!(card.hidden_valley.phimass, "phimass");
    set!(card.hidden_valley.lambda, "lambda");
    set!(card.hidden_valley.inv, "inv");
    set!(card.hidden_valley.nc, "nc");
    set!(card.cuts.pt_min, "ptmin");
    set!(card.cuts.met_min, "metmin");
    set!(card.cuts.met_max, "metmax");
    set!(card.cuts.dphi_min, "dphimin");
    set!(card.cuts.njet_max, "njetmax");
    set!(card.cuts.lepton_veto, "lveto");

    if let Some(input) = matches.value_of("input") {
        card.input = Some(input.to_owned());
    }
    if let Some(hepmc) = matches.value_of("hepmc") {
        card.hepmc = Some(hepmc.to_owned());
    }

    if let Some(njet) = parse::<i64>(matches, "njet")? {
        if njet < 0 {
            warn!("cannot require a negative number of jets, requiring none");
        }
        card.cuts.njet_min = njet.max(0) as usize;
    }

    card.rehadronize |= matches.is_present("rehad");
    card.cuts.recluster |= matches.is_present("zprime");
    card.weighted |= matches.is_present("weighted");
    card.verbose |= matches.is_present("verbose");

    Ok(card)
}

fn run(card: &RunCard) -> Result<(), Error> {
    card.validate()?;
    let mode = card.run_mode()?;
    let format = card.record_format()?;

    info!("mode: {:?}", mode);
    info!("pT cut: {}", card.cuts.pt_min);
    info!("MEt cut: {}", card.cuts.met_min);
    if card.cuts.recluster {
        info!("jets will be reclustered with R = {}", card.cuts.recluster_radius);
    }

    let hadron_level = !card.rehadronize;
    let source: Box<dyn EventSource> = match mode {
        RunMode::TChannel => {
            info!("mediator mass is {} GeV", card.mphi);
            let process = TChannel {
                e_cm: card.ecm,
                mphi: card.mphi,
                ptcut: card.ptcut,
            };
            Box::new(HiddenValleyGenerator::new(
                process,
                card.hidden_valley.clone(),
                card.seed,
                hadron_level,
            ))
        }
        RunMode::Lhe => {
            let input = card.input.as_ref().ok_or(ConfigError::MissingInput)?;
            info!("input: {}", input);
            Box::new(LheSource::open(
                input,
                card.nmatch,
                card.hidden_valley.clone(),
                card.seed,
                hadron_level,
            )?)
        }
    };
    let policy = match mode {
        RunMode::TChannel => RunPolicy::FixedCount(card.nevents),
        RunMode::Lhe => RunPolicy::UntilExhausted(card.nevents),
    };

    let detector_card = DetectorCard::resolve(&card.detector)?;
    info!("detector: {}", detector_card.name);
    let detector: Box<dyn DetectorSimulator> = Box::new(FastDetector::new(detector_card));

    let output = OutputWriter::create(&card.output, format, card.weighted)?;

    let mut settings = RunSettings::new(policy);
    settings.frozen = card.rehadronize;
    settings.weighted = card.weighted;

    let mut controller = RunController::new(
        settings,
        source,
        detector,
        ObjectSelector::new(card.cuts.clone()),
        output,
    );
    if let Some(path) = &card.hepmc {
        info!("HepMC output written to {}", path);
        controller = controller.with_event_dump(EventDump::create(path)?);
    }
    let summary = controller.run()?;

    info!("{} total events", summary.accepted);
    if card.verbose {
        println!("{}", controller.cut_flow());
    }
    Ok(())
}

fn main() {
    let matches = App::new("monojet")
        .version("0.1")
        .about("Generate dark-shower events, simulate a detector and select monojet-like signatures")
        .arg(
            Arg::with_name("mode")
                .short("m")
                .long("mode")
                .value_name("MODE")
                .help("Event source: tchannel or lhe"),
        )
        .arg(
            Arg::with_name("nevents")
                .short("n")
                .long("nevents")
                .value_name("N")
                .help("Number of events to attempt (tchannel) or accept (lhe)"),
        )
        .arg(
            Arg::with_name("output")
                .short("o")
                .long("output")
                .value_name("PREFIX")
                .help("Prefix of the .evt and .meta files"),
        )
        .arg(
            Arg::with_name("input")
                .short("i")
                .long("input")
                .value_name("FILE")
                .help("Les Houches event file"),
        )
        .arg(Arg::with_name("ptmin").long("ptmin").value_name("GEV").help("Leading jet pt cut"))
        .arg(Arg::with_name("metmin").long("metmin").value_name("GEV").help("Lower MET cut"))
        .arg(Arg::with_name("metmax").long("metmax").value_name("GEV").help("Upper MET cut"))
        .arg(
            Arg::with_name("dphimin")
                .long("dphimin")
                .value_name("RAD")
                .help("Minimum azimuthal distance between MET and the jets"),
        )
        .arg(
            Arg::with_name("njet")
                .long("njet")
                .value_name("N")
                .allow_hyphen_values(true)
                .help("Minimum number of jets"),
        )
        .arg(Arg::with_name("njetmax").long("njetmax").value_name("N").help("Maximum number of jets"))
        .arg(
            Arg::with_name("lveto")
                .long("lveto")
                .value_name("BOOL")
                .possible_values(&["true", "false"])
                .help("Reject events with isolated leptons"),
        )
        .arg(
            Arg::with_name("rehad")
                .long("rehad")
                .help("Rehadronize each hard process several times"),
        )
        .arg(
            Arg::with_name("zprime")
                .long("zprime")
                .help("Recluster the selected jets into large-radius jets"),
        )
        .arg(
            Arg::with_name("weighted")
                .short("w")
                .long("weighted")
                .help("Write event weights"),
        )
        .arg(
            Arg::with_name("nmatch")
                .long("nmatch")
                .value_name("N")
                .help("Maximum number of matched jets (lhe)"),
        )
        .arg(Arg::with_name("mphi").long("mphi").value_name("GEV").help("Mediator mass"))
        .arg(
            Arg::with_name("ptcut")
                .long("ptcut")
                .value_name("GEV")
                .help("Minimum pt of the hard process"),
        )
        .arg(Arg::with_name("phimass").long("phimass").value_name("GEV").help("Dark meson mass"))
        .arg(
            Arg::with_name("lambda")
                .long("lambda")
                .value_name("GEV")
                .help("Dark confinement scale"),
        )
        .arg(
            Arg::with_name("inv")
                .long("inv")
                .value_name("FRACTION")
                .help("Fraction of invisible dark mesons"),
        )
        .arg(Arg::with_name("nc").long("nc").value_name("N").help("Number of dark colours"))
        .arg(
            Arg::with_name("ecm")
                .long("ecm")
                .value_name("GEV")
                .help("Collider centre-of-mass energy"),
        )
        .arg(Arg::with_name("seed").long("seed").value_name("SEED").help("Random seed"))
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .long("verbose")
                .help("Debug logging and a cut-flow table at the end"),
        )
        .arg(
            Arg::with_name("card")
                .long("card")
                .value_name("YAML")
                .help("Run card, overridden by the other flags"),
        )
        .arg(
            Arg::with_name("detector")
                .long("detector")
                .value_name("CMS|ATLAS|FILE")
                .help("Detector profile"),
        )
        .arg(
            Arg::with_name("hepmc")
                .long("hepmc")
                .value_name("FILE")
                .help("Write the full record of every attempted event in HepMC2 format"),
        )
        .arg(
            Arg::with_name("record")
                .long("record")
                .value_name("FORMAT")
                .possible_values(&["basic", "extended"])
                .help("Layout of the event file"),
        )
        .get_matches();

    let default_level = if matches.is_present("verbose") {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let result = configure(&matches)
        .map_err(Error::from)
        .and_then(|card| run(&card));

    if let Err(e) = result {
        error!("{}", e);
        process::exit(1);
    }
}
