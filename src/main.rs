// General flow:
//  - parse command line arguments
//  - open the input (a file, or stdin when no file or "-" is given)
//  - run the pipeline:
//      - read a chunk of compressed bytes and decompress it
//      - append the output to the framer and pull out every complete top-level object
//      - write each object to stdout on its own line, optionally checking it parses as JSON
//  - at the end of the stream, report an object left open (an error with --strict)

use error_chain::bail;
use error_chain::ChainedError;
use gzjson_stream::errors::*;
use gzjson_stream::{Config, Pipeline, DEFAULT_CHUNK_SIZE};

use bytes::Bytes;
use clap::{App, Arg};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use tracing::info;
use tracing_subscriber::EnvFilter;

const APP_NAME: &str = "gzjson_stream";
const ABOUT_STR: &str = "Streams top-level JSON objects out of a gzip-compressed file \
    without decompressing the whole file into memory";

const CHUNK_SIZE_HELP: &str = const_format::formatcp!(
    "number of compressed bytes to read at a time, default {}",
    DEFAULT_CHUNK_SIZE
);

struct Settings {
    input: Option<String>,
    config: Config,
    validate: bool,
    strict: bool,
    verbose: bool,
}

fn parse_args() -> Result<Settings> {
    let m = App::new(APP_NAME)
        .about(ABOUT_STR)
        .arg(
            Arg::with_name("FILE")
                .help("gzip-compressed input, reads stdin if absent or \"-\"")
                .index(1),
        )
        .arg(
            Arg::with_name("chunk-size")
                .long("chunk-size")
                .help(CHUNK_SIZE_HELP)
                .takes_value(true),
        )
        .arg(
            Arg::with_name("validate")
                .long("validate")
                .help("fail on objects that are not valid JSON"),
        )
        .arg(
            Arg::with_name("strict")
                .long("strict")
                .help("fail if the stream ends inside an object"),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .long("verbose")
                .help("log every extracted object"),
        )
        .get_matches_safe()
        .chain_err(|| "error parsing arguments")?;

    let chunk_size = match m.value_of("chunk-size") {
        Some(s) => s
            .parse()
            .chain_err(|| format!("error parsing chunk size \"{}\"", s))?,
        None => DEFAULT_CHUNK_SIZE,
    };

    Ok(Settings {
        input: m
            .value_of("FILE")
            .filter(|f| *f != "-")
            .map(|f| f.to_string()),
        config: Config::new().chunk_size(chunk_size),
        validate: m.is_present("validate"),
        strict: m.is_present("strict"),
        verbose: m.is_present("verbose"),
    })
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn write_object<W: Write>(out: &mut W, object: &Bytes, validate: bool) -> Result<()> {
    if validate {
        serde_json::from_slice::<serde_json::Value>(object)?;
    }
    out.write_all(object)?;
    out.write_all(b"\n")?;
    Ok(())
}

fn run() -> Result<()> {
    let settings = parse_args()?;
    init_logging(settings.verbose);

    let reader: Box<dyn Read> = match settings.input {
        Some(ref path) => Box::new(BufReader::new(
            File::open(path).chain_err(|| format!("error opening \"{}\"", path))?,
        )),
        None => Box::new(io::stdin()),
    };

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    let pipeline = Pipeline::new(reader, &settings.config)?;
    let summary = pipeline
        .run(|object| write_object(&mut out, &object, settings.validate))
        .chain_err(|| "error extracting objects")?;
    out.flush()?;

    info!(
        objects = summary.objects,
        compressed_bytes = summary.compressed_bytes,
        decompressed_bytes = summary.decompressed_bytes,
        "finished"
    );

    if let Some(truncation) = summary.truncated {
        if settings.strict {
            bail!(ErrorKind::TruncatedObject(
                truncation.start,
                truncation.pending
            ));
        }
        eprintln!("warning: {}", truncation);
    }

    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{}", e.display_chain().to_string());
        std::process::exit(1);
    }
}
