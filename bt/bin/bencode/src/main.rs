mod tracing;

use std::error;
use std::fs::File;
use std::io::{self, BufRead, Read, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Deserialize;
use serde_json::Deserializer;

use bt_bencode::error::io::Error as IoError;
use bt_bencode::{DecodeOptions, Decoder, Encode, EncodeOptions, ReaderSource, Value};

use crate::tracing::TracingConfig;

#[derive(Debug, Parser)]
#[command(about = "Convert a stream of Bencode values read from stdin")]
struct Bencode {
    #[command(subcommand)]
    command: Command,

    #[arg(long, global = true, help = "Load decoder and encoder options from a YAML file")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Limit the decoder operand stack size")]
    max_stack_size: Option<usize>,
    #[arg(long, global = true, help = "Limit the encoder nesting depth")]
    max_depth: Option<usize>,
    #[arg(long, global = true, help = "Accept dictionary keys out of order")]
    allow_unordered_keys: bool,
    #[arg(long, global = true, help = "Reject a top-level byte string or integer")]
    reject_unwrapped: bool,

    #[command(flatten)]
    tracing: TracingConfig,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print each value in its debug representation.
    Debug,
    /// Convert Bencode to JSON lines.
    Json {
        #[arg(short, long, help = "Convert a stream of JSON documents to Bencode instead")]
        reverse: bool,
    },
    /// Re-encode each value in canonical form.
    Canonicalize,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct Config {
    decode: DecodeOptions,
    encode: EncodeOptions,
}

type Reader<T> = Box<dyn FnMut() -> Result<Option<T>, Error>>;
type Writer<T> = Box<dyn FnMut(T) -> Result<(), Error>>;

type Error = Box<dyn error::Error>;

impl Bencode {
    fn load_config(&self) -> Result<Config, Error> {
        let mut config = match &self.config {
            Some(path) => serde_yaml::from_reader(File::open(path)?)?,
            None => Config::default(),
        };
        if let Some(max_stack_size) = self.max_stack_size {
            config.decode.max_stack_size = max_stack_size;
        }
        if let Some(max_depth) = self.max_depth {
            config.encode.max_depth = max_depth;
        }
        if self.allow_unordered_keys {
            config.decode.allow_unordered_keys = true;
        }
        if self.reject_unwrapped {
            config.decode.allow_unwrapped_elements = false;
        }
        ::tracing::debug!(?config, "load config");
        Ok(config)
    }

    fn execute(&self) -> Result<(), Error> {
        let Config { decode, encode } = self.load_config()?;
        let reader = io::stdin().lock();
        let writer = io::stdout();
        match self.command {
            Command::Debug => transcode(bencode_reader(reader, decode), debug_writer(writer)),
            Command::Json { reverse: false } => {
                transcode(bencode_reader(reader, decode), json_writer(writer))
            }
            Command::Json { reverse: true } => {
                transcode(json_reader(reader), bencode_writer(writer, encode))
            }
            Command::Canonicalize => {
                transcode(bencode_reader(reader, decode), bencode_writer(writer, encode))
            }
        }
    }
}

fn transcode<T>(mut reader: Reader<T>, mut writer: Writer<T>) -> Result<(), Error> {
    let mut num_values = 0usize;
    while let Some(value) = reader()? {
        writer(value)?;
        num_values += 1;
    }
    ::tracing::info!(num_values, "transcode");
    Ok(())
}

fn bencode_reader<R>(reader: R, options: DecodeOptions) -> Reader<Value>
where
    R: BufRead + 'static,
{
    let mut decoder = Decoder::<_, IoError>::with_options(ReaderSource::new(reader), options);
    Box::new(move || {
        decoder.decode_next().map_err(|error| {
            if error.is_incomplete() {
                ::tracing::warn!("input ends in the middle of a value");
            }
            error.into()
        })
    })
}

fn json_reader<R>(reader: R) -> Reader<serde_json::Value>
where
    R: Read + 'static,
{
    let mut stream = Deserializer::from_reader(reader).into_iter();
    Box::new(move || Ok(stream.next().transpose()?))
}

fn bencode_writer<W, T>(mut writer: W, options: EncodeOptions) -> Writer<T>
where
    W: Write + 'static,
    T: Encode + 'static,
{
    Box::new(move |value| {
        bt_bencode::to_writer_with(&mut writer, &value, options.clone())?;
        Ok(writer.flush()?)
    })
}

fn json_writer<W>(mut writer: W) -> Writer<Value>
where
    W: Write + 'static,
{
    Box::new(move |value| {
        bt_bencode::to_json_writer(&mut writer, &value)?;
        std::writeln!(writer)?;
        Ok(())
    })
}

fn debug_writer<W>(mut writer: W) -> Writer<Value>
where
    W: Write + 'static,
{
    Box::new(move |value| Ok(std::writeln!(writer, "{value:#?}")?))
}

fn main() -> Result<(), Error> {
    let bencode = Bencode::parse();
    bencode.tracing.init();
    bencode.execute()
}
