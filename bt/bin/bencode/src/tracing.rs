use std::io;

use clap::{ArgAction, Args};
use tracing_subscriber::{
    filter::{EnvFilter, LevelFilter},
    fmt,
    prelude::*,
};

#[derive(Args, Clone, Debug)]
pub struct TracingConfig {
    #[arg(
        long,
        short = 'v',
        action = ArgAction::Count,
        global = true,
        help = "Make log output more verbose",
    )]
    verbose: u8,
    #[arg(
        long,
        action = ArgAction::Count,
        global = true,
        help = "Make log output less verbose",
    )]
    silent: u8,

    #[arg(long, global = true, help = "Enable colored log output")]
    color: bool,
}

// Levels relative to the default, which is `WARN` because stdout carries the data.
const OFF: i16 = -2;
const ERROR: i16 = -1;
const WARN: i16 = 0;
const INFO: i16 = 1;
const DEBUG: i16 = 2;
const TRACE: i16 = 3;

impl TracingConfig {
    pub fn init(&self) {
        let layer = fmt::layer()
            .compact()
            .with_ansi(self.color)
            .with_file(self.level() >= TRACE)
            .with_line_number(self.level() >= TRACE)
            .with_target(self.level() >= DEBUG)
            .with_writer(io::stderr)
            .with_filter(self.env_filter());
        tracing_subscriber::registry().with(layer).init();
    }

    fn level(&self) -> i16 {
        i16::from(self.verbose).saturating_sub(i16::from(self.silent))
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::builder()
            .with_default_directive(self.level_filter().into())
            .from_env_lossy()
    }

    fn level_filter(&self) -> LevelFilter {
        match self.level() {
            level if level <= OFF => LevelFilter::OFF,
            ERROR => LevelFilter::ERROR,
            WARN => LevelFilter::WARN,
            INFO => LevelFilter::INFO,
            DEBUG => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    }
}
