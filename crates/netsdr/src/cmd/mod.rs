use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};
use netsdr_transport::{DEFAULT_CONTROL_PORT, DEFAULT_DATA_PORT};

use crate::exit::{io_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod decode;
pub mod echo;
pub mod emit;
pub mod session;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Drive a receiver interactively from stdin.
    Session(SessionArgs),
    /// Decode a hex-encoded message.
    Decode(DecodeArgs),
    /// Run a TCP echo server that answers every request with itself.
    Echo(EchoArgs),
    /// Send dummy IQ datagrams at a fixed interval.
    Emit(EmitArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Session(args) => session::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Echo(args) => echo::run(args, format),
        Command::Emit(args) => emit::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct SessionArgs {
    /// Receiver host.
    #[arg(long, env = "NETSDR_HOST")]
    pub host: Option<String>,
    /// Receiver control (TCP) port.
    #[arg(long, short = 'p', env = "NETSDR_PORT")]
    pub port: Option<u16>,
    /// Local port for IQ (UDP) datagrams.
    #[arg(long, env = "NETSDR_UDP_PORT")]
    pub udp_port: Option<u16>,
    /// JSON client config; flags override its values.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// File IQ samples are appended to.
    #[arg(long, value_name = "FILE")]
    pub samples: Option<PathBuf>,
    /// Give up on a control request after this long (e.g. 2s, 500ms).
    #[arg(long, value_name = "DURATION")]
    pub request_timeout: Option<String>,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Message bytes as hex. Spaces, ':' and '-' separators and a 0x prefix
    /// are accepted.
    pub hex: String,
    /// Also decode the body as samples.
    #[arg(long)]
    pub samples: bool,
    /// Sample width in bits when --samples is set.
    #[arg(long, default_value_t = netsdr_frame::IQ_SAMPLE_BITS, requires = "samples")]
    pub bits: u16,
}

#[derive(Args, Debug)]
pub struct EchoArgs {
    /// Port to listen on. 0 picks a free port.
    #[arg(long, short = 'p', default_value_t = DEFAULT_CONTROL_PORT)]
    pub port: u16,
    /// Address to bind.
    #[arg(long, default_value = "0.0.0.0")]
    pub bind: String,
}

#[derive(Args, Debug)]
pub struct EmitArgs {
    /// Destination host.
    #[arg(long, default_value = "127.0.0.1", env = "NETSDR_HOST")]
    pub host: String,
    /// Destination UDP port.
    #[arg(long, short = 'p', default_value_t = DEFAULT_DATA_PORT, env = "NETSDR_UDP_PORT")]
    pub port: u16,
    /// Time between datagrams (e.g. 5s, 250ms).
    #[arg(long, default_value = "5s")]
    pub interval: String,
    /// Stop after N datagrams.
    #[arg(long)]
    pub count: Option<u64>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub(crate) fn runtime() -> CliResult<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| io_error("runtime setup failed", err))
}

pub(crate) fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
