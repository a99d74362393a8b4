use std::sync::Arc;

use netsdr_client::{ClientConfig, IqState, NetSdrClient, DEFAULT_CHANNEL, DEFAULT_FREQUENCY_HZ};
use netsdr_transport::{TcpControlChannel, UdpDataChannel};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;

use crate::cmd::{parse_duration, runtime, SessionArgs};
use crate::exit::{client_error, io_error, CliResult, SUCCESS};
use crate::output::{print_event, print_status, OutputFormat, SessionStatus};

type Client = NetSdrClient<TcpControlChannel, UdpDataChannel>;

const USAGE_TEXT: &str = "\
commands:
  c                    connect and configure the receiver
  d                    disconnect
  f [hz] [channel]     change frequency (default 20000000 Hz, channel 1)
  s                    start or stop IQ streaming
  status               show connection and IQ state
  q                    quit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionCommand {
    Connect,
    Disconnect,
    Frequency { hz: u64, channel: u8 },
    ToggleIq,
    Status,
    Help,
    Quit,
}

impl SessionCommand {
    /// `Ok(None)` for blank lines.
    fn parse(line: &str) -> Result<Option<Self>, String> {
        let mut words = line.split_whitespace();
        let Some(word) = words.next() else {
            return Ok(None);
        };

        let command = match word.to_ascii_lowercase().as_str() {
            "c" | "connect" => Self::Connect,
            "d" | "disconnect" => Self::Disconnect,
            "f" | "freq" | "frequency" => {
                let hz = match words.next() {
                    Some(hz) => hz
                        .parse()
                        .map_err(|_| format!("invalid frequency: {hz}"))?,
                    None => DEFAULT_FREQUENCY_HZ,
                };
                let channel = match words.next() {
                    Some(channel) => channel
                        .parse()
                        .map_err(|_| format!("invalid channel: {channel}"))?,
                    None => DEFAULT_CHANNEL,
                };
                Self::Frequency { hz, channel }
            }
            "s" | "iq" => Self::ToggleIq,
            "status" => Self::Status,
            "h" | "help" | "?" => Self::Help,
            "q" | "quit" | "exit" => Self::Quit,
            other => return Err(format!("unknown command: {other}")),
        };
        Ok(Some(command))
    }
}

pub fn run(args: SessionArgs, format: OutputFormat) -> CliResult<i32> {
    let config = build_config(&args)?;
    let runtime = runtime()?;
    let result = runtime.block_on(session(config, format));
    // A stdin read still parked on the blocking pool cannot be cancelled.
    runtime.shutdown_background();
    result
}

/// Defaults, then the config file, then flags and environment.
fn build_config(args: &SessionArgs) -> CliResult<ClientConfig> {
    let mut config = match &args.config {
        Some(path) => ClientConfig::from_json_file(path)
            .map_err(|err| client_error("config load failed", err))?,
        None => ClientConfig::default(),
    };

    if let Some(host) = &args.host {
        config.host = host.clone();
    }
    if let Some(port) = args.port {
        config.control_port = port;
    }
    if let Some(port) = args.udp_port {
        config.data_port = port;
    }
    if let Some(path) = &args.samples {
        config.sample_file = path.clone();
    }
    if let Some(timeout) = &args.request_timeout {
        config.request_timeout_ms = Some(parse_duration(timeout)?.as_millis() as u64);
    }
    Ok(config)
}

async fn session(config: ClientConfig, format: OutputFormat) -> CliResult<i32> {
    tracing::debug!(?config, "starting session");
    let client = Arc::new(NetSdrClient::from_config(&config));

    let mut events = client.subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => print_event(&event, format),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event output fell behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    eprintln!("{USAGE_TEXT}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => line.map_err(|err| io_error("stdin read failed", err))?,
        };
        let Some(line) = line else {
            break;
        };

        let command = match SessionCommand::parse(&line) {
            Ok(Some(SessionCommand::Quit)) => break,
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(message) => {
                eprintln!("{message}");
                continue;
            }
        };

        match execute(&client, command).await {
            Ok(Some(status)) => print_status(&status, format),
            Ok(None) => {}
            Err(err) => eprintln!("error: {err}"),
        }
    }

    if client.is_connected() {
        if let Err(err) = client.disconnect().await {
            tracing::warn!(error = %err, "disconnect on exit failed");
        }
    }
    printer.abort();
    Ok(SUCCESS)
}

async fn execute(client: &Client, command: SessionCommand) -> CliResult<Option<SessionStatus>> {
    let status = |action| SessionStatus::new(action, client.is_connected(), client.iq_state());

    match command {
        SessionCommand::Connect => {
            client
                .connect()
                .await
                .map_err(|err| client_error("connect failed", err))?;
            Ok(Some(status("connect")))
        }
        SessionCommand::Disconnect => {
            client
                .disconnect()
                .await
                .map_err(|err| client_error("disconnect failed", err))?;
            Ok(Some(status("disconnect")))
        }
        SessionCommand::Frequency { hz, channel } => {
            client
                .change_frequency(hz, channel)
                .await
                .map_err(|err| client_error("frequency change failed", err))?;
            Ok(Some(
                status("frequency").with_detail(format!("{hz} Hz on channel {channel}")),
            ))
        }
        SessionCommand::ToggleIq => match client.iq_state() {
            IqState::Started => {
                client
                    .stop_iq()
                    .await
                    .map_err(|err| client_error("IQ stop failed", err))?;
                Ok(Some(status("stop_iq")))
            }
            IqState::Stopped => {
                client
                    .start_iq()
                    .await
                    .map_err(|err| client_error("IQ start failed", err))?;
                Ok(Some(status("start_iq")))
            }
        },
        SessionCommand::Status => Ok(Some(status("status"))),
        SessionCommand::Help => {
            eprintln!("{USAGE_TEXT}");
            Ok(None)
        }
        SessionCommand::Quit => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn args() -> SessionArgs {
        SessionArgs {
            host: None,
            port: None,
            udp_port: None,
            config: None,
            samples: None,
            request_timeout: None,
        }
    }

    #[test]
    fn parses_single_letter_commands() {
        assert_eq!(SessionCommand::parse("c"), Ok(Some(SessionCommand::Connect)));
        assert_eq!(SessionCommand::parse(" D "), Ok(Some(SessionCommand::Disconnect)));
        assert_eq!(SessionCommand::parse("s"), Ok(Some(SessionCommand::ToggleIq)));
        assert_eq!(SessionCommand::parse("q"), Ok(Some(SessionCommand::Quit)));
        assert_eq!(SessionCommand::parse("   "), Ok(None));
    }

    #[test]
    fn frequency_defaults_and_overrides() {
        assert_eq!(
            SessionCommand::parse("f"),
            Ok(Some(SessionCommand::Frequency {
                hz: 20_000_000,
                channel: 1
            }))
        );
        assert_eq!(
            SessionCommand::parse("freq 7100000 2"),
            Ok(Some(SessionCommand::Frequency {
                hz: 7_100_000,
                channel: 2
            }))
        );
        assert!(SessionCommand::parse("f abc").is_err());
        assert!(SessionCommand::parse("f 1000 300").is_err());
    }

    #[test]
    fn rejects_unknown_command() {
        assert_eq!(
            SessionCommand::parse("x"),
            Err("unknown command: x".to_string())
        );
    }

    #[test]
    fn flags_override_defaults() {
        let mut args = args();
        args.host = Some("192.168.0.9".to_string());
        args.udp_port = Some(61000);
        args.request_timeout = Some("750ms".to_string());

        let config = build_config(&args).unwrap();
        assert_eq!(config.control_addr(), "192.168.0.9:50000");
        assert_eq!(config.data_port, 61000);
        assert_eq!(config.request_timeout(), Some(Duration::from_millis(750)));
    }

    #[test]
    fn missing_config_file_is_usage_error() {
        let mut args = args();
        args.config = Some("/nonexistent/netsdr.json".into());
        let err = build_config(&args).unwrap_err();
        assert_eq!(err.code, crate::exit::USAGE);
    }
}
