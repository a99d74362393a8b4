use std::fmt::Write as _;
use std::io::{IsTerminal, Write};
use std::net::SocketAddr;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use netsdr_client::{ClientEvent, IqState};
use netsdr_frame::{Frame, ItemCode};
use serde::Serialize;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct FrameOutput<'a> {
    kind: &'static str,
    kind_code: u8,
    control: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    item_code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    item_code_value: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sequence_number: Option<u16>,
    body_len: usize,
    body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    samples: Option<&'a [u32]>,
}

impl<'a> FrameOutput<'a> {
    fn new(frame: &Frame, samples: Option<&'a [u32]>) -> Self {
        let control = frame.kind.is_control();
        let item_code = (control && frame.item_code != ItemCode::None).then_some(frame.item_code);
        Self {
            kind: frame.kind.name(),
            kind_code: frame.kind.ordinal(),
            control,
            item_code: item_code.map(ItemCode::name),
            item_code_value: item_code.map(ItemCode::code),
            sequence_number: (!control).then_some(frame.sequence_number),
            body_len: frame.body.len(),
            body: hex::encode(&frame.body),
            samples,
        }
    }
}

pub fn print_frame(frame: &Frame, samples: Option<&[u32]>, format: OutputFormat) {
    let out = FrameOutput::new(frame, samples);
    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "VALUE"])
                .add_row(vec!["kind".to_string(), format!("{} ({})", out.kind, out.kind_code)]);
            if let Some(item) = item_code_label(&out) {
                table.add_row(vec!["item_code".to_string(), item]);
            }
            if let Some(seq) = out.sequence_number {
                table.add_row(vec!["sequence_number".to_string(), seq.to_string()]);
            }
            table.add_row(vec!["body_len".to_string(), out.body_len.to_string()]);
            table.add_row(vec!["body".to_string(), out.body.clone()]);
            if let Some(samples) = samples {
                table.add_row(vec!["samples".to_string(), join_samples(samples)]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let mut line = format!("kind={} ({})", out.kind, out.kind_code);
            if let Some(item) = item_code_label(&out) {
                let _ = write!(line, " item_code={item}");
            }
            if let Some(seq) = out.sequence_number {
                let _ = write!(line, " seq={seq}");
            }
            let _ = write!(line, " body_len={} body={}", out.body_len, out.body);
            if let Some(samples) = samples {
                let _ = write!(line, " samples=[{}]", join_samples(samples));
            }
            println!("{line}");
        }
        OutputFormat::Raw => print_raw(&frame.body),
    }
}

#[derive(Serialize)]
struct EventOutput {
    event: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    item_code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sequence_number: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    timestamp: String,
}

impl EventOutput {
    fn new(event: &'static str) -> Self {
        Self {
            event,
            kind: None,
            item_code: None,
            sequence_number: None,
            body: None,
            count: None,
            error: None,
            timestamp: now_unix_seconds(),
        }
    }

    fn with_frame(mut self, frame: &Frame) -> Self {
        self.kind = Some(frame.kind.name());
        if frame.kind.is_control() {
            self.item_code = Some(frame.item_code.name());
        } else {
            self.sequence_number = Some(frame.sequence_number);
        }
        self.body = Some(hex::encode(&frame.body));
        self
    }
}

pub fn print_event(event: &ClientEvent, format: OutputFormat) {
    let out = match event {
        ClientEvent::Notification(frame) => EventOutput::new("notification").with_frame(frame),
        ClientEvent::Unexpected(frame) => EventOutput::new("unexpected").with_frame(frame),
        ClientEvent::Malformed { bytes, error } => {
            let mut out = EventOutput::new("malformed");
            out.body = Some(hex::encode(bytes));
            out.error = Some(error.clone());
            out
        }
        ClientEvent::Samples {
            sequence_number,
            count,
        } => {
            let mut out = EventOutput::new("samples");
            out.sequence_number = Some(*sequence_number);
            out.count = Some(*count);
            out
        }
        ClientEvent::ConnectionLost => EventOutput::new("connection_lost"),
    };

    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table | OutputFormat::Pretty | OutputFormat::Raw => {
            let mut line = format!("[{}]", out.event);
            for (key, value) in [
                ("kind", out.kind.map(str::to_string)),
                ("item_code", out.item_code.map(str::to_string)),
                ("seq", out.sequence_number.map(|v| v.to_string())),
                ("count", out.count.map(|v| v.to_string())),
                ("body", out.body),
                ("error", out.error),
            ] {
                if let Some(value) = value {
                    let _ = write!(line, " {key}={value}");
                }
            }
            println!("{line}");
        }
    }
}

/// Result of one interactive session command.
#[derive(Debug, Serialize)]
pub struct SessionStatus {
    pub action: &'static str,
    pub connected: bool,
    pub iq_state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl SessionStatus {
    pub fn new(action: &'static str, connected: bool, iq_state: IqState) -> Self {
        Self {
            action,
            connected,
            iq_state: iq_state.to_string(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

pub fn print_status(status: &SessionStatus, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(status),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["ACTION", "CONNECTED", "IQ", "DETAIL"])
                .add_row(vec![
                    status.action.to_string(),
                    status.connected.to_string(),
                    status.iq_state.clone(),
                    status.detail.clone().unwrap_or_default(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            let mut line = format!(
                "{}: connected={} iq={}",
                status.action, status.connected, status.iq_state
            );
            if let Some(detail) = &status.detail {
                let _ = write!(line, " ({detail})");
            }
            println!("{line}");
        }
    }
}

#[derive(Serialize)]
struct ListeningOutput {
    event: &'static str,
    addr: String,
}

pub fn print_listening(addr: SocketAddr, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&ListeningOutput {
            event: "listening",
            addr: addr.to_string(),
        }),
        _ => println!("listening on {addr}"),
    }
}

#[derive(Serialize)]
struct EmitSummary<'a> {
    event: &'static str,
    target: &'a str,
    sent: u64,
    failed: u64,
}

pub fn print_emit_summary(target: &str, sent: u64, failed: u64, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&EmitSummary {
            event: "emit_finished",
            target,
            sent,
            failed,
        }),
        _ => println!("sent {sent} datagrams to {target} ({failed} failed)"),
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn item_code_label(out: &FrameOutput<'_>) -> Option<String> {
    out.item_code
        .zip(out.item_code_value)
        .map(|(name, value)| format!("{name} (0x{value:04X})"))
}

fn join_samples(samples: &[u32]) -> String {
    samples
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
