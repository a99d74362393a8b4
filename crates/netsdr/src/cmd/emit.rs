use netsdr_frame::{encode_data_item, MessageKind};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::net::UdpSocket;
use tokio::time::MissedTickBehavior;

use crate::cmd::{parse_duration, runtime, EmitArgs};
use crate::exit::{frame_error, io_error, CliResult, SUCCESS};
use crate::output::{print_emit_summary, OutputFormat};

/// Random bytes per datagram; with header and counter the message is 1028 bytes.
pub const DUMMY_SAMPLE_BYTES: usize = 1024;

pub fn run(args: EmitArgs, format: OutputFormat) -> CliResult<i32> {
    let interval = parse_duration(&args.interval)?;
    runtime()?.block_on(emit(args, interval, format))
}

async fn emit(args: EmitArgs, interval: std::time::Duration, format: OutputFormat) -> CliResult<i32> {
    let target = format!("{}:{}", args.host, args.port);
    let socket = UdpSocket::bind("0.0.0.0:0")
        .await
        .map_err(|err| io_error("bind failed", err))?;

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut rng = StdRng::from_entropy();
    let mut counter: u16 = 0;
    let (mut sent, mut failed) = (0u64, 0u64);

    tracing::info!(target = %target, interval = ?interval, "emitting IQ datagrams");
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = ticker.tick() => {}
        }

        counter = counter.wrapping_add(1);
        let datagram = dummy_datagram(counter, &mut rng)?;
        match socket.send_to(&datagram, &target).await {
            Ok(_) => {
                sent += 1;
                tracing::info!(target = %target, counter, "datagram sent");
            }
            Err(err) => {
                failed += 1;
                tracing::warn!(target = %target, error = %err, "datagram send failed");
            }
        }

        if args.count.is_some_and(|count| sent + failed >= count) {
            break;
        }
    }

    print_emit_summary(&target, sent, failed, format);
    Ok(SUCCESS)
}

/// A `DataItem0` message: 16-bit counter followed by random sample bytes.
fn dummy_datagram(counter: u16, rng: &mut impl Rng) -> CliResult<Vec<u8>> {
    let mut payload = vec![0u8; 2 + DUMMY_SAMPLE_BYTES];
    payload[..2].copy_from_slice(&counter.to_le_bytes());
    rng.fill(&mut payload[2..]);

    let message = encode_data_item(MessageKind::DataItem0, &payload)
        .map_err(|err| frame_error("datagram encode failed", err))?;
    Ok(message.to_vec())
}

#[cfg(test)]
mod tests {
    use netsdr_frame::decode_frame;

    use super::*;

    #[test]
    fn dummy_datagram_layout() {
        let mut rng = StdRng::seed_from_u64(7);
        let datagram = dummy_datagram(0x0102, &mut rng).unwrap();

        assert_eq!(datagram.len(), 1028);
        assert_eq!(&datagram[..4], &[0x04, 0x84, 0x02, 0x01]);

        let frame = decode_frame(&datagram).unwrap();
        assert_eq!(frame.kind, MessageKind::DataItem0);
        assert_eq!(frame.sequence_number, 0x0102);
        assert_eq!(frame.body.len(), DUMMY_SAMPLE_BYTES);
    }
}
