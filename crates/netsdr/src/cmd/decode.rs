use netsdr_frame::{decode_frame, decode_samples};

use crate::cmd::DecodeArgs;
use crate::exit::{frame_error, hex_error, CliResult, SUCCESS};
use crate::output::{print_frame, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let bytes = parse_hex(&args.hex)?;
    let frame = decode_frame(&bytes).map_err(|err| frame_error("decode failed", err))?;

    let samples = if args.samples {
        let samples = decode_samples(args.bits, &frame.body)
            .map_err(|err| frame_error("sample decode failed", err))?;
        Some(samples.collect::<Vec<u32>>())
    } else {
        None
    };

    if bytes.len() > frame.wire_size() {
        tracing::debug!(
            extra = bytes.len() - frame.wire_size(),
            "ignoring bytes past the declared length"
        );
    }

    print_frame(&frame, samples.as_deref(), format);
    Ok(SUCCESS)
}

fn parse_hex(input: &str) -> CliResult<Vec<u8>> {
    let trimmed = input.trim();
    let trimmed = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let digits: String = trimmed
        .chars()
        .filter(|c| !matches!(c, ' ' | ':' | '-' | '\t'))
        .collect();

    hex::decode(&digits).map_err(|err| hex_error("invalid hex input", err))
}
