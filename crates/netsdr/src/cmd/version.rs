use netsdr_client::{DEFAULT_SAMPLE_FILE, DEFAULT_SAMPLE_RATE};
use netsdr_transport::{DEFAULT_CONTROL_PORT, DEFAULT_DATA_PORT};

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("netsdr {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: netsdr");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("NETSDR_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));
    println!("features: client={}, cli=true", cfg!(feature = "client"));
    println!(
        "defaults: control_port={DEFAULT_CONTROL_PORT} data_port={DEFAULT_DATA_PORT} \
         sample_rate={DEFAULT_SAMPLE_RATE} sample_file={DEFAULT_SAMPLE_FILE}"
    );

    Ok(SUCCESS)
}
