use std::net::SocketAddr;

use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

use crate::cmd::{runtime, EchoArgs};
use crate::exit::{io_error, CliResult, SUCCESS};
use crate::output::{print_listening, OutputFormat};

pub fn run(args: EchoArgs, format: OutputFormat) -> CliResult<i32> {
    runtime()?.block_on(serve(args, format))
}

async fn serve(args: EchoArgs, format: OutputFormat) -> CliResult<i32> {
    let addr = format!("{}:{}", args.bind, args.port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|err| io_error(&format!("bind {addr} failed"), err))?;
    let local = listener
        .local_addr()
        .map_err(|err| io_error("local address unavailable", err))?;

    print_listening(local, format);
    tracing::info!(addr = %local, "echo server started");

    let shutdown = CancellationToken::new();
    loop {
        let accepted = tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            accepted = listener.accept() => accepted,
        };
        match accepted {
            Ok((stream, peer)) => {
                tracing::info!(peer = %peer, "client connected");
                tokio::spawn(echo_client(stream, peer, shutdown.clone()));
            }
            Err(err) => tracing::warn!(error = %err, "accept failed"),
        }
    }

    shutdown.cancel();
    tracing::info!("echo server stopped");
    Ok(SUCCESS)
}

async fn echo_client(mut stream: TcpStream, peer: SocketAddr, shutdown: CancellationToken) {
    let (mut reader, mut writer) = stream.split();
    let copied = tokio::select! {
        _ = shutdown.cancelled() => None,
        copied = tokio::io::copy(&mut reader, &mut writer) => Some(copied),
    };

    match copied {
        Some(Ok(bytes)) => tracing::info!(peer = %peer, bytes, "client disconnected"),
        Some(Err(err)) => tracing::warn!(peer = %peer, error = %err, "echo failed"),
        None => {
            let _ = writer.shutdown().await;
        }
    }
}
