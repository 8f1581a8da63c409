use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use rapidbus_tools::{
    config::LiveFeedArgs,
    live_feed::{FeedSession, SessionEvent, SocketHandle, connect},
    telemetry,
};
use tokio::{select, signal, spawn, sync::mpsc::channel};
use tracing::{error, info, warn};

#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    let args = LiveFeedArgs::parse();

    let _telemetry = match telemetry::init("live_feed", &args.log) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {e:#}");
            return ExitCode::from(2);
        }
    };

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:?}");
            eprintln!("Error: {e:#}");
            ExitCode::from(2)
        }
    }
}

async fn run(args: LiveFeedArgs) -> anyhow::Result<()> {
    let (session_sender, session_receiver) = channel::<SessionEvent<SocketHandle>>(64);

    let session = FeedSession::new(
        args.reload_request(),
        args.reload_timing(),
        std::io::stdout(),
    );
    let mut session_task = spawn(session.run(session_receiver));

    let socket = connect(&args.url, &args.origin, session_sender)
        .await
        .context("couldn't connect to the live feed")?;

    select! {
        res = &mut session_task => {
            res?;
            info!("session ended");
        },
        res = signal::ctrl_c() => {
            res?;
            info!("shutting down");
            if let Err(e) = socket.disconnect().await {
                warn!("error disconnecting: {e}");
            }
        },
    }

    session_task.abort();

    Ok(())
}
