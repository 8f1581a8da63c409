use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use rapidbus_tools::{
    config::StopsArgs,
    kiosk::{KioskClient, ResolveError, fetch_routes, resolve_stops},
    telemetry,
};
use tracing::error;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = StopsArgs::parse();

    if args.is_missing_request() {
        eprintln!("{}", StopsArgs::USAGE);
        return ExitCode::from(1);
    }

    let _telemetry = match telemetry::init("get_bus_stops", &args.log) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {e:#}");
            return ExitCode::from(2);
        }
    };

    match run(&args).await {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            let status = match e.downcast_ref::<ResolveError>() {
                Some(ResolveError::Fetch(fetch)) => fetch.status(),
                _ => None,
            };
            error!(?status, "{e:?}");
            eprintln!("Error: {e:#}");
            ExitCode::from(2)
        }
    }
}

async fn run(args: &StopsArgs) -> anyhow::Result<String> {
    let kiosk = KioskClient::new(&args.base_url).context("couldn't build the HTTP client")?;

    let output = match args.route() {
        Some(route) => serde_json::to_string_pretty(&resolve_stops(&kiosk, route).await?)?,
        None => serde_json::to_string_pretty(&fetch_routes(&kiosk).await?)?,
    };

    Ok(output)
}
