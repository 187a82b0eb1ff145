use clap::Parser;
use miette::{miette, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio_graceful_shutdown::{SubsystemBuilder, SubsystemHandle, Toplevel};

use twinmount_core::targeting::Targeting;
use twinmount_server::bus::{BusHandle, BusTarget};
use twinmount_server::receiver::BusReceiver;
use twinmount_server::settings::Config;
use twinmount_server::ticker::FireControlTicker;
use twinmount_server::{tables, Cli, Session};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    env_logger::Builder::new()
        .filter_level(args.verbose.log_level_filter())
        .parse_default_env()
        .init();

    let config = Config::load(args.config.as_deref()).map_err(|e| miette!("{:#}", e))?;
    log::debug!("Configuration: {:?}", config);

    let tables = tables::load_tables(
        config.firing_table_path(&args),
        config.slope_table_path(&args),
    );
    let targeting = Targeting::new(config.targeting, tables);

    // The one and only bus handle, opened now and kept until exit
    let bus = Arc::new(BusHandle::new(BusTarget::from_args(&args)));
    if let Err(e) = bus.get() {
        log::warn!("Continuing without bus: {}", e);
    }

    let session = Session::new(args, config, targeting);

    Toplevel::new(|s| async move {
        let receiver = BusReceiver::new(session.clone(), bus.clone());
        s.start(SubsystemBuilder::new("bus receiver", |h: SubsystemHandle| {
            receiver.run(h)
        }));

        let ticker = FireControlTicker::new(session, bus);
        s.start(SubsystemBuilder::new("fire control", |h: SubsystemHandle| {
            ticker.run(h)
        }));
    })
    .catch_signals()
    .handle_shutdown_requests(Duration::from_millis(2000))
    .await
    .map_err(Into::into)
}
