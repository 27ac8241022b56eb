mod cli;
mod logging;

use clap::Parser;
use ssh_reverse_tunnel::{SshRelayTransport, SshTunnel};
use tracing::{error, warn};

use crate::cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init_logging(&cli.log_level);

    let transport = SshRelayTransport::new(cli.get_ssh_connect_timeout());
    let settings = cli.into_tunnel_settings();

    if settings.credentials.get_host_key_policy().is_insecure() {
        warn!(
            "Host key of {} is not verified. Use --host_key_sha256 to pin it",
            settings.server
        );
    }

    let tunnel = SshTunnel::new(settings, transport);

    if let Err(err) = tunnel.start().await {
        error!("Service stopped, {}", err);
        std::process::exit(1);
    }
}
