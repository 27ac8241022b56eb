use std::time::Duration;

use clap::{value_parser, Parser};
use ssh_reverse_tunnel::{
    HostKeyPolicy, SshCredentials, TunnelSettings, DEFAULT_LOCAL_PORT, DEFAULT_SSH_PORT,
};

/// Expose a local TCP port on a remote SSH relay (reverse tunnel).
#[derive(Debug, Parser)]
#[command(name = "ssh-reverse-tunnel", version, about)]
pub struct Cli {
    /// The local port to forward to
    #[arg(
        short = 'p',
        long = "port",
        default_value_t = DEFAULT_LOCAL_PORT,
        value_parser = value_parser!(u16).range(1..)
    )]
    pub port: u16,

    /// The remote server ip address
    #[arg(long = "remote_ip", value_parser = non_empty)]
    pub remote_ip: String,

    /// The remote port to listen on the remote server
    #[arg(short = 'r', long = "remote_port", value_parser = value_parser!(u16).range(1..))]
    pub remote_port: u16,

    /// The user to ssh to the remote server
    #[arg(short = 'u', long = "remote_user", value_parser = non_empty)]
    pub remote_user: String,

    /// The password to ssh to the remote server
    #[arg(long = "remote_password")]
    pub remote_password: String,

    /// SSH port of the remote server
    #[arg(
        long = "ssh_port",
        default_value_t = DEFAULT_SSH_PORT,
        value_parser = value_parser!(u16).range(1..)
    )]
    pub ssh_port: u16,

    /// Pin the relay host key by SHA-256 fingerprint (hex). Host key is not checked when omitted
    #[arg(long = "host_key_sha256", value_parser = HostKeyPolicy::sha256_fingerprint)]
    pub host_key_sha256: Option<HostKeyPolicy>,

    /// Seconds to wait for the local port to accept a connection
    #[arg(
        long = "local_dial_timeout",
        default_value_t = 60,
        value_parser = value_parser!(u64).range(1..)
    )]
    pub local_dial_timeout: u64,

    /// Seconds to wait for connect, handshake and authentication with the relay
    #[arg(
        long = "ssh_connect_timeout",
        default_value_t = 30,
        value_parser = value_parser!(u64).range(1..)
    )]
    pub ssh_connect_timeout: u64,

    /// Log filter used when RUST_LOG is not set
    #[arg(long = "log_level", default_value = "debug", value_parser = log_filter)]
    pub log_level: String,
}

impl Cli {
    pub fn into_tunnel_settings(self) -> TunnelSettings {
        let mut credentials = SshCredentials::new(self.remote_user, self.remote_password);

        if let Some(policy) = self.host_key_sha256 {
            credentials = credentials.with_host_key_policy(policy);
        }

        TunnelSettings::new(self.port, self.remote_ip, self.remote_port, credentials)
            .with_ssh_port(self.ssh_port)
            .with_local_dial_timeout(Duration::from_secs(self.local_dial_timeout))
    }

    pub fn get_ssh_connect_timeout(&self) -> Duration {
        Duration::from_secs(self.ssh_connect_timeout)
    }
}

fn non_empty(src: &str) -> Result<String, String> {
    let src = src.trim();
    if src.is_empty() {
        return Err("value can not be empty".to_string());
    }

    Ok(src.to_string())
}

fn log_filter(src: &str) -> Result<String, String> {
    tracing_subscriber::EnvFilter::try_new(src).map_err(|err| err.to_string())?;
    Ok(src.to_string())
}
