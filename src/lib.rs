mod error;
pub use error::*;
mod endpoint;
pub use endpoint::*;
mod host_key_policy;
pub use host_key_policy::*;
mod ssh_credentials;
pub use ssh_credentials::*;
mod tunnel_settings;
pub use tunnel_settings::*;

mod transport;
pub use transport::*;
mod ssh_session;
pub use ssh_session::*;
mod ssh_channel_stream;
pub use ssh_channel_stream::*;

mod bridge;
pub use bridge::ActiveConnections;
mod connection_forwarder;
pub use connection_forwarder::*;
mod ssh_tunnel;
pub use ssh_tunnel::*;

pub type SshAsyncSession = async_ssh2_lite::AsyncSession<async_ssh2_lite::TokioTcpStream>;

pub type SshAsyncChannel = async_ssh2_lite::AsyncChannel<async_ssh2_lite::TokioTcpStream>;

pub extern crate ssh2;
