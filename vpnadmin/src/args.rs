use std::{net::SocketAddr, path::PathBuf};

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "vpnadmin")]
#[command(about = "Client provisioning API for OpenVPN, Shadowsocks and V2Ray backends")]
pub struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, env = "VPNADMIN_CONFIG", default_value = "./vpnadmin.toml")]
    pub config: PathBuf,

    /// Address to listen on, overrides `server.listen_address`
    #[arg(long, env = "VPNADMIN_LISTEN_ADDRESS")]
    pub listen_address: Option<SocketAddr>,

    /// Log filter, e.g. `info` or `server=debug,registry=debug`
    #[arg(long, env = "VPNADMIN_LOG", default_value = "info")]
    pub log: String,
}
