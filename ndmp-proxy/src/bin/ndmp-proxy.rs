// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

use std::net::{IpAddr, Ipv4Addr, TcpListener};
use std::sync::Arc;

use clap::Parser;
use log::{info, warn};

use ndmp_proxy::{handle_connection, MemoryTapeBackend, Session};

#[derive(Debug, Parser)]
struct Cli {
    /// Port to listen on. Falls back to AMANDA_NDMP_PROXY_PORT, then 0 (OS-assigned).
    #[arg(long)]
    port: Option<u16>,

    #[arg(long, default_value = "127.0.0.1")]
    bind_address: String,

    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn resolved_port(&self) -> u16 {
        self.port
            .or_else(|| std::env::var("AMANDA_NDMP_PROXY_PORT").ok()?.parse().ok())
            .unwrap_or(0)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level.to_string()))
        .init();

    let port = cli.resolved_port();

    let listener = TcpListener::bind((cli.bind_address.as_str(), port))?;
    let local_addr = listener.local_addr()?;
    info!("ndmp-proxy listening on {local_addr}");
    println!("PORT {}", local_addr.port());

    let session = Arc::new(Session::new());

    for stream in listener.incoming() {
        let stream = match stream {
            Ok(stream) => stream,
            Err(e) => {
                warn!("error accepting connection: {e}");
                continue;
            }
        };

        let peer = stream.peer_addr().ok();
        let from_loopback = matches!(
            peer.map(|addr| addr.ip()),
            Some(IpAddr::V4(ip)) if ip == Ipv4Addr::LOCALHOST
        );

        let session = Arc::clone(&session);
        std::thread::spawn(move || {
            if let Err(e) = handle_connection(stream, from_loopback, session, || {
                Box::new(MemoryTapeBackend::new())
            }) {
                warn!("connection ended with an error: {e}");
            }
        });
    }

    Ok(())
}
