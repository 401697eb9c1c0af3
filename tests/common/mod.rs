#![allow(dead_code)]

use pos_gateway::application::engine::AuthDecisionEngine;
use pos_gateway::application::server::GatewayServer;
use pos_gateway::config::ServerConfig;
use pos_gateway::infrastructure::in_memory::InMemoryLedger;
use pos_gateway::interfaces::wire::codec::LineCodec;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

pub struct RunningGateway {
    pub addr: SocketAddr,
    pub ledger: InMemoryLedger,
    handle: JoinHandle<()>,
}

impl Drop for RunningGateway {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Starts a gateway on an ephemeral loopback port with a shared in-memory ledger.
pub async fn spawn_gateway() -> RunningGateway {
    let ledger = InMemoryLedger::new();
    let config = ServerConfig {
        read_timeout: Duration::from_millis(1000),
        processing_delay: Duration::from_millis(10),
        ..ServerConfig::default()
    };
    let engine = AuthDecisionEngine::new(Box::new(ledger.clone()), config.processing_delay);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let server = GatewayServer::from_listener(listener, engine, config);
    let addr = server.local_addr().unwrap();
    let handle = tokio::spawn(server.run());

    RunningGateway {
        addr,
        ledger,
        handle,
    }
}

/// A raw line connection to a gateway, for speaking the protocol by hand.
pub async fn connect(addr: SocketAddr) -> LineCodec<TcpStream> {
    let stream = TcpStream::connect(addr).await.unwrap();
    LineCodec::new(stream, 1024, Duration::from_secs(2))
}

/// Returns a loopback port with nothing listening on it.
pub fn unused_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}
