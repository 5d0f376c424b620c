//! End-to-end over real sockets: a client logs in, receives the level, and
//! chats; rejected clients get their reason before the socket closes.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

use classic_engine::world::grid::VoxelGrid;
use classic_engine::world::position::Dimensions;

use classic_server::config::ServerConfig;
use classic_server::generator::{FlatGenerator, Generator};
use classic_server::net::{handler, listener};
use classic_server::protocol::outbound::packet_length;
use classic_server::protocol::{Inbound, Outbound, PROTOCOL_VERSION, SELF_ID};
use classic_server::server::{Collaborators, Server};

const WAIT: Duration = Duration::from_secs(5);

async fn start(config: ServerConfig) -> (Arc<Server>, SocketAddr) {
    let mut grid = VoxelGrid::new(Dimensions::new(16, 16, 16).unwrap());
    FlatGenerator.fill(&mut grid);
    let server = Server::new(config, grid, Collaborators::default()).unwrap();

    let socket = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();
    tokio::spawn(listener::serve(Arc::clone(&server), socket));
    (server, addr)
}

async fn login(addr: SocketAddr, name: &str, key: &str) -> TcpStream {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let hello = Inbound::Identification {
        protocol_version: PROTOCOL_VERSION,
        username: name.into(),
        verify_key: key.into(),
        unused: 0,
    };
    stream.write_all(&hello.to_bytes()).await.unwrap();
    stream
}

/// Read exactly one server packet.
async fn read_packet(stream: &mut TcpStream) -> Outbound {
    let kind = timeout(WAIT, stream.read_u8()).await.unwrap().unwrap();
    let len = packet_length(kind).unwrap_or_else(|| panic!("unknown packet 0x{:02x}", kind));
    let mut frame = vec![0u8; len];
    frame[0] = kind;
    timeout(WAIT, stream.read_exact(&mut frame[1..]))
        .await
        .unwrap()
        .unwrap();
    Outbound::decode(&mut &frame[..]).unwrap()
}

/// Read packets until one matches `pred`, returning everything read.
async fn read_until(stream: &mut TcpStream, pred: impl Fn(&Outbound) -> bool) -> Vec<Outbound> {
    let mut seen = Vec::new();
    loop {
        let packet = read_packet(stream).await;
        let done = pred(&packet);
        seen.push(packet);
        if done {
            return seen;
        }
    }
}

#[tokio::test]
async fn client_logs_in_and_chats() {
    let (server, addr) = start(ServerConfig::default()).await;
    let mut client = login(addr, "alice", "").await;

    match read_packet(&mut client).await {
        Outbound::ServerIdentification {
            protocol_version,
            name,
            ..
        } => {
            assert_eq!(protocol_version, PROTOCOL_VERSION);
            assert_eq!(name, "Classic Server");
        }
        other => panic!("expected identification, got {:?}", other),
    }
    assert_eq!(read_packet(&mut client).await, Outbound::LevelInitialize);

    let level = read_until(&mut client, |p| matches!(p, Outbound::LevelFinalize { .. })).await;
    assert_eq!(
        level.last(),
        Some(&Outbound::LevelFinalize {
            size_x: 16,
            size_y: 16,
            size_z: 16
        })
    );

    let rest = read_until(&mut client, |p| {
        matches!(p, Outbound::Message { text, .. } if text.ends_with("joined the game"))
    })
    .await;
    assert!(rest.iter().any(|p| matches!(
        p,
        Outbound::SpawnPlayer { player_id, .. } if *player_id == SELF_ID
    )));

    let say = Inbound::Message {
        unused: 0xff,
        text: "hello".into(),
    };
    client.write_all(&say.to_bytes()).await.unwrap();
    let echo = read_until(&mut client, |p| matches!(p, Outbound::Message { .. })).await;
    match echo.last() {
        Some(Outbound::Message { text, .. }) => assert_eq!(text, "alice: hello"),
        other => panic!("expected chat, got {:?}", other),
    }

    assert_eq!(server.registry().active_players().len(), 1);
}

#[tokio::test]
async fn wrong_key_gets_reason_then_eof() {
    let config = ServerConfig {
        verify_key: "s3cret".into(),
        ..ServerConfig::default()
    };
    let (_server, addr) = start(config).await;
    let mut client = login(addr, "guest", "wrong").await;

    assert_eq!(
        read_packet(&mut client).await,
        Outbound::Disconnect {
            reason: handler::NOT_VERIFIED.into()
        }
    );
    let mut rest = Vec::new();
    let n = timeout(WAIT, client.read_to_end(&mut rest))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(n, 0);
}

#[tokio::test]
async fn full_server_turns_clients_away() {
    let config = ServerConfig {
        max_players: 1,
        ..ServerConfig::default()
    };
    let (_server, addr) = start(config).await;

    let mut first = login(addr, "alice", "").await;
    assert!(matches!(
        read_packet(&mut first).await,
        Outbound::ServerIdentification { .. }
    ));

    let mut second = TcpStream::connect(addr).await.unwrap();
    assert_eq!(
        read_packet(&mut second).await,
        Outbound::Disconnect {
            reason: handler::SERVER_FULL.into()
        }
    );
}

#[tokio::test]
async fn stop_closes_connected_clients() {
    let (server, addr) = start(ServerConfig::default()).await;
    let mut client = login(addr, "alice", "").await;
    read_until(&mut client, |p| {
        matches!(p, Outbound::Message { text, .. } if text.ends_with("joined the game"))
    })
    .await;

    let runner = tokio::spawn({
        let server = Arc::clone(&server);
        async move { server.run().await }
    });
    server.request_stop("&cmaintenance");

    let seen = read_until(&mut client, |p| matches!(p, Outbound::Disconnect { .. })).await;
    assert_eq!(
        seen.last(),
        Some(&Outbound::Disconnect {
            reason: "&cmaintenance".into()
        })
    );

    timeout(Duration::from_secs(10), runner)
        .await
        .unwrap()
        .unwrap();
    assert!(server.registry().is_empty());
}
