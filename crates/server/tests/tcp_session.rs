use serde_json::Value;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

type LineStream = Lines<BufReader<OwnedReadHalf>>;

async fn start_server() -> SocketAddr {
    let mut config = server::Config::default();
    config.server.tick_interval_ms = 10;
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(server::serve(listener, config));
    addr
}

async fn connect(addr: SocketAddr, name: &str) -> (LineStream, OwnedWriteHalf) {
    let stream = TcpStream::connect(addr).await.unwrap();
    let (read, mut write) = stream.into_split();
    write.write_all(format!("{name}\n").as_bytes()).await.unwrap();
    (BufReader::new(read).lines(), write)
}

async fn next_line(lines: &mut LineStream) -> String {
    timeout(Duration::from_secs(5), lines.next_line())
        .await
        .expect("timed out waiting for a line")
        .unwrap()
        .expect("server closed the connection")
}

/// Skip to the next broadcast line describing the snake with `id`.
async fn next_snake(lines: &mut LineStream, id: u64) -> Value {
    loop {
        let value: Value = serde_json::from_str(&next_line(lines).await).unwrap();
        if value.get("name").is_some() && value["id"] == id {
            return value;
        }
    }
}

/// Read the id, size and wall lines.
async fn read_handshake(lines: &mut LineStream) -> u64 {
    let id: u64 = next_line(lines).await.parse().unwrap();
    assert_eq!(next_line(lines).await, "2000");
    for _ in 0..3 {
        let wall: Value = serde_json::from_str(&next_line(lines).await).unwrap();
        assert!(wall.get("p1").is_some() && wall.get("p2").is_some());
    }
    id
}

#[tokio::test]
async fn test_handshake_then_frames() {
    let addr = start_server().await;
    let (mut lines, mut write) = connect(addr, "  a very long player name\r").await;
    let id = read_handshake(&mut lines).await;

    let snake = next_snake(&mut lines, id).await;
    assert_eq!(snake["name"], "a very long play");
    assert_eq!(snake["joined"], true);
    assert_eq!(snake["alive"], true);
    assert_eq!(snake["score"], 0);
    assert_eq!(snake["body"].as_array().unwrap().len(), 2);

    // Garbage is ignored; the session keeps going.
    write
        .write_all(b"{\"moving\":\"sideways\"}\nnot json\n{\"moving\":\"up\"}\n")
        .await
        .unwrap();
    let snake = next_snake(&mut lines, id).await;
    assert_eq!(snake["joined"], false);
    let later = next_snake(&mut lines, id).await;
    assert_eq!(later["id"], id);
}

#[tokio::test]
async fn test_peer_sees_disconnect() {
    let addr = start_server().await;
    let (mut lines_a, _write_a) = connect(addr, "a").await;
    let id_a = read_handshake(&mut lines_a).await;
    let (mut lines_b, write_b) = connect(addr, "b").await;
    let id_b = read_handshake(&mut lines_b).await;
    assert_ne!(id_a, id_b);

    next_snake(&mut lines_a, id_b).await;
    drop(write_b);
    drop(lines_b);

    // Broadcast once with the flag set, then gone.
    let snake = timeout(Duration::from_secs(10), async {
        loop {
            let snake = next_snake(&mut lines_a, id_b).await;
            if snake["disconnected"] == true {
                return snake;
            }
        }
    })
    .await
    .expect("disconnect was never broadcast");
    assert_eq!(snake["alive"], false);
}
