//! Game server implementation.
//!
//! One task runs the tick loop; each connection gets its own task that reads
//! commands into the [`CommandIntake`] and writes queued frames back out.

use bytes::{Bytes, BytesMut};
use protocol::packets::{ClientCommand, parse_player_name};
use protocol::{LineReader, ProtocolError};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, error, info, warn};

use crate::config::Config;

pub mod client;
pub mod commands;
pub mod game;

pub use client::{Client, ClientRegistry};
pub use commands::CommandIntake;
pub use game::{GameState, run_game_loop};

/// Frames queued per client before new ones are dropped.
const FRAME_QUEUE_DEPTH: usize = 32;
const READ_BUFFER_SIZE: usize = 1024;

/// Everything the tick loop and the connection tasks share.
///
/// Lock order: `clients` before `game`.
#[derive(Debug)]
pub struct ServerState {
    pub config: Config,
    pub clients: RwLock<ClientRegistry>,
    pub game: RwLock<GameState>,
    pub commands: CommandIntake,
    connections: RwLock<ConnectionState>,
}

impl ServerState {
    pub fn new(config: Config) -> Self {
        let game = GameState::new(&config);
        Self {
            config,
            clients: RwLock::new(ClientRegistry::new()),
            game: RwLock::new(game),
            commands: CommandIntake::new(),
            connections: RwLock::new(ConnectionState::new()),
        }
    }
}

/// Open connection count, including clients still in the handshake.
#[derive(Debug)]
struct ConnectionState {
    total_connections: usize,
}

impl ConnectionState {
    fn new() -> Self {
        Self {
            total_connections: 0,
        }
    }

    /// Try to add a connection, returns true if allowed.
    fn try_add_connection(&mut self, max_total: usize) -> bool {
        if self.total_connections >= max_total {
            return false;
        }
        self.total_connections += 1;
        true
    }

    fn remove_connection(&mut self) {
        self.total_connections = self.total_connections.saturating_sub(1);
    }
}

/// Run the game server.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);
    serve(listener, config).await
}

/// Run the tick loop and accept connections on an already bound listener.
pub async fn serve(listener: TcpListener, config: Config) -> anyhow::Result<()> {
    let state = Arc::new(ServerState::new(config));

    {
        let mut game = state.game.write().await;
        let spawned = game.populate(&mut rand::rng());
        info!(
            "World initialized: size {}, {} walls, {} powerups",
            game.world.size(),
            game.world.walls.len(),
            spawned
        );
    }

    let game_loop_state = Arc::clone(&state);
    let tick_interval = state.config.server.tick_interval_ms;
    tokio::spawn(async move {
        run_game_loop(game_loop_state, tick_interval).await;
    });

    let max_connections = state.config.server.max_connections;
    loop {
        let (stream, addr) = listener.accept().await?;

        if !state.connections.write().await.try_add_connection(max_connections) {
            warn!("Connection rejected (limit reached): {}", addr);
            continue;
        }

        let state = Arc::clone(&state);
        tokio::spawn(async move {
            let result = handle_connection(stream, addr, Arc::clone(&state)).await;

            // Always remove from connection tracking when done
            state.connections.write().await.remove_connection();

            if let Err(e) = result {
                error!("Connection error from {}: {}", addr, e);
            }
        });
    }
}

/// Handle a single connection: name handshake, then commands in and frames
/// out until either side closes.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    state: Arc<ServerState>,
) -> anyhow::Result<()> {
    info!("New connection from {}", addr);
    stream.set_nodelay(true)?;
    let (mut read, mut write) = stream.into_split();
    let mut lines = LineReader::new();
    let mut buf = BytesMut::with_capacity(READ_BUFFER_SIZE);

    let max_name_length = state.config.server.max_name_length;
    let Some(name) = read_name(&mut read, &mut lines, &mut buf, addr, max_name_length).await? else {
        info!("Client {} disconnected before sending a name", addr);
        return Ok(());
    };

    let (tx, mut rx) = mpsc::channel::<Bytes>(FRAME_QUEUE_DEPTH);
    let client_id = join(&state, addr, name, tx).await?;

    let result = loop {
        // Commands that arrived in the same read as earlier lines.
        while let Some(line) = lines.next_line() {
            handle_line(&state, client_id, line);
        }

        tokio::select! {
            received = read.read_buf(&mut buf) => {
                match received {
                    Ok(0) => break Ok(()),
                    Ok(_) => {
                        lines.extend(&buf[..]);
                        buf.clear();
                    }
                    Err(e) => break Err(e.into()),
                }
            }
            frame = rx.recv() => {
                let Some(frame) = frame else {
                    // Dropped from the registry by the tick loop.
                    break Ok(());
                };
                if let Err(e) = write.write_all(&frame).await {
                    break Err(e.into());
                }
            }
        }
    };

    disconnect(&state, client_id).await;
    result
}

/// Read until the first complete line and turn it into a player name.
/// Returns `None` if the peer closed first.
async fn read_name(
    read: &mut OwnedReadHalf,
    lines: &mut LineReader,
    buf: &mut BytesMut,
    addr: SocketAddr,
    max_name_length: usize,
) -> anyhow::Result<Option<String>> {
    loop {
        while let Some(line) = lines.next_line() {
            match line {
                Ok(line) => return Ok(Some(parse_player_name(&line, max_name_length))),
                Err(e) => warn!("Bad handshake line from {}: {}", addr, e),
            }
        }
        if read.read_buf(buf).await? == 0 {
            return Ok(None);
        }
        lines.extend(&buf[..]);
        buf.clear();
    }
}

fn handle_line(state: &ServerState, client_id: u32, line: Result<String, ProtocolError>) {
    match line.and_then(|line| ClientCommand::parse(&line)) {
        Ok(ClientCommand::Move(dir)) => state.commands.set_pending(client_id, dir),
        Err(e) => debug!("Ignoring line from client {}: {}", client_id, e),
    }
}

/// Register a named client: create its snake and queue the handshake ahead
/// of any frame.
async fn join(
    state: &ServerState,
    addr: SocketAddr,
    name: String,
    tx: mpsc::Sender<Bytes>,
) -> anyhow::Result<u32> {
    let mut clients = state.clients.write().await;
    let client_id = clients.allocate_id();
    let handshake = {
        let mut game = state.game.write().await;
        game.add_player(client_id, name.clone(), &mut rand::rng())?
    };
    tx.try_send(handshake)?;

    info!("Client {} joined as {:?} from {}", client_id, name, addr);
    clients.insert(Client::new(client_id, addr, tx));
    Ok(client_id)
}

/// Remove a client and flag its snake. Safe to call more than once.
pub(crate) async fn disconnect(state: &ServerState, client_id: u32) {
    let mut clients = state.clients.write().await;
    let Some(client) = clients.remove(client_id) else {
        return;
    };
    state.game.write().await.remove_player(client_id);
    state.commands.forget(client_id);
    info!("Client {} ({}) disconnected", client.id, client.addr);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_limit() {
        let mut conns = ConnectionState::new();
        assert!(conns.try_add_connection(2));
        assert!(conns.try_add_connection(2));
        assert!(!conns.try_add_connection(2));
        conns.remove_connection();
        assert!(conns.try_add_connection(2));
    }

    #[tokio::test]
    async fn test_join_and_disconnect() {
        let state = ServerState::new(Config::default());
        let (tx, mut rx) = mpsc::channel(4);
        let addr: SocketAddr = "127.0.0.1:9".parse().unwrap();

        let id = join(&state, addr, "zed".into(), tx).await.unwrap();
        let handshake = rx.try_recv().unwrap();
        assert!(handshake.starts_with(format!("{id}\n2000\n").as_bytes()));
        assert!(state.clients.read().await.contains(id));
        assert!(state.game.read().await.world.snakes.contains_key(&id));

        state.commands.set_pending(id, protocol::Direction::Up);
        disconnect(&state, id).await;
        disconnect(&state, id).await;
        assert!(state.clients.read().await.is_empty());
        assert!(state.commands.is_empty());
        assert!(state.game.read().await.world.snakes[&id].disconnected);
    }
}
