//! TCP front end: accept connections, read the mode selector and start sessions.
//!
//! A vs-bot connection gets its own session right away. A vs-human connection
//! waits in the [`Lobby`] until a second one arrives; the first becomes Black.
//! A waiting connection that closes before then is dropped from the lobby when
//! the next one arrives.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, bail};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, instrument, warn};

use crate::bot::SmartBot;
use crate::constants::{DEFAULT_PORT, DEFAULT_SIZE, MAX_SIZE, MIN_SIZE};
use crate::protocol::{ProtocolError, read_mode};
use crate::session::{Game, Inbox, Mode, Seat, run_session, spawn_reader};
use crate::store::{GameStore, JsonLinesStore};

/// Settings for [`run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub board_size: usize,
    pub store_path: PathBuf,
    /// Base seed for automated players; `None` seeds from entropy
    pub seed: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            board_size: DEFAULT_SIZE,
            store_path: PathBuf::from("games.jsonl"),
            seed: None,
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !(MIN_SIZE..=MAX_SIZE).contains(&self.board_size) {
            bail!(
                "board size {} is outside {MIN_SIZE}..={MAX_SIZE}",
                self.board_size
            );
        }
        Ok(())
    }
}

/// The single matchmaking slot.
///
/// Pairing is one critical section: a connection either takes the waiting
/// one or becomes the waiting one.
#[derive(Debug)]
pub struct Lobby<T> {
    waiting: Mutex<Option<T>>,
}

impl<T> Default for Lobby<T> {
    fn default() -> Self {
        Self {
            waiting: Mutex::new(None),
        }
    }
}

impl<T> Lobby<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `(first, second)` when `conn` completes a pair, `None` when it is parked.
    ///
    /// A waiting entry for which `has_left` holds is discarded and `conn`
    /// takes its place.
    pub fn pair_or_wait(&self, conn: T, has_left: impl FnOnce(&mut T) -> bool) -> Option<(T, T)> {
        let mut waiting = self.waiting.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(mut first) = waiting.take() {
            if !has_left(&mut first) {
                return Some((first, conn));
            }
            debug!("waiting player left before an opponent arrived");
        }
        *waiting = Some(conn);
        None
    }

    #[cfg(test)]
    fn is_waiting(&self) -> bool {
        self.waiting
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_some()
    }
}

/// A human connection waiting for an opponent.
pub struct PendingConnection {
    peer: SocketAddr,
    inbox: Inbox,
    writer: OwnedWriteHalf,
}

impl PendingConnection {
    /// The reader task ends on EOF or a bad frame, which closes the inbox.
    fn has_left(&mut self) -> bool {
        self.inbox.is_closed()
    }
}

struct Shared {
    config: ServerConfig,
    store: Arc<dyn GameStore>,
    lobby: Lobby<PendingConnection>,
    bots_created: AtomicU64,
}

impl Shared {
    fn new_bot(&self) -> SmartBot {
        let n = self.bots_created.fetch_add(1, Ordering::Relaxed);
        match self.config.seed {
            Some(seed) => SmartBot::with_seed(seed.wrapping_add(n)),
            None => SmartBot::new(),
        }
    }
}

/// Open the store, bind the listener and serve forever.
pub async fn run(config: ServerConfig) -> anyhow::Result<()> {
    config.validate()?;
    let store = JsonLinesStore::open(&config.store_path)
        .with_context(|| format!("failed to open game store {}", config.store_path.display()))?;
    let listener = TcpListener::bind(config.addr())
        .await
        .with_context(|| format!("failed to bind {}", config.addr()))?;
    info!(store = %store.path().display(), "recording finished games");
    serve(listener, config, Arc::new(store)).await
}

/// Accept connections on an already bound listener.
#[instrument(skip_all, fields(addr = ?listener.local_addr().ok(), size = config.board_size))]
pub async fn serve(listener: TcpListener, config: ServerConfig, store: Arc<dyn GameStore>) -> anyhow::Result<()> {
    config.validate()?;
    let shared = Arc::new(Shared {
        config,
        store,
        lobby: Lobby::new(),
        bots_created: AtomicU64::new(0),
    });
    info!("listening");

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!(error = %e, "accept failed");
                continue;
            }
        };
        let shared = Arc::clone(&shared);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer, shared).await {
                warn!(%peer, error = %e, "connection dropped before a game started");
            }
        });
    }
}

#[instrument(skip(stream, shared))]
async fn handle_connection(stream: TcpStream, peer: SocketAddr, shared: Arc<Shared>) -> Result<(), ProtocolError> {
    stream.set_nodelay(true)?;
    let (mut reader, writer) = stream.into_split();
    let mode = read_mode(&mut reader).await?;
    info!(%mode, "client connected");

    let inbox = spawn_reader(reader);
    let size = shared.config.board_size;

    match mode {
        Mode::VsBot => {
            let human = Seat::remote(inbox, writer);
            let bot = Seat::bot(shared.new_bot());
            run_session(Game::new(size, Mode::VsBot), human, bot, Arc::clone(&shared.store)).await;
        }
        Mode::VsHuman => {
            let conn = PendingConnection { peer, inbox, writer };
            let Some((first, second)) = shared.lobby.pair_or_wait(conn, PendingConnection::has_left) else {
                debug!("waiting for an opponent");
                return Ok(());
            };
            info!(black = %first.peer, white = %second.peer, "players paired");
            let black = Seat::remote(first.inbox, first.writer);
            let white = Seat::remote(second.inbox, second.writer);
            run_session(Game::new(size, Mode::VsHuman), black, white, Arc::clone(&shared.store)).await;
        }
    }
    Ok(())
}
