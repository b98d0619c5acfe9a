//! One game from first move to final score.
//!
//! The session is split in two layers:
//!
//! - [`Game`] is a synchronous state machine. It takes an [`Event`] from one
//!   side, consults the rules engine and returns a [`Step`]: the frames to
//!   send to each side and, once the game ends, the [`GameRecord`] to persist.
//!   It never touches I/O, so every transition is unit-testable.
//! - [`run_session`] is the async driver. It owns both [`Seat`]s, feeds remote
//!   frames and automated moves into the `Game` and delivers what comes out.
//!
//! ```text
//! AwaitingMove(Black) --pass, pass--> Proposing(p) --proposal--> AwaitingResponse(r)
//!        ^       |                                                 |        |
//!        +-move--+                               counter-proposal -+        +- accept --> Finished
//! ```
//!
//! Resign, quit and disconnect finish the game from any point.

use std::fmt;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument, warn};

use crate::board::{Board, Point, Stone};
use crate::bot::Strategy;
use crate::constants::{INBOX_CAPACITY, PLAYER_BLACK, PLAYER_WHITE};
use crate::movelog::{MoveKind, MoveLog};
use crate::protocol::{Message, ProtocolError, read_message, write_handshake, write_message};
use crate::rules::{MoveError, Rules, Score};
use crate::store::GameStore;

/// Whether a remote player faces the bot or another person.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum Mode {
    #[display("vs-bot")]
    #[serde(rename = "vs-bot")]
    VsBot,
    #[display("vs-human")]
    #[serde(rename = "vs-human")]
    VsHuman,
}

/// Where the game currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for this side to move
    AwaitingMove(Stone),
    /// Both sides passed; this side must submit dead stones
    Proposing(Stone),
    /// This side must accept the pending proposal or counter it
    AwaitingResponse(Stone),
    Finished,
}

/// Something one side did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Place { x: i32, y: i32 },
    Pass,
    Resign,
    Quit,
    Propose(Vec<Point>),
    Accept,
    Chat(String),
    /// The connection dropped or sent garbage
    Disconnect,
}

impl Event {
    /// Map an inbound frame to an event. Frames only the server sends have none.
    pub fn from_message(msg: Message) -> Option<Event> {
        match msg {
            Message::Move { x, y } => Some(Event::Place { x, y }),
            Message::Pass => Some(Event::Pass),
            Message::Surrender => Some(Event::Resign),
            Message::Quit => Some(Event::Quit),
            Message::SendProposal(points) => Some(Event::Propose(points)),
            Message::AcceptProposal => Some(Event::Accept),
            Message::Chat(text) => Some(Event::Chat(text)),
            _ => None,
        }
    }
}

/// Final result of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Black,
    White,
    Draw,
}

impl Outcome {
    pub fn winner(color: Stone) -> Outcome {
        match color {
            Stone::Black => Outcome::Black,
            Stone::White => Outcome::White,
            Stone::Empty => Outcome::Draw,
        }
    }

    fn from_score(score: Score) -> Outcome {
        score.leader().map_or(Outcome::Draw, Outcome::winner)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Black => write!(f, "Black"),
            Outcome::White => write!(f, "White"),
            Outcome::Draw => write!(f, "Draw"),
        }
    }
}

/// Everything worth keeping about a finished game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    pub played_at: DateTime<Utc>,
    pub winner: Outcome,
    pub black_score: u32,
    pub white_score: u32,
    pub mode: Mode,
    pub move_log: String,
}

/// Result of feeding one event to a [`Game`].
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Step {
    /// Frames to deliver, in order, with their recipient
    pub outbox: Vec<(Stone, Message)>,
    /// Set exactly once, on the step that finishes a scored game
    pub record: Option<GameRecord>,
}

impl Step {
    fn send(&mut self, to: Stone, msg: Message) {
        self.outbox.push((to, msg));
    }

    fn broadcast(&mut self, msg: Message) {
        self.outbox.push((Stone::Black, msg.clone()));
        self.outbox.push((Stone::White, msg));
    }

    /// Frames addressed to `side`.
    pub fn to(&self, side: Stone) -> impl Iterator<Item = &Message> {
        self.outbox
            .iter()
            .filter(move |(to, _)| *to == side)
            .map(|(_, msg)| msg)
    }
}

/// State of one game between Black and White.
#[derive(Debug, Clone)]
pub struct Game {
    mode: Mode,
    board: Board,
    rules: Rules,
    log: MoveLog,
    phase: Phase,
    consecutive_passes: u32,
    proposal: Vec<Point>,
}

impl Game {
    pub fn new(size: usize, mode: Mode) -> Self {
        Self {
            mode,
            board: Board::new(size),
            rules: Rules::new(),
            log: MoveLog::new(),
            phase: Phase::AwaitingMove(Stone::Black),
            consecutive_passes: 0,
            proposal: Vec::new(),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    pub fn log(&self) -> &MoveLog {
        &self.log
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    /// The automated side in a vs-bot game. The human always plays Black.
    pub fn bot_color(&self) -> Option<Stone> {
        match self.mode {
            Mode::VsBot => Some(Stone::White),
            Mode::VsHuman => None,
        }
    }

    /// Apply one event from `side`.
    ///
    /// Events that make no sense right now (wrong side, wrong phase, game
    /// over) are logged and produce an empty step.
    pub fn handle(&mut self, side: Stone, event: Event) -> Step {
        match (self.phase, event) {
            (Phase::Finished, event) => {
                debug!(%side, ?event, "game already finished");
                Step::default()
            }
            (_, Event::Chat(text)) => {
                let mut step = Step::default();
                step.send(side.opponent(), Message::Chat(text));
                step
            }
            (_, Event::Quit) => self.quit(side),
            (_, Event::Disconnect) => {
                info!(%side, "side disconnected");
                self.quit(side)
            }
            (Phase::AwaitingMove(active), Event::Place { x, y }) if active == side => self.place(side, x, y),
            (Phase::AwaitingMove(active), Event::Pass) if active == side => self.pass(side),
            (Phase::AwaitingMove(active), Event::Resign) if active == side => self.resign(side),
            (Phase::Proposing(p), Event::Propose(points)) if p == side => self.propose(side, points),
            (Phase::AwaitingResponse(r), Event::Propose(points)) if r == side => self.propose(side, points),
            (Phase::AwaitingResponse(r), Event::Accept) if r == side => self.accept(),
            (phase, event) => {
                warn!(%side, ?phase, ?event, "ignoring out-of-turn event");
                Step::default()
            }
        }
    }

    /// Apply a move chosen by an automated player. A rejected placement becomes a pass.
    pub fn play_choice(&mut self, side: Stone, choice: Option<Point>) -> Step {
        let Some(pt) = choice else {
            return self.handle(side, Event::Pass);
        };
        if self.phase != Phase::AwaitingMove(side) {
            warn!(%side, phase = ?self.phase, "automated move out of turn");
            return Step::default();
        }

        let mut board = self.board.clone();
        match self.rules.clone().try_place(&mut board, pt, side) {
            Ok(_) => {
                let (x, y) = pt.to_wire();
                self.place(side, x, y)
            }
            Err(e) => {
                warn!(%side, point = %pt, error = %e, "automated move rejected, passing");
                self.pass(side)
            }
        }
    }

    fn place(&mut self, side: Stone, x: i32, y: i32) -> Step {
        let mut step = Step::default();
        let result = match Point::from_wire(x, y) {
            Some(pt) => self.rules.try_place(&mut self.board, pt, side).map(|n| (pt, n)),
            None => Err(MoveError::OffBoard),
        };

        let (pt, captured) = match result {
            Ok(done) => done,
            Err(e) => {
                warn!(%side, x, y, error = %e, "rejected move");
                step.send(side, Message::InvalidMove { x, y });
                return step;
            }
        };

        debug!(%side, point = %pt, captured, "stone placed");
        self.log.push(side, MoveKind::Place(pt));
        self.consecutive_passes = 0;

        let captures = self.rules.captures();
        step.broadcast(Message::BoardState(self.board.clone()));
        step.broadcast(Message::Captures {
            black: captures.black as i32,
            white: captures.white as i32,
        });
        step.send(side.opponent(), Message::Move { x, y });
        self.phase = Phase::AwaitingMove(side.opponent());
        step
    }

    fn pass(&mut self, side: Stone) -> Step {
        let mut step = Step::default();
        self.log.push(side, MoveKind::Pass);
        self.rules.pass(&self.board);
        self.consecutive_passes += 1;
        step.send(side.opponent(), Message::Pass);

        if self.consecutive_passes < 2 {
            self.phase = Phase::AwaitingMove(side.opponent());
            return step;
        }

        let proposer = match self.bot_color() {
            Some(bot) => bot.opponent(),
            None => side,
        };
        info!(%proposer, "both sides passed, marking dead stones");
        step.send(proposer, Message::StartMarking(true));
        step.send(proposer.opponent(), Message::StartMarking(false));
        self.phase = Phase::Proposing(proposer);
        step
    }

    fn propose(&mut self, side: Stone, points: Vec<Point>) -> Step {
        let mut step = Step::default();
        debug!(%side, count = points.len(), "dead stone proposal");
        step.send(side.opponent(), Message::ReceiveProposal(points.clone()));
        self.proposal = points;
        self.phase = Phase::AwaitingResponse(side.opponent());
        step
    }

    fn accept(&mut self) -> Step {
        let proposal = std::mem::take(&mut self.proposal);
        let removed = self.rules.remove_dead_groups(&mut self.board, &proposal);
        let score = self.rules.final_score(&self.board);
        debug!(removed, "dead stones removed");

        let mut step = Step::default();
        step.broadcast(Message::BoardState(self.board.clone()));
        step.broadcast(Message::GameOver {
            black: score.black as i32,
            white: score.white as i32,
        });
        step.record = Some(self.finish(Outcome::from_score(score), score));
        step
    }

    fn resign(&mut self, side: Stone) -> Step {
        let mut step = Step::default();
        self.log.push(side, MoveKind::Resign);
        step.send(side.opponent(), Message::Surrender);
        let score = self.rules.final_score(&self.board);
        step.record = Some(self.finish(Outcome::winner(side.opponent()), score));
        step
    }

    fn quit(&mut self, side: Stone) -> Step {
        let mut step = Step::default();
        self.log.push(side, MoveKind::Quit);
        step.send(side.opponent(), Message::Quit);

        match self.mode {
            Mode::VsBot => {
                let score = self.rules.final_score(&self.board);
                step.record = Some(self.finish(Outcome::winner(side.opponent()), score));
            }
            Mode::VsHuman => {
                info!(%side, "game abandoned, nothing recorded");
                self.phase = Phase::Finished;
            }
        }
        step
    }

    fn finish(&mut self, winner: Outcome, score: Score) -> GameRecord {
        self.phase = Phase::Finished;
        info!(
            %winner,
            black = score.black,
            white = score.white,
            stones = self.log.placements(),
            mode = %self.mode,
            "game over"
        );
        GameRecord {
            played_at: Utc::now(),
            winner,
            black_score: score.black,
            white_score: score.white,
            mode: self.mode,
            move_log: self.log.to_string(),
        }
    }
}

// =============================================================================
// Async driver
// =============================================================================

/// Frames decoded from one connection, in arrival order.
pub type Inbox = mpsc::Receiver<Result<Message, ProtocolError>>;

/// One side of the table.
pub enum Seat<W> {
    Remote { inbox: Inbox, writer: W },
    Bot(Arc<Mutex<Box<dyn Strategy>>>),
}

impl<W> Seat<W> {
    pub fn remote(inbox: Inbox, writer: W) -> Self {
        Seat::Remote { inbox, writer }
    }

    pub fn bot(strategy: impl Strategy + 'static) -> Self {
        Seat::Bot(Arc::new(Mutex::new(Box::new(strategy))))
    }

    fn strategy(&self) -> Option<Arc<Mutex<Box<dyn Strategy>>>> {
        match self {
            Seat::Bot(strategy) => Some(Arc::clone(strategy)),
            Seat::Remote { .. } => None,
        }
    }

    fn inbox(&mut self) -> Option<&mut Inbox> {
        match self {
            Seat::Remote { inbox, .. } => Some(inbox),
            Seat::Bot(_) => None,
        }
    }
}

/// Decode frames from `reader` on a background task.
///
/// The task stops after forwarding the first error or once the session drops
/// the receiver.
pub fn spawn_reader<R>(mut reader: R) -> Inbox
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(INBOX_CAPACITY);
    tokio::spawn(async move {
        loop {
            let frame = read_message(&mut reader).await;
            let failed = frame.is_err();
            if tx.send(frame).await.is_err() || failed {
                break;
            }
        }
    });
    rx
}

struct Table<W> {
    black: Seat<W>,
    white: Seat<W>,
}

impl<W> Table<W>
where
    W: AsyncWrite + Unpin + Send,
{
    fn seat(&mut self, side: Stone) -> &mut Seat<W> {
        match side {
            Stone::White => &mut self.white,
            _ => &mut self.black,
        }
    }

    /// Greet every remote side, then report the first one that failed.
    ///
    /// Both sides always get their identifier before any other frame.
    async fn handshake(&mut self) -> Option<Stone> {
        let mut failed = None;
        for (side, id) in [(Stone::Black, PLAYER_BLACK), (Stone::White, PLAYER_WHITE)] {
            if let Seat::Remote { writer, .. } = self.seat(side) {
                if let Err(e) = write_handshake(writer, id, side == Stone::Black).await {
                    warn!(%side, error = %e, "handshake failed");
                    failed = failed.or(Some(side));
                }
            }
        }
        failed
    }

    async fn deliver(&mut self, outbox: Vec<(Stone, Message)>) {
        for (to, msg) in outbox {
            if let Seat::Remote { writer, .. } = self.seat(to) {
                // A dead writer shows up as a disconnect on the reader side
                if let Err(e) = write_message(writer, &msg).await {
                    warn!(side = %to, code = msg.code(), error = %e, "failed to deliver frame");
                }
            }
        }
    }

    /// Wait for the next meaningful event from either remote side.
    async fn next_event(&mut self) -> Option<(Stone, Event)> {
        loop {
            let (side, frame) = match (self.black.inbox(), self.white.inbox()) {
                (Some(black), Some(white)) => tokio::select! {
                    frame = black.recv() => (Stone::Black, frame),
                    frame = white.recv() => (Stone::White, frame),
                },
                (Some(black), None) => (Stone::Black, black.recv().await),
                (None, Some(white)) => (Stone::White, white.recv().await),
                (None, None) => return None,
            };

            match frame {
                None => return Some((side, Event::Disconnect)),
                Some(Err(e)) => {
                    if !e.is_disconnect() {
                        warn!(%side, error = %e, "bad frame, closing side");
                    }
                    return Some((side, Event::Disconnect));
                }
                Some(Ok(msg)) => match Event::from_message(msg.clone()) {
                    Some(event) => return Some((side, event)),
                    None => warn!(%side, code = msg.code(), "ignoring server-only frame"),
                },
            }
        }
    }
}

async fn think(strategy: Arc<Mutex<Box<dyn Strategy>>>, game: &Game, side: Stone) -> Option<Point> {
    let rules = game.rules().clone();
    let board = game.board().clone();
    let task = tokio::task::spawn_blocking(move || {
        let mut player = strategy.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        player.choose_move(&rules, &board, side)
    });
    match task.await {
        Ok(choice) => choice,
        Err(e) => {
            error!(%side, error = %e, "automated player crashed, passing");
            None
        }
    }
}

async fn persist(store: Arc<dyn GameStore>, record: GameRecord) {
    match tokio::task::spawn_blocking(move || store.save(&record)).await {
        Ok(Ok(id)) => info!(id, "game record saved"),
        Ok(Err(e)) => warn!(error = %e, "failed to save game record"),
        Err(e) => warn!(error = %e, "save task failed"),
    }
}

/// Play `game` to the end between two seats.
///
/// Remote seats get their handshake first. The finished record, if any, is
/// handed to `store` and also returned.
#[instrument(skip_all, fields(mode = %game.mode(), size = game.board().size()))]
pub async fn run_session<W>(
    mut game: Game,
    black: Seat<W>,
    white: Seat<W>,
    store: Arc<dyn GameStore>,
) -> Option<GameRecord>
where
    W: AsyncWrite + Unpin + Send,
{
    let mut table = Table { black, white };
    let mut record = None;
    info!("session started");

    if let Some(side) = table.handshake().await {
        let step = game.handle(side, Event::Disconnect);
        table.deliver(step.outbox).await;
        record = step.record;
    }

    while !game.is_finished() {
        let phase = game.phase();
        let automated = match phase {
            Phase::AwaitingMove(side) | Phase::Proposing(side) | Phase::AwaitingResponse(side) => {
                table.seat(side).strategy().map(|strategy| (side, strategy))
            }
            Phase::Finished => None,
        };

        let step = match (phase, automated) {
            (Phase::AwaitingMove(_), Some((side, strategy))) => {
                let choice = think(strategy, &game, side).await;
                game.play_choice(side, choice)
            }
            // Automated sides never veto: no dead stones, and any proposal is fine
            (Phase::Proposing(_), Some((side, _))) => game.handle(side, Event::Propose(Vec::new())),
            (Phase::AwaitingResponse(_), Some((side, _))) => game.handle(side, Event::Accept),
            _ => match table.next_event().await {
                Some((side, event)) => game.handle(side, event),
                None => {
                    warn!("no side can act, abandoning game");
                    break;
                }
            },
        };

        table.deliver(step.outbox).await;
        if step.record.is_some() {
            record = step.record;
        }
    }

    if let Some(record) = &record {
        persist(store, record.clone()).await;
    }
    info!("session closed");
    record
}
