//! End-to-end session tests: the state machine, the async driver over
//! in-memory pipes, and the TCP server.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream, WriteHalf};
use tokio::net::{TcpListener, TcpStream};

use go_arena::board::{Point, Stone};
use go_arena::bot::SmartBot;
use go_arena::constants::{MODE_BOT, MODE_HUMAN, PLAYER_BLACK, PLAYER_WHITE};
use go_arena::movelog::{MoveLog, replay};
use go_arena::protocol::{Message, read_message, write_message};
use go_arena::server::{ServerConfig, serve};
use go_arena::session::{Event, Game, Mode, Outcome, Phase, Seat, run_session, spawn_reader};
use go_arena::store::MemoryStore;

// =============================================================================
// Helpers
// =============================================================================

const WAIT: Duration = Duration::from_secs(10);

type ServerSeat = Seat<WriteHalf<DuplexStream>>;

/// A remote seat and the client end of its pipe.
fn remote() -> (ServerSeat, DuplexStream) {
    let (client, server) = tokio::io::duplex(16 * 1024);
    let (read, write) = tokio::io::split(server);
    (Seat::remote(spawn_reader(read), write), client)
}

async fn recv<S>(client: &mut S) -> Message
where
    S: tokio::io::AsyncRead + Unpin,
{
    tokio::time::timeout(WAIT, read_message(client))
        .await
        .expect("timed out waiting for a frame")
        .expect("bad frame")
}

async fn recv_int<S>(client: &mut S) -> i32
where
    S: tokio::io::AsyncRead + Unpin,
{
    tokio::time::timeout(WAIT, client.read_i32())
        .await
        .expect("timed out waiting for handshake")
        .expect("handshake")
}

async fn send<S>(client: &mut S, msg: Message)
where
    S: tokio::io::AsyncWrite + Unpin,
{
    write_message(client, &msg).await.unwrap();
}

// =============================================================================
// State machine
// =============================================================================

#[test]
fn test_two_passes_start_negotiation_with_second_passer() {
    let mut game = Game::new(9, Mode::VsHuman);
    game.handle(Stone::Black, Event::Place { x: 2, y: 2 });
    game.handle(Stone::White, Event::Pass);
    assert_eq!(game.phase(), Phase::AwaitingMove(Stone::Black));

    let step = game.handle(Stone::Black, Event::Pass);
    assert_eq!(game.phase(), Phase::Proposing(Stone::Black));
    assert!(step.to(Stone::Black).any(|m| *m == Message::StartMarking(true)));
    assert!(step.to(Stone::White).any(|m| *m == Message::StartMarking(false)));
}

#[test]
fn test_record_log_replays_to_final_position() {
    let mut game = Game::new(5, Mode::VsHuman);
    for (side, x, y) in [
        (Stone::Black, 1, 0),
        (Stone::White, 1, 1),
        (Stone::Black, 0, 1),
        (Stone::White, 4, 4),
        (Stone::Black, 2, 1),
        (Stone::White, 4, 3),
        (Stone::Black, 1, 2),
    ] {
        game.handle(side, Event::Place { x, y });
    }
    game.handle(Stone::White, Event::Pass);
    game.handle(Stone::Black, Event::Pass);
    game.handle(Stone::Black, Event::Propose(Vec::new()));
    let record = game.handle(Stone::White, Event::Accept).record.unwrap();

    let log = MoveLog::parse(&record.move_log, 5).unwrap();
    let (board, rules) = replay(&log, 5).unwrap();
    assert_eq!(&board, game.board());
    assert_eq!(rules.captures(), game.rules().captures());
    assert_eq!(rules.captures().black, 1);
}

#[test]
fn test_record_log_replays_to_position_before_negotiation() {
    let mut game = Game::new(5, Mode::VsHuman);
    for (side, x, y) in [
        (Stone::Black, 1, 0),
        (Stone::White, 1, 1),
        (Stone::Black, 0, 1),
        (Stone::White, 4, 4),
        (Stone::Black, 2, 1),
        (Stone::White, 4, 3),
        (Stone::Black, 1, 2),
    ] {
        game.handle(side, Event::Place { x, y });
    }
    game.handle(Stone::White, Event::Pass);
    game.handle(Stone::Black, Event::Pass);
    let before = game.board().clone();
    let captures_before = game.rules().captures();

    let dead = vec![Point::new(4, 4), Point::new(4, 3)];
    game.handle(Stone::Black, Event::Propose(dead));
    let record = game.handle(Stone::White, Event::Accept).record.unwrap();
    assert_eq!(game.board().count(Stone::White), 0);
    assert_eq!(game.rules().captures().black, 3);

    let log = MoveLog::parse(&record.move_log, 5).unwrap();
    let (board, rules) = replay(&log, 5).unwrap();
    assert_eq!(board, before);
    assert_eq!(rules.captures(), captures_before);
    assert_eq!(board.count(Stone::White), 2);
    assert_ne!(&board, game.board());
}

// =============================================================================
// Driver over in-memory pipes
// =============================================================================

#[tokio::test]
async fn test_human_game_ends_with_identical_scores() {
    let (black_seat, mut black) = remote();
    let (white_seat, mut white) = remote();
    let store = Arc::new(MemoryStore::new());
    let session = tokio::spawn(run_session(
        Game::new(5, Mode::VsHuman),
        black_seat,
        white_seat,
        store.clone(),
    ));

    assert_eq!(recv_int(&mut black).await, PLAYER_BLACK);
    assert_eq!(recv_int(&mut black).await, 1);
    assert_eq!(recv_int(&mut white).await, PLAYER_WHITE);

    send(&mut black, Message::Chat("have fun".into())).await;
    assert_eq!(recv(&mut white).await, Message::Chat("have fun".into()));

    send(&mut black, Message::Move { x: 2, y: 2 }).await;
    assert!(matches!(recv(&mut black).await, Message::BoardState(_)));
    assert_eq!(recv(&mut black).await, Message::Captures { black: 0, white: 0 });
    assert!(matches!(recv(&mut white).await, Message::BoardState(_)));
    assert_eq!(recv(&mut white).await, Message::Captures { black: 0, white: 0 });
    assert_eq!(recv(&mut white).await, Message::Move { x: 2, y: 2 });

    send(&mut white, Message::Pass).await;
    assert_eq!(recv(&mut black).await, Message::Pass);
    send(&mut black, Message::Pass).await;
    assert_eq!(recv(&mut white).await, Message::Pass);
    assert_eq!(recv(&mut black).await, Message::StartMarking(true));
    assert_eq!(recv(&mut white).await, Message::StartMarking(false));

    send(&mut black, Message::SendProposal(vec![])).await;
    assert_eq!(recv(&mut white).await, Message::ReceiveProposal(vec![]));
    send(&mut white, Message::AcceptProposal).await;

    let mut finals = Vec::new();
    for client in [&mut black, &mut white] {
        assert!(matches!(recv(client).await, Message::BoardState(_)));
        finals.push(recv(client).await);
    }
    assert_eq!(finals[0], finals[1]);
    assert_eq!(finals[0], Message::GameOver { black: 24, white: 0 });

    let record = session.await.unwrap().unwrap();
    assert_eq!(record.winner, Outcome::Black);
    assert_eq!(store.games().len(), 1);
    assert_eq!(store.games()[0].record, record);
}

#[tokio::test]
async fn test_disconnect_between_humans() {
    let (black_seat, mut black) = remote();
    let (white_seat, mut white) = remote();
    let store = Arc::new(MemoryStore::new());
    let session = tokio::spawn(run_session(
        Game::new(9, Mode::VsHuman),
        black_seat,
        white_seat,
        store.clone(),
    ));

    recv_int(&mut black).await;
    recv_int(&mut black).await;
    recv_int(&mut white).await;
    drop(white);

    assert_eq!(recv(&mut black).await, Message::Quit);
    assert_eq!(session.await.unwrap(), None);
    assert!(store.games().is_empty());
}

#[tokio::test]
async fn test_unknown_frame_ends_session() {
    let (black_seat, mut black) = remote();
    let (white_seat, mut white) = remote();
    let store = Arc::new(MemoryStore::new());
    let session = tokio::spawn(run_session(
        Game::new(9, Mode::VsHuman),
        black_seat,
        white_seat,
        store.clone(),
    ));

    recv_int(&mut black).await;
    recv_int(&mut black).await;
    recv_int(&mut white).await;
    white.write_i32(99).await.unwrap();

    assert_eq!(recv(&mut black).await, Message::Quit);
    assert_eq!(session.await.unwrap(), None);
    assert!(store.games().is_empty());
}

#[tokio::test]
async fn test_white_gets_id_when_black_is_gone() {
    let (black_seat, black) = remote();
    let (white_seat, mut white) = remote();
    drop(black);
    let session = tokio::spawn(run_session(
        Game::new(9, Mode::VsHuman),
        black_seat,
        white_seat,
        Arc::new(MemoryStore::new()),
    ));

    assert_eq!(recv_int(&mut white).await, PLAYER_WHITE);
    assert_eq!(recv(&mut white).await, Message::Quit);
    assert_eq!(session.await.unwrap(), None);
}

#[tokio::test]
async fn test_game_against_bot() {
    let (human_seat, mut human) = remote();
    let store = Arc::new(MemoryStore::new());
    let session = tokio::spawn(run_session(
        Game::new(9, Mode::VsBot),
        human_seat,
        Seat::bot(SmartBot::with_seed(42)),
        store.clone(),
    ));

    assert_eq!(recv_int(&mut human).await, PLAYER_BLACK);
    assert_eq!(recv_int(&mut human).await, 1);

    send(&mut human, Message::Move { x: 4, y: 4 }).await;
    assert!(matches!(recv(&mut human).await, Message::BoardState(_)));
    assert!(matches!(recv(&mut human).await, Message::Captures { .. }));

    // The bot answers right away
    let Message::BoardState(board) = recv(&mut human).await else {
        panic!("expected the board after the bot's move");
    };
    assert!(matches!(recv(&mut human).await, Message::Captures { .. }));
    let Message::Move { x, y } = recv(&mut human).await else {
        panic!("expected the bot's move");
    };
    assert_eq!(board.get(Point::new(x as usize, y as usize)), Some(Stone::White));
    assert_eq!(board.count(Stone::Black), 1);

    // Playing on the bot's stone is rejected and only echoed back
    send(&mut human, Message::Move { x, y }).await;
    assert_eq!(recv(&mut human).await, Message::InvalidMove { x, y });

    send(&mut human, Message::Quit).await;
    let record = session.await.unwrap().unwrap();
    assert_eq!(record.winner, Outcome::White);
    assert_eq!(record.mode, Mode::VsBot);
    assert!(record.move_log.starts_with("B[E5];W["));
    assert!(record.move_log.ends_with("B[QUIT];"));
    assert_eq!(store.games().len(), 1);
}

#[tokio::test]
async fn test_bot_accepts_human_proposal() {
    let (human_seat, mut human) = remote();
    let store = Arc::new(MemoryStore::new());
    let session = tokio::spawn(run_session(
        Game::new(5, Mode::VsBot),
        human_seat,
        Seat::bot(SmartBot::with_seed(7)),
        store,
    ));

    recv_int(&mut human).await;
    recv_int(&mut human).await;

    // Keep passing until the bot runs out of moves and passes back
    let mut marking = false;
    for _ in 0..40 {
        send(&mut human, Message::Pass).await;
        loop {
            match recv(&mut human).await {
                Message::StartMarking(first) => {
                    assert!(first, "the human always proposes against the bot");
                    marking = true;
                    break;
                }
                Message::Move { .. } => break,
                _ => {}
            }
        }
        if marking {
            break;
        }
    }
    assert!(marking);

    send(&mut human, Message::SendProposal(vec![])).await;
    let over = loop {
        if let msg @ Message::GameOver { .. } = recv(&mut human).await {
            break msg;
        }
    };

    let record = session.await.unwrap().unwrap();
    assert_eq!(
        over,
        Message::GameOver {
            black: record.black_score as i32,
            white: record.white_score as i32,
        }
    );
}

// =============================================================================
// TCP server
// =============================================================================

async fn start_server() -> std::net::SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let config = ServerConfig {
        board_size: 9,
        seed: Some(1),
        ..ServerConfig::default()
    };
    tokio::spawn(serve(listener, config, Arc::new(MemoryStore::new())));
    addr
}

#[tokio::test]
async fn test_server_pairs_two_humans() {
    let addr = start_server().await;

    let mut first = TcpStream::connect(addr).await.unwrap();
    first.write_i32(MODE_HUMAN).await.unwrap();
    let mut second = TcpStream::connect(addr).await.unwrap();
    second.write_i32(MODE_HUMAN).await.unwrap();

    // Whoever reached the lobby first plays Black
    let first_id = recv_int(&mut first).await;
    let second_id = recv_int(&mut second).await;
    assert_eq!(first_id + second_id, PLAYER_BLACK + PLAYER_WHITE);
    let (mut black, mut white) = if first_id == PLAYER_BLACK {
        (first, second)
    } else {
        (second, first)
    };
    assert_eq!(recv_int(&mut black).await, 1);

    send(&mut black, Message::Pass).await;
    assert_eq!(recv(&mut white).await, Message::Pass);

    send(&mut white, Message::Quit).await;
    assert_eq!(recv(&mut black).await, Message::Quit);
}

#[tokio::test]
async fn test_server_skips_waiting_player_who_left() {
    let addr = start_server().await;

    let mut gone = TcpStream::connect(addr).await.unwrap();
    gone.write_i32(MODE_HUMAN).await.unwrap();
    gone.flush().await.unwrap();
    // Give the server time to park it and notice the close
    tokio::time::sleep(Duration::from_millis(200)).await;
    drop(gone);
    tokio::time::sleep(Duration::from_millis(200)).await;

    let mut first = TcpStream::connect(addr).await.unwrap();
    first.write_i32(MODE_HUMAN).await.unwrap();
    let mut second = TcpStream::connect(addr).await.unwrap();
    second.write_i32(MODE_HUMAN).await.unwrap();

    let first_id = recv_int(&mut first).await;
    let second_id = recv_int(&mut second).await;
    assert_eq!(first_id + second_id, PLAYER_BLACK + PLAYER_WHITE);
    let (mut black, mut white) = if first_id == PLAYER_BLACK {
        (first, second)
    } else {
        (second, first)
    };
    assert_eq!(recv_int(&mut black).await, 1);

    send(&mut black, Message::Pass).await;
    assert_eq!(recv(&mut white).await, Message::Pass);
}

#[tokio::test]
async fn test_server_bot_mode() {
    let addr = start_server().await;

    let mut client = TcpStream::connect(addr).await.unwrap();
    client.write_i32(MODE_BOT).await.unwrap();
    assert_eq!(recv_int(&mut client).await, PLAYER_BLACK);
    assert_eq!(recv_int(&mut client).await, 1);

    send(&mut client, Message::Pass).await;
    // The bot does not pass in the opening
    loop {
        if let Message::Move { x, y } = recv(&mut client).await {
            assert!((0..9).contains(&x) && (0..9).contains(&y));
            break;
        }
    }
}
