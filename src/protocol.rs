//! Binary wire protocol.
//!
//! Every frame starts with a big-endian `i32` message code (see the `MSG_*`
//! constants) followed by a fixed payload:
//!
//! | Code | Message            | Payload                                   |
//! |------|--------------------|-------------------------------------------|
//! | 10   | `Move`             | x, y                                      |
//! | 11   | `Pass`             |                                           |
//! | 12   | `Surrender`        |                                           |
//! | 13   | `Quit`             |                                           |
//! | 14   | `GameOver`         | black score, white score                  |
//! | 15   | `InvalidMove`      | x, y                                      |
//! | 16   | `BoardState`       | size, then size² cell codes, row-major    |
//! | 17   | `Captures`         | black captures, white captures            |
//! | 18   | `Chat`             | u16 byte length, UTF-8 bytes              |
//! | 19   | `StartMarking`     | one byte, non-zero = recipient proposes   |
//! | 20   | `SendProposal`     | count, then count × (x, y)                |
//! | 21   | `ReceiveProposal`  | count, then count × (x, y)                |
//! | 22   | `AcceptProposal`   |                                           |
//!
//! Before the first frame a client sends a raw `i32` mode selector and the
//! server answers with raw `i32`s (player id, then the start signal for Black).

use derive_more::{Display, Error, From};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::board::{Board, Point, Stone};
use crate::constants::{
    MAX_PROPOSAL_POINTS, MAX_SIZE, MODE_BOT, MODE_HUMAN, MSG_ACCEPT_PROPOSAL, MSG_BOARD_STATE,
    MSG_CAPTURES, MSG_GAME_OVER, MSG_INVALID_MOVE, MSG_MESSAGE, MSG_MOVE, MSG_PASS, MSG_QUIT,
    MSG_RECEIVE_PROPOSAL, MSG_SEND_PROPOSAL, MSG_START_MARKING, MSG_SURRENDER,
};
use crate::session::Mode;

/// One protocol frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Move { x: i32, y: i32 },
    Pass,
    Surrender,
    Quit,
    GameOver { black: i32, white: i32 },
    InvalidMove { x: i32, y: i32 },
    BoardState(Board),
    Captures { black: i32, white: i32 },
    Chat(String),
    /// `true` tells the recipient it proposes first
    StartMarking(bool),
    SendProposal(Vec<Point>),
    ReceiveProposal(Vec<Point>),
    AcceptProposal,
}

/// Failure to read or write a frame.
#[derive(Debug, Display, Error, From)]
pub enum ProtocolError {
    #[display("transport error: {_0}")]
    #[from]
    Io(std::io::Error),
    #[display("unknown message code {code}")]
    UnknownMessage { code: i32 },
    #[display("invalid payload: {reason}")]
    InvalidPayload { reason: String },
    #[display("invalid mode selector {mode}")]
    InvalidMode { mode: i32 },
}

impl ProtocolError {
    fn payload(reason: impl Into<String>) -> Self {
        ProtocolError::InvalidPayload {
            reason: reason.into(),
        }
    }

    /// True when the peer simply went away.
    pub fn is_disconnect(&self) -> bool {
        matches!(self, ProtocolError::Io(e) if matches!(
            e.kind(),
            std::io::ErrorKind::UnexpectedEof
                | std::io::ErrorKind::ConnectionReset
                | std::io::ErrorKind::BrokenPipe
        ))
    }
}

impl Message {
    pub fn code(&self) -> i32 {
        match self {
            Message::Move { .. } => MSG_MOVE,
            Message::Pass => MSG_PASS,
            Message::Surrender => MSG_SURRENDER,
            Message::Quit => MSG_QUIT,
            Message::GameOver { .. } => MSG_GAME_OVER,
            Message::InvalidMove { .. } => MSG_INVALID_MOVE,
            Message::BoardState(_) => MSG_BOARD_STATE,
            Message::Captures { .. } => MSG_CAPTURES,
            Message::Chat(_) => MSG_MESSAGE,
            Message::StartMarking(_) => MSG_START_MARKING,
            Message::SendProposal(_) => MSG_SEND_PROPOSAL,
            Message::ReceiveProposal(_) => MSG_RECEIVE_PROPOSAL,
            Message::AcceptProposal => MSG_ACCEPT_PROPOSAL,
        }
    }

    /// Serialize the whole frame, code included.
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        let mut buf = Vec::with_capacity(16);
        put(&mut buf, self.code());

        match self {
            Message::Move { x, y } | Message::InvalidMove { x, y } => {
                put(&mut buf, *x);
                put(&mut buf, *y);
            }
            Message::GameOver { black, white } | Message::Captures { black, white } => {
                put(&mut buf, *black);
                put(&mut buf, *white);
            }
            Message::BoardState(board) => {
                put(&mut buf, board.size() as i32);
                for cell in board.cells() {
                    put(&mut buf, cell.code());
                }
            }
            Message::Chat(text) => {
                let len = u16::try_from(text.len())
                    .map_err(|_| ProtocolError::payload("chat message too long"))?;
                buf.extend_from_slice(&len.to_be_bytes());
                buf.extend_from_slice(text.as_bytes());
            }
            Message::StartMarking(first) => buf.push(u8::from(*first)),
            Message::SendProposal(points) | Message::ReceiveProposal(points) => {
                put(&mut buf, points.len() as i32);
                for pt in points {
                    let (x, y) = pt.to_wire();
                    put(&mut buf, x);
                    put(&mut buf, y);
                }
            }
            Message::Pass | Message::Surrender | Message::Quit | Message::AcceptProposal => {}
        }
        Ok(buf)
    }
}

fn put(buf: &mut Vec<u8>, value: i32) {
    buf.extend_from_slice(&value.to_be_bytes());
}

/// Read one frame.
pub async fn read_message<R>(reader: &mut R) -> Result<Message, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let code = reader.read_i32().await?;
    let msg = match code {
        MSG_MOVE => Message::Move {
            x: reader.read_i32().await?,
            y: reader.read_i32().await?,
        },
        MSG_PASS => Message::Pass,
        MSG_SURRENDER => Message::Surrender,
        MSG_QUIT => Message::Quit,
        MSG_GAME_OVER => Message::GameOver {
            black: reader.read_i32().await?,
            white: reader.read_i32().await?,
        },
        MSG_INVALID_MOVE => Message::InvalidMove {
            x: reader.read_i32().await?,
            y: reader.read_i32().await?,
        },
        MSG_BOARD_STATE => Message::BoardState(read_board(reader).await?),
        MSG_CAPTURES => Message::Captures {
            black: reader.read_i32().await?,
            white: reader.read_i32().await?,
        },
        MSG_MESSAGE => {
            let len = reader.read_u16().await?;
            let mut bytes = vec![0u8; len as usize];
            reader.read_exact(&mut bytes).await?;
            let text = String::from_utf8(bytes).map_err(|_| ProtocolError::payload("chat is not UTF-8"))?;
            Message::Chat(text)
        }
        MSG_START_MARKING => Message::StartMarking(reader.read_u8().await? != 0),
        MSG_SEND_PROPOSAL => Message::SendProposal(read_points(reader).await?),
        MSG_RECEIVE_PROPOSAL => Message::ReceiveProposal(read_points(reader).await?),
        MSG_ACCEPT_PROPOSAL => Message::AcceptProposal,
        code => return Err(ProtocolError::UnknownMessage { code }),
    };
    Ok(msg)
}

async fn read_board<R>(reader: &mut R) -> Result<Board, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let size = reader.read_i32().await?;
    let size = usize::try_from(size)
        .ok()
        .filter(|s| (1..=MAX_SIZE).contains(s))
        .ok_or_else(|| ProtocolError::payload(format!("board size {size} out of range")))?;

    let mut cells = Vec::with_capacity(size * size);
    for _ in 0..size * size {
        let code = reader.read_i32().await?;
        let stone = Stone::from_code(code)
            .ok_or_else(|| ProtocolError::payload(format!("unknown cell code {code}")))?;
        cells.push(stone);
    }
    Board::from_cells(size, cells).ok_or_else(|| ProtocolError::payload("cell count mismatch"))
}

async fn read_points<R>(reader: &mut R) -> Result<Vec<Point>, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let count = reader.read_i32().await?;
    if !(0..=MAX_PROPOSAL_POINTS).contains(&count) {
        return Err(ProtocolError::payload(format!("proposal of {count} points")));
    }

    let mut points = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let x = reader.read_i32().await?;
        let y = reader.read_i32().await?;
        let pt = Point::from_wire(x, y)
            .ok_or_else(|| ProtocolError::payload(format!("negative coordinate ({x}, {y})")))?;
        points.push(pt);
    }
    Ok(points)
}

/// Write one frame and flush it.
pub async fn write_message<W>(writer: &mut W, msg: &Message) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    let frame = msg.encode()?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

/// Read the mode selector a client sends right after connecting.
pub async fn read_mode<R>(reader: &mut R) -> Result<Mode, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    match reader.read_i32().await? {
        MODE_BOT => Ok(Mode::VsBot),
        MODE_HUMAN => Ok(Mode::VsHuman),
        mode => Err(ProtocolError::InvalidMode { mode }),
    }
}

/// Send a side its player id, followed by the start signal if it moves first.
pub async fn write_handshake<W>(writer: &mut W, player_id: i32, starts: bool) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    writer.write_i32(player_id).await?;
    if starts {
        writer.write_i32(1).await?;
    }
    writer.flush().await?;
    Ok(())
}
