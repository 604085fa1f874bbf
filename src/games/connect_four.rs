//! Connect Four position model.
//!
//! A small, fully specified game used to drive the search in tests,
//! benchmarks and engine matches. Discs drop into one of seven columns; four
//! in a row horizontally, vertically or diagonally wins.
//!
//! Zobrist keys are generated from a fixed seed so fingerprints are stable
//! across runs and persisted tables stay valid between processes.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::errors::{PositionError, PositionResult};
use crate::position::position_model::{FeatureVector, GameOutcome, GamePhase, PositionModel};
use crate::search::heuristic_weights::HeuristicWeights;

pub const COLUMNS: usize = 7;
pub const ROWS: usize = 6;
const CELLS: usize = COLUMNS * ROWS;
const CENTER_COLUMN: usize = COLUMNS / 2;
const OPENING_DISC_LIMIT: usize = 14;
/// Center-out column order for move generation.
const COLUMN_ORDER: [u8; COLUMNS] = [3, 2, 4, 1, 5, 0, 6];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Player {
    First,
    Second,
}

impl Player {
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Player::First => 0,
            Player::Second => 1,
        }
    }

    #[inline]
    pub const fn opposite(self) -> Self {
        match self {
            Player::First => Player::Second,
            Player::Second => Player::First,
        }
    }

    const fn symbol(self) -> char {
        match self {
            Player::First => 'X',
            Player::Second => 'O',
        }
    }
}

/// Column a disc is dropped into, written `a` to `g`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Column(u8);

impl Column {
    pub fn new(index: usize) -> Option<Self> {
        (index < COLUMNS).then_some(Column(index as u8))
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", char::from(b'a' + self.0))
    }
}

impl FromStr for Column {
    type Err = PositionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.trim().chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii_lowercase() => {
                Column::new(usize::from(c as u8 - b'a')).ok_or_else(|| PositionError::IllegalMove(s.to_owned()))
            }
            _ => Err(PositionError::IllegalMove(s.to_owned())),
        }
    }
}

#[derive(Debug)]
struct ZobristKeys {
    disc: [[u64; CELLS]; 2],
    side_to_move: u64,
}

static KEYS: OnceLock<ZobristKeys> = OnceLock::new();

#[inline]
fn keys() -> &'static ZobristKeys {
    KEYS.get_or_init(build_keys)
}

fn build_keys() -> ZobristKeys {
    let mut seed: u64 = 0xC4_F0_0D_5E_ED_u64;
    let mut disc = [[0u64; CELLS]; 2];
    for player in &mut disc {
        for cell in player {
            *cell = next_random_u64(&mut seed);
        }
    }
    ZobristKeys {
        disc,
        side_to_move: next_random_u64(&mut seed),
    }
}

#[inline]
fn next_random_u64(state: &mut u64) -> u64 {
    // splitmix64
    *state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[inline]
const fn cell(column: usize, row: usize) -> usize {
    column * ROWS + row
}

static WINDOWS: OnceLock<Vec<[usize; 4]>> = OnceLock::new();

/// Every line of four cells on the board.
fn windows() -> &'static [[usize; 4]] {
    WINDOWS.get_or_init(|| {
        let mut out = Vec::with_capacity(69);
        let directions: [(isize, isize); 4] = [(1, 0), (0, 1), (1, 1), (1, -1)];
        for column in 0..COLUMNS as isize {
            for row in 0..ROWS as isize {
                for (dc, dr) in directions {
                    let end_c = column + 3 * dc;
                    let end_r = row + 3 * dr;
                    if !(0..COLUMNS as isize).contains(&end_c) || !(0..ROWS as isize).contains(&end_r) {
                        continue;
                    }
                    let mut window = [0usize; 4];
                    for (step, slot) in window.iter_mut().enumerate() {
                        let s = step as isize;
                        *slot = cell((column + s * dc) as usize, (row + s * dr) as usize);
                    }
                    out.push(window);
                }
            }
        }
        out
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectFour {
    cells: [Option<Player>; CELLS],
    heights: [u8; COLUMNS],
    side_to_move: Player,
    history: Vec<Column>,
    winner: Option<Player>,
    hash: u64,
}

impl Default for ConnectFour {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectFour {
    pub fn new() -> Self {
        Self {
            cells: [None; CELLS],
            heights: [0; COLUMNS],
            side_to_move: Player::First,
            history: Vec::with_capacity(CELLS),
            winner: None,
            hash: 0,
        }
    }

    /// Play a compact column sequence such as `"ddce"`; whitespace is ignored.
    pub fn from_moves(moves: &str) -> PositionResult<Self> {
        let mut game = Self::new();
        for c in moves.chars().filter(|c| !c.is_whitespace()) {
            let column: Column = c.to_string().parse()?;
            game.make_move(&column)?;
        }
        Ok(game)
    }

    pub fn side_to_move(&self) -> Player {
        self.side_to_move
    }

    pub fn winner(&self) -> Option<Player> {
        self.winner
    }

    pub fn disc_count(&self) -> usize {
        self.history.len()
    }

    pub fn history(&self) -> &[Column] {
        &self.history
    }

    pub fn disc_at(&self, column: usize, row: usize) -> Option<Player> {
        if column < COLUMNS && row < ROWS {
            self.cells[cell(column, row)]
        } else {
            None
        }
    }

    fn completes_four(&self, column: usize, row: usize, player: Player) -> bool {
        let directions: [(isize, isize); 4] = [(1, 0), (0, 1), (1, 1), (1, -1)];
        directions.iter().any(|&(dc, dr)| {
            let run = |sign: isize| {
                let mut count = 0;
                let (mut c, mut r) = (column as isize + sign * dc, row as isize + sign * dr);
                while (0..COLUMNS as isize).contains(&c)
                    && (0..ROWS as isize).contains(&r)
                    && self.cells[cell(c as usize, r as usize)] == Some(player)
                {
                    count += 1;
                    c += sign * dc;
                    r += sign * dr;
                }
                count
            };
            1 + run(1) + run(-1) >= 4
        })
    }
}

impl PositionModel for ConnectFour {
    type Move = Column;

    fn fingerprint(&self) -> u64 {
        self.hash
    }

    fn legal_moves(&self) -> Vec<Column> {
        if self.outcome().is_some() {
            return Vec::new();
        }
        COLUMN_ORDER
            .iter()
            .filter(|&&c| usize::from(self.heights[usize::from(c)]) < ROWS)
            .map(|&c| Column(c))
            .collect()
    }

    fn make_move(&mut self, mv: &Column) -> PositionResult<()> {
        let column = mv.index();
        if self.outcome().is_some() || column >= COLUMNS || usize::from(self.heights[column]) >= ROWS {
            return Err(PositionError::IllegalMove(mv.to_string()));
        }

        let row = usize::from(self.heights[column]);
        let player = self.side_to_move;
        let idx = cell(column, row);
        self.cells[idx] = Some(player);
        self.heights[column] += 1;
        self.hash ^= keys().disc[player.index()][idx] ^ keys().side_to_move;
        self.history.push(*mv);
        if self.completes_four(column, row, player) {
            self.winner = Some(player);
        }
        self.side_to_move = player.opposite();
        Ok(())
    }

    fn unmake_move(&mut self) -> PositionResult<()> {
        let mv = self.history.pop().ok_or(PositionError::NothingToUndo)?;
        let column = mv.index();
        let Some(row) = usize::from(self.heights[column]).checked_sub(1) else {
            return Err(PositionError::Inconsistent(format!("column {mv} is empty")));
        };
        let player = self.side_to_move.opposite();
        let idx = cell(column, row);
        if self.cells[idx] != Some(player) {
            return Err(PositionError::Inconsistent(format!("top of column {mv} is not the last mover's")));
        }

        self.cells[idx] = None;
        self.heights[column] -= 1;
        self.hash ^= keys().disc[player.index()][idx] ^ keys().side_to_move;
        // A won position never has a successor, so undoing always reopens the game.
        self.winner = None;
        self.side_to_move = player;
        Ok(())
    }

    fn outcome(&self) -> Option<GameOutcome> {
        match self.winner {
            Some(p) if p == self.side_to_move => Some(GameOutcome::SideToMoveWins),
            Some(_) => Some(GameOutcome::SideToMoveLoses),
            None if self.history.len() == CELLS => Some(GameOutcome::Draw),
            None => None,
        }
    }

    fn phase(&self) -> GamePhase {
        if self.history.len() < OPENING_DISC_LIMIT {
            GamePhase::Opening
        } else {
            GamePhase::Endgame
        }
    }

    fn features(&self) -> FeatureVector {
        let me = Some(self.side_to_move);
        let them = Some(self.side_to_move.opposite());

        let mut threes = 0.0;
        let mut twos = 0.0;
        for window in windows() {
            let mut own = 0;
            let mut other = 0;
            for &idx in window {
                if self.cells[idx] == me {
                    own += 1;
                } else if self.cells[idx] == them {
                    other += 1;
                }
            }
            match (own, other) {
                (3, 0) => threes += 1.0,
                (0, 3) => threes -= 1.0,
                (2, 0) => twos += 1.0,
                (0, 2) => twos -= 1.0,
                _ => {}
            }
        }

        let center: f64 = (0..ROWS)
            .map(|row| match self.cells[cell(CENTER_COLUMN, row)] {
                Some(p) if Some(p) == me => 1.0,
                Some(_) => -1.0,
                None => 0.0,
            })
            .sum();

        vec![("center", center), ("open_threes", threes), ("open_twos", twos)]
    }

    fn default_weights(phase: GamePhase) -> HeuristicWeights {
        let pairs = match phase {
            GamePhase::Opening => [("center", 3.0), ("open_threes", 5.0), ("open_twos", 1.0)],
            GamePhase::Endgame => [("center", 1.0), ("open_threes", 8.0), ("open_twos", 2.0)],
        };
        HeuristicWeights::from_pairs(pairs).unwrap_or_default()
    }
}

impl fmt::Display for ConnectFour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in (0..ROWS).rev() {
            for column in 0..COLUMNS {
                let symbol = self.cells[cell(column, row)].map_or('.', Player::symbol);
                write!(f, "{symbol}")?;
            }
            writeln!(f)?;
        }
        write!(f, "abcdefg")
    }
}
