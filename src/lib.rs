//! Encode a 9x9 Sudoku board as propositional clauses, hand them to a SAT
//! backend, and translate any satisfying assignment back into a board.
//!
//! The board is mapped onto 729 variables, one per (row, column, value)
//! triple, constrained by four exactly-one rule families plus one unit
//! constraint per pre-filled cell. The search itself is delegated through
//! the [`SatEngine`] trait; [`SplrEngine`], built on the `splr` solver, is
//! the default backend.

use std::fmt;
use std::time::Duration;

use itertools::iproduct;
use log::debug;
use splr::{Certificate, Config, SolveIF, Solver, SolverError};

/// Rows on the board.
const ROWS: usize = 9;
/// Columns on the board.
const COLUMNS: usize = 9;
/// Distinct cell values.
const VALUES: usize = 9;
/// Side length of the 3x3 boxes.
const BOX_SIDE: usize = 3;
/// One proposition per (row, column, value) triple.
const VARIABLE_COUNT: usize = ROWS * COLUMNS * VALUES;

/// A propositional variable identifier; strictly positive, as SAT backends
/// require. A positive literal is the variable itself, a negative literal
/// its negation.
pub type Var = i32;

/// Rejected input boards, reported at construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum BoardError {
    /// The outer dimension is not nine rows.
    #[display("invalid number of rows: expected 9, got {got}")]
    RowCount { got: usize },
    /// A row does not hold nine cells.
    #[display("invalid number of columns for row #{row}: expected 9, got {got}")]
    ColumnCount { row: usize, got: usize },
    /// A cell value outside 0..=9.
    #[display("invalid value at row #{row}, column #{column}: expected a value between 0 and 9, got {value}")]
    Digit { row: usize, column: usize, value: i32 },
}

/// Failures while solving. Malformed input is caught earlier, by
/// [`Board::from_rows`]; both variants here signal a defect in the backend
/// or in the encoding, never a property of the puzzle.
#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum SolveError {
    /// The backend rejected the clause store or failed mid-search.
    #[display("unexpected solver error: {cause:?}")]
    Engine {
        /// Error reported by the backing `splr` solver.
        #[error(not(source))]
        cause: SolverError,
    },
    /// A satisfying assignment left a cell without a value.
    #[display("model assigns no value at row #{row}, column #{column}")]
    InconsistentModel { row: usize, column: usize },
}

/// A 9x9 Sudoku board in row-major order; 0 marks a blank cell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Board([[u8; COLUMNS]; ROWS]);

impl Board {
    /// Validates a row-major grid of 9x9 cells, each between 0 and 9.
    ///
    /// Scans in row-major order and stops at the first violation.
    pub fn from_rows(rows: &[Vec<i32>]) -> Result<Self, BoardError> {
        if rows.len() != ROWS {
            return Err(BoardError::RowCount { got: rows.len() });
        }
        let mut cells = [[0u8; COLUMNS]; ROWS];
        for (row, values) in rows.iter().enumerate() {
            if values.len() != COLUMNS {
                return Err(BoardError::ColumnCount {
                    row,
                    got: values.len(),
                });
            }
            for (column, &value) in values.iter().enumerate() {
                // 0 is accepted, it means the cell is not set
                if !(0..=9).contains(&value) {
                    return Err(BoardError::Digit { row, column, value });
                }
                cells[row][column] = value as u8;
            }
        }
        Ok(Self(cells))
    }

    /// The cells in row-major order.
    pub fn rows(&self) -> &[[u8; COLUMNS]; ROWS] {
        &self.0
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, row) in self.0.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            for &value in row {
                write!(f, "{value}")?;
            }
        }
        Ok(())
    }
}

/// The variable standing for "cell (`row`, `column`) holds `digit` + 1".
///
/// Bijective over row, column, digit in 0..9, with values in 1..=729;
/// [`cell`] is the inverse.
#[must_use]
pub const fn variable(row: usize, column: usize, digit: usize) -> Var {
    (row * COLUMNS * VALUES + column * VALUES + digit + 1) as Var
}

/// The (row, column, digit) triple a variable stands for.
#[must_use]
pub const fn cell(var: Var) -> (usize, usize, usize) {
    let index = (var - 1) as usize;
    (
        index / (COLUMNS * VALUES),
        index / VALUES % COLUMNS,
        index % VALUES,
    )
}

/// What a backend reports back from a search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A satisfying assignment, indexed by variable id minus one.
    Satisfiable(Vec<bool>),
    /// No assignment satisfies the clause store.
    Unsatisfiable,
    /// The deadline elapsed before the search finished.
    TimedOut,
}

/// A SAT backend able to hold a clause store and search it.
///
/// Callers issue `allocate` once, then constraints, then `solve` once per
/// problem; the solver never retries or re-encodes after the outcome.
pub trait SatEngine {
    /// Reserves the contiguous variable space `1..=variable_count`.
    fn allocate(&mut self, variable_count: usize);

    /// Constrains exactly one of `variables` to be true.
    fn add_exactly_one(&mut self, variables: &[Var]);

    /// Constrains `variable` to be true.
    fn add_unit(&mut self, variable: Var);

    /// Searches for a satisfying assignment within `deadline`.
    fn solve(&mut self, deadline: Duration) -> Result<Outcome, SolveError>;
}

/// The default backend: a clause store searched by the `splr` solver.
///
/// `splr` has no native exactly-one primitive, so the constraint is lowered
/// to one at-least-one clause plus pairwise at-most-one clauses. For the
/// nine-literal constraints used here that is 37 clauses each; the encoding
/// stays well inside what the solver handles instantly.
#[derive(Debug, Clone, Default)]
pub struct SplrEngine {
    variable_count: usize,
    clauses: Vec<Vec<i32>>,
}

impl SplrEngine {
    /// Creates an empty clause store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn to_assignment(&self, model: &[i32]) -> Vec<bool> {
        let mut assignment = vec![false; self.variable_count];
        for &literal in model {
            assert_ne!(literal, 0);
            let index = literal.unsigned_abs() as usize - 1;
            if index < assignment.len() {
                assignment[index] = literal > 0;
            }
        }
        assignment
    }
}

impl SatEngine for SplrEngine {
    fn allocate(&mut self, variable_count: usize) {
        self.variable_count = variable_count;
    }

    fn add_exactly_one(&mut self, variables: &[Var]) {
        // at least one of them holds
        self.clauses.push(variables.to_vec());
        // no two of them hold together
        for (index, &a) in variables.iter().enumerate() {
            for &b in &variables[index + 1..] {
                self.clauses.push(vec![-a, -b]);
            }
        }
    }

    fn add_unit(&mut self, variable: Var) {
        self.clauses.push(vec![variable]);
    }

    fn solve(&mut self, deadline: Duration) -> Result<Outcome, SolveError> {
        debug!(
            "solving {} clauses over {} variables, deadline {deadline:?}",
            self.clauses.len(),
            self.variable_count
        );
        let mut config = Config::default();
        config.c_timeout = deadline.as_secs_f64();
        match Solver::try_from((config, self.clauses.as_slice())) {
            Ok(mut solver) => match solver.solve() {
                Ok(Certificate::SAT(model)) => Ok(Outcome::Satisfiable(self.to_assignment(&model))),
                Ok(Certificate::UNSAT) => Ok(Outcome::Unsatisfiable),
                Err(SolverError::TimeOut) => Ok(Outcome::TimedOut),
                Err(cause) => Err(SolveError::Engine { cause }),
            },
            // A store that already conflicts while its clauses are ingested
            // is reported as a certificate before any search runs.
            Err(Ok(Certificate::UNSAT)) => Ok(Outcome::Unsatisfiable),
            Err(Ok(Certificate::SAT(model))) => Ok(Outcome::Satisfiable(self.to_assignment(&model))),
            Err(Err(cause)) => Err(SolveError::Engine { cause }),
        }
    }
}

/// Emits the four structural rule families, in a fixed order.
fn encode_rules(engine: &mut impl SatEngine) {
    // Rule 1: no row contains a duplicate value.
    for (row, digit) in iproduct!(0..ROWS, 0..VALUES) {
        let vars: Vec<Var> = (0..COLUMNS)
            .map(|column| variable(row, column, digit))
            .collect();
        engine.add_exactly_one(&vars);
    }

    // Rule 2: no column contains a duplicate value.
    for (column, digit) in iproduct!(0..COLUMNS, 0..VALUES) {
        let vars: Vec<Var> = (0..ROWS).map(|row| variable(row, column, digit)).collect();
        engine.add_exactly_one(&vars);
    }

    // Rule 3: no 3x3 box contains a duplicate value.
    for (start_row, start_column, digit) in iproduct!(
        (0..ROWS).step_by(BOX_SIDE),
        (0..COLUMNS).step_by(BOX_SIDE),
        0..VALUES
    ) {
        let vars: Vec<Var> = iproduct!(0..BOX_SIDE, 0..BOX_SIDE)
            .map(|(row, column)| variable(start_row + row, start_column + column, digit))
            .collect();
        engine.add_exactly_one(&vars);
    }

    // Rule 4: every position holds exactly one value.
    for (row, column) in iproduct!(0..ROWS, 0..COLUMNS) {
        let vars: Vec<Var> = (0..VALUES)
            .map(|digit| variable(row, column, digit))
            .collect();
        engine.add_exactly_one(&vars);
    }
}

/// Rule 5: the solution agrees with every pre-filled cell.
fn encode_givens(engine: &mut impl SatEngine, board: &Board) {
    for (row, column) in iproduct!(0..ROWS, 0..COLUMNS) {
        let value = board.0[row][column];
        if value > 0 {
            engine.add_unit(variable(row, column, value as usize - 1));
        }
    }
}

/// Reads a completed board back out of a satisfying assignment.
///
/// The cell-determinacy constraints guarantee one true value per position;
/// a position without one means the backend and the encoding disagree.
fn decode(assignment: &[bool]) -> Result<Board, SolveError> {
    let mut cells = [[0u8; COLUMNS]; ROWS];
    for (row, column) in iproduct!(0..ROWS, 0..COLUMNS) {
        let digit = (0..VALUES)
            .find(|&digit| {
                assignment
                    .get(variable(row, column, digit) as usize - 1)
                    .copied()
                    .unwrap_or(false)
            })
            .ok_or(SolveError::InconsistentModel { row, column })?;
        cells[row][column] = digit as u8 + 1;
    }
    Ok(Board(cells))
}

/// A solver for one board: the board is validated up front and immutable
/// afterwards; each [`Sudoku::solve`] call encodes, searches, and decodes
/// independently.
#[derive(Debug, Clone)]
pub struct Sudoku {
    board: Board,
    timeout: Duration,
}

impl Sudoku {
    /// Time budget used when none is given.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// A solver for a board without predefined cells.
    #[must_use]
    pub fn new() -> Self {
        Self::with_board(Board::default())
    }

    /// A solver for `board`, using the default timeout.
    #[must_use]
    pub fn with_board(board: Board) -> Self {
        Self::with_board_and_timeout(board, Self::DEFAULT_TIMEOUT)
    }

    /// A solver for `board` that gives the search at most `timeout`.
    #[must_use]
    pub fn with_board_and_timeout(board: Board, timeout: Duration) -> Self {
        Self { board, timeout }
    }

    /// Solves the board on the default `splr` backend.
    ///
    /// `Ok(None)` means no solution was found before the deadline — the
    /// constraints are unsatisfiable or the search timed out; the two are
    /// deliberately not distinguished.
    pub fn solve(&self) -> Result<Option<Board>, SolveError> {
        self.solve_with(&mut SplrEngine::new())
    }

    /// Solves the board on a caller-supplied backend.
    pub fn solve_with(&self, engine: &mut impl SatEngine) -> Result<Option<Board>, SolveError> {
        engine.allocate(VARIABLE_COUNT);
        encode_rules(engine);
        encode_givens(engine, &self.board);
        match engine.solve(self.timeout)? {
            Outcome::Satisfiable(assignment) => decode(&assignment).map(Some),
            Outcome::Unsatisfiable | Outcome::TimedOut => {
                debug!("no solution within {:?}", self.timeout);
                Ok(None)
            }
        }
    }
}

impl Default for Sudoku {
    fn default() -> Self {
        Self::new()
    }
}
