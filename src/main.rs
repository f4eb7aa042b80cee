//! Command-line front-end: read a puzzle, solve it, print the grid.

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use sudoku_sat::{Board, Sudoku};

/// Solve a 9x9 Sudoku by handing it to a SAT solver.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// The puzzle as 81 row-major digits, 0 for a blank cell.
    ///
    /// Omit it to solve a board without predefined cells.
    puzzle: Option<String>,

    /// Time budget for the search, in seconds.
    #[arg(short, long, default_value_t = 10)]
    timeout: u64,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let board = match cli.puzzle.as_deref().map(parse_puzzle).transpose() {
        Ok(board) => board.unwrap_or_default(),
        Err(message) => {
            eprintln!("{message}");
            return ExitCode::FAILURE;
        }
    };

    let sudoku = Sudoku::with_board_and_timeout(board, Duration::from_secs(cli.timeout));
    match sudoku.solve() {
        Ok(Some(solution)) => {
            println!("{solution}");
            ExitCode::SUCCESS
        }
        Ok(None) => {
            eprintln!("no solution found");
            ExitCode::FAILURE
        }
        Err(error) => {
            eprintln!("{error}");
            ExitCode::FAILURE
        }
    }
}

/// Expands an 81-character digit string into rows for [`Board::from_rows`].
fn parse_puzzle(text: &str) -> Result<Board, String> {
    let digits = text
        .trim()
        .chars()
        .map(|c| {
            c.to_digit(10)
                .map(|digit| digit as i32)
                .ok_or_else(|| format!("unexpected character {c:?} in puzzle"))
        })
        .collect::<Result<Vec<i32>, String>>()?;
    if digits.len() != 81 {
        return Err(format!("puzzle must hold 81 digits, got {}", digits.len()));
    }
    let rows: Vec<Vec<i32>> = digits.chunks(9).map(<[i32]>::to_vec).collect();
    Board::from_rows(&rows).map_err(|error| error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_row_major_puzzle() {
        let text = "530070000600195000098000060800060003400803001700020006060000280000419005000080079";
        let board = parse_puzzle(text).unwrap();
        assert_eq!(board.rows()[0][0], 5);
        assert_eq!(board.rows()[0][4], 7);
        assert_eq!(board.rows()[8][8], 9);
    }

    #[test]
    fn rejects_a_short_puzzle() {
        let error = parse_puzzle("530070").unwrap_err();
        assert_eq!(error, "puzzle must hold 81 digits, got 6");
    }

    #[test]
    fn rejects_non_digit_characters() {
        let error = parse_puzzle(&"x".repeat(81)).unwrap_err();
        assert_eq!(error, "unexpected character 'x' in puzzle");
    }
}
