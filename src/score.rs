// src/score.rs
// Win pattern definitions and ticket progress evaluation.

use crate::defs::{Number, TICKETCONFIG};
use crate::ticket::{Grid, decode_layout};

use serde::{Deserialize, Serialize};
use std::fmt;

/// The mainstage (90-ball) patterns, defined by how many fully-matched rows
/// they require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WinPattern {
    OneLine,
    TwoLines,
    FullHouse,
}

impl WinPattern {
    pub fn required_rows(self) -> usize {
        match self {
            WinPattern::OneLine => 1,
            WinPattern::TwoLines => 2,
            WinPattern::FullHouse => 3,
        }
    }

    pub fn all() -> [WinPattern; 3] {
        [WinPattern::OneLine, WinPattern::TwoLines, WinPattern::FullHouse]
    }
}

impl fmt::Display for WinPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            WinPattern::OneLine => "one line",
            WinPattern::TwoLines => "two lines",
            WinPattern::FullHouse => "full house",
        };
        write!(f, "{label}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    pub is_winner: bool,
    pub to_go: usize,
}

struct RowProgress {
    matched: usize,
    size: usize,
}

impl RowProgress {
    fn is_complete(&self) -> bool {
        self.size > 0 && self.matched == self.size
    }

    fn outstanding(&self) -> usize {
        self.size - self.matched
    }
}

fn row_progress(grid: &Grid, called: &[Number]) -> Vec<RowProgress> {
    grid.iter()
        .map(|row| {
            let cells: Vec<Number> = row.iter().filter_map(|cell| *cell).collect();
            RowProgress {
                matched: cells.iter().filter(|n| called.contains(n)).count(),
                size: cells.len(),
            }
        })
        .collect()
}

/// Progress of a grid towards a pattern against the called numbers.
///
/// `to_go` is 0 for a winner; otherwise it is the minimum outstanding count
/// among the incomplete rows. That single-row minimum is the house to-go
/// proxy: exact whenever one more row settles the pattern, coarse for
/// multi-row patterns. An all-empty grid reports a full row outstanding.
pub fn evaluate(grid: &Grid, called: &[Number], pattern: WinPattern) -> Evaluation {
    let rows = row_progress(grid, called);
    let completed = rows.iter().filter(|row| row.is_complete()).count();

    if completed >= pattern.required_rows() {
        return Evaluation {
            is_winner: true,
            to_go: 0,
        };
    }

    let to_go = rows
        .iter()
        .filter(|row| row.size > 0 && !row.is_complete())
        .map(RowProgress::outstanding)
        .min()
        .unwrap_or(TICKETCONFIG.numbers_per_row as usize);

    Evaluation {
        is_winner: false,
        to_go,
    }
}

/// Evaluate a raw `(numbers, layout_mask)` pair without decoding first at
/// the call site.
pub fn evaluate_numbers(
    numbers: &[Number],
    layout_mask: u32,
    called: &[Number],
    pattern: WinPattern,
) -> Evaluation {
    evaluate(&decode_layout(numbers, layout_mask), called, pattern)
}

/// Best progress across several patterns: winner if any pattern matches,
/// to-go is the minimum over the patterns checked.
pub fn evaluate_best(grid: &Grid, called: &[Number], patterns: &[WinPattern]) -> Evaluation {
    let mut best = Evaluation {
        is_winner: false,
        to_go: TICKETCONFIG.numbers_per_row as usize,
    };

    for &pattern in patterns {
        let result = evaluate(grid, called, pattern);
        if result.is_winner {
            return result;
        }
        if result.to_go < best.to_go {
            best.to_go = result.to_go;
        }
    }

    best
}
