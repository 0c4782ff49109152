// src/card.rs
// Random ticket and strip generation for the mainstage game.

use crate::defs::{Number, TICKETCONFIG, TICKETSPERSTRIP};
use crate::ticket::{Grid, Ticket, empty_grid};

use rand::Rng;
use rand::rng;
use rand::seq::{IndexedRandom, SliceRandom};
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct TicketGenerator;

impl TicketGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Numeric bucket for a column: column 0 holds 1-9, column 8 holds
    /// 80-90, the columns between hold 10c+1 ..= 10c+10.
    pub fn column_range(col: usize) -> (Number, Number) {
        match col {
            0 => (1, 9),
            8 => (80, 90),
            c => ((10 * c + 1) as Number, (10 * c + 10) as Number),
        }
    }

    /// Generate one ticket grid: seed every column with 1-3 numbers, then
    /// rebalance each row to exactly 5 filled cells.
    pub fn generate_grid(&self) -> Grid {
        let mut rng = rng();
        let mut grid = empty_grid();
        let rows = TICKETCONFIG.rows as usize;
        let cols = TICKETCONFIG.cols as usize;

        for col in 0..cols {
            let count = rng.random_range(1..=rows);

            // Rows without replacement, in selection order.
            let mut target_rows: Vec<usize> = (0..rows).collect();
            target_rows.shuffle(&mut rng);
            target_rows.truncate(count);

            let (low, high) = Self::column_range(col);
            let bucket: Vec<Number> = (low..=high).collect();
            let mut values: Vec<Number> =
                bucket.choose_multiple(&mut rng, count).copied().collect();
            values.sort_unstable();

            for (idx, &row) in target_rows.iter().enumerate() {
                grid[row][col] = Some(values[idx]);
            }
        }

        self.balance_rows(&mut grid, &mut rng);
        grid
    }

    // Every row must end with exactly TICKETCONFIG.numbers_per_row filled
    // cells: clear the excess scanning columns left to right, then fill the
    // shortfall the same way with in-bucket numbers that do not collide with
    // a value already present in the column.
    fn balance_rows<R: Rng>(&self, grid: &mut Grid, rng: &mut R) {
        let rows = TICKETCONFIG.rows as usize;
        let cols = TICKETCONFIG.cols as usize;
        let target = TICKETCONFIG.numbers_per_row as usize;

        for row in 0..rows {
            let mut filled = grid[row].iter().filter(|cell| cell.is_some()).count();

            let mut col = 0;
            while filled > target && col < cols {
                if grid[row][col].is_some() {
                    grid[row][col] = None;
                    filled -= 1;
                }
                col += 1;
            }

            let mut col = 0;
            while filled < target && col < cols {
                if grid[row][col].is_none() {
                    if let Some(value) = Self::pick_unused(grid, col, rng) {
                        grid[row][col] = Some(value);
                        filled += 1;
                    }
                }
                col += 1;
            }
        }
    }

    // Random number from the column's bucket not yet used anywhere in the
    // column. The buckets hold at least 9 values against at most 3 cells,
    // so this only returns None when the column is already full.
    fn pick_unused<R: Rng>(grid: &Grid, col: usize, rng: &mut R) -> Option<Number> {
        let (low, high) = Self::column_range(col);
        let used: Vec<Number> = grid.iter().filter_map(|row| row[col]).collect();
        let available: Vec<Number> = (low..=high).filter(|n| !used.contains(n)).collect();
        available.choose(rng).copied()
    }

    pub fn generate_ticket(&self, perm: u32, position: u8) -> Ticket {
        Ticket::from_grid(&self.generate_grid(), perm, position)
    }

    /// Generate a strip: TICKETSPERSTRIP tickets sharing a perm, positions
    /// 0.., serials unique within the strip. Retries the whole strip on a
    /// serial collision.
    pub fn generate_strip(&self, perm: u32) -> Vec<Ticket> {
        const MAX_RETRIES: usize = 100;
        let mut attempt = 0;

        loop {
            attempt += 1;
            let tickets: Vec<Ticket> = (0..TICKETSPERSTRIP)
                .map(|position| self.generate_ticket(perm, position))
                .collect();

            let serials: HashSet<&String> = tickets.iter().map(|t| &t.serial).collect();
            if serials.len() == tickets.len() {
                return tickets;
            }

            if attempt >= MAX_RETRIES {
                eprintln!("Warning: could not generate unique serials after {MAX_RETRIES} attempts");
                return tickets;
            }
        }
    }
}

impl Default for TicketGenerator {
    fn default() -> Self {
        Self::new()
    }
}
