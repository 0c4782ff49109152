// src/terminal.rs
// Terminal input/output shared by the caller and player clients.

use crossterm::{
    event::{self, Event, KeyCode},
    terminal::{disable_raw_mode, enable_raw_mode},
};

use crate::defs::{LASTNUMBER, Number, TICKETCONFIG};
use crate::score::Evaluation;
use crate::ticket::Grid;

/// What the caller asked for at the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Call,
    AcceptClaim,
    RejectClaim,
    NewGame,
    Refresh,
    Quit,
}

/// Print the 1-90 call board, ten numbers per row. Called numbers are
/// yellow, the latest call green, the rest dim.
pub fn print_call_board(called: &[Number], last: Option<Number>) {
    for number in 1..=LASTNUMBER {
        if Some(number) == last {
            print!("\x1b[1;32m{number:2}\x1b[0m "); // bold green for the last call
        } else if called.contains(&number) {
            print!("\x1b[1;33m{number:2}\x1b[0m "); // bold yellow for called numbers
        } else {
            print!("\x1b[2m{number:2}\x1b[0m ");
        }
        if number % 10 == 0 {
            println!();
        }
    }
}

/// Print one ticket grid with called numbers marked. Malformed grids are
/// skipped rather than rendered half-way.
pub fn print_ticket(grid: &Grid, called: &[Number], last: Option<Number>) {
    if !is_printable_grid(grid) {
        println!("  (ticket data not available)");
        return;
    }
    for row in grid {
        for cell in row {
            match cell {
                Some(number) if Some(*number) == last => {
                    print!("\x1b[1;32m{number:3}\x1b[0m ");
                }
                Some(number) if called.contains(number) => {
                    print!("\x1b[1;33m{number:3}\x1b[0m ");
                }
                Some(number) => print!("{number:3} "),
                None => print!("  . "),
            }
        }
        println!();
    }
}

pub fn print_ticket_progress(serial: &str, evaluation: &Evaluation) {
    if evaluation.is_winner {
        println!("Ticket {serial}: \x1b[1;32mWINNER\x1b[0m");
    } else if evaluation.to_go <= 2 {
        println!("Ticket {serial}: \x1b[1;33m{} to go\x1b[0m", evaluation.to_go);
    } else {
        println!("Ticket {serial}: {} to go", evaluation.to_go);
    }
}

pub fn clear_screen() {
    print!("\x1Bc");
}

/// Wait for one caller key press in raw mode.
/// ENTER calls a number, A accepts the top claim, R rejects it, N starts a
/// new game, F5 refreshes, ESC quits.
pub fn wait_for_caller_action() -> KeyAction {
    println!("\n[ENTER] call  [A]ccept claim  [R]eject claim  [N]ew game  [F5] refresh  [ESC] quit");

    enable_raw_mode().unwrap_or(());

    // Drain anything already buffered.
    while event::poll(std::time::Duration::from_millis(0)).unwrap_or(false) {
        let _ = event::read();
    }

    let action = loop {
        if let Ok(Event::Key(key_event)) = event::read() {
            if key_event.kind != event::KeyEventKind::Press {
                continue;
            }
            match key_event.code {
                KeyCode::Enter => break KeyAction::Call,
                KeyCode::Char('a') | KeyCode::Char('A') => break KeyAction::AcceptClaim,
                KeyCode::Char('r') | KeyCode::Char('R') => break KeyAction::RejectClaim,
                KeyCode::Char('n') | KeyCode::Char('N') => break KeyAction::NewGame,
                KeyCode::F(5) => break KeyAction::Refresh,
                KeyCode::Esc => break KeyAction::Quit,
                _ => {}
            }
        }
    };

    disable_raw_mode().unwrap_or(());
    action
}

/// Sanity bound used by display code: a grid is printable when it has the
/// configured shape.
pub fn is_printable_grid(grid: &Grid) -> bool {
    grid.len() == TICKETCONFIG.rows as usize
        && grid
            .iter()
            .all(|row| row.len() == TICKETCONFIG.cols as usize)
}
