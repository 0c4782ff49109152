// src/pouch.rs
// The caller's draw source: the full number range in randomized order.

use crate::defs::{FIRSTNUMBER, LASTNUMBER, Number};

use rand::rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pouch {
    numbers: Vec<Number>,
}

impl Pouch {
    pub fn new() -> Self {
        let mut numbers: Vec<Number> = (FIRSTNUMBER..=LASTNUMBER).collect();
        numbers.shuffle(&mut rng());
        Pouch { numbers }
    }

    pub fn len(&self) -> usize {
        self.numbers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.numbers.is_empty()
    }

    pub fn remaining(&self) -> &[Number] {
        &self.numbers
    }

    /// Draw the next number, None once the pouch is exhausted.
    pub fn draw(&mut self) -> Option<Number> {
        self.numbers.pop()
    }
}

impl Default for Pouch {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_new_pouch_holds_every_number_once() {
        let pouch = Pouch::new();
        assert_eq!(pouch.len(), LASTNUMBER as usize);

        let distinct: HashSet<Number> = pouch.remaining().iter().copied().collect();
        assert_eq!(distinct.len(), LASTNUMBER as usize);
        assert!(distinct.contains(&FIRSTNUMBER));
        assert!(distinct.contains(&LASTNUMBER));
    }

    #[test]
    fn test_draw_drains_without_repeats() {
        let mut pouch = Pouch::new();
        let mut seen = HashSet::new();
        while let Some(number) = pouch.draw() {
            assert!(seen.insert(number), "{number} drawn twice");
        }
        assert_eq!(seen.len(), LASTNUMBER as usize);
        assert!(pouch.is_empty());
        assert_eq!(pouch.draw(), None);
    }
}
