//! Grid snake entities
//!
//! The head moves one cell per tick. The trail holds the cells the head
//! has left, oldest first, trimmed to `score + SNAKE_BASE_TRAIL`.

use std::collections::VecDeque;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::consts::*;

/// Travel direction on the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub fn delta(&self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    pub fn opposite(&self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }
}

/// A grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn step(&self, dir: Direction) -> Cell {
        let (dx, dy) = dir.delta();
        Cell::new(self.x + dx, self.y + dy)
    }

    pub fn in_bounds(&self) -> bool {
        self.x >= 0 && self.y >= 0 && self.x < GRID_COLUMNS && self.y < GRID_ROWS
    }
}

#[derive(Debug, Clone)]
pub struct SnakeWorld {
    pub head: Cell,
    /// Oldest segment first
    pub trail: VecDeque<Cell>,
    /// Direction the next move uses
    pub heading: Direction,
    /// Direction the last move used; reversals are judged against it
    pub previous_heading: Direction,
    /// None only when the board is full
    pub food: Option<Cell>,
}

impl SnakeWorld {
    pub fn new<R: Rng>(rng: &mut R) -> Self {
        let mut world = Self {
            head: Cell::new(SNAKE_START.0, SNAKE_START.1),
            trail: VecDeque::new(),
            heading: Direction::Up,
            previous_heading: Direction::Up,
            food: None,
        };
        world.food = world.place_food(rng);
        world
    }

    /// Apply this tick's turn requests in arrival order.
    ///
    /// A turn back into the segment just left is dropped; the last
    /// accepted turn wins.
    pub fn steer(&mut self, turns: &[Direction]) {
        for &turn in turns {
            if turn == self.previous_heading.opposite() {
                log::debug!("Ignoring reversing turn {:?}", turn);
                continue;
            }
            self.heading = turn;
        }
    }

    pub fn next_head(&self) -> Cell {
        self.head.step(self.heading)
    }

    /// Trail as it will be after the next move, without mutating
    pub fn trail_after_move(&self, trail_len: usize) -> impl Iterator<Item = &Cell> {
        let total = self.trail.len() + 1;
        let skip = total.saturating_sub(trail_len);
        self.trail
            .iter()
            .chain(std::iter::once(&self.head))
            .skip(skip)
    }

    /// Move the head one cell, keeping `trail_len` trailing segments
    pub fn advance(&mut self, trail_len: usize) {
        self.trail.push_back(self.head);
        while self.trail.len() > trail_len {
            self.trail.pop_front();
        }
        self.head = self.next_head();
        self.previous_heading = self.heading;
    }

    pub fn occupies(&self, cell: Cell) -> bool {
        self.head == cell || self.trail.contains(&cell)
    }

    /// Pick a free cell for food.
    ///
    /// Bounded rejection sampling first; if every attempt lands on the
    /// snake, scan the grid row by row for the first free cell.
    pub fn place_food<R: Rng>(&self, rng: &mut R) -> Option<Cell> {
        for _ in 0..FOOD_PLACEMENT_ATTEMPTS {
            let cell = Cell::new(
                rng.random_range(0..GRID_COLUMNS),
                rng.random_range(0..GRID_ROWS),
            );
            if !self.occupies(cell) {
                return Some(cell);
            }
        }

        let free = (0..GRID_ROWS)
            .flat_map(|y| (0..GRID_COLUMNS).map(move |x| Cell::new(x, y)))
            .find(|&cell| !self.occupies(cell));
        if free.is_none() {
            log::info!("Board is full, no food placed");
        }
        free
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn world() -> SnakeWorld {
        let mut rng = Pcg32::seed_from_u64(1);
        SnakeWorld::new(&mut rng)
    }

    #[test]
    fn test_reversing_turn_ignored() {
        let mut w = world();
        w.heading = Direction::Right;
        w.previous_heading = Direction::Right;
        w.steer(&[Direction::Left, Direction::Up]);
        assert_eq!(w.heading, Direction::Up);

        // Order doesn't matter: the reversal is judged against the last move
        w.heading = Direction::Right;
        w.steer(&[Direction::Up, Direction::Left]);
        assert_eq!(w.heading, Direction::Up);
    }

    #[test]
    fn test_two_quick_turns_cannot_reverse() {
        let mut w = world();
        // Moving up; "left" then "down" in the same tick
        w.steer(&[Direction::Left, Direction::Down]);
        assert_eq!(w.heading, Direction::Left);
    }

    #[test]
    fn test_advance_trims_trail() {
        let mut w = world();
        for _ in 0..5 {
            w.advance(2);
        }
        assert_eq!(w.trail.len(), 2);
        assert_eq!(w.head, Cell::new(SNAKE_START.0, SNAKE_START.1 - 5));
        assert_eq!(w.trail.back(), Some(&Cell::new(SNAKE_START.0, SNAKE_START.1 - 4)));
    }

    #[test]
    fn test_trail_after_move_matches_advance() {
        let mut w = world();
        for _ in 0..4 {
            w.advance(3);
        }
        let predicted: Vec<Cell> = w.trail_after_move(3).copied().collect();
        w.advance(3);
        let actual: Vec<Cell> = w.trail.iter().copied().collect();
        assert_eq!(predicted, actual);
    }

    #[test]
    fn test_food_never_on_snake() {
        let mut rng = Pcg32::seed_from_u64(99);
        let mut w = world();
        for _ in 0..6 {
            w.advance(10);
        }
        for _ in 0..200 {
            let food = w.place_food(&mut rng).unwrap();
            assert!(!w.occupies(food));
            assert!(food.in_bounds());
        }
    }

    #[test]
    fn test_food_scan_fallback() {
        let mut rng = Pcg32::seed_from_u64(5);
        let mut w = world();
        // Fill every cell except one
        w.trail.clear();
        for y in 0..GRID_ROWS {
            for x in 0..GRID_COLUMNS {
                let cell = Cell::new(x, y);
                if cell != w.head && cell != Cell::new(31, 23) {
                    w.trail.push_back(cell);
                }
            }
        }
        assert_eq!(w.place_food(&mut rng), Some(Cell::new(31, 23)));

        w.trail.push_back(Cell::new(31, 23));
        assert_eq!(w.place_food(&mut rng), None);
    }
}
