//! This module defines the `Tape` struct: a bounded, auto-growing sequence of
//! binary cells with an addressable cursor. The tape owns all of its bounds
//! checking; the interpreter never indexes into cell storage directly.

use crate::types::{Cell, Direction, Pattern, RuntimeError};
use std::fmt;

/// A half-infinite binary tape, bounded by `max_size`, with a cursor.
///
/// New cells materialize as `Cell::Zero` when the cursor moves past the
/// current high-water mark. Length and capacity are tracked by the backing
/// vector; `max_size` is the hard limit the cursor may never cross.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tape {
    cells: Vec<Cell>,
    position: usize,
    max_size: usize,
}

impl Tape {
    /// Creates a tape holding a single `0` cell with the cursor on it.
    pub fn new(max_size: usize) -> Self {
        Self {
            cells: vec![Cell::Zero],
            position: 0,
            max_size,
        }
    }

    /// Returns the value under the cursor.
    pub fn selected(&self) -> Cell {
        self.cells[self.position]
    }

    /// Overwrites the value under the cursor.
    pub fn set_selected(&mut self, value: Cell) {
        self.cells[self.position] = value;
    }

    /// Returns the cursor position.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Moves the cursor to an absolute position within the materialized range.
    pub fn set_position(&mut self, position: usize) -> Result<(), RuntimeError> {
        if position >= self.cells.len() {
            return Err(RuntimeError::PositionOutOfRange(position));
        }
        self.position = position;
        Ok(())
    }

    /// Reads the cell at an absolute position within the materialized range.
    pub fn value_at(&self, position: usize) -> Result<Cell, RuntimeError> {
        self.cells
            .get(position)
            .copied()
            .ok_or(RuntimeError::PositionOutOfRange(position))
    }

    /// Number of materialized cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// The tape always holds at least one cell.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// The materialized cells, in order.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Moves the cursor `count` cells in `direction`, overwriting every cell
    /// passed over (exclusive of the start, inclusive of the destination)
    /// with `fill` unless `fill` is the wildcard. `Stay` is a no-op.
    pub fn shift(
        &mut self,
        direction: Direction,
        count: usize,
        fill: Pattern,
    ) -> Result<(), RuntimeError> {
        match direction {
            Direction::Right => self.right(count, fill),
            Direction::Left => self.left(count, fill),
            Direction::Stay => Ok(()),
        }
    }

    fn right(&mut self, count: usize, fill: Pattern) -> Result<(), RuntimeError> {
        // Counts come straight from scripts and may be any usize; a wrapped
        // sum must read as out of bounds, not as a small position.
        let target = match self.position.checked_add(count) {
            Some(target) if target < self.max_size => target,
            _ => return Err(RuntimeError::TapeOverflow(self.max_size)),
        };

        if target >= self.cells.len() {
            self.cells.resize(target + 1, Cell::Zero);
        }

        if let Pattern::Cell(fill) = fill {
            for cell in &mut self.cells[self.position + 1..=target] {
                *cell = fill;
            }
        }

        self.position = target;
        Ok(())
    }

    fn left(&mut self, count: usize, fill: Pattern) -> Result<(), RuntimeError> {
        if count > self.position {
            return Err(RuntimeError::TapeUnderflow);
        }

        if let Pattern::Cell(fill) = fill {
            for cell in &mut self.cells[self.position - count..self.position] {
                *cell = fill;
            }
        }

        self.position -= count;
        Ok(())
    }
}

/// Snapshot rendering with the cursor marked as `>x<`, e.g. `[ 0 1>0<1 ]`.
/// The brackets hug the cursor when it sits at either edge.
impl fmt::Display for Tape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |cells: &[Cell]| {
            cells
                .iter()
                .map(|c| c.to_string())
                .collect::<Vec<_>>()
                .join(" ")
        };

        write!(
            f,
            "{}{}>{}<{}{}",
            if self.position == 0 { "[" } else { "[ " },
            join(&self.cells[..self.position]),
            self.selected(),
            join(&self.cells[self.position + 1..]),
            if self.position + 1 == self.cells.len() {
                "]"
            } else {
                " ]"
            }
        )
    }
}
