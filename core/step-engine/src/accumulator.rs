//! FILENAME: core/step-engine/src/accumulator.rs
//! PURPOSE: Incremental state for the basic column reductions.
//! CONTEXT: Shared by the aggregate step (one accumulator per group) and the
//! summary step (one accumulator over the whole column).

use table::CellValue;

use crate::definition::Reduction;

/// Accumulator for computing reductions in one pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Accumulator {
    pub sum: f64,
    /// Non-missing cells seen.
    pub count: u64,
    /// Cells that coerced to a number.
    pub count_numbers: u64,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_number(&mut self, value: f64) {
        self.count += 1;
        self.count_numbers += 1;
        self.sum += value;
        self.min = Some(self.min.map_or(value, |m| m.min(value)));
        self.max = Some(self.max.map_or(value, |m| m.max(value)));
    }

    pub fn add_non_number(&mut self) {
        self.count += 1;
    }

    pub fn add_cell(&mut self, cell: &CellValue) {
        if cell.is_missing() {
            return;
        }
        match cell.as_number() {
            Some(n) => self.add_number(n),
            None => self.add_non_number(),
        }
    }

    /// Final value. `sum` of nothing is 0; `mean`, `max` and `min` of nothing
    /// are null.
    pub fn compute(&self, reduction: Reduction) -> Option<f64> {
        match reduction {
            Reduction::Sum => Some(self.sum),
            Reduction::Count => Some(self.count as f64),
            Reduction::Mean => {
                if self.count_numbers > 0 {
                    Some(self.sum / self.count_numbers as f64)
                } else {
                    None
                }
            }
            Reduction::Max => self.max,
            Reduction::Min => self.min,
        }
    }
}

impl<'a> FromIterator<&'a CellValue> for Accumulator {
    fn from_iter<I: IntoIterator<Item = &'a CellValue>>(iter: I) -> Self {
        let mut acc = Accumulator::new();
        for cell in iter {
            acc.add_cell(cell);
        }
        acc
    }
}
