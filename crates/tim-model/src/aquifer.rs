//! Vertical aquifer stack: validation and derived layer parameters.
//!
//! Rows alternate between aquifers (conductivity given) and aquitards
//! (resistance given). A confined stack starts with an aquifer; a
//! semi-confined stack starts with an aquitard whose `headtop` fixes the
//! head above it. Either way the stack ends with an aquifer. Only the last
//! row's bottom is used; every other row contributes its top.

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};
use crate::extract::ExtractedTable;

/// One row of the aquifer table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AquiferRow {
    pub conductivity: Option<f64>,
    pub resistance: Option<f64>,
    pub top: f64,
    pub bottom: f64,
    pub porosity: f64,
    pub headtop: Option<f64>,
}

impl AquiferRow {
    pub fn is_aquifer(&self) -> bool {
        self.conductivity.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TopBoundary {
    Confined,
    SemiConfined { hstar: f64 },
}

/// A validated stack with the solver's layer parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AquiferStack {
    rows: Vec<AquiferRow>,
    kaq: Vec<f64>,
    c: Vec<f64>,
    z: Vec<f64>,
    npor: Vec<f64>,
    top_boundary: TopBoundary,
}

impl AquiferStack {
    /// Validate rows (top to bottom) and derive the layer parameters.
    pub fn from_rows(rows: Vec<AquiferRow>) -> Result<Self> {
        let last = match rows.len() {
            0 => return Err(ModelError::stack(None, "no aquifer rows")),
            n => n - 1,
        };

        for (i, row) in rows.iter().enumerate() {
            match (row.conductivity, row.resistance) {
                (Some(_), Some(_)) => {
                    return Err(ModelError::stack(
                        Some(i),
                        "both conductivity and resistance given",
                    ))
                }
                (None, None) => {
                    return Err(ModelError::stack(
                        Some(i),
                        "neither conductivity nor resistance given",
                    ))
                }
                (Some(k), None) if !(k > 0.0) => {
                    return Err(ModelError::stack(
                        Some(i),
                        format!("conductivity must be positive, got {}", k),
                    ))
                }
                (None, Some(c)) if !(c > 0.0) => {
                    return Err(ModelError::stack(
                        Some(i),
                        format!("resistance must be positive, got {}", c),
                    ))
                }
                _ => {}
            }
            if i > 0 && row.headtop.is_some() {
                return Err(ModelError::stack(Some(i), "headtop is only allowed on the first row"));
            }
            if i > 0 && row.is_aquifer() == rows[i - 1].is_aquifer() {
                let what = if row.is_aquifer() { "aquifers" } else { "aquitards" };
                return Err(ModelError::stack(
                    Some(i),
                    format!("two consecutive {}; rows must alternate", what),
                ));
            }
            if i > 0 && !(row.top < rows[i - 1].top) {
                return Err(ModelError::stack(
                    Some(i),
                    format!(
                        "top {} is not below the previous top {}",
                        row.top,
                        rows[i - 1].top
                    ),
                ));
            }
        }

        let first = &rows[0];
        let top_boundary = match (first.is_aquifer(), first.headtop) {
            (true, None) => TopBoundary::Confined,
            (false, Some(hstar)) => TopBoundary::SemiConfined { hstar },
            (true, Some(_)) => {
                return Err(ModelError::stack(
                    Some(0),
                    "headtop requires the first row to be an aquitard",
                ))
            }
            (false, None) => {
                return Err(ModelError::stack(
                    Some(0),
                    "stack starts with an aquitard but no headtop is given",
                ))
            }
        };

        if !rows[last].is_aquifer() {
            return Err(ModelError::stack(Some(last), "stack must end with an aquifer"));
        }
        if !(rows[last].bottom < rows[last].top) {
            return Err(ModelError::stack(
                Some(last),
                format!(
                    "bottom {} is not below top {}",
                    rows[last].bottom, rows[last].top
                ),
            ));
        }

        let kaq = rows.iter().filter_map(|r| r.conductivity).collect();
        let c = rows.iter().filter_map(|r| r.resistance).collect();
        let npor = rows.iter().map(|r| r.porosity).collect();
        let mut z: Vec<f64> = rows.iter().map(|r| r.top).collect();
        z.push(rows[last].bottom);

        Ok(Self {
            rows,
            kaq,
            c,
            z,
            npor,
            top_boundary,
        })
    }

    /// Build from an extracted aquifer table, in dataset row order.
    pub fn from_table(table: &ExtractedTable) -> Result<Self> {
        let rows = table
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let required = |name: &str| {
                    row.get(name).as_f64().ok_or_else(|| {
                        ModelError::stack(Some(i), format!("missing {}", name))
                    })
                };
                Ok(AquiferRow {
                    conductivity: row.get("conductivity").as_f64(),
                    resistance: row.get("resistance").as_f64(),
                    top: required("top")?,
                    bottom: required("bottom")?,
                    porosity: row.get("porosity").as_f64().unwrap_or(0.3),
                    headtop: row.get("headtop").as_f64(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Self::from_rows(rows)
    }

    pub fn rows(&self) -> &[AquiferRow] {
        &self.rows
    }

    /// Hydraulic conductivity per aquifer.
    pub fn kaq(&self) -> &[f64] {
        &self.kaq
    }

    /// Resistance per aquitard.
    pub fn c(&self) -> &[f64] {
        &self.c
    }

    /// Layer interfaces, top to bottom: every row's top, then the final bottom.
    pub fn z(&self) -> &[f64] {
        &self.z
    }

    /// Porosity per row.
    pub fn npor(&self) -> &[f64] {
        &self.npor
    }

    pub fn top_boundary(&self) -> TopBoundary {
        self.top_boundary
    }

    /// Number of aquifers.
    pub fn naq(&self) -> usize {
        self.kaq.len()
    }

    pub fn is_semi_confined(&self) -> bool {
        matches!(self.top_boundary, TopBoundary::SemiConfined { .. })
    }

    /// Top and bottom elevation of aquifer `layer`.
    pub fn aquifer_bounds(&self, layer: usize) -> Option<(f64, f64)> {
        let index = self
            .rows
            .iter()
            .enumerate()
            .filter(|(_, r)| r.is_aquifer())
            .nth(layer)?
            .0;
        Some((self.z[index], self.z[index + 1]))
    }
}
