use crate::{
    frame::{Column, Frame, FrameError},
    value::{DType, Value},
};
use std::fmt;

///
/// PostFunc
///
/// Cell-wise finalizer turning aggregated partial columns into one
/// user-visible column. Input order is fixed per variant:
///
/// Identity → [x]
/// Mean     → [sum, count]
/// Var/Std/Sem → [sum, sum_sq, count]
/// Skew     → [sum, sum_sq, sum_cube, count]
/// Kurt     → [sum, sum_sq, sum_cube, sum_quad, count]
///

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PostFunc {
    Identity,
    Mean,
    Var { ddof: u32 },
    Std { ddof: u32 },
    Sem { ddof: u32 },
    Skew,
    Kurt,
}

impl PostFunc {
    #[must_use]
    pub const fn arity(self) -> usize {
        match self {
            Self::Identity => 1,
            Self::Mean => 2,
            Self::Var { .. } | Self::Std { .. } | Self::Sem { .. } => 3,
            Self::Skew => 4,
            Self::Kurt => 5,
        }
    }

    pub fn apply(self, inputs: &[&Frame]) -> Result<Frame, FrameError> {
        if inputs.len() != self.arity() {
            return Err(FrameError::LengthMismatch {
                expected: self.arity(),
                found: inputs.len(),
            });
        }
        let first = inputs[0];
        if self == Self::Identity {
            return Ok(first.clone());
        }
        if let Some(other) = inputs
            .iter()
            .find(|frame| frame.nrows() != first.nrows() || frame.ncols() != first.ncols())
        {
            return Err(FrameError::LengthMismatch {
                expected: first.nrows() * first.ncols(),
                found: other.nrows() * other.ncols(),
            });
        }

        let mut columns = Vec::with_capacity(first.ncols());
        for col in 0..first.ncols() {
            let values = (0..first.nrows())
                .map(|row| {
                    let cells: Vec<Option<f64>> = inputs
                        .iter()
                        .map(|frame| frame.columns()[col].values()[row].as_f64())
                        .collect();
                    self.finalize(&cells).map_or(Value::Null, Value::Float)
                })
                .collect();
            columns.push(Column::typed(DType::Float64, values));
        }

        Frame::new(first.index().clone(), first.labels().to_vec(), columns)
    }

    fn finalize(self, cells: &[Option<f64>]) -> Option<f64> {
        let n = cells.last().copied().flatten()?;
        let sums: Vec<f64> = cells[..cells.len() - 1]
            .iter()
            .map(|cell| cell.unwrap_or(0.0))
            .collect();

        match self {
            Self::Identity => cells.first().copied().flatten(),
            Self::Mean => (n > 0.0).then(|| sums[0] / n),
            Self::Var { ddof } => variance(n, sums[0], sums[1], ddof),
            Self::Std { ddof } => variance(n, sums[0], sums[1], ddof).map(f64::sqrt),
            Self::Sem { ddof } => {
                variance(n, sums[0], sums[1], ddof).map(|var| var.sqrt() / n.sqrt())
            }
            Self::Skew => skew(n, sums[0], sums[1], sums[2]),
            Self::Kurt => kurtosis(n, sums[0], sums[1], sums[2], sums[3]),
        }
    }
}

impl fmt::Display for PostFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identity => f.write_str("identity"),
            Self::Mean => f.write_str("mean"),
            Self::Var { ddof } => write!(f, "var(ddof={ddof})"),
            Self::Std { ddof } => write!(f, "std(ddof={ddof})"),
            Self::Sem { ddof } => write!(f, "sem(ddof={ddof})"),
            Self::Skew => f.write_str("skew"),
            Self::Kurt => f.write_str("kurt"),
        }
    }
}

fn variance(n: f64, s1: f64, s2: f64, ddof: u32) -> Option<f64> {
    let dof = n - f64::from(ddof);
    if dof <= 0.0 {
        return None;
    }

    Some(((s2 - s1 * s1 / n) / dof).max(0.0))
}

// Central moments m2..m4 of a sample of size n from raw power sums.
fn central_moments(n: f64, s1: f64, s2: f64, s3: f64, s4: f64) -> (f64, f64, f64) {
    let mean = s1 / n;
    let m2 = s2 / n - mean * mean;
    let m3 = s3 / n - 3.0 * mean * s2 / n + 2.0 * mean.powi(3);
    let m4 = s4 / n - 4.0 * mean * s3 / n + 6.0 * mean * mean * s2 / n - 3.0 * mean.powi(4);

    (m2, m3, m4)
}

// Adjusted Fisher-Pearson sample skewness.
fn skew(n: f64, s1: f64, s2: f64, s3: f64) -> Option<f64> {
    if n < 3.0 {
        return None;
    }
    let (m2, m3, _) = central_moments(n, s1, s2, s3, 0.0);
    if m2 <= f64::EPSILON * (s2 / n).abs() {
        return Some(0.0);
    }

    Some((n * (n - 1.0)).sqrt() / (n - 2.0) * m3 / m2.powf(1.5))
}

// Unbiased excess kurtosis.
fn kurtosis(n: f64, s1: f64, s2: f64, s3: f64, s4: f64) -> Option<f64> {
    if n < 4.0 {
        return None;
    }
    let (m2, _, m4) = central_moments(n, s1, s2, s3, s4);
    if m2 <= f64::EPSILON * (s2 / n).abs() {
        return Some(0.0);
    }

    let scale = (n - 1.0) / ((n - 2.0) * (n - 3.0));
    Some(scale * ((n + 1.0) * m4 / (m2 * m2) - 3.0 * (n - 1.0)))
}
