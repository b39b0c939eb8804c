use ndarray as nd;

use crate::error::{FlowError, FlowResult};
use crate::grid::Grid;

/// Hydraulic conductivity input, resolved once into three axis fields.
#[derive(Debug, Clone)]
pub enum Conductivity {
    /// Same conductivity along all axes.
    Isotropic(nd::Array3<f64>),
    /// Horizontal (x and y) and vertical conductivity.
    HorizontalVertical {
        kh: nd::Array3<f64>,
        kv: nd::Array3<f64>,
    },
    /// Separate conductivity per axis.
    FullAnisotropic {
        kx: nd::Array3<f64>,
        ky: nd::Array3<f64>,
        kz: nd::Array3<f64>,
    },
}

impl Conductivity {
    /// Uniform isotropic conductivity over the grid.
    pub fn uniform(grid: &Grid, k: f64) -> Self {
        Self::Isotropic(nd::Array3::from_elem(grid.shape(), k))
    }

    /// Returns `(kx, ky, kz)`.
    pub fn components(&self) -> (&nd::Array3<f64>, &nd::Array3<f64>, &nd::Array3<f64>) {
        match self {
            Self::Isotropic(k) => (k, k, k),
            Self::HorizontalVertical { kh, kv } => (kh, kh, kv),
            Self::FullAnisotropic { kx, ky, kz } => (kx, ky, kz),
        }
    }

    fn named_components(&self) -> Vec<(&'static str, &nd::Array3<f64>)> {
        match self {
            Self::Isotropic(k) => vec![("k", k)],
            Self::HorizontalVertical { kh, kv } => vec![("kh", kh), ("kv", kv)],
            Self::FullAnisotropic { kx, ky, kz } => vec![("kx", kx), ("ky", ky), ("kz", kz)],
        }
    }
}

/// Role of a cell in the flow system, derived from IBOUND.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    /// Head is computed (`IBOUND > 0`).
    Active,
    /// Cell is excluded and gets NaN heads (`IBOUND == 0`).
    Inactive,
    /// Head is prescribed by the initial head (`IBOUND < 0`).
    FixedHead,
}

impl CellKind {
    pub fn from_ibound(value: i32) -> Self {
        match value {
            v if v > 0 => Self::Active,
            0 => Self::Inactive,
            _ => Self::FixedHead,
        }
    }
}

/// Classifies every cell in node order.
pub fn classify(ibound: &nd::Array3<i32>) -> Vec<CellKind> {
    ibound.iter().map(|&v| CellKind::from_ibound(v)).collect()
}

/// Everything a single solve needs besides the solver configuration.
///
/// `times` holds the start time followed by the end times of all steps.
#[derive(Debug, Clone)]
pub struct ModelInputs {
    pub grid: Grid,
    pub conductivity: Conductivity,
    /// Specific storage [1/L].
    pub ss: nd::Array3<f64>,
    /// Prescribed cell flows [L3/T], injection positive.
    pub fq: nd::Array3<f64>,
    /// Initial heads, and prescribed heads where `ibound < 0`.
    pub hi: nd::Array3<f64>,
    pub ibound: nd::Array3<i32>,
    pub times: Vec<f64>,
}

impl ModelInputs {
    /// All cells active, no storage, no sources, zero initial heads.
    pub fn new(grid: Grid, conductivity: Conductivity, times: Vec<f64>) -> Self {
        let shape = grid.shape();
        Self {
            grid,
            conductivity,
            ss: nd::Array3::zeros(shape),
            fq: nd::Array3::zeros(shape),
            hi: nd::Array3::zeros(shape),
            ibound: nd::Array3::ones(shape),
            times,
        }
    }

    pub fn with_storage(mut self, ss: nd::Array3<f64>) -> Self {
        self.ss = ss;
        self
    }

    pub fn with_sources(mut self, fq: nd::Array3<f64>) -> Self {
        self.fq = fq;
        self
    }

    pub fn with_initial_heads(mut self, hi: nd::Array3<f64>) -> Self {
        self.hi = hi;
        self
    }

    pub fn with_ibound(mut self, ibound: nd::Array3<i32>) -> Self {
        self.ibound = ibound;
        self
    }

    pub fn with_times(mut self, times: Vec<f64>) -> Self {
        self.times = times;
        self
    }

    /// Checks shapes, value ranges and the time vector.
    pub fn validate(&self) -> FlowResult<()> {
        let expected = self.grid.shape();

        for (name, k) in self.conductivity.named_components() {
            check_shape(name, expected, k.dim())?;
        }
        check_shape("ss", expected, self.ss.dim())?;
        check_shape("fq", expected, self.fq.dim())?;
        check_shape("hi", expected, self.hi.dim())?;
        check_shape("ibound", expected, self.ibound.dim())?;

        for (name, k) in self.conductivity.named_components() {
            check_finite_non_negative(name, k)?;
        }
        check_finite_non_negative("ss", &self.ss)?;

        for ((idx, &kind), (&h, &q)) in self
            .ibound
            .indexed_iter()
            .zip(self.hi.iter().zip(self.fq.iter()))
        {
            if CellKind::from_ibound(kind) == CellKind::Inactive {
                continue;
            }
            if !h.is_finite() || !q.is_finite() {
                return Err(FlowError::InvalidConfiguration(format!(
                    "non-finite head or flow in cell {idx:?} (hi={h}, fq={q})"
                )));
            }
        }

        validate_times(&self.times)
    }
}

fn check_shape(
    field: &str,
    expected: (usize, usize, usize),
    found: (usize, usize, usize),
) -> FlowResult<()> {
    if expected != found {
        return Err(FlowError::shape_mismatch(field, expected, found));
    }
    Ok(())
}

fn check_finite_non_negative(field: &str, values: &nd::Array3<f64>) -> FlowResult<()> {
    if let Some((idx, v)) = values.indexed_iter().find(|(_, v)| !(v.is_finite() && **v >= 0.0)) {
        return Err(FlowError::InvalidConfiguration(format!(
            "{field} must be finite and non-negative, got {v} in cell {idx:?}"
        )));
    }
    Ok(())
}

/// Requires at least two strictly increasing, finite times.
pub fn validate_times(times: &[f64]) -> FlowResult<()> {
    if times.len() < 2 {
        return Err(FlowError::InvalidTimeVector(format!(
            "need at least 2 times, got {}",
            times.len()
        )));
    }
    if let Some(t) = times.iter().find(|t| !t.is_finite()) {
        return Err(FlowError::InvalidTimeVector(format!(
            "non-finite time {t}"
        )));
    }
    if let Some(i) = times.windows(2).position(|w| w[1] <= w[0]) {
        return Err(FlowError::InvalidTimeVector(format!(
            "times must be strictly increasing, t[{}]={} >= t[{}]={}",
            i,
            times[i],
            i + 1,
            times[i + 1]
        )));
    }
    Ok(())
}
