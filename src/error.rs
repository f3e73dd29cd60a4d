/// Invalid setup detected by `init`, before any objective evaluation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("The objective reports a dimension of zero; there is nothing to optimize.")]
    ZeroDimension,
    #[error("Tolerance `{name}` must be finite and non-negative, got {value}.")]
    InvalidTolerance { name: &'static str, value: f64 },
    #[error(
        "Trust radius bounds must satisfy 0 < min <= initial <= max (all finite), got min={min}, initial={initial}, max={max}."
    )]
    InvalidRadiusBounds { min: f64, initial: f64, max: f64 },
    #[error("Ratio threshold `{name}` is out of range: {value}.")]
    InvalidRatio { name: &'static str, value: f64 },
    #[error("Radius factor `{name}` is out of range: {value}.")]
    InvalidFactor { name: &'static str, value: f64 },
    #[error("Invalid line search settings: {reason}.")]
    InvalidLineSearch { reason: &'static str },
    #[error("The stagnation window must span at least one accepted iteration.")]
    InvalidStagnationWindow,
}

/// A run that could not produce a status.
///
/// Everything an optimizer can run into on a well-formed problem (iteration
/// limit, line search failure, stagnation) is reported through
/// [`Status`](crate::Status) instead.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OptimizeError {
    #[error("The iterate has {found} components but the objective expects {expected}.")]
    DimensionMismatch { expected: usize, found: usize },
    #[error(
        "The objective value or gradient was NaN or infinity at iteration {iteration}, indicating numerical instability."
    )]
    NonFinite { iteration: usize },
}
