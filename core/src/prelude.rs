/// Common error type for ISR tasks and kernels.
#[derive(thiserror::Error, Debug)]
pub enum IsrError {
    #[error("this method must be executed on an amplifier, got detector {0}")]
    NotAnAmplifier(String),
    #[error(
        "coeff[1] must be 0 for PROPORTIONAL non-linearity correction; saw {value} \
         for detector {detector} amplifier {amp}"
    )]
    NonZeroSecondCoeff {
        detector: String,
        amp: String,
        value: f64,
    },
    #[error("one or more linearity coefficients not finite for amplifier {amp}: {coeffs:?}")]
    NonFiniteCoeffs { amp: String, coeffs: Vec<f64> },
    #[error(
        "unsupported linearity type {kind:?} for detector {detector} amplifier {amp}; \
         must be PROPORTIONAL or NONE"
    )]
    UnsupportedLinearity {
        kind: String,
        detector: String,
        amp: String,
    },
    #[error("need 3 linearity coefficients; only found {0}")]
    TooFewLinearityCoeffs(usize),
    #[error("there were {0} unmasked NaNs")]
    UnmaskedNans(usize),
    #[error("dimension mismatch: expected {expected:?}, found {found:?}")]
    DimensionMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },
    #[error("bounding box {0} lies outside the image")]
    OutOfBounds(String),
    #[error("unknown mask plane {0:?}")]
    UnknownMaskPlane(String),
    #[error("exposure has no detector attached")]
    MissingDetector,
    #[error("dataset {0} not available")]
    MissingDataset(String),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization failure: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type IsrResult<T> = Result<T, IsrError>;

/// Trait describing a named pipeline task with a single entry point.
pub trait Task {
    type Input<'a>;
    type Output;

    fn name(&self) -> &str;
    fn run(&mut self, input: Self::Input<'_>) -> IsrResult<Self::Output>;
}
