#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Operands (or a requested shape) do not agree.
    #[error("shape mismatch in `{op}`: {lhs:?} vs {rhs:?}")]
    ShapeMismatch {
        op: &'static str,
        lhs: Vec<usize>,
        rhs: Vec<usize>,
    },

    /// An axis, index or range falls outside the array.
    #[error("index out of bounds in `{op}`: {msg}")]
    IndexOutOfBounds { op: &'static str, msg: String },

    /// A layout that cannot serve the requested operation without copying.
    #[error("illegal layout for `{op}`: shape {shape:?}, strides {strides:?}")]
    IllegalLayout {
        op: &'static str,
        shape: Vec<usize>,
        strides: Vec<usize>,
    },

    #[error("missing gradient: {0}")]
    MissingGradient(String),

    /// A tensor handle that belongs to another graph or was freed by a reset.
    #[error("illegal graph state: {0}")]
    IllegalGraphState(String),

    #[error("parameters #{first} and #{second} alias the same storage")]
    AliasedParameters { first: usize, second: usize },

    #[error("{inner}\n{backtrace}")]
    WithBacktrace {
        inner: Box<Self>,
        backtrace: Box<std::backtrace::Backtrace>,
    },

    /// Arbitrary errors wrapping.
    #[error(transparent)]
    Wrapped(Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Wrap an arbitrary error.
    pub fn wrap(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Wrapped(Box::new(err)).bt()
    }

    pub(crate) fn shape_mismatch(op: &'static str, lhs: &[usize], rhs: &[usize]) -> Self {
        Self::ShapeMismatch {
            op,
            lhs: lhs.to_vec(),
            rhs: rhs.to_vec(),
        }
        .bt()
    }

    pub(crate) fn out_of_bounds(op: &'static str, msg: impl Into<String>) -> Self {
        Self::IndexOutOfBounds {
            op,
            msg: msg.into(),
        }
        .bt()
    }

    pub fn bt(self) -> Self {
        let backtrace = std::backtrace::Backtrace::capture();
        match backtrace.status() {
            std::backtrace::BacktraceStatus::Disabled
            | std::backtrace::BacktraceStatus::Unsupported => self,
            _ => Self::WithBacktrace {
                inner: Box::new(self),
                backtrace: Box::new(backtrace),
            },
        }
    }

    /// The error with any backtrace wrapper removed.
    pub fn inner(&self) -> &Self {
        match self {
            Self::WithBacktrace { inner, .. } => inner.inner(),
            other => other,
        }
    }
}
