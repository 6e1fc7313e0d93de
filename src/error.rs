use thiserror::Error;

pub type Result<T> = std::result::Result<T, BnetError>;

/// Errors surfaced by network construction, potential algebra and the
/// inference engines.
#[derive(Error, Debug)]
pub enum BnetError {
    /// A graph edit or sort detected an illegal structure (cycles,
    /// self edges, or a disconnected network where a single join tree
    /// is required).
    #[error("bad graph structure: {0}")]
    GraphStructure(String),

    /// A potential was built or combined with mismatched node sets or
    /// array shapes. Always a programming error in the caller.
    #[error("potential shape mismatch: {0}")]
    PotentialShape(String),

    /// A conditional slice summed (classical) or normed (quantum) to
    /// less than 1e-6 during normalization. During readout this means
    /// the evidence is inconsistent with the model.
    #[error("potential of {label} cannot be normalized at parent states {parent_states:?}")]
    UnNormalizablePot {
        label: String,
        parent_states: Vec<usize>,
    },

    /// A non-finite value escaped the defined zero-on-degenerate
    /// division rule.
    #[error("non-finite value in {0}")]
    Arithmetic(String),

    /// The BIF text did not match the grammar.
    #[error("bif parse error: {0}")]
    Parse(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
