use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("scene contains no primitives")]
    EmptyScene,

    #[error("invalid image resolution {width}x{height}")]
    InvalidResolution { width: u32, height: u32 },

    #[error("primitive {primitive} references material {material}, but only {count} materials exist")]
    InvalidMaterial {
        primitive: usize,
        material: usize,
        count: usize,
    },

    #[error("could not start render threads: {0}")]
    ThreadPool(String),

    #[error("render cancelled after {passes_completed} of {passes_total} passes")]
    Cancelled {
        passes_completed: usize,
        passes_total: usize,
    },
}

pub type RenderResult<T> = Result<T, RenderError>;
