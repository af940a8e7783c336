use thiserror::Error;

/// Errors raised by layout operations.
#[derive(Error, Debug)]
pub enum LayoutError {
    #[error("No objects selected")]
    EmptySelection,

    #[error("Object '{0}' has no geometry")]
    EmptyObject(String),

    #[error("Object index {index} out of range ({len} objects)")]
    IndexOutOfRange { index: usize, len: usize },
}

pub type LayoutResult<T> = Result<T, LayoutError>;
