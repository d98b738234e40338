pub type GlitchResult<T> = Result<T, GlitchError>;

#[derive(thiserror::Error, Debug)]
pub enum GlitchError {
    #[error("validation error: {0}")]
    Validation(String),

    /// Corrupted or undecodable media. Aborts the operation that triggered
    /// loading, never the render loop.
    #[error("resource error: {0}")]
    Resource(String),

    #[error("render error: {0}")]
    Render(String),

    #[error("export error: {0}")]
    Export(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GlitchError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn resource(msg: impl Into<String>) -> Self {
        Self::Resource(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    pub fn export(msg: impl Into<String>) -> Self {
        Self::Export(msg.into())
    }
}
