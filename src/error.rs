//! Error kinds reported by the rasterizer.
//!
//! Argument and lifecycle-order errors are raised synchronously by the call
//! that violates them. Shader build failures leave the session without a
//! usable program; the caller has to `cleanup()` and `init()` again.

pub type RasterResult<T> = Result<T, RasterError>;

#[derive(thiserror::Error, Debug)]
pub enum RasterError {
    /// A size or range invariant of the input was violated.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The GPU could not allocate a buffer, texture or attachment.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("shader compilation failed: {0}")]
    ShaderCompile(String),

    #[error("shader program link failed: {0}")]
    ShaderLink(String),

    /// The color/depth attachments can't be combined into a render target.
    #[error("incomplete framebuffer: {0}")]
    IncompleteFramebuffer(String),

    /// An operation was invoked out of lifecycle order.
    #[error("not initialized: {0}")]
    NotInitialized(String),

    #[error("pixel transfer failed: {0}")]
    TransferFailed(String),

    /// No adapter/device, or the adapter lacks a capability the renderer needs.
    #[error("gpu context unavailable: {0}")]
    ContextUnavailable(String),
}

impl RasterError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn resource_exhausted(msg: impl Into<String>) -> Self {
        Self::ResourceExhausted(msg.into())
    }

    pub fn shader_compile(msg: impl Into<String>) -> Self {
        Self::ShaderCompile(msg.into())
    }

    pub fn shader_link(msg: impl Into<String>) -> Self {
        Self::ShaderLink(msg.into())
    }

    pub fn incomplete_framebuffer(msg: impl Into<String>) -> Self {
        Self::IncompleteFramebuffer(msg.into())
    }

    pub fn not_initialized(msg: impl Into<String>) -> Self {
        Self::NotInitialized(msg.into())
    }

    pub fn transfer_failed(msg: impl Into<String>) -> Self {
        Self::TransferFailed(msg.into())
    }

    pub fn context_unavailable(msg: impl Into<String>) -> Self {
        Self::ContextUnavailable(msg.into())
    }

    /// True for errors after which no valid program exists for this session.
    pub fn is_fatal_for_session(&self) -> bool {
        matches!(self, Self::ShaderCompile(_) | Self::ShaderLink(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            RasterError::invalid_argument("x")
                .to_string()
                .starts_with("invalid argument:")
        );
        assert!(
            RasterError::resource_exhausted("x")
                .to_string()
                .starts_with("resource exhausted:")
        );
        assert!(
            RasterError::not_initialized("x")
                .to_string()
                .starts_with("not initialized:")
        );
        assert!(
            RasterError::transfer_failed("x")
                .to_string()
                .starts_with("pixel transfer failed:")
        );
    }

    #[test]
    fn diagnostics_are_kept_verbatim() {
        let err = RasterError::shader_compile("error: expected ';', found '}'");
        assert!(err.to_string().contains("expected ';', found '}'"));
    }

    #[test]
    fn only_shader_errors_end_the_session() {
        assert!(RasterError::shader_compile("x").is_fatal_for_session());
        assert!(RasterError::shader_link("x").is_fatal_for_session());
        assert!(!RasterError::resource_exhausted("x").is_fatal_for_session());
        assert!(!RasterError::transfer_failed("x").is_fatal_for_session());
        assert!(!RasterError::incomplete_framebuffer("x").is_fatal_for_session());
    }
}
