pub type RetrofbResult<T> = Result<T, RetrofbError>;

#[derive(thiserror::Error, Debug)]
pub enum RetrofbError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("asset load error: {0}")]
    AssetLoad(String),

    #[error("shader compile error: {0}")]
    ShaderCompile(String),

    #[error("shader link error: {0}")]
    ShaderLink(String),

    #[error("gpu error: {0}")]
    Gpu(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RetrofbError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn asset_load(msg: impl Into<String>) -> Self {
        Self::AssetLoad(msg.into())
    }

    pub fn shader_compile(msg: impl Into<String>) -> Self {
        Self::ShaderCompile(msg.into())
    }

    pub fn shader_link(msg: impl Into<String>) -> Self {
        Self::ShaderLink(msg.into())
    }

    pub fn gpu(msg: impl Into<String>) -> Self {
        Self::Gpu(msg.into())
    }
}
