use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid config `{field}`: {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    #[error("Property `{key}` has unparsable value `{value}`")]
    Property { key: String, value: String },

    #[error("Json Error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Io Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Frame index {current} does not follow {previous}")]
    FrameOrder { previous: u32, current: u32 },

    #[error("Frame has degenerate size {width}x{height}")]
    FrameSize { width: usize, height: usize },

    #[error("Detector Error: {0}")]
    Detector(String),
}
