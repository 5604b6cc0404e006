use std::fmt;

#[derive(Debug)]
pub enum GlyphBookError {
    Composition { target: u64, component: u64 },
    LayoutConfiguration(String),
    Store(String),
    Render(String),
    Assembly(String),
    Io(std::io::Error),
}

impl fmt::Display for GlyphBookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GlyphBookError::Composition { target, component } => {
                write!(
                    f,
                    "cannot compose {}: no image for component {}",
                    target, component
                )
            }
            GlyphBookError::LayoutConfiguration(message) => {
                write!(f, "invalid layout configuration: {}", message)
            }
            GlyphBookError::Store(message) => write!(f, "glyph store error: {}", message),
            GlyphBookError::Render(message) => write!(f, "render error: {}", message),
            GlyphBookError::Assembly(message) => write!(f, "pdf assembly error: {}", message),
            GlyphBookError::Io(err) => write!(f, "io error: {}", err),
        }
    }
}

impl std::error::Error for GlyphBookError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GlyphBookError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for GlyphBookError {
    fn from(value: std::io::Error) -> Self {
        GlyphBookError::Io(value)
    }
}
