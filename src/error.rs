use std::fmt;

#[derive(Debug)]
pub enum TableTextError {
    InvalidConfiguration(String),
    Io(std::io::Error),
}

impl fmt::Display for TableTextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableTextError::InvalidConfiguration(message) => {
                write!(f, "invalid configuration: {}", message)
            }
            TableTextError::Io(err) => write!(f, "io error: {}", err),
        }
    }
}

impl std::error::Error for TableTextError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TableTextError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for TableTextError {
    fn from(value: std::io::Error) -> Self {
        TableTextError::Io(value)
    }
}
