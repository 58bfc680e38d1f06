use std::{error, fmt, io};

use camino::FromPathBufError;

#[derive(Debug, Clone)]
pub enum Error {
    Io(String),
    Utf8(String),
    Auth(String),
    Api(String),
    Config(String),
    Other(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(msg) => write!(f, "IO error: {msg}"),
            Self::Utf8(msg) => write!(f, "Non UTF-8 path: {msg}"),
            Self::Auth(msg) => write!(f, "Authorization error: {msg}"),
            Self::Api(msg) => write!(f, "API error: {msg}"),
            Self::Config(msg) => write!(f, "Configuration error: {msg}"),
            Self::Other(msg) => f.write_str(msg),
        }
    }
}

impl error::Error for Error {}

impl From<io::Error> for Error {
    fn from(value: io::Error) -> Self {
        Self::Io(value.to_string())
    }
}

impl From<FromPathBufError> for Error {
    fn from(value: FromPathBufError) -> Self {
        Self::Utf8(value.as_path().as_os_str().to_string_lossy().to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(value: reqwest::Error) -> Self {
        Self::Api(value.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[macro_export]
macro_rules! api_bail {
    ($($t:tt)*) => {
        return ::core::result::Result::Err($crate::Error::Api(format!($($t)*)))
    };
}

#[macro_export]
macro_rules! auth_bail {
    ($($t:tt)*) => {
        return ::core::result::Result::Err($crate::Error::Auth(format!($($t)*)))
    };
}

#[macro_export]
macro_rules! config_bail {
    ($($t:tt)*) => {
        return ::core::result::Result::Err($crate::Error::Config(format!($($t)*)))
    };
}

#[macro_export]
macro_rules! io_error {
    ($($t:tt)*) => {
        $crate::Error::Io(format!($($t)*))
    };
}

#[macro_export]
macro_rules! auth_error {
    ($($t:tt)*) => {
        $crate::Error::Auth(format!($($t)*))
    };
}

#[macro_export]
macro_rules! api_error {
    ($($t:tt)*) => {
        $crate::Error::Api(format!($($t)*))
    };
}

#[macro_export]
macro_rules! config_error {
    ($($t:tt)*) => {
        $crate::Error::Config(format!($($t)*))
    };
}

#[macro_export]
macro_rules! other_error {
    ($($t:tt)*) => {
        $crate::Error::Other(format!($($t)*))
    };
}

#[cfg(test)]
mod tests {
    use super::Error;

    #[test]
    fn display_api_error() {
        let err = Error::Api("files.list returned 403".into());
        assert_eq!(err.to_string(), "API error: files.list returned 403");
    }

    #[test]
    fn display_other_error() {
        let err = Error::Other("An error message".into());
        assert_eq!(err.to_string(), "An error message");
    }

    #[test]
    fn from_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = Error::from(io);
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn error_macro_formats() {
        let err = crate::config_error!("interval is {}", 0);
        assert_eq!(err.to_string(), "Configuration error: interval is 0");
    }
}
