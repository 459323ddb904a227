use failure::Fail;
use lifecycle_macros::From;
use std::borrow::Cow;

pub use lifecycle_macros::ApiError;

/// An error that occurred while carrying out a lifecycle operation.
pub trait ApiError: Fail {
    /// Internal code describing this error.
    ///
    /// This code is used to identify this error outside the engine, and thus
    /// should only be present for errors which are intended to be reported
    /// to the caller in detail.
    fn code(&self) -> Option<Cow<str>>;
}

/// This implementation is required to make `#[cause]` on a `Box<dyn ApiError>`
/// work.
impl Fail for Box<dyn ApiError> {
    fn name(&self) -> Option<&str> {
        (**self).name()
    }

    fn cause(&self) -> Option<&dyn Fail> {
        (**self).cause()
    }

    fn backtrace(&self) -> Option<&failure::Backtrace> {
        (**self).backtrace()
    }
}

/// A wrapper around many types of errors, including caller-facing
/// [`ApiError`]s as well as errors of the surrounding process, such as failure
/// to read a state snapshot.
#[derive(Debug, Fail, From)]
pub enum Error {
    #[fail(display = "{}", _0)]
    Api(#[cause] Box<dyn ApiError>),
    /// Generic system error.
    #[fail(display = "{}", _0)]
    System(#[cause] #[from] std::io::Error),
    /// State snapshot could not be encoded or decoded.
    #[fail(display = "Invalid state snapshot: {}", _0)]
    Snapshot(#[cause] #[from] serde_json::Error),
}

impl Error {
    /// Code of the underlying [`ApiError`], if there is one.
    pub fn code(&self) -> Option<Cow<str>> {
        match self {
            Error::Api(err) => err.code(),
            _ => None,
        }
    }
}

impl<T: ApiError> From<T> for Error {
    fn from(error: T) -> Error {
        Error::Api(Box::new(error))
    }
}
