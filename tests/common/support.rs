//! Support framework.
//!
//! Tests are plain functions taking a [`Fixture`] and returning anything
//! implementing [`TestResult`]; [`run_test`] builds the fixture, runs the test,
//! and turns errors into panics.

use failure::Error;

/// Only types implementing this trait can be returned from test functions.
pub trait TestResult {
    /// Convert this value into a test result.
    fn into_result(self) -> Result<(), Error>;
}

impl<T, E> TestResult for Result<T, E>
where
    Error: From<E>,
{
    fn into_result(self) -> Result<(), Error> {
        self.map(|_| ()).map_err(From::from)
    }
}

impl TestResult for () {
    fn into_result(self) -> Result<(), Error> {
        Ok(self)
    }
}

/// Common trait implemented by test fixtures.
pub trait Fixture: Sized {
    fn make() -> Result<Self, Error>;
}

impl Fixture for () {
    fn make() -> Result<Self, Error> {
        Ok(())
    }
}

/// Run a test case.
pub fn run_test<A, R, T>(test: T)
where
    A: Fixture,
    R: TestResult,
    T: FnOnce(A) -> R,
{
    let _ = env_logger::builder().is_test(true).try_init();

    let result = A::make().and_then(|fixture| test(fixture).into_result());

    if let Err(err) = result {
        panic!("{}", err);
    }
}
