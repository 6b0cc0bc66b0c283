use derive_more::Display;

/// The error produced when a pattern cannot be constructed.
///
/// Every failure, no matter which stage of construction detected it, carries
/// the byte index closest to the offending character and the string that was
/// being processed at the time.
#[derive(Debug, Display, Clone, PartialEq, Eq)]
#[display(fmt = "illegal pattern near index {}: {}", index, input)]
pub struct Error {
  index: usize,
  input: String,
}

impl Error {
  pub(crate) fn at(index: usize, input: impl Into<String>) -> Self {
    Error {
      index,
      input: input.into(),
    }
  }

  /// The byte index near which processing failed.
  pub fn index(&self) -> usize {
    self.index
  }

  /// The string that was being processed when the failure occurred.
  pub fn input(&self) -> &str {
    &self.input
  }
}

impl std::error::Error for Error {}
