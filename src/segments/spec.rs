use super::Concurrency;
use crate::error::GateError;

/// Request to enter a named segment.
///
/// Combines the segment name and the concurrency the caller wants it to have.
/// The concurrency overwrites whatever the segment had before (last writer wins).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SegmentSpec {
    name: String,
    concurrency: Concurrency,
}

impl SegmentSpec {
    /// Name under which the step is exposed to pipeline scripts.
    pub const FUNCTION_NAME: &'static str = "segment";

    /// Creates a new segment request.
    ///
    /// ## Errors
    /// - [`GateError::MissingName`] if `name` is blank.
    pub fn new(name: impl Into<String>, concurrency: Concurrency) -> Result<Self, GateError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(GateError::MissingName);
        }
        Ok(Self { name, concurrency })
    }

    /// Builds a request from raw script arguments.
    ///
    /// An absent or empty `concurrency` means unbounded.
    pub fn parse(name: Option<&str>, concurrency: Option<&str>) -> Result<Self, GateError> {
        let name = name.ok_or(GateError::MissingName)?;
        let concurrency = concurrency.unwrap_or_default().parse()?;
        Self::new(name, concurrency)
    }

    /// Convenience: bounded segment.
    #[inline]
    pub fn limited(name: impl Into<String>, n: u32) -> Result<Self, GateError> {
        Self::new(name, Concurrency::limited(n)?)
    }

    #[inline]
    pub fn unbounded(name: impl Into<String>) -> Result<Self, GateError> {
        Self::new(name, Concurrency::Unbounded)
    }

    /// Returns the segment name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn concurrency(&self) -> Concurrency {
        self.concurrency
    }
}
