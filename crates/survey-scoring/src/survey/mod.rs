pub mod key;
pub mod scoring;
pub mod table;

/// Coarse classification shared by every library error so callers can
/// branch on the failure class without matching each variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad caller input: unknown method, malformed subscale map, bad bounds.
    Configuration,
    /// A requested key artifact does not exist.
    NotFound,
    /// Persisted artifacts or response data that cannot be interpreted.
    Data,
    Io,
}
