//! Configuration access port trait.

/// Read-only key/value access grouped by section.
///
/// Numeric getters return `Ok(None)` for a missing key and `Err` with a
/// description for a value that does not parse.
pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_int(&self, section: &str, key: &str) -> Result<Option<i64>, String>;
    fn get_double(&self, section: &str, key: &str) -> Result<Option<f64>, String>;
}
