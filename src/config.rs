//! Engine configuration, passed explicitly to [`crate::interpreter::Interpreter::new`].

use crate::numeric::MathContext;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Name recorded in every parsed [`crate::source::Location`].
    pub script_name: String,

    /// Extra digits kept by decimal division.
    pub division_digits: u64,

    /// Significant digits of non-integer exponentiation.
    pub transcendental_digits: u64,

    /// Most frames rendered when an escaped error is reported.
    pub trace_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let math = MathContext::default();

        Self {
            script_name: "<script>".to_string(),
            division_digits: math.division_digits,
            transcendental_digits: math.transcendental_digits,
            trace_limit: 16,
        }
    }
}

impl EngineConfig {
    pub fn math_context(&self) -> MathContext {
        MathContext {
            division_digits: self.division_digits,
            transcendental_digits: self.transcendental_digits,
        }
    }
}
