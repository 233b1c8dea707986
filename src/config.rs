use xforms_xpath_engine::TimeZone;

/// Default bound of the parsed-expression cache.
pub const DEFAULT_CACHE_CAPACITY: usize = 256;

/// Settings shared by every evaluation an [`Evaluator`](crate::Evaluator) runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluatorConfig {
    /// The zone `today()`, `now()` and the other date functions anchor to.
    pub time_zone: TimeZone,
    /// How many parsed expressions are kept. Zero is treated as one.
    pub cache_capacity: usize,
    /// If true, a reference to an unbound variable is an error instead of `''`.
    pub strict: bool,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            time_zone: TimeZone::default(),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            strict: false,
        }
    }
}
