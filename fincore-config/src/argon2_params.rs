/// Argon2id cost parameters, process-wide immutable once loaded
/// (spec.md §4.1, §5 "Global state"). Defaults are time=3, memory=64 MiB,
/// parallelism=2 per spec.md §4.1.
#[derive(Debug, Clone, Copy)]
pub struct Argon2Params {
    pub time_cost: u32,
    pub memory_kib: u32,
    pub parallelism: u32,
}

impl Argon2Params {
    pub fn new(time_cost: u32, memory_kib: u32, parallelism: u32) -> Self {
        Self {
            time_cost,
            memory_kib,
            parallelism,
        }
    }
}

impl Default for Argon2Params {
    fn default() -> Self {
        Self::new(3, 64 * 1024, 2)
    }
}
