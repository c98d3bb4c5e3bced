/// Number of data-memory cells addressable by programs. The stack pointer
/// starts here and grows downward.
pub const DATA_MEM_SZ: usize = 10000;

/// Physical length of data memory. The two cells above `DATA_MEM_SZ` are
/// guard space for the first stack push.
pub const DATA_MEM_LEN: usize = DATA_MEM_SZ + 2;

/// Default instruction cap for a simulation run.
pub const SIMULATION_LIMIT: u64 = 100_000;
