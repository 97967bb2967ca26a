pub mod validation;

pub use validation::{
    validate_cpu_threshold, validate_keyword, validate_memory_threshold, validate_pid,
    validate_pids, validate_port, validate_required_port, validate_user, ProcessFilter,
};
