//! Raw peripheral access, input debouncing, and task spawning helpers.

pub mod button;
pub mod hw_init;
pub mod task_pin;
