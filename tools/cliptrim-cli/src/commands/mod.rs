pub mod check;
pub mod defaults;
pub mod export;
pub mod next_name;
