mod settings;

pub use settings::{default_data_dir, ResxSettings};
