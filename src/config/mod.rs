// Configuration: `.stitchctl.yaml` in the working directory, all fields optional.

mod loader;
mod types;

pub use loader::{CONFIG_FILE, load, load_from};
pub use types::{Config, Profile};
