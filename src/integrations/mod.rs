//! External service integrations.

pub mod services {
    pub use crate::services::*;
}

pub mod prompts {
    pub use crate::prompts::*;
}
