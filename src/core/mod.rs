// Domain-layer modules and shared errors/models
pub mod enrichment {
    pub use crate::enrichment::*;
}

pub mod models {
    pub use crate::models::*;
}

pub mod model_output {
    pub use crate::model_output::*;
}

pub mod report {
    pub use crate::report::*;
}

pub mod errors {
    pub use crate::errors::*;
}
