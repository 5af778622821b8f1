// Domain-layer modules and shared errors
pub mod campaign_mapper {
    pub use crate::campaign_mapper::*;
}

pub mod dispatcher {
    pub use crate::dispatcher::*;
}

pub mod error_normalizer {
    pub use crate::error_normalizer::*;
}

pub mod errors {
    pub use crate::errors::*;
}
