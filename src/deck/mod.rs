pub mod coupling;
pub mod mutator;
pub mod record;
pub mod workspace;

pub use self::coupling::CouplingEnforcer;
pub use self::record::{Keyword, NumField, RecordKey};
pub use self::workspace::Workspace;
