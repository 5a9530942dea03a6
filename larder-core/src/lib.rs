pub mod oracle;
pub mod pantry;
pub mod preferences;
pub mod retailer;
pub mod search;

pub use oracle::{OracleError, OracleRequest, SelectionOracle};
pub use pantry::{PantryError, PantryReconciler};
pub use preferences::{PreferenceError, PreferenceStore};
pub use retailer::{RetailerClient, RetailerError};
pub use search::{CachedMapping, CatalogError, CatalogSearch, MappingCache};
