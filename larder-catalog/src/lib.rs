pub mod brands;
pub mod pricing;
pub mod prompt;
pub mod search;
pub mod selector;
pub mod substitution;

pub use search::ProductSearchService;
pub use selector::{ProductSelector, Selection, SelectionError, SelectionMethod};
pub use substitution::{PriorAttempt, SubstitutionError, SubstitutionResolver};
