// Submodules for separation of concerns
mod coerce;
mod ordering;
mod parse;
mod predicate;
mod scope;
mod translate;
mod types;
mod window;

// Public API re-exports
pub use coerce::coerce_literal;
pub use parse::{FilterSerde, PageSerde, QueryDescriptionSerde, parse_filter_json, parse_query_json};
pub use scope::{FieldType, Scope, TypeDescriptor};
pub use translate::{QueryTranslator, TranslatedQuery};
pub use types::{CompareOp, FilterNode, PageWindow, QueryDescription, SortKey};
