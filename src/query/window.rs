use crate::query::translate::TranslatedQuery;
use crate::query::types::PageWindow;

/// Applies the skip/take bounds of a page window onto a translated query.
///
/// Operates on the already filtered and sorted sequence; it never affects
/// which documents match or how they rank.
pub(crate) fn apply_window(query: &mut TranslatedQuery, page: &PageWindow) {
    query.skip = page.skip();
    query.limit = Some(page.take());
}
