//! Item search queries

/// Build the `q` parameter used to find an item by title
///
/// Colons in the title are replaced by spaces. Unless the whole organization
/// is searched the query is scoped with `owner:<username>`. Item types are
/// appended as ` (type:"A" OR type:"B")`.
pub fn find_item_query<S: AsRef<str>>(
    title: &str,
    item_types: &[S],
    username: Option<&str>,
    search_org: bool,
) -> String {
    let title = title.replace(':', " ");

    let mut query = match (search_org, username) {
        (false, Some(user)) => format!("{title} owner:{user}"),
        _ => title,
    };

    if !item_types.is_empty() {
        let types = item_types
            .iter()
            .map(|t| format!("type:\"{}\"", t.as_ref()))
            .collect::<Vec<_>>()
            .join(" OR ");
        query.push_str(&format!(" ({types})"));
    }

    query
}
