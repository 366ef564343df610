//! Products a complete products file did not name

use super::settings::MissingItemsAction;
use crate::db::repository::{RepoResult, product};
use sqlx::SqliteConnection;
use std::collections::HashSet;

/// Apply `action` to every product whose article is not in `seen`
///
/// Returns the number of products changed.
pub async fn apply(
    conn: &mut SqliteConnection,
    action: MissingItemsAction,
    seen: &HashSet<String>,
) -> RepoResult<usize> {
    if action == MissingItemsAction::Ignore {
        return Ok(0);
    }
    let mut changed = 0;
    for (id, article) in product::find_articles(conn).await? {
        if seen.contains(&article) {
            continue;
        }
        let touched = match action {
            MissingItemsAction::SetNotInStock => product::set_in_stock(conn, id, false).await?,
            MissingItemsAction::Delete => product::delete(conn, id).await?,
            MissingItemsAction::Ignore => false,
        };
        if touched {
            changed += 1;
            tracing::debug!(target: "import", article = %article, id, action = ?action, "Unlisted product updated");
        }
    }
    Ok(changed)
}
