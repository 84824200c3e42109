//! List filter builder
//!
//! Turns a structured list request into SQL clauses plus the positional
//! arguments they reference. Every active condition contributes exactly one
//! argument and one `AND`-joined fragment. Fragments use numbered
//! placeholders (`?N`) so a single argument can be referenced more than once.
//!
//! The same filter value drives both the page query and the `COUNT` query:
//! the count variant sets `disable_order` and `disable_offset`, which drops
//! the `ORDER BY` and `LIMIT/OFFSET` clauses and their arguments.

use sqlx::{Arguments, sqlite::SqliteArguments};

/// Page size used when the client sends `limit=0` or nothing at all
pub const DEFAULT_LIMIT: i64 = 5;

/// A positional argument produced by the builder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterArg {
    Text(String),
    Int(i64),
}

/// Output of [`PostFilter::build`] / [`UserFilter::build`]
///
/// Each clause is either empty or ends with a single space, so they can be
/// appended to a base `SELECT ... FROM ...` verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListClauses {
    pub predicate: String,
    pub order: String,
    pub limit_offset: String,
    pub args: Vec<FilterArg>,
}

impl ListClauses {
    /// Append the clauses to a base query
    pub fn apply_to(&self, base: &str) -> String {
        format!(
            "{} {}{}{}",
            base.trim_end(),
            self.predicate,
            self.order,
            self.limit_offset
        )
    }

    /// Convert the arguments into sqlx bind arguments, preserving order
    pub fn arguments<'q>(&self) -> SqliteArguments<'q> {
        let mut arguments = SqliteArguments::default();
        for arg in &self.args {
            match arg {
                FilterArg::Text(value) => arguments.add(value.clone()),
                FilterArg::Int(value) => arguments.add(*value),
            }
        }
        arguments
    }
}

/// Accumulates `AND`-joined fragments and their arguments
#[derive(Default)]
struct ClauseBuilder {
    fragments: Vec<String>,
    args: Vec<FilterArg>,
}

impl ClauseBuilder {
    /// Register `arg` and push the fragment rendered with its placeholder index
    fn condition(&mut self, arg: FilterArg, fragment: impl FnOnce(usize) -> String) {
        self.args.push(arg);
        let index = self.args.len();
        self.fragments.push(fragment(index));
    }

    fn predicate(&self) -> String {
        if self.fragments.is_empty() {
            return String::new();
        }
        format!("WHERE {} ", self.fragments.join(" AND "))
    }

    fn finish(mut self, order: Option<String>, page: Option<(i64, i64)>) -> ListClauses {
        let predicate = self.predicate();

        let order = order
            .map(|order| format!("ORDER BY {} ", order))
            .unwrap_or_default();

        let limit_offset = match page {
            Some((limit, offset)) => {
                self.args.push(FilterArg::Int(limit));
                let limit_index = self.args.len();
                self.args.push(FilterArg::Int(offset));
                let offset_index = self.args.len();
                format!("LIMIT ?{} OFFSET ?{} ", limit_index, offset_index)
            }
            None => String::new(),
        };

        ListClauses {
            predicate,
            order,
            limit_offset,
            args: self.args,
        }
    }
}

/// Subquery yielding the ids of everyone befriended with `?{index}`,
/// whichever side created the edge.
pub(crate) fn friends_of_subquery(index: usize) -> String {
    format!(
        "SELECT f.user_id_added FROM friends f WHERE f.user_id_adder = ?{index} \
         UNION SELECT f.user_id_adder FROM friends f WHERE f.user_id_added = ?{index}"
    )
}

/// Folded form stored in the `*_search` columns
pub(crate) fn search_text(text: &str) -> String {
    text.to_lowercase()
}

/// Folded `%term%` pattern with LIKE wildcards escaped
fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for ch in search_text(term).chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

pub(crate) fn json_array(values: &[String]) -> String {
    serde_json::Value::from(values.to_vec()).to_string()
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|value| !value.is_empty())
}

fn effective_limit(limit: i64) -> i64 {
    if limit <= 0 { DEFAULT_LIMIT } else { limit }
}

// =============================================================================
// Posts
// =============================================================================

/// Feed filter
///
/// Queries built from it expect `posts` aliased as `p`.
#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    /// Actor; restricts to the actor's own posts and their friends' posts
    pub user_id: Option<String>,
    /// Case-insensitive substring of the post body
    pub search: Option<String>,
    /// Post must carry at least one of these tags
    pub search_tags: Vec<String>,
    pub limit: i64,
    pub offset: i64,
    pub disable_order: bool,
    pub disable_offset: bool,
}

impl PostFilter {
    /// Copy of this filter suitable for a `COUNT` query
    pub fn for_count(&self) -> Self {
        Self {
            disable_order: true,
            disable_offset: true,
            ..self.clone()
        }
    }

    pub fn effective_limit(&self) -> i64 {
        effective_limit(self.limit)
    }

    pub fn build(&self) -> ListClauses {
        let mut builder = ClauseBuilder::default();

        if let Some(search) = non_empty(&self.search) {
            builder.condition(FilterArg::Text(like_pattern(search)), |n| {
                format!("p.body_search LIKE ?{n} ESCAPE '\\'")
            });
        }

        if !self.search_tags.is_empty() {
            builder.condition(FilterArg::Text(json_array(&self.search_tags)), |n| {
                format!(
                    "EXISTS (SELECT 1 FROM json_each(p.tags) t \
                     WHERE t.value IN (SELECT value FROM json_each(?{n})))"
                )
            });
        }

        if let Some(user_id) = non_empty(&self.user_id) {
            builder.condition(FilterArg::Text(user_id.to_string()), |n| {
                format!(
                    "(p.user_id = ?{n} OR p.user_id IN ({}))",
                    friends_of_subquery(n)
                )
            });
        }

        let order = (!self.disable_order).then(|| "p.created_at DESC, p.id DESC".to_string());
        let page = (!self.disable_offset).then(|| (self.effective_limit(), self.offset.max(0)));

        builder.finish(order, page)
    }
}

// =============================================================================
// Users
// =============================================================================

/// User sort key
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UserSortKey {
    #[default]
    CreatedAt,
    FriendCount,
}

impl UserSortKey {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "createdAt" => Some(Self::CreatedAt),
            "friendCount" => Some(Self::FriendCount),
            _ => None,
        }
    }
}

/// Sort direction; descending unless ascending is asked for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }

    fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// User directory filter
///
/// Queries built from it expect `users` aliased as `u` and a selected
/// `friend_count` column.
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    /// Actor, used by `only_friend`
    pub user_id: Option<String>,
    /// Restrict to the actor's friends (never the actor)
    pub only_friend: bool,
    /// Restrict to this id set
    pub user_ids: Vec<String>,
    /// Case-insensitive substring of the name
    pub search: Option<String>,
    pub sort_by: UserSortKey,
    pub order_by: SortDirection,
    pub limit: i64,
    pub offset: i64,
    pub disable_order: bool,
    pub disable_offset: bool,
}

impl UserFilter {
    /// Filter that fetches exactly `user_ids`, unordered and unpaginated
    pub fn by_ids(user_ids: Vec<String>) -> Self {
        Self {
            user_ids,
            disable_order: true,
            disable_offset: true,
            ..Self::default()
        }
    }

    /// Copy of this filter suitable for a `COUNT` query
    pub fn for_count(&self) -> Self {
        Self {
            disable_order: true,
            disable_offset: true,
            ..self.clone()
        }
    }

    pub fn effective_limit(&self) -> i64 {
        effective_limit(self.limit)
    }

    pub fn build(&self) -> ListClauses {
        let mut builder = ClauseBuilder::default();

        if self.only_friend {
            if let Some(user_id) = non_empty(&self.user_id) {
                builder.condition(FilterArg::Text(user_id.to_string()), |n| {
                    format!("(u.id <> ?{n} AND u.id IN ({}))", friends_of_subquery(n))
                });
            }
        }

        if !self.user_ids.is_empty() {
            builder.condition(FilterArg::Text(json_array(&self.user_ids)), |n| {
                format!("u.id IN (SELECT value FROM json_each(?{n}))")
            });
        }

        if let Some(search) = non_empty(&self.search) {
            builder.condition(FilterArg::Text(like_pattern(search)), |n| {
                format!("u.name_search LIKE ?{n} ESCAPE '\\'")
            });
        }

        let order = (!self.disable_order).then(|| {
            let direction = self.order_by.as_sql();
            match self.sort_by {
                UserSortKey::CreatedAt => {
                    format!("u.created_at {direction}, u.id {direction}")
                }
                UserSortKey::FriendCount => {
                    format!("friend_count {direction}, u.id {direction}")
                }
            }
        });
        let page = (!self.disable_offset).then(|| (self.effective_limit(), self.offset.max(0)));

        builder.finish(order, page)
    }
}
