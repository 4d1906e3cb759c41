//! Raw SQL fragments that can't be expressed in Diesel's type-safe DSL.
//!
//! # Safety
//!
//! User input is ALWAYS passed via `.bind()` parameters, never interpolated.

/// Filter expression for case-insensitive exact tag membership.
///
/// Matches rows where any element of `recipes.tags` equals `tag` after
/// lowercasing both sides. Substrings never match.
///
/// # Case folding
/// `lower()` follows the database collation's `LC_CTYPE`, while
/// `Recipe::has_tag` (the in-memory path) uses Rust's Unicode
/// `to_lowercase`. They agree for ASCII and, under a UTF-8 locale, for
/// ordinary accented letters. Under the `C` locale PostgreSQL only folds
/// ASCII, so `CRÈME` would not match `crème` there. Neither side does full
/// case folding (`STRASSE` never matches `straße`).
///
/// # Safety
/// The tag value is passed via `.bind()`, not interpolated.
///
/// # Why raw SQL?
/// Diesel has no DSL for `unnest()` or per-element functions on arrays.
#[macro_export]
macro_rules! tag_in_array {
    ($tag:expr) => {
        diesel::dsl::sql::<diesel::sql_types::Bool>(
            "EXISTS (SELECT 1 FROM unnest(recipes.tags) AS t WHERE lower(t) = lower(",
        )
        .bind::<diesel::sql_types::Text, _>($tag)
        .sql("))")
    };
}
