use std::collections::{HashMap, HashSet};

use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QuerySelect};

pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total_count: u64,
    pub page: u64,
    pub page_size: u64,
}

impl<T> PaginatedResult<T> {
    pub fn has_next(&self) -> bool {
        self.page * self.page_size < self.total_count
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }
}

/// Number of pages for `total_count` rows. An empty result still has one (empty) page.
pub fn page_count(total_count: u64, page_size: u64) -> u64 {
    total_count.div_ceil(page_size.max(1)).max(1)
}

/// Limit/offset for a 1-based page.
pub fn apply_pagination<T: EntityTrait>(
    query: sea_orm::Select<T>,
    page: u64,
    page_size: u64,
) -> sea_orm::Select<T> {
    let offset = page.saturating_sub(1) * page_size;
    query.limit(page_size).offset(offset)
}

/// Case-insensitive substring match on a single column.
///
/// Uses `instr` rather than `LIKE` so `%` and `_` in the search term match literally.
/// SQLite's `lower` only folds ASCII letters.
pub fn apply_text_search<T, C>(
    query: sea_orm::Select<T>,
    column: C,
    search_term: &str,
) -> sea_orm::Select<T>
where
    T: EntityTrait,
    C: ColumnTrait,
{
    if search_term.is_empty() {
        return query;
    }

    let sql = format!(
        "instr(lower(\"{}\".\"{}\"), lower(?)) > 0",
        T::default().table_name(),
        column.as_str()
    );
    query.filter(Expr::cust_with_values(sql, [search_term.to_string()]))
}

/// Fetch the rows of `T` whose primary key is in `ids`, keyed by id.
///
/// Used to eager-load the targets of foreign keys for a page of rows in one query.
pub async fn load_by_ids<T, C>(
    conn: &C,
    id_column: T::Column,
    ids: impl IntoIterator<Item = i64>,
    key: impl Fn(&T::Model) -> i64,
) -> Result<HashMap<i64, T::Model>, DbErr>
where
    T: EntityTrait,
    C: ConnectionTrait,
{
    let ids: HashSet<i64> = ids.into_iter().collect();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = T::find().filter(id_column.is_in(ids)).all(conn).await?;
    Ok(rows.into_iter().map(|row| (key(&row), row)).collect())
}

/// The subset of `ids` that has a row in `T`.
pub async fn existing_ids<T, C>(
    conn: &C,
    id_column: T::Column,
    ids: impl IntoIterator<Item = i64>,
) -> Result<HashSet<i64>, DbErr>
where
    T: EntityTrait,
    C: ConnectionTrait,
{
    let ids: HashSet<i64> = ids.into_iter().collect();
    if ids.is_empty() {
        return Ok(HashSet::new());
    }

    let found = T::find()
        .select_only()
        .column(id_column)
        .filter(id_column.is_in(ids))
        .into_tuple::<i64>()
        .all(conn)
        .await?;
    Ok(found.into_iter().collect())
}

/// First id of `ids`, in input order, with no row in `T`.
pub async fn first_missing_id<T, C>(
    conn: &C,
    id_column: T::Column,
    ids: &[i64],
) -> Result<Option<i64>, DbErr>
where
    T: EntityTrait,
    C: ConnectionTrait,
{
    let found = existing_ids::<T, C>(conn, id_column, ids.iter().copied()).await?;
    Ok(ids.iter().copied().find(|id| !found.contains(id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities;
    use crate::test_utils::{insert_genre, insert_movie, test_db};
    use sea_orm::QueryOrder;

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(0, 1), 1);
        assert_eq!(page_count(1, 1), 1);
        assert_eq!(page_count(3, 2), 2);
        assert_eq!(page_count(4, 2), 2);
        assert_eq!(page_count(5, 0), 5);
    }

    #[test]
    fn test_paginated_result_links() {
        let result = PaginatedResult::<()> {
            items: vec![],
            total_count: 3,
            page: 2,
            page_size: 1,
        };
        assert!(result.has_next());
        assert!(result.has_previous());

        let last = PaginatedResult::<()> {
            items: vec![],
            total_count: 3,
            page: 3,
            page_size: 1,
        };
        assert!(!last.has_next());
    }

    #[tokio::test]
    async fn test_apply_pagination_offsets() {
        let db = test_db().await;
        for title in ["A", "B", "C"] {
            insert_movie(&db, title, &[], &[]).await;
        }

        let query = entities::movie::Entity::find().order_by_asc(entities::movie::Column::Id);
        let second = apply_pagination(query, 2, 2).all(&db.conn).await.unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].title, "C");
    }

    #[tokio::test]
    async fn test_apply_text_search_is_case_insensitive() {
        let db = test_db().await;
        insert_movie(&db, "The Matrix", &[], &[]).await;
        insert_movie(&db, "Inception", &[], &[]).await;

        let query = entities::movie::Entity::find();
        let found = apply_text_search(query, entities::movie::Column::Title, "matRIX")
            .all(&db.conn)
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "The Matrix");
    }

    #[tokio::test]
    async fn test_apply_text_search_treats_wildcards_literally() {
        let db = test_db().await;
        insert_movie(&db, "100% Wolf", &[], &[]).await;
        insert_movie(&db, "Wolf", &[], &[]).await;

        let query = entities::movie::Entity::find();
        let found = apply_text_search(query, entities::movie::Column::Title, "%")
            .all(&db.conn)
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "100% Wolf");
    }

    #[tokio::test]
    async fn test_load_by_ids() {
        let db = test_db().await;
        let drama = insert_genre(&db, "Drama").await;
        insert_genre(&db, "Comedy").await;

        let loaded = load_by_ids::<entities::genre::Entity, _>(
            &db.conn,
            entities::genre::Column::Id,
            [drama.id, drama.id],
            |genre| genre.id,
        )
        .await
        .unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[&drama.id].name, "Drama");

        let none = load_by_ids::<entities::genre::Entity, _>(
            &db.conn,
            entities::genre::Column::Id,
            [],
            |genre| genre.id,
        )
        .await
        .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_first_missing_id_keeps_input_order() {
        let db = test_db().await;
        let drama = insert_genre(&db, "Drama").await;

        let missing = first_missing_id::<entities::genre::Entity, _>(
            &db.conn,
            entities::genre::Column::Id,
            &[drama.id, 99, 42],
        )
        .await
        .unwrap();
        assert_eq!(missing, Some(99));

        let none = first_missing_id::<entities::genre::Entity, _>(
            &db.conn,
            entities::genre::Column::Id,
            &[drama.id],
        )
        .await
        .unwrap();
        assert_eq!(none, None);
    }
}
