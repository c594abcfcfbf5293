//! Postgres-backed implementation of the primary data source boundary.
//!
//! Uses runtime-built queries so the crate compiles without a live
//! database. Rows live in a single `content_items` table; `kind` and
//! `status` are stored as text and parsed at this boundary.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, QueryBuilder, Row};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{ContentRepo, ListScope, RecentQuery, RepoError};
use crate::domain::content::{
    ContentItem, ContentKind, ContentStatus, EventDetails, PlacementFlags,
};

const SELECT_COLUMNS: &str = "SELECT id, kind, title, body, excerpt, categories, location, \
     image_url, status, home_featured, city_a_featured, city_b_featured, \
     event_date, event_end_date, organizer, organizer_contact, venue_address, \
     ticket_url, price, currency, created_at, updated_at FROM content_items";

#[derive(Clone)]
pub struct PostgresContent {
    pool: PgPool,
}

impl PostgresContent {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await.map(|_| ())
    }
}

pub fn map_sqlx_error(err: sqlx::Error) -> RepoError {
    match err {
        sqlx::Error::RowNotFound => RepoError::NotFound,
        sqlx::Error::Database(db) if db.message().contains("duplicate key") => {
            RepoError::Duplicate {
                constraint: db.constraint().unwrap_or("unknown").to_string(),
            }
        }
        sqlx::Error::Database(db)
            if db.message().contains("violates foreign key constraint")
                || db.message().contains("invalid input syntax") =>
        {
            RepoError::InvalidInput {
                message: db.message().to_string(),
            }
        }
        sqlx::Error::Database(db)
            if db
                .message()
                .contains("canceling statement due to user request") =>
        {
            RepoError::Timeout
        }
        other => RepoError::from_persistence(other),
    }
}

fn map_row(row: &PgRow) -> Result<ContentItem, RepoError> {
    let kind_raw: String = row.try_get("kind").map_err(map_sqlx_error)?;
    let kind = ContentKind::try_from(kind_raw.as_str())
        .map_err(|_| RepoError::from_persistence(format!("unknown content kind `{kind_raw}`")))?;

    let status_raw: String = row.try_get("status").map_err(map_sqlx_error)?;
    let status = ContentStatus::try_from(status_raw.as_str()).map_err(|_| {
        RepoError::from_persistence(format!("unknown content status `{status_raw}`"))
    })?;

    let event_date: Option<OffsetDateTime> = row.try_get("event_date").map_err(map_sqlx_error)?;
    let event = match event_date {
        Some(event_date) => Some(EventDetails {
            event_date,
            event_end_date: row.try_get("event_end_date").map_err(map_sqlx_error)?,
            organizer: row
                .try_get::<Option<String>, _>("organizer")
                .map_err(map_sqlx_error)?
                .unwrap_or_default(),
            organizer_contact: row
                .try_get::<Option<String>, _>("organizer_contact")
                .map_err(map_sqlx_error)?
                .unwrap_or_default(),
            venue_address: row
                .try_get::<Option<String>, _>("venue_address")
                .map_err(map_sqlx_error)?
                .unwrap_or_default(),
            ticket_url: row
                .try_get::<Option<String>, _>("ticket_url")
                .map_err(map_sqlx_error)?
                .unwrap_or_default(),
            price: row.try_get("price").map_err(map_sqlx_error)?,
            currency: row.try_get("currency").map_err(map_sqlx_error)?,
        }),
        None => None,
    };

    Ok(ContentItem {
        id: row.try_get("id").map_err(map_sqlx_error)?,
        kind,
        title: row.try_get("title").map_err(map_sqlx_error)?,
        body: row
            .try_get::<Option<String>, _>("body")
            .map_err(map_sqlx_error)?
            .unwrap_or_default(),
        excerpt: row
            .try_get::<Option<String>, _>("excerpt")
            .map_err(map_sqlx_error)?
            .unwrap_or_default(),
        categories: row.try_get("categories").map_err(map_sqlx_error)?,
        location: row
            .try_get::<Option<String>, _>("location")
            .map_err(map_sqlx_error)?
            .unwrap_or_default(),
        image_url: row
            .try_get::<Option<String>, _>("image_url")
            .map_err(map_sqlx_error)?
            .unwrap_or_default(),
        status,
        placement: PlacementFlags {
            home_featured: row.try_get("home_featured").map_err(map_sqlx_error)?,
            city_a_featured: row.try_get("city_a_featured").map_err(map_sqlx_error)?,
            city_b_featured: row.try_get("city_b_featured").map_err(map_sqlx_error)?,
        },
        event,
        created_at: row.try_get("created_at").map_err(map_sqlx_error)?,
        updated_at: row.try_get("updated_at").map_err(map_sqlx_error)?,
    })
}

fn event_field<T: Clone>(item: &ContentItem, pick: impl Fn(&EventDetails) -> T) -> Option<T> {
    item.event.as_ref().map(|details| pick(details))
}

#[async_trait]
impl ContentRepo for PostgresContent {
    async fn list_recent(&self, query: RecentQuery) -> Result<Vec<ContentItem>, RepoError> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(SELECT_COLUMNS);
        qb.push(" WHERE TRUE");

        if query.scope == ListScope::Public {
            qb.push(" AND status = ");
            qb.push_bind(ContentStatus::Published.as_str());
        }

        if let Some(kind) = query.kind {
            qb.push(" AND kind = ");
            qb.push_bind(kind.as_str());
        }

        qb.push(" ORDER BY created_at DESC, id ASC LIMIT ");
        qb.push_bind(i64::from(query.limit));

        let rows = qb
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        rows.iter().map(map_row).collect()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ContentItem>, RepoError> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(SELECT_COLUMNS);
        qb.push(" WHERE id = ");
        qb.push_bind(id);

        let row = qb
            .build()
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.as_ref().map(map_row).transpose()
    }

    async fn insert_item(&self, item: &ContentItem) -> Result<(), RepoError> {
        sqlx::query(
            "INSERT INTO content_items \
             (id, kind, title, body, excerpt, categories, location, image_url, status, \
              home_featured, city_a_featured, city_b_featured, \
              event_date, event_end_date, organizer, organizer_contact, venue_address, \
              ticket_url, price, currency, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, \
                     $16, $17, $18, $19, $20, $21, $22)",
        )
        .bind(item.id)
        .bind(item.kind.as_str())
        .bind(&item.title)
        .bind(&item.body)
        .bind(&item.excerpt)
        .bind(&item.categories)
        .bind(&item.location)
        .bind(&item.image_url)
        .bind(item.status.as_str())
        .bind(item.placement.home_featured)
        .bind(item.placement.city_a_featured)
        .bind(item.placement.city_b_featured)
        .bind(event_field(item, |event| event.event_date))
        .bind(event_field(item, |event| event.event_end_date).flatten())
        .bind(event_field(item, |event| event.organizer.clone()))
        .bind(event_field(item, |event| event.organizer_contact.clone()))
        .bind(event_field(item, |event| event.venue_address.clone()))
        .bind(event_field(item, |event| event.ticket_url.clone()))
        .bind(event_field(item, |event| event.price).flatten())
        .bind(event_field(item, |event| event.currency.clone()).flatten())
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn update_item(&self, item: &ContentItem) -> Result<(), RepoError> {
        let result = sqlx::query(
            "UPDATE content_items SET \
             title = $2, body = $3, excerpt = $4, categories = $5, location = $6, \
             image_url = $7, status = $8, home_featured = $9, city_a_featured = $10, \
             city_b_featured = $11, event_date = $12, event_end_date = $13, \
             organizer = $14, organizer_contact = $15, venue_address = $16, \
             ticket_url = $17, price = $18, currency = $19, updated_at = $20 \
             WHERE id = $1",
        )
        .bind(item.id)
        .bind(&item.title)
        .bind(&item.body)
        .bind(&item.excerpt)
        .bind(&item.categories)
        .bind(&item.location)
        .bind(&item.image_url)
        .bind(item.status.as_str())
        .bind(item.placement.home_featured)
        .bind(item.placement.city_a_featured)
        .bind(item.placement.city_b_featured)
        .bind(event_field(item, |event| event.event_date))
        .bind(event_field(item, |event| event.event_end_date).flatten())
        .bind(event_field(item, |event| event.organizer.clone()))
        .bind(event_field(item, |event| event.organizer_contact.clone()))
        .bind(event_field(item, |event| event.venue_address.clone()))
        .bind(event_field(item, |event| event.ticket_url.clone()))
        .bind(event_field(item, |event| event.price).flatten())
        .bind(event_field(item, |event| event.currency.clone()).flatten())
        .bind(item.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn delete_item(&self, id: Uuid) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM content_items WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }
}
