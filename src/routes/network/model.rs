use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("Parent record not found")]
    ParentNotFound,
    #[error("Record still has children and cannot be deleted")]
    HasChildren,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Serialize, FromRow)]
pub struct Dealer {
    pub id: Uuid,
    pub name: String,
    pub phone: Option<String>,
    pub region_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct Retailer {
    pub id: Uuid,
    pub name: String,
    pub phone: Option<String>,
    pub dealer_id: Option<Uuid>,
    pub region_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct Farmer {
    pub id: Uuid,
    pub name: String,
    pub phone: Option<String>,
    pub retailer_id: Option<Uuid>,
    pub region_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateDealerRequest {
    pub name: String,
    pub phone: Option<String>,
    pub region_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct CreateRetailerRequest {
    pub name: String,
    pub phone: Option<String>,
    pub dealer_id: Option<Uuid>,
    pub region_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct CreateFarmerRequest {
    pub name: String,
    pub phone: Option<String>,
    pub retailer_id: Option<Uuid>,
    pub region_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateContactRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub region_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NetworkListQuery {
    pub search: Option<String>,
    pub region_id: Option<Uuid>,
    /// dealer_id for retailer listings, retailer_id for farmer listings
    pub parent_id: Option<Uuid>,
}

async fn exists(pool: &PgPool, table: &str, id: Uuid) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(&format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = $1)"))
        .bind(id)
        .fetch_one(pool)
        .await
}

fn push_list_filters(
    builder: &mut QueryBuilder<'_, Postgres>,
    query: &NetworkListQuery,
    parent_column: Option<&str>,
) {
    builder.push(" WHERE TRUE");
    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        builder.push(" AND name ILIKE ");
        builder.push_bind(format!("%{}%", search));
    }
    if let Some(region_id) = query.region_id {
        builder.push(" AND region_id = ");
        builder.push_bind(region_id);
    }
    if let (Some(column), Some(parent_id)) = (parent_column, query.parent_id) {
        builder.push(format!(" AND {column} = "));
        builder.push_bind(parent_id);
    }
    builder.push(" ORDER BY name");
}

impl Dealer {
    pub async fn create(pool: &PgPool, req: &CreateDealerRequest) -> Result<Self, NetworkError> {
        let dealer = sqlx::query_as::<_, Dealer>(
            "INSERT INTO dealers (id, name, phone, region_id) VALUES ($1, $2, $3, $4) \
             RETURNING id, name, phone, region_id, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(req.name.trim())
        .bind(req.phone.as_deref().map(str::trim))
        .bind(req.region_id)
        .fetch_one(pool)
        .await?;
        Ok(dealer)
    }

    pub async fn list(pool: &PgPool, query: &NetworkListQuery) -> Result<Vec<Self>, sqlx::Error> {
        let mut builder = QueryBuilder::<Postgres>::new(
            "SELECT id, name, phone, region_id, created_at FROM dealers",
        );
        push_list_filters(&mut builder, query, None);
        builder.build_query_as::<Dealer>().fetch_all(pool).await
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        req: &UpdateContactRequest,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Dealer>(
            "UPDATE dealers SET name = COALESCE($2, name), phone = COALESCE($3, phone), \
             region_id = COALESCE($4, region_id) \
             WHERE id = $1 RETURNING id, name, phone, region_id, created_at",
        )
        .bind(id)
        .bind(req.name.as_deref().map(str::trim))
        .bind(req.phone.as_deref().map(str::trim))
        .bind(req.region_id)
        .fetch_optional(pool)
        .await
    }

    /// A dealer with retailers underneath cannot be removed.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, NetworkError> {
        let has_children: bool = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM retailers WHERE dealer_id = $1)",
        )
        .bind(id)
        .fetch_one(pool)
        .await?;
        if has_children {
            return Err(NetworkError::HasChildren);
        }
        let deleted = sqlx::query("DELETE FROM dealers WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(deleted.rows_affected() > 0)
    }
}

impl Retailer {
    pub async fn create(pool: &PgPool, req: &CreateRetailerRequest) -> Result<Self, NetworkError> {
        if let Some(dealer_id) = req.dealer_id {
            if !exists(pool, "dealers", dealer_id).await? {
                return Err(NetworkError::ParentNotFound);
            }
        }
        let retailer = sqlx::query_as::<_, Retailer>(
            "INSERT INTO retailers (id, name, phone, dealer_id, region_id) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, name, phone, dealer_id, region_id, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(req.name.trim())
        .bind(req.phone.as_deref().map(str::trim))
        .bind(req.dealer_id)
        .bind(req.region_id)
        .fetch_one(pool)
        .await?;
        Ok(retailer)
    }

    pub async fn list(pool: &PgPool, query: &NetworkListQuery) -> Result<Vec<Self>, sqlx::Error> {
        let mut builder = QueryBuilder::<Postgres>::new(
            "SELECT id, name, phone, dealer_id, region_id, created_at FROM retailers",
        );
        push_list_filters(&mut builder, query, Some("dealer_id"));
        builder.build_query_as::<Retailer>().fetch_all(pool).await
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        req: &UpdateContactRequest,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Retailer>(
            "UPDATE retailers SET name = COALESCE($2, name), phone = COALESCE($3, phone), \
             region_id = COALESCE($4, region_id) \
             WHERE id = $1 RETURNING id, name, phone, dealer_id, region_id, created_at",
        )
        .bind(id)
        .bind(req.name.as_deref().map(str::trim))
        .bind(req.phone.as_deref().map(str::trim))
        .bind(req.region_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, NetworkError> {
        let has_children: bool = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM farmers WHERE retailer_id = $1)",
        )
        .bind(id)
        .fetch_one(pool)
        .await?;
        if has_children {
            return Err(NetworkError::HasChildren);
        }
        let deleted = sqlx::query("DELETE FROM retailers WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(deleted.rows_affected() > 0)
    }
}

impl Farmer {
    pub async fn create(pool: &PgPool, req: &CreateFarmerRequest) -> Result<Self, NetworkError> {
        if let Some(retailer_id) = req.retailer_id {
            if !exists(pool, "retailers", retailer_id).await? {
                return Err(NetworkError::ParentNotFound);
            }
        }
        let farmer = sqlx::query_as::<_, Farmer>(
            "INSERT INTO farmers (id, name, phone, retailer_id, region_id) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, name, phone, retailer_id, region_id, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(req.name.trim())
        .bind(req.phone.as_deref().map(str::trim))
        .bind(req.retailer_id)
        .bind(req.region_id)
        .fetch_one(pool)
        .await?;
        Ok(farmer)
    }

    pub async fn list(pool: &PgPool, query: &NetworkListQuery) -> Result<Vec<Self>, sqlx::Error> {
        let mut builder = QueryBuilder::<Postgres>::new(
            "SELECT id, name, phone, retailer_id, region_id, created_at FROM farmers",
        );
        push_list_filters(&mut builder, query, Some("retailer_id"));
        builder.build_query_as::<Farmer>().fetch_all(pool).await
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        req: &UpdateContactRequest,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Farmer>(
            "UPDATE farmers SET name = COALESCE($2, name), phone = COALESCE($3, phone), \
             region_id = COALESCE($4, region_id) \
             WHERE id = $1 RETURNING id, name, phone, retailer_id, region_id, created_at",
        )
        .bind(id)
        .bind(req.name.as_deref().map(str::trim))
        .bind(req.phone.as_deref().map(str::trim))
        .bind(req.region_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, NetworkError> {
        let deleted = sqlx::query("DELETE FROM farmers WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(deleted.rows_affected() > 0)
    }
}
