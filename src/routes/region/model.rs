use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(Debug, Serialize, FromRow)]
pub struct Region {
    pub id: Uuid,
    pub state: String,
    pub city: String,
    pub state_slug: String,
    pub city_slug: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateRegionRequest {
    pub state: String,
    pub city: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRegionRequest {
    pub state: Option<String>,
    pub city: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum RegionError {
    #[error("Region already exists")]
    Duplicate,
    #[error("Region is still referenced and cannot be deleted")]
    InUse,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

const REGION_COLUMNS: &str = "id, state, city, state_slug, city_slug, slug, created_at";

/// Lowercases, replaces runs of non-alphanumerics with single hyphens and
/// trims leading/trailing hyphens.
pub fn slugify(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last_was_hyphen = true;
    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
            last_was_hyphen = false;
        } else if !last_was_hyphen {
            out.push('-');
            last_was_hyphen = true;
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}

impl Region {
    pub async fn create(pool: &PgPool, req: &CreateRegionRequest) -> Result<Self, RegionError> {
        let state = req.state.trim();
        let city = req.city.trim();
        let state_slug = slugify(state);
        let city_slug = slugify(city);
        let slug = format!("{}-{}", state_slug, city_slug);

        let exists: bool =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM regions WHERE slug = $1)")
                .bind(&slug)
                .fetch_one(pool)
                .await?;
        if exists {
            return Err(RegionError::Duplicate);
        }

        let region = sqlx::query_as::<_, Region>(&format!(
            "INSERT INTO regions (id, state, city, state_slug, city_slug, slug) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {REGION_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(state)
        .bind(city)
        .bind(state_slug)
        .bind(city_slug)
        .bind(slug)
        .fetch_one(pool)
        .await?;

        Ok(region)
    }

    pub async fn list(pool: &PgPool, state: Option<&str>) -> Result<Vec<Self>, sqlx::Error> {
        match state {
            Some(state) => {
                sqlx::query_as::<_, Region>(&format!(
                    "SELECT {REGION_COLUMNS} FROM regions WHERE state_slug = $1 \
                     ORDER BY state, city"
                ))
                .bind(slugify(state))
                .fetch_all(pool)
                .await
            }
            None => {
                sqlx::query_as::<_, Region>(&format!(
                    "SELECT {REGION_COLUMNS} FROM regions ORDER BY state, city"
                ))
                .fetch_all(pool)
                .await
            }
        }
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Region>(&format!(
            "SELECT {REGION_COLUMNS} FROM regions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        req: &UpdateRegionRequest,
    ) -> Result<Option<Self>, RegionError> {
        let Some(current) = Self::find_by_id(pool, id).await? else {
            return Ok(None);
        };

        let state = req
            .state
            .as_deref()
            .map(str::trim)
            .unwrap_or(&current.state)
            .to_string();
        let city = req
            .city
            .as_deref()
            .map(str::trim)
            .unwrap_or(&current.city)
            .to_string();
        let state_slug = slugify(&state);
        let city_slug = slugify(&city);
        let slug = format!("{}-{}", state_slug, city_slug);

        let taken: bool = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM regions WHERE slug = $1 AND id <> $2)",
        )
        .bind(&slug)
        .bind(id)
        .fetch_one(pool)
        .await?;
        if taken {
            return Err(RegionError::Duplicate);
        }

        let region = sqlx::query_as::<_, Region>(&format!(
            "UPDATE regions SET state = $2, city = $3, state_slug = $4, city_slug = $5, slug = $6 \
             WHERE id = $1 RETURNING {REGION_COLUMNS}"
        ))
        .bind(id)
        .bind(state)
        .bind(city)
        .bind(state_slug)
        .bind(city_slug)
        .bind(slug)
        .fetch_optional(pool)
        .await?;

        Ok(region)
    }

    /// Refuses to delete a region that employees or the dealer network still
    /// reference.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, RegionError> {
        let referenced: bool = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM employee_regions WHERE region_id = $1) \
             OR EXISTS(SELECT 1 FROM dealers WHERE region_id = $1) \
             OR EXISTS(SELECT 1 FROM retailers WHERE region_id = $1) \
             OR EXISTS(SELECT 1 FROM farmers WHERE region_id = $1)",
        )
        .bind(id)
        .fetch_one(pool)
        .await?;
        if referenced {
            return Err(RegionError::InUse);
        }

        let deleted = sqlx::query("DELETE FROM regions WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(deleted.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_lowercases_and_hyphenates() {
        assert_eq!(slugify("Tamil Nadu"), "tamil-nadu");
        assert_eq!(slugify("Coimbatore"), "coimbatore");
    }

    #[test]
    fn slugify_collapses_runs_and_trims() {
        assert_eq!(slugify("  Uttar   Pradesh  "), "uttar-pradesh");
        assert_eq!(slugify("Delhi (NCR)"), "delhi-ncr");
        assert_eq!(slugify("---"), "");
    }
}
