use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::catalog::{days, ProviderAvailability, ServiceCategory, ServiceProvider};
use crate::models::user::roles;

/// Provider profile joined with the owning user's public identity
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProviderListing {
    pub id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub business_name: String,
    pub description: String,
    pub skills: String,
    pub experience_years: i32,
    pub hourly_rate_cents: Option<i64>,
    pub service_area: String,
    pub license_number: Option<String>,
    pub insurance_verified: bool,
    pub is_available: bool,
    pub rating: f64,
    pub total_jobs: i32,
}

pub struct NewProviderProfile<'a> {
    pub business_name: &'a str,
    pub description: &'a str,
    pub skills: &'a str,
    pub experience_years: i32,
    pub hourly_rate_cents: Option<i64>,
    pub service_area: &'a str,
    pub license_number: Option<&'a str>,
    pub category_ids: &'a [Uuid],
}

#[derive(Debug, Clone, Deserialize)]
pub struct AvailabilitySlotInput {
    pub day_of_week: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    #[serde(default = "default_true")]
    pub is_available: bool,
}

fn default_true() -> bool {
    true
}

const PROVIDER_LISTING_SELECT: &str =
    "SELECT p.id, p.user_id, u.username, u.first_name, u.last_name,
            p.business_name, p.description, p.skills, p.experience_years,
            p.hourly_rate_cents, p.service_area, p.license_number,
            p.insurance_verified, p.is_available, p.rating, p.total_jobs
     FROM service_providers p
     JOIN users u ON u.id = p.user_id";

pub struct CatalogService;

impl CatalogService {
    pub async fn list_categories(db: &Pool<Postgres>) -> AppResult<Vec<ServiceCategory>> {
        let categories = sqlx::query_as::<_, ServiceCategory>(
            "SELECT id, name, description, icon, created_at FROM service_categories ORDER BY name",
        )
        .fetch_all(db)
        .await?;
        Ok(categories)
    }

    pub async fn create_category(
        db: &Pool<Postgres>,
        name: &str,
        description: &str,
        icon: &str,
    ) -> AppResult<ServiceCategory> {
        if name.trim().is_empty() {
            return Err(AppError::BadRequest("category name is required".into()));
        }
        let category = sqlx::query_as::<_, ServiceCategory>(
            "INSERT INTO service_categories (name, description, icon)
             VALUES ($1, $2, $3)
             RETURNING id, name, description, icon, created_at",
        )
        .bind(name)
        .bind(description)
        .bind(icon)
        .fetch_one(db)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(dbe) if dbe.is_unique_violation() => {
                AppError::Conflict("category already exists".into())
            }
            _ => AppError::Database(e),
        })?;
        Ok(category)
    }

    pub async fn list_providers(
        db: &Pool<Postgres>,
        category_id: Option<Uuid>,
    ) -> AppResult<Vec<ProviderListing>> {
        let providers = match category_id {
            Some(category_id) => {
                let sql = format!(
                    "{PROVIDER_LISTING_SELECT}
                     JOIN provider_categories pc ON pc.provider_id = p.id
                     WHERE pc.category_id = $1
                     ORDER BY p.rating DESC, p.total_jobs DESC"
                );
                sqlx::query_as::<_, ProviderListing>(&sql)
                    .bind(category_id)
                    .fetch_all(db)
                    .await?
            }
            None => {
                let sql =
                    format!("{PROVIDER_LISTING_SELECT} ORDER BY p.rating DESC, p.total_jobs DESC");
                sqlx::query_as::<_, ProviderListing>(&sql).fetch_all(db).await?
            }
        };
        Ok(providers)
    }

    pub async fn get_provider(
        db: &Pool<Postgres>,
        provider_id: Uuid,
    ) -> AppResult<(ProviderListing, Vec<ServiceCategory>)> {
        let sql = format!("{PROVIDER_LISTING_SELECT} WHERE p.id = $1");
        let provider = sqlx::query_as::<_, ProviderListing>(&sql)
            .bind(provider_id)
            .fetch_optional(db)
            .await?
            .ok_or(AppError::NotFound)?;

        let categories = sqlx::query_as::<_, ServiceCategory>(
            "SELECT c.id, c.name, c.description, c.icon, c.created_at
             FROM service_categories c
             JOIN provider_categories pc ON pc.category_id = c.id
             WHERE pc.provider_id = $1
             ORDER BY c.name",
        )
        .bind(provider_id)
        .fetch_all(db)
        .await?;

        Ok((provider, categories))
    }

    /// Look up the provider profile owned by a user, if any
    pub async fn provider_by_user(
        db: &Pool<Postgres>,
        user_id: Uuid,
    ) -> AppResult<Option<ServiceProvider>> {
        let provider = sqlx::query_as::<_, ServiceProvider>(
            "SELECT * FROM service_providers WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(db)
        .await?;
        Ok(provider)
    }

    /// A provider-role user creates their profile, once
    pub async fn create_profile(
        db: &Pool<Postgres>,
        user_id: Uuid,
        profile: NewProviderProfile<'_>,
    ) -> AppResult<ServiceProvider> {
        let role: Option<String> = sqlx::query_scalar("SELECT role FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(db)
            .await?;
        if role.as_deref() != Some(roles::PROVIDER) {
            return Err(AppError::Forbidden);
        }

        let mut tx = db.begin().await?;

        let provider = sqlx::query_as::<_, ServiceProvider>(
            "INSERT INTO service_providers
                 (user_id, business_name, description, skills, experience_years,
                  hourly_rate_cents, service_area, license_number)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING *",
        )
        .bind(user_id)
        .bind(profile.business_name)
        .bind(profile.description)
        .bind(profile.skills)
        .bind(profile.experience_years)
        .bind(profile.hourly_rate_cents)
        .bind(profile.service_area)
        .bind(profile.license_number)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(dbe) if dbe.is_unique_violation() => {
                AppError::Conflict("provider profile already exists".into())
            }
            _ => AppError::Database(e),
        })?;

        for category_id in profile.category_ids {
            sqlx::query(
                "INSERT INTO provider_categories (provider_id, category_id)
                 VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(provider.id)
            .bind(category_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(provider)
    }

    pub async fn get_availability(
        db: &Pool<Postgres>,
        provider_id: Uuid,
    ) -> AppResult<Vec<ProviderAvailability>> {
        let slots = sqlx::query_as::<_, ProviderAvailability>(
            "SELECT id, provider_id, day_of_week, start_time, end_time, is_available
             FROM provider_availability WHERE provider_id = $1",
        )
        .bind(provider_id)
        .fetch_all(db)
        .await?;
        Ok(slots)
    }

    /// Replace the weekly schedule; one slot per day at most
    pub async fn set_availability(
        db: &Pool<Postgres>,
        provider_id: Uuid,
        slots: &[AvailabilitySlotInput],
    ) -> AppResult<Vec<ProviderAvailability>> {
        for slot in slots {
            if !days::is_valid(&slot.day_of_week) {
                return Err(AppError::BadRequest(format!(
                    "invalid day of week: {}",
                    slot.day_of_week
                )));
            }
            if slot.start_time >= slot.end_time {
                return Err(AppError::BadRequest(
                    "start_time must be before end_time".into(),
                ));
            }
        }

        let mut tx = db.begin().await?;
        sqlx::query("DELETE FROM provider_availability WHERE provider_id = $1")
            .bind(provider_id)
            .execute(&mut *tx)
            .await?;
        for slot in slots {
            sqlx::query(
                "INSERT INTO provider_availability
                     (provider_id, day_of_week, start_time, end_time, is_available)
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(provider_id)
            .bind(&slot.day_of_week)
            .bind(slot.start_time)
            .bind(slot.end_time)
            .bind(slot.is_available)
            .execute(&mut *tx)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(dbe) if dbe.is_unique_violation() => {
                    AppError::BadRequest("duplicate day in schedule".into())
                }
                _ => AppError::Database(e),
            })?;
        }
        tx.commit().await?;

        Self::get_availability(db, provider_id).await
    }
}
