//! Server side of the `setup-database` function.
//!
//! Each step is idempotent: running it against an already-initialized database
//! leaves the data unchanged and still reports success.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::Serialize;

use crate::db::{self, DbConn};
use crate::error::{AppError, Result};
use crate::models::prelude::*;
use crate::models::user_role::ADMIN_ROLE;
use crate::models::{profile, site_setting, user_role};

/// Result of a successful step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepOutcome {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl StepOutcome {
    fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            note: None,
        }
    }
}

/// Default landing-page settings written by the `data` step
pub struct DefaultSiteSettings;

impl DefaultSiteSettings {
    pub const HERO_TITLE: &'static str = "Create Engaging Video Popups";
    pub const HERO_SUBTITLE: &'static str = "Boost conversions with personalized video widgets";
    pub const BRANDING_TEXT: &'static str = "Powered by VideoPopup";
    pub const BRANDING_URL: &'static str = "/";
    pub const PRICING_ENABLED: bool = true;
    pub const PRICE_AMOUNT: i32 = 29;
    pub const PRICE_CURRENCY: &'static str = "USD";
}

/// Create the schema
pub async fn run_migrations(db: &DbConn) -> Result<StepOutcome> {
    db::migrate(db).await?;
    Ok(StepOutcome::message("Migrations completed"))
}

/// Make sure an admin exists, promoting the configured account when it has signed up
pub async fn ensure_admin(db: &DbConn, admin_email: &str) -> Result<StepOutcome> {
    let existing_admin = UserRole::find()
        .filter(user_role::Column::Role.eq(ADMIN_ROLE))
        .one(db)
        .await?;

    if existing_admin.is_some() {
        return Ok(StepOutcome::message("Admin already exists"));
    }

    let profile = Profile::find()
        .filter(profile::Column::Email.eq(admin_email))
        .one(db)
        .await?;

    let Some(profile) = profile else {
        tracing::info!(
            "No account for {} yet, admin role will be assigned after signup",
            admin_email
        );
        return Ok(StepOutcome {
            message: format!(
                "Admin setup ready. Please sign up with {} to create the first admin account.",
                admin_email
            ),
            note: Some(
                "After signup, run the admin step again to assign the admin role".to_string(),
            ),
        });
    };

    let now = Utc::now();
    match UserRole::find_by_id(profile.id.clone()).one(db).await? {
        Some(existing) => {
            let mut active: user_role::ActiveModel = existing.into();
            active.role = Set(ADMIN_ROLE.to_string());
            active.update(db).await?;
        }
        None => {
            let assignment = user_role::ActiveModel {
                user_id: Set(profile.id.clone()),
                role: Set(ADMIN_ROLE.to_string()),
                created_at: Set(now),
            };
            assignment.insert(db).await.map_err(|e| {
                AppError::Internal(format!("Failed to assign admin role: {}", e))
            })?;
        }
    }

    tracing::info!("Assigned admin role to {}", profile.email);
    Ok(StepOutcome::message(format!(
        "Admin role assigned to {}",
        profile.email
    )))
}

/// Seed the initial site settings if none exist
pub async fn seed_data(db: &DbConn) -> Result<StepOutcome> {
    let existing = SiteSetting::find().one(db).await?;

    if existing.is_none() {
        let settings = site_setting::ActiveModel {
            hero_title: Set(DefaultSiteSettings::HERO_TITLE.to_string()),
            hero_subtitle: Set(DefaultSiteSettings::HERO_SUBTITLE.to_string()),
            branding_text: Set(DefaultSiteSettings::BRANDING_TEXT.to_string()),
            branding_url: Set(DefaultSiteSettings::BRANDING_URL.to_string()),
            pricing_enabled: Set(DefaultSiteSettings::PRICING_ENABLED),
            price_amount: Set(DefaultSiteSettings::PRICE_AMOUNT),
            price_currency: Set(DefaultSiteSettings::PRICE_CURRENCY.to_string()),
            created_at: Set(Utc::now()),
            ..Default::default()
        };
        settings
            .insert(db)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to seed site_settings: {}", e)))?;
        tracing::info!("Seeded default site settings");
    }

    Ok(StepOutcome::message("Data seeded successfully"))
}

/// Current site settings, if seeded
pub async fn get_site_settings(db: &DbConn) -> Result<Option<site_setting::Model>> {
    Ok(SiteSetting::find().one(db).await?)
}
