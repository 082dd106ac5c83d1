//! Migration: Create site_settings table

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SiteSettings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SiteSettings::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SiteSettings::HeroTitle).string().not_null())
                    .col(ColumnDef::new(SiteSettings::HeroSubtitle).string().not_null())
                    .col(ColumnDef::new(SiteSettings::BrandingText).string().not_null())
                    .col(ColumnDef::new(SiteSettings::BrandingUrl).string().not_null())
                    .col(
                        ColumnDef::new(SiteSettings::PricingEnabled)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(SiteSettings::PriceAmount)
                            .integer()
                            .not_null()
                            .default(29),
                    )
                    .col(
                        ColumnDef::new(SiteSettings::PriceCurrency)
                            .string()
                            .not_null()
                            .default("USD"),
                    )
                    .col(
                        ColumnDef::new(SiteSettings::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(SiteSettings::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await
    }
}

#[derive(Iden)]
#[iden = "site_settings"]
enum SiteSettings {
    Table,
    Id,
    #[iden = "hero_title"]
    HeroTitle,
    #[iden = "hero_subtitle"]
    HeroSubtitle,
    #[iden = "branding_text"]
    BrandingText,
    #[iden = "branding_url"]
    BrandingUrl,
    #[iden = "pricing_enabled"]
    PricingEnabled,
    #[iden = "price_amount"]
    PriceAmount,
    #[iden = "price_currency"]
    PriceCurrency,
    #[iden = "created_at"]
    CreatedAt,
}
