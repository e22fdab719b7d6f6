use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260101_000001_create_locations_table::Migration),
            Box::new(m20260101_000002_create_users_table::Migration),
            Box::new(m20260101_000003_create_voters_table::Migration),
            Box::new(m20260101_000004_create_sms_campaigns_table::Migration),
        ]
    }
}

// Migration implementations

mod m20260101_000001_create_locations_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000001_create_locations_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Locations::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Locations::Id)
                                .string()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Locations::Name).string().not_null())
                        .col(ColumnDef::new(Locations::BnName).string().not_null())
                        .col(ColumnDef::new(Locations::Level).string().not_null())
                        .col(ColumnDef::new(Locations::ParentId).string().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_locations_parent_id")
                        .table(Locations::Table)
                        .col(Locations::ParentId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_locations_level")
                        .table(Locations::Table)
                        .col(Locations::Level)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Locations::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Locations {
        Table,
        Id,
        Name,
        BnName,
        Level,
        ParentId,
    }
}

mod m20260101_000002_create_users_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000002_create_users_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Users::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Users::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Users::Name).string().not_null())
                        .col(
                            ColumnDef::new(Users::Phone)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Users::PasswordHash).string().not_null())
                        .col(ColumnDef::new(Users::Role).string().null())
                        .col(ColumnDef::new(Users::DivisionId).string().null())
                        .col(ColumnDef::new(Users::DistrictId).string().null())
                        .col(ColumnDef::new(Users::UpazilaId).string().null())
                        .col(ColumnDef::new(Users::UnionId).string().null())
                        .col(ColumnDef::new(Users::VillageId).string().null())
                        .col(
                            ColumnDef::new(Users::ApprovalStatus)
                                .string()
                                .not_null()
                                .default("pending"),
                        )
                        .col(ColumnDef::new(Users::ApprovedBy).uuid().null())
                        .col(ColumnDef::new(Users::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Users::UpdatedAt).timestamp().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_users_approval_status")
                        .table(Users::Table)
                        .col(Users::ApprovalStatus)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Users::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Users {
        Table,
        Id,
        Name,
        Phone,
        PasswordHash,
        Role,
        DivisionId,
        DistrictId,
        UpazilaId,
        UnionId,
        VillageId,
        ApprovalStatus,
        ApprovedBy,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20260101_000003_create_voters_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000003_create_voters_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Voters::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Voters::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Voters::Name).string().not_null())
                        .col(ColumnDef::new(Voters::BnName).string().null())
                        .col(ColumnDef::new(Voters::Phone).string().not_null())
                        .col(ColumnDef::new(Voters::Gender).string().null())
                        .col(ColumnDef::new(Voters::DateOfBirth).string().null())
                        .col(ColumnDef::new(Voters::Occupation).string().null())
                        .col(ColumnDef::new(Voters::VoteIntent).string().null())
                        .col(ColumnDef::new(Voters::Notes).string().null())
                        .col(ColumnDef::new(Voters::DivisionId).string().not_null())
                        .col(ColumnDef::new(Voters::DistrictId).string().not_null())
                        .col(ColumnDef::new(Voters::UpazilaId).string().not_null())
                        .col(ColumnDef::new(Voters::UnionId).string().not_null())
                        .col(ColumnDef::new(Voters::VillageId).string().not_null())
                        .col(ColumnDef::new(Voters::CreatedBy).uuid().not_null())
                        .col(ColumnDef::new(Voters::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Voters::UpdatedAt).timestamp().null())
                        .col(
                            ColumnDef::new(Voters::Version)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .to_owned(),
                )
                .await?;

            // One index per scoping column; every scoped query hits
            // exactly one of these.
            for (name, col) in [
                ("idx_voters_division_id", Voters::DivisionId),
                ("idx_voters_district_id", Voters::DistrictId),
                ("idx_voters_upazila_id", Voters::UpazilaId),
                ("idx_voters_union_id", Voters::UnionId),
                ("idx_voters_village_id", Voters::VillageId),
            ] {
                manager
                    .create_index(
                        Index::create()
                            .if_not_exists()
                            .name(name)
                            .table(Voters::Table)
                            .col(col)
                            .to_owned(),
                    )
                    .await?;
            }

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_voters_phone")
                        .table(Voters::Table)
                        .col(Voters::Phone)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Voters::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Voters {
        Table,
        Id,
        Name,
        BnName,
        Phone,
        Gender,
        DateOfBirth,
        Occupation,
        VoteIntent,
        Notes,
        DivisionId,
        DistrictId,
        UpazilaId,
        UnionId,
        VillageId,
        CreatedBy,
        CreatedAt,
        UpdatedAt,
        Version,
    }
}

mod m20260101_000004_create_sms_campaigns_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000004_create_sms_campaigns_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(SmsCampaigns::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(SmsCampaigns::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(SmsCampaigns::Message).text().not_null())
                        .col(ColumnDef::new(SmsCampaigns::CreatedBy).uuid().not_null())
                        .col(ColumnDef::new(SmsCampaigns::TargetLevel).string().null())
                        .col(
                            ColumnDef::new(SmsCampaigns::TargetAnchorId)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(SmsCampaigns::Status)
                                .string()
                                .not_null()
                                .default("queued"),
                        )
                        .col(
                            ColumnDef::new(SmsCampaigns::RecipientCount)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(SmsCampaigns::DeliveredCount)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(SmsCampaigns::FailedCount)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(SmsCampaigns::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(ColumnDef::new(SmsCampaigns::DispatchedAt).timestamp().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_sms_campaigns_status")
                        .table(SmsCampaigns::Table)
                        .col(SmsCampaigns::Status)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(SmsCampaigns::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum SmsCampaigns {
        Table,
        Id,
        Message,
        CreatedBy,
        TargetLevel,
        TargetAnchorId,
        Status,
        RecipientCount,
        DeliveredCount,
        FailedCount,
        CreatedAt,
        DispatchedAt,
    }
}
