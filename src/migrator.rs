use anyhow::Result;
use sea_orm::{ConnectOptions, Database};
use sea_orm_migration::prelude::*;
use std::time::Duration;
use tracing::{error, info};

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250531_000001_create_maintenance_technicians_table::Migration),
            Box::new(m20250531_000002_create_maintenance_requests_table::Migration),
            Box::new(m20250531_000003_create_invoices_table::Migration),
            Box::new(m20250531_000004_create_products_table::Migration),
            Box::new(m20250601_000005_create_sequence_counters_table::Migration),
        ]
    }
}

mod m20250531_000001_create_maintenance_technicians_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250531_000001_create_maintenance_technicians_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(MaintenanceTechnicians::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(MaintenanceTechnicians::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(MaintenanceTechnicians::Name)
                                .string_len(255)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(MaintenanceTechnicians::Specialty)
                                .string_len(255)
                                .null(),
                        )
                        .col(
                            ColumnDef::new(MaintenanceTechnicians::Contact)
                                .string_len(255)
                                .null(),
                        )
                        .col(
                            ColumnDef::new(MaintenanceTechnicians::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(MaintenanceTechnicians::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(MaintenanceTechnicians::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub enum MaintenanceTechnicians {
        Table,
        Id,
        Name,
        Specialty,
        Contact,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250531_000002_create_maintenance_requests_table {
    use super::m20250531_000001_create_maintenance_technicians_table::MaintenanceTechnicians;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250531_000002_create_maintenance_requests_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(MaintenanceRequests::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(MaintenanceRequests::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(MaintenanceRequests::RequestNo)
                                .string_len(32)
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(MaintenanceRequests::CustomerName)
                                .string_len(255)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(MaintenanceRequests::CustomerPhone)
                                .string_len(20)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(MaintenanceRequests::Description)
                                .text()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(MaintenanceRequests::Category)
                                .string_len(32)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(MaintenanceRequests::Status)
                                .string_len(20)
                                .not_null()
                                .default("pending"),
                        )
                        .col(
                            ColumnDef::new(MaintenanceRequests::TechnicianId)
                                .integer()
                                .null(),
                        )
                        .col(ColumnDef::new(MaintenanceRequests::Notes).text().null())
                        .col(
                            ColumnDef::new(MaintenanceRequests::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(MaintenanceRequests::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_maintenance_requests_technician_id")
                                .from(MaintenanceRequests::Table, MaintenanceRequests::TechnicianId)
                                .to(MaintenanceTechnicians::Table, MaintenanceTechnicians::Id)
                                .on_delete(ForeignKeyAction::SetNull)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_maintenance_requests_technician_id")
                        .table(MaintenanceRequests::Table)
                        .col(MaintenanceRequests::TechnicianId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_maintenance_requests_status")
                        .table(MaintenanceRequests::Table)
                        .col(MaintenanceRequests::Status)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(MaintenanceRequests::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub enum MaintenanceRequests {
        Table,
        Id,
        RequestNo,
        CustomerName,
        CustomerPhone,
        Description,
        Category,
        Status,
        TechnicianId,
        Notes,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250531_000003_create_invoices_table {
    use super::m20250531_000002_create_maintenance_requests_table::MaintenanceRequests;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250531_000003_create_invoices_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Invoices::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Invoices::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Invoices::RequestId).integer().not_null())
                        .col(
                            ColumnDef::new(Invoices::Amount)
                                .decimal_len(10, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Invoices::InvoiceNo)
                                .string_len(32)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Invoices::IssueDate).date().not_null())
                        .col(ColumnDef::new(Invoices::DueDate).date().not_null())
                        .col(
                            ColumnDef::new(Invoices::Status)
                                .string_len(20)
                                .not_null()
                                .default("unpaid"),
                        )
                        .col(ColumnDef::new(Invoices::Items).text().null())
                        .col(
                            ColumnDef::new(Invoices::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Invoices::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_invoices_request_id")
                                .from(Invoices::Table, Invoices::RequestId)
                                .to(MaintenanceRequests::Table, MaintenanceRequests::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            // One invoice per maintenance request.
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_invoices_request_id_unique")
                        .table(Invoices::Table)
                        .col(Invoices::RequestId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_invoices_status")
                        .table(Invoices::Table)
                        .col(Invoices::Status)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Invoices::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Invoices {
        Table,
        Id,
        RequestId,
        Amount,
        InvoiceNo,
        IssueDate,
        DueDate,
        Status,
        Items,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250531_000004_create_products_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250531_000004_create_products_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Products::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Products::Name).string_len(255).not_null())
                        .col(ColumnDef::new(Products::Price).decimal_len(10, 2).not_null())
                        .col(ColumnDef::new(Products::Image).string_len(1024).null())
                        .col(ColumnDef::new(Products::Category).string_len(20).not_null())
                        .col(
                            ColumnDef::new(Products::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Products::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_products_category")
                        .table(Products::Table)
                        .col(Products::Category)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Products {
        Table,
        Id,
        Name,
        Price,
        Image,
        Category,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250601_000005_create_sequence_counters_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250601_000005_create_sequence_counters_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(SequenceCounters::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(SequenceCounters::Prefix)
                                .string_len(16)
                                .not_null()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(SequenceCounters::LastValue)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(SequenceCounters::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum SequenceCounters {
        Table,
        Prefix,
        LastValue,
    }
}

/// Standalone migration runner used by the operator CLI.
pub async fn run_migration(db_url: &str) -> Result<()> {
    info!("Setting up database connection for migrations");

    let mut opt = ConnectOptions::new(db_url);
    opt.max_connections(2)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(30))
        .acquire_timeout(Duration::from_secs(30))
        .sqlx_logging(false);

    let db = Database::connect(opt).await?;

    info!("Running database migrations");

    match Migrator::up(&db, None).await {
        Ok(_) => {
            info!("Migrations completed successfully");
            Ok(())
        }
        Err(e) => {
            error!("Migration failed: {}", e);
            Err(e.into())
        }
    }
}
