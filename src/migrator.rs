use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_tenants_table::Migration),
            Box::new(m20240101_000002_create_products_table::Migration),
            Box::new(m20240101_000003_create_materials_table::Migration),
            Box::new(m20240101_000004_create_recipes_tables::Migration),
            Box::new(m20240101_000005_create_inventory_transactions_table::Migration),
            Box::new(m20240101_000006_create_stock_alerts_table::Migration),
        ]
    }
}

#[derive(DeriveIden)]
enum Tenants {
    Table,
    Id,
    Name,
    Slug,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Products {
    Table,
    Id,
    TenantId,
    Name,
    Sku,
    Price,
    IsActive,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}

#[derive(DeriveIden)]
enum Materials {
    Table,
    Id,
    TenantId,
    Name,
    Sku,
    Category,
    UnitOfMeasure,
    StockQuantity,
    ReorderLevel,
    UnitCost,
    Description,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}

#[derive(DeriveIden)]
enum Recipes {
    Table,
    Id,
    TenantId,
    ProductId,
    Name,
    Description,
    YieldQuantity,
    YieldUnit,
    IsActive,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}

#[derive(DeriveIden)]
enum RecipeMaterials {
    Table,
    Id,
    TenantId,
    RecipeId,
    MaterialId,
    QuantityRequired,
    Unit,
    WastePercentage,
    SortOrder,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum InventoryTransactions {
    Table,
    Id,
    TenantId,
    MaterialId,
    TransactionType,
    QuantityBefore,
    QuantityChange,
    QuantityAfter,
    Reason,
    Notes,
    ReferenceType,
    ReferenceId,
    CreatedBy,
    CreatedAt,
}

#[derive(DeriveIden)]
enum StockAlerts {
    Table,
    Id,
    TenantId,
    MaterialId,
    AlertType,
    Status,
    StockLevel,
    ReorderLevel,
    Message,
    AcknowledgedBy,
    AcknowledgedAt,
    ResolvedBy,
    ResolvedAt,
    DismissedBy,
    DismissedAt,
    Notes,
    CreatedAt,
    UpdatedAt,
}

mod m20240101_000001_create_tenants_table {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_tenants_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Tenants::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Tenants::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Tenants::Name).string().not_null())
                        .col(
                            ColumnDef::new(Tenants::Slug)
                                .string_len(100)
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(Tenants::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Tenants::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Tenants::Table).to_owned())
                .await
        }
    }
}

mod m20240101_000002_create_products_table {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_products_table"
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
                        .col(ColumnDef::new(Products::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Products::TenantId).uuid().not_null())
                        .col(ColumnDef::new(Products::Name).string().not_null())
                        .col(ColumnDef::new(Products::Sku).string_len(100).not_null())
                        .col(
                            ColumnDef::new(Products::Price)
                                .decimal_len(15, 4)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Products::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
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
                        .col(
                            ColumnDef::new(Products::DeletedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_products_tenant_id")
                                .from(Products::Table, Products::TenantId)
                                .to(Tenants::Table, Tenants::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_products_tenant_sku")
                        .table(Products::Table)
                        .col(Products::TenantId)
                        .col(Products::Sku)
                        .unique()
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
}

mod m20240101_000003_create_materials_table {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_materials_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Materials::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Materials::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Materials::TenantId).uuid().not_null())
                        .col(ColumnDef::new(Materials::Name).string().not_null())
                        .col(ColumnDef::new(Materials::Sku).string_len(100).not_null())
                        .col(ColumnDef::new(Materials::Category).string_len(100).null())
                        .col(
                            ColumnDef::new(Materials::UnitOfMeasure)
                                .string_len(32)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Materials::StockQuantity)
                                .decimal_len(15, 4)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Materials::ReorderLevel)
                                .decimal_len(15, 4)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Materials::UnitCost)
                                .decimal_len(15, 4)
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Materials::Description).text().null())
                        .col(
                            ColumnDef::new(Materials::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Materials::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Materials::DeletedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_materials_tenant_id")
                                .from(Materials::Table, Materials::TenantId)
                                .to(Tenants::Table, Tenants::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_materials_tenant_sku")
                        .table(Materials::Table)
                        .col(Materials::TenantId)
                        .col(Materials::Sku)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_materials_tenant_category")
                        .table(Materials::Table)
                        .col(Materials::TenantId)
                        .col(Materials::Category)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Materials::Table).to_owned())
                .await
        }
    }
}

mod m20240101_000004_create_recipes_tables {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000004_create_recipes_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Recipes::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Recipes::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Recipes::TenantId).uuid().not_null())
                        .col(ColumnDef::new(Recipes::ProductId).uuid().not_null())
                        .col(ColumnDef::new(Recipes::Name).string().not_null())
                        .col(ColumnDef::new(Recipes::Description).text().null())
                        .col(
                            ColumnDef::new(Recipes::YieldQuantity)
                                .decimal_len(15, 4)
                                .not_null()
                                .default(1),
                        )
                        .col(ColumnDef::new(Recipes::YieldUnit).string_len(32).not_null())
                        .col(
                            ColumnDef::new(Recipes::IsActive)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Recipes::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Recipes::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Recipes::DeletedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_recipes_tenant_id")
                                .from(Recipes::Table, Recipes::TenantId)
                                .to(Tenants::Table, Tenants::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_recipes_product_id")
                                .from(Recipes::Table, Recipes::ProductId)
                                .to(Products::Table, Products::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_recipes_tenant_product")
                        .table(Recipes::Table)
                        .col(Recipes::TenantId)
                        .col(Recipes::ProductId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(RecipeMaterials::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(RecipeMaterials::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(RecipeMaterials::TenantId).uuid().not_null())
                        .col(ColumnDef::new(RecipeMaterials::RecipeId).uuid().not_null())
                        .col(ColumnDef::new(RecipeMaterials::MaterialId).uuid().not_null())
                        .col(
                            ColumnDef::new(RecipeMaterials::QuantityRequired)
                                .decimal_len(15, 4)
                                .not_null(),
                        )
                        .col(ColumnDef::new(RecipeMaterials::Unit).string_len(32).not_null())
                        .col(
                            ColumnDef::new(RecipeMaterials::WastePercentage)
                                .decimal_len(5, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(RecipeMaterials::SortOrder)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(RecipeMaterials::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(RecipeMaterials::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_recipe_materials_recipe_id")
                                .from(RecipeMaterials::Table, RecipeMaterials::RecipeId)
                                .to(Recipes::Table, Recipes::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_recipe_materials_material_id")
                                .from(RecipeMaterials::Table, RecipeMaterials::MaterialId)
                                .to(Materials::Table, Materials::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_recipe_materials_recipe_material")
                        .table(RecipeMaterials::Table)
                        .col(RecipeMaterials::RecipeId)
                        .col(RecipeMaterials::MaterialId)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(RecipeMaterials::Table).to_owned())
                .await?;

            manager
                .drop_table(Table::drop().table(Recipes::Table).to_owned())
                .await
        }
    }
}

mod m20240101_000005_create_inventory_transactions_table {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000005_create_inventory_transactions_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(InventoryTransactions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(InventoryTransactions::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(InventoryTransactions::TenantId).uuid().not_null())
                        .col(
                            ColumnDef::new(InventoryTransactions::MaterialId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryTransactions::TransactionType)
                                .string_len(32)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryTransactions::QuantityBefore)
                                .decimal_len(15, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryTransactions::QuantityChange)
                                .decimal_len(15, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryTransactions::QuantityAfter)
                                .decimal_len(15, 4)
                                .not_null(),
                        )
                        .col(ColumnDef::new(InventoryTransactions::Reason).string().null())
                        .col(ColumnDef::new(InventoryTransactions::Notes).text().null())
                        .col(
                            ColumnDef::new(InventoryTransactions::ReferenceType)
                                .string_len(50)
                                .null(),
                        )
                        .col(ColumnDef::new(InventoryTransactions::ReferenceId).uuid().null())
                        .col(ColumnDef::new(InventoryTransactions::CreatedBy).uuid().null())
                        .col(
                            ColumnDef::new(InventoryTransactions::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_inventory_transactions_material_id")
                                .from(
                                    InventoryTransactions::Table,
                                    InventoryTransactions::MaterialId,
                                )
                                .to(Materials::Table, Materials::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_inventory_transactions_tenant_created")
                        .table(InventoryTransactions::Table)
                        .col(InventoryTransactions::TenantId)
                        .col(InventoryTransactions::CreatedAt)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_inventory_transactions_material")
                        .table(InventoryTransactions::Table)
                        .col(InventoryTransactions::MaterialId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(InventoryTransactions::Table).to_owned())
                .await
        }
    }
}

mod m20240101_000006_create_stock_alerts_table {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000006_create_stock_alerts_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(StockAlerts::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockAlerts::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockAlerts::TenantId).uuid().not_null())
                        .col(ColumnDef::new(StockAlerts::MaterialId).uuid().not_null())
                        .col(ColumnDef::new(StockAlerts::AlertType).string_len(32).not_null())
                        .col(ColumnDef::new(StockAlerts::Status).string_len(32).not_null())
                        .col(
                            ColumnDef::new(StockAlerts::StockLevel)
                                .decimal_len(15, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockAlerts::ReorderLevel)
                                .decimal_len(15, 4)
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockAlerts::Message).string().not_null())
                        .col(ColumnDef::new(StockAlerts::AcknowledgedBy).uuid().null())
                        .col(
                            ColumnDef::new(StockAlerts::AcknowledgedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(StockAlerts::ResolvedBy).uuid().null())
                        .col(
                            ColumnDef::new(StockAlerts::ResolvedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(StockAlerts::DismissedBy).uuid().null())
                        .col(
                            ColumnDef::new(StockAlerts::DismissedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(StockAlerts::Notes).text().null())
                        .col(
                            ColumnDef::new(StockAlerts::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockAlerts::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_stock_alerts_material_id")
                                .from(StockAlerts::Table, StockAlerts::MaterialId)
                                .to(Materials::Table, Materials::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_stock_alerts_tenant_status")
                        .table(StockAlerts::Table)
                        .col(StockAlerts::TenantId)
                        .col(StockAlerts::Status)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(StockAlerts::Table).to_owned())
                .await
        }
    }
}
