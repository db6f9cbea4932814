use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_sales_table::Migration),
            Box::new(m20250301_000002_create_cart_items_table::Migration),
        ]
    }
}

mod m20250301_000001_create_sales_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000001_create_sales_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Sales::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Sales::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Sales::IdSaleProvider)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(Sales::SecureId)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Sales::ProviderName).string().not_null())
                        .col(ColumnDef::new(Sales::Name).string().not_null())
                        .col(ColumnDef::new(Sales::LastName).string().not_null())
                        .col(ColumnDef::new(Sales::Email).string().not_null())
                        .col(ColumnDef::new(Sales::PhoneNumber).string().not_null())
                        .col(ColumnDef::new(Sales::Country).string().not_null())
                        .col(ColumnDef::new(Sales::City).string().not_null())
                        .col(ColumnDef::new(Sales::Language).string().not_null())
                        .col(ColumnDef::new(Sales::ServiceDate).date().not_null())
                        .col(ColumnDef::new(Sales::ServiceTime).string().not_null())
                        .col(ColumnDef::new(Sales::QtyPax).integer().not_null())
                        .col(ColumnDef::new(Sales::Opt).string().not_null())
                        .col(ColumnDef::new(Sales::Total).decimal().not_null())
                        .col(ColumnDef::new(Sales::OzytripBookingId).string())
                        .col(ColumnDef::new(Sales::OzytripSalesCode).string())
                        .col(ColumnDef::new(Sales::OzytripBalance).decimal())
                        .col(ColumnDef::new(Sales::OzytripHasAdvancePayment).boolean())
                        .col(ColumnDef::new(Sales::OzytripResponse).text())
                        .col(ColumnDef::new(Sales::Status).string().not_null())
                        .col(ColumnDef::new(Sales::CancelReason).string())
                        .col(
                            ColumnDef::new(Sales::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Sales::UpdatedAt).timestamp_with_time_zone())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_sales_status")
                        .table(Sales::Table)
                        .col(Sales::Status)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Sales::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    pub enum Sales {
        Table,
        Id,
        IdSaleProvider,
        SecureId,
        ProviderName,
        Name,
        LastName,
        Email,
        PhoneNumber,
        Country,
        City,
        Language,
        ServiceDate,
        ServiceTime,
        QtyPax,
        Opt,
        Total,
        OzytripBookingId,
        OzytripSalesCode,
        OzytripBalance,
        OzytripHasAdvancePayment,
        OzytripResponse,
        Status,
        CancelReason,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250301_000002_create_cart_items_table {
    use sea_orm_migration::prelude::*;

    use super::m20250301_000001_create_sales_table::Sales;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000002_create_cart_items_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(CartItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(CartItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(CartItems::SaleId).uuid().not_null())
                        .col(
                            ColumnDef::new(CartItems::IdItemEcommerce)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(CartItems::Status).string().not_null())
                        .col(ColumnDef::new(CartItems::CancelReason).string())
                        .col(
                            ColumnDef::new(CartItems::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(CartItems::UpdatedAt).timestamp_with_time_zone())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_cart_items_sale")
                                .from(CartItems::Table, CartItems::SaleId)
                                .to(Sales::Table, Sales::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_cart_items_sale_id")
                        .table(CartItems::Table)
                        .col(CartItems::SaleId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(CartItems::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum CartItems {
        Table,
        Id,
        SaleId,
        IdItemEcommerce,
        Status,
        CancelReason,
        CreatedAt,
        UpdatedAt,
    }
}
