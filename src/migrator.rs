use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_users_table::Migration),
            Box::new(m20240301_000002_create_customers_and_counters::Migration),
            Box::new(m20240301_000003_create_orders_tables::Migration),
            Box::new(m20240301_000004_create_quotations_tables::Migration),
            Box::new(m20240301_000005_create_invoices_tables::Migration),
            Box::new(m20240301_000006_create_inventory_tables::Migration),
            Box::new(m20240301_000007_create_chat_tables::Migration),
            Box::new(m20240301_000008_create_calls_tables::Migration),
            Box::new(m20240301_000009_create_notifications_table::Migration),
        ]
    }
}

mod m20240301_000001_create_users_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000001_create_users_table"
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
                            ColumnDef::new(Users::Email)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Users::PasswordHash).string().not_null())
                        .col(ColumnDef::new(Users::Role).string_len(32).not_null())
                        .col(ColumnDef::new(Users::Department).string_len(32).not_null())
                        .col(ColumnDef::new(Users::Phone).string().null())
                        .col(
                            ColumnDef::new(Users::Active)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Users::LastLoginAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Users::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Users::UpdatedAt)
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
                        .name("idx_users_role")
                        .table(Users::Table)
                        .col(Users::Role)
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
    enum Users {
        Table,
        Id,
        Name,
        Email,
        PasswordHash,
        Role,
        Department,
        Phone,
        Active,
        LastLoginAt,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240301_000002_create_customers_and_counters {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000002_create_customers_and_counters"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Customers::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Customers::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Customers::Name).string().not_null())
                        .col(ColumnDef::new(Customers::Phone).string().null())
                        .col(ColumnDef::new(Customers::Email).string().null())
                        .col(ColumnDef::new(Customers::Company).string().null())
                        .col(ColumnDef::new(Customers::Address).string().null())
                        .col(ColumnDef::new(Customers::Notes).text().null())
                        .col(ColumnDef::new(Customers::CreatedBy).uuid().not_null())
                        .col(
                            ColumnDef::new(Customers::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Customers::UpdatedAt)
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
                        .name("idx_customers_name")
                        .table(Customers::Table)
                        .col(Customers::Name)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Counters::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Counters::Name)
                                .string_len(32)
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Counters::Value)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Counters::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            let now = chrono::Utc::now();
            let seed = Query::insert()
                .into_table(Counters::Table)
                .columns([Counters::Name, Counters::Value, Counters::UpdatedAt])
                .values_panic(["orders".into(), 0i64.into(), now.into()])
                .values_panic(["quotations".into(), 0i64.into(), now.into()])
                .values_panic(["invoices".into(), 0i64.into(), now.into()])
                .to_owned();
            manager.exec_stmt(seed).await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Counters::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Customers::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Customers {
        Table,
        Id,
        Name,
        Phone,
        Email,
        Company,
        Address,
        Notes,
        CreatedBy,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Counters {
        Table,
        Name,
        Value,
        UpdatedAt,
    }
}

mod m20240301_000003_create_orders_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000003_create_orders_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Orders::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Orders::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Orders::OrderNumber)
                                .string_len(32)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Orders::CustomerId).uuid().null())
                        .col(ColumnDef::new(Orders::CustomerName).string().not_null())
                        .col(ColumnDef::new(Orders::CustomerPhone).string().null())
                        .col(ColumnDef::new(Orders::QuotationId).uuid().null())
                        .col(ColumnDef::new(Orders::Title).string().not_null())
                        .col(ColumnDef::new(Orders::Description).text().null())
                        .col(ColumnDef::new(Orders::OrderType).string_len(32).not_null())
                        .col(
                            ColumnDef::new(Orders::Quantity)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .col(ColumnDef::new(Orders::Dimensions).string().null())
                        .col(ColumnDef::new(Orders::Priority).string_len(16).not_null())
                        .col(ColumnDef::new(Orders::Status).string_len(32).not_null())
                        .col(ColumnDef::new(Orders::AssignedDesignerId).uuid().null())
                        .col(ColumnDef::new(Orders::AssignedPrinterId).uuid().null())
                        .col(
                            ColumnDef::new(Orders::TotalAmount)
                                .decimal_len(14, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Orders::PaidAmount)
                                .decimal_len(14, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Orders::RemainingAmount)
                                .decimal_len(14, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Orders::DueDate)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(Orders::CreatedBy).uuid().not_null())
                        .col(
                            ColumnDef::new(Orders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Orders::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Orders::Version)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .to_owned(),
                )
                .await?;

            for (name, col) in [
                ("idx_orders_status", Orders::Status),
                ("idx_orders_customer_id", Orders::CustomerId),
                ("idx_orders_created_at", Orders::CreatedAt),
                ("idx_orders_designer", Orders::AssignedDesignerId),
                ("idx_orders_printer", Orders::AssignedPrinterId),
            ] {
                manager
                    .create_index(
                        Index::create()
                            .if_not_exists()
                            .name(name)
                            .table(Orders::Table)
                            .col(col)
                            .to_owned(),
                    )
                    .await?;
            }

            manager
                .create_table(
                    Table::create()
                        .table(OrderTimelineEntries::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OrderTimelineEntries::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OrderTimelineEntries::OrderId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OrderTimelineEntries::Action)
                                .string_len(32)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OrderTimelineEntries::FromStatus)
                                .string_len(32)
                                .null(),
                        )
                        .col(
                            ColumnDef::new(OrderTimelineEntries::ToStatus)
                                .string_len(32)
                                .null(),
                        )
                        .col(ColumnDef::new(OrderTimelineEntries::Note).text().null())
                        .col(
                            ColumnDef::new(OrderTimelineEntries::ActorId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OrderTimelineEntries::ActorName)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OrderTimelineEntries::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_timeline_order")
                                .from(OrderTimelineEntries::Table, OrderTimelineEntries::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_timeline_order_id")
                        .table(OrderTimelineEntries::Table)
                        .col(OrderTimelineEntries::OrderId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(OrderAttachments::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OrderAttachments::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(OrderAttachments::OrderId).uuid().not_null())
                        .col(
                            ColumnDef::new(OrderAttachments::Kind)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OrderAttachments::StorageKey)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(OrderAttachments::FileName).string().not_null())
                        .col(
                            ColumnDef::new(OrderAttachments::ContentType)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OrderAttachments::SizeBytes)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OrderAttachments::UploadedBy)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OrderAttachments::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_attachment_order")
                                .from(OrderAttachments::Table, OrderAttachments::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OrderAttachments::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(OrderTimelineEntries::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Orders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Orders {
        Table,
        Id,
        OrderNumber,
        CustomerId,
        CustomerName,
        CustomerPhone,
        QuotationId,
        Title,
        Description,
        OrderType,
        Quantity,
        Dimensions,
        Priority,
        Status,
        AssignedDesignerId,
        AssignedPrinterId,
        TotalAmount,
        PaidAmount,
        RemainingAmount,
        DueDate,
        CreatedBy,
        CreatedAt,
        UpdatedAt,
        Version,
    }

    #[derive(DeriveIden)]
    enum OrderTimelineEntries {
        Table,
        Id,
        OrderId,
        Action,
        FromStatus,
        ToStatus,
        Note,
        ActorId,
        ActorName,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum OrderAttachments {
        Table,
        Id,
        OrderId,
        Kind,
        StorageKey,
        FileName,
        ContentType,
        SizeBytes,
        UploadedBy,
        CreatedAt,
    }
}

mod m20240301_000004_create_quotations_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000004_create_quotations_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Quotations::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Quotations::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Quotations::QuotationNumber)
                                .string_len(32)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Quotations::CustomerId).uuid().null())
                        .col(ColumnDef::new(Quotations::CustomerName).string().not_null())
                        .col(ColumnDef::new(Quotations::CustomerPhone).string().null())
                        .col(ColumnDef::new(Quotations::Title).string().not_null())
                        .col(ColumnDef::new(Quotations::Notes).text().null())
                        .col(
                            ColumnDef::new(Quotations::Subtotal)
                                .decimal_len(14, 2)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Quotations::Discount)
                                .decimal_len(14, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Quotations::TaxRate)
                                .decimal_len(6, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Quotations::TaxAmount)
                                .decimal_len(14, 2)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Quotations::Total)
                                .decimal_len(14, 2)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Quotations::Status).string_len(32).not_null())
                        .col(
                            ColumnDef::new(Quotations::ValidUntil)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(Quotations::ReviewedBy).uuid().null())
                        .col(
                            ColumnDef::new(Quotations::ReviewedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(Quotations::RejectionReason).string().null())
                        .col(ColumnDef::new(Quotations::OrderId).uuid().null())
                        .col(ColumnDef::new(Quotations::CreatedBy).uuid().not_null())
                        .col(
                            ColumnDef::new(Quotations::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Quotations::UpdatedAt)
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
                        .name("idx_quotations_status")
                        .table(Quotations::Table)
                        .col(Quotations::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(QuotationItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(QuotationItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(QuotationItems::QuotationId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(QuotationItems::Position).integer().not_null())
                        .col(
                            ColumnDef::new(QuotationItems::Description)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(QuotationItems::Quantity).integer().not_null())
                        .col(
                            ColumnDef::new(QuotationItems::UnitPrice)
                                .decimal_len(14, 2)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(QuotationItems::LineTotal)
                                .decimal_len(14, 2)
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_quotation_item_quotation")
                                .from(QuotationItems::Table, QuotationItems::QuotationId)
                                .to(Quotations::Table, Quotations::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(QuotationItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Quotations::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Quotations {
        Table,
        Id,
        QuotationNumber,
        CustomerId,
        CustomerName,
        CustomerPhone,
        Title,
        Notes,
        Subtotal,
        Discount,
        TaxRate,
        TaxAmount,
        Total,
        Status,
        ValidUntil,
        ReviewedBy,
        ReviewedAt,
        RejectionReason,
        OrderId,
        CreatedBy,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum QuotationItems {
        Table,
        Id,
        QuotationId,
        Position,
        Description,
        Quantity,
        UnitPrice,
        LineTotal,
    }
}

mod m20240301_000005_create_invoices_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000005_create_invoices_tables"
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
                        .col(ColumnDef::new(Invoices::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Invoices::InvoiceNumber)
                                .string_len(32)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Invoices::OrderId).uuid().null())
                        .col(ColumnDef::new(Invoices::CustomerId).uuid().null())
                        .col(ColumnDef::new(Invoices::CustomerName).string().not_null())
                        .col(
                            ColumnDef::new(Invoices::Subtotal)
                                .decimal_len(14, 2)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Invoices::Discount)
                                .decimal_len(14, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Invoices::TaxAmount)
                                .decimal_len(14, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Invoices::TotalAmount)
                                .decimal_len(14, 2)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Invoices::PaidAmount)
                                .decimal_len(14, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Invoices::RemainingAmount)
                                .decimal_len(14, 2)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Invoices::Status).string_len(32).not_null())
                        .col(
                            ColumnDef::new(Invoices::DueDate)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(Invoices::Notes).text().null())
                        .col(ColumnDef::new(Invoices::CreatedBy).uuid().not_null())
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
                        .col(
                            ColumnDef::new(Invoices::Version)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .to_owned(),
                )
                .await?;

            for (name, col) in [
                ("idx_invoices_status", Invoices::Status),
                ("idx_invoices_order_id", Invoices::OrderId),
                ("idx_invoices_customer_id", Invoices::CustomerId),
            ] {
                manager
                    .create_index(
                        Index::create()
                            .if_not_exists()
                            .name(name)
                            .table(Invoices::Table)
                            .col(col)
                            .to_owned(),
                    )
                    .await?;
            }

            manager
                .create_table(
                    Table::create()
                        .table(Payments::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Payments::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Payments::InvoiceId).uuid().not_null())
                        .col(
                            ColumnDef::new(Payments::Amount)
                                .decimal_len(14, 2)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Payments::Method).string_len(32).not_null())
                        .col(ColumnDef::new(Payments::Reference).string().null())
                        .col(ColumnDef::new(Payments::Notes).text().null())
                        .col(ColumnDef::new(Payments::ReceivedBy).uuid().not_null())
                        .col(
                            ColumnDef::new(Payments::PaidAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_payment_invoice")
                                .from(Payments::Table, Payments::InvoiceId)
                                .to(Invoices::Table, Invoices::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_payments_invoice_id")
                        .table(Payments::Table)
                        .col(Payments::InvoiceId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Payments::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Invoices::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Invoices {
        Table,
        Id,
        InvoiceNumber,
        OrderId,
        CustomerId,
        CustomerName,
        Subtotal,
        Discount,
        TaxAmount,
        TotalAmount,
        PaidAmount,
        RemainingAmount,
        Status,
        DueDate,
        Notes,
        CreatedBy,
        CreatedAt,
        UpdatedAt,
        Version,
    }

    #[derive(DeriveIden)]
    enum Payments {
        Table,
        Id,
        InvoiceId,
        Amount,
        Method,
        Reference,
        Notes,
        ReceivedBy,
        PaidAt,
    }
}

mod m20240301_000006_create_inventory_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000006_create_inventory_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(InventoryItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(InventoryItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(InventoryItems::Name).string().not_null())
                        .col(
                            ColumnDef::new(InventoryItems::Sku)
                                .string_len(64)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(InventoryItems::Category).string().null())
                        .col(ColumnDef::new(InventoryItems::Unit).string_len(32).not_null())
                        .col(
                            ColumnDef::new(InventoryItems::Quantity)
                                .decimal_len(14, 3)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(InventoryItems::MinQuantity)
                                .decimal_len(14, 3)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(InventoryItems::UnitCost)
                                .decimal_len(14, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(InventoryItems::Location).string().null())
                        .col(ColumnDef::new(InventoryItems::Supplier).string().null())
                        .col(ColumnDef::new(InventoryItems::Notes).text().null())
                        .col(
                            ColumnDef::new(InventoryItems::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryItems::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

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
                        .col(
                            ColumnDef::new(InventoryTransactions::ItemId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryTransactions::Delta)
                                .decimal_len(14, 3)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryTransactions::QuantityAfter)
                                .decimal_len(14, 3)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryTransactions::Reason)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryTransactions::ReferenceType)
                                .string_len(32)
                                .null(),
                        )
                        .col(
                            ColumnDef::new(InventoryTransactions::ReferenceId)
                                .uuid()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(InventoryTransactions::ActorId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryTransactions::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_inventory_tx_item")
                                .from(InventoryTransactions::Table, InventoryTransactions::ItemId)
                                .to(InventoryItems::Table, InventoryItems::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_inventory_tx_item_id")
                        .table(InventoryTransactions::Table)
                        .col(InventoryTransactions::ItemId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(MaterialRequests::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(MaterialRequests::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(MaterialRequests::Department)
                                .string_len(32)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(MaterialRequests::RequestedBy)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(MaterialRequests::ItemId).uuid().null())
                        .col(ColumnDef::new(MaterialRequests::ItemName).string().not_null())
                        .col(
                            ColumnDef::new(MaterialRequests::Quantity)
                                .decimal_len(14, 3)
                                .not_null(),
                        )
                        .col(ColumnDef::new(MaterialRequests::Unit).string_len(32).not_null())
                        .col(ColumnDef::new(MaterialRequests::Reason).text().null())
                        .col(
                            ColumnDef::new(MaterialRequests::Urgency)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(MaterialRequests::Status)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(ColumnDef::new(MaterialRequests::ReviewedBy).uuid().null())
                        .col(
                            ColumnDef::new(MaterialRequests::ReviewedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(MaterialRequests::ReviewNote).string().null())
                        .col(ColumnDef::new(MaterialRequests::FulfilledBy).uuid().null())
                        .col(
                            ColumnDef::new(MaterialRequests::FulfilledAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(MaterialRequests::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(MaterialRequests::UpdatedAt)
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
                        .name("idx_material_requests_status")
                        .table(MaterialRequests::Table)
                        .col(MaterialRequests::Status)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(MaterialRequests::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(InventoryTransactions::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(InventoryItems::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum InventoryItems {
        Table,
        Id,
        Name,
        Sku,
        Category,
        Unit,
        Quantity,
        MinQuantity,
        UnitCost,
        Location,
        Supplier,
        Notes,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum InventoryTransactions {
        Table,
        Id,
        ItemId,
        Delta,
        QuantityAfter,
        Reason,
        ReferenceType,
        ReferenceId,
        ActorId,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum MaterialRequests {
        Table,
        Id,
        Department,
        RequestedBy,
        ItemId,
        ItemName,
        Quantity,
        Unit,
        Reason,
        Urgency,
        Status,
        ReviewedBy,
        ReviewedAt,
        ReviewNote,
        FulfilledBy,
        FulfilledAt,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240301_000007_create_chat_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000007_create_chat_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Chats::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Chats::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Chats::Kind).string_len(16).not_null())
                        .col(ColumnDef::new(Chats::Name).string().null())
                        .col(
                            ColumnDef::new(Chats::DirectKey)
                                .string_len(80)
                                .null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Chats::CreatedBy).uuid().not_null())
                        .col(
                            ColumnDef::new(Chats::LastMessageAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(Chats::LastMessagePreview).string().null())
                        .col(
                            ColumnDef::new(Chats::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ChatParticipants::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(ChatParticipants::ChatId).uuid().not_null())
                        .col(ColumnDef::new(ChatParticipants::UserId).uuid().not_null())
                        .col(
                            ColumnDef::new(ChatParticipants::LastReadAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ChatParticipants::JoinedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .primary_key(
                            Index::create()
                                .col(ChatParticipants::ChatId)
                                .col(ChatParticipants::UserId),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_participant_chat")
                                .from(ChatParticipants::Table, ChatParticipants::ChatId)
                                .to(Chats::Table, Chats::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_chat_participants_user")
                        .table(ChatParticipants::Table)
                        .col(ChatParticipants::UserId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Messages::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Messages::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Messages::ChatId).uuid().not_null())
                        .col(ColumnDef::new(Messages::SenderId).uuid().not_null())
                        .col(ColumnDef::new(Messages::Kind).string_len(16).not_null())
                        .col(ColumnDef::new(Messages::Body).text().null())
                        .col(ColumnDef::new(Messages::AttachmentKey).string().null())
                        .col(ColumnDef::new(Messages::DurationSecs).integer().null())
                        .col(
                            ColumnDef::new(Messages::Deleted)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Messages::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_message_chat")
                                .from(Messages::Table, Messages::ChatId)
                                .to(Chats::Table, Chats::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_messages_chat_created")
                        .table(Messages::Table)
                        .col(Messages::ChatId)
                        .col(Messages::CreatedAt)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Messages::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ChatParticipants::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Chats::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Chats {
        Table,
        Id,
        Kind,
        Name,
        DirectKey,
        CreatedBy,
        LastMessageAt,
        LastMessagePreview,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum ChatParticipants {
        Table,
        ChatId,
        UserId,
        LastReadAt,
        JoinedAt,
    }

    #[derive(DeriveIden)]
    enum Messages {
        Table,
        Id,
        ChatId,
        SenderId,
        Kind,
        Body,
        AttachmentKey,
        DurationSecs,
        Deleted,
        CreatedAt,
    }
}

mod m20240301_000008_create_calls_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000008_create_calls_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Calls::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Calls::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Calls::CallerId).uuid().not_null())
                        .col(ColumnDef::new(Calls::ReceiverId).uuid().not_null())
                        .col(ColumnDef::new(Calls::Status).string_len(16).not_null())
                        .col(ColumnDef::new(Calls::OfferSdp).text().not_null())
                        .col(ColumnDef::new(Calls::AnswerSdp).text().null())
                        .col(ColumnDef::new(Calls::EndReason).string_len(32).null())
                        .col(
                            ColumnDef::new(Calls::StartedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Calls::AnsweredAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Calls::EndedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_calls_status")
                        .table(Calls::Table)
                        .col(Calls::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(CallCandidates::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(CallCandidates::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(CallCandidates::CallId).uuid().not_null())
                        .col(ColumnDef::new(CallCandidates::SenderId).uuid().not_null())
                        .col(ColumnDef::new(CallCandidates::Candidate).text().not_null())
                        .col(ColumnDef::new(CallCandidates::SdpMid).string().null())
                        .col(
                            ColumnDef::new(CallCandidates::SdpMlineIndex)
                                .integer()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(CallCandidates::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_candidate_call")
                                .from(CallCandidates::Table, CallCandidates::CallId)
                                .to(Calls::Table, Calls::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(CallCandidates::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Calls::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Calls {
        Table,
        Id,
        CallerId,
        ReceiverId,
        Status,
        OfferSdp,
        AnswerSdp,
        EndReason,
        StartedAt,
        AnsweredAt,
        EndedAt,
    }

    #[derive(DeriveIden)]
    enum CallCandidates {
        Table,
        Id,
        CallId,
        SenderId,
        Candidate,
        SdpMid,
        SdpMlineIndex,
        CreatedAt,
    }
}

mod m20240301_000009_create_notifications_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000009_create_notifications_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Notifications::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Notifications::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Notifications::UserId).uuid().not_null())
                        .col(ColumnDef::new(Notifications::Kind).string_len(32).not_null())
                        .col(ColumnDef::new(Notifications::Title).string().not_null())
                        .col(ColumnDef::new(Notifications::Body).text().not_null())
                        .col(ColumnDef::new(Notifications::LinkType).string_len(32).null())
                        .col(ColumnDef::new(Notifications::LinkId).uuid().null())
                        .col(
                            ColumnDef::new(Notifications::ReadAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Notifications::CreatedAt)
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
                        .name("idx_notifications_user")
                        .table(Notifications::Table)
                        .col(Notifications::UserId)
                        .col(Notifications::ReadAt)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Notifications::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Notifications {
        Table,
        Id,
        UserId,
        Kind,
        Title,
        Body,
        LinkType,
        LinkId,
        ReadAt,
        CreatedAt,
    }
}
