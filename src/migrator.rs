use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_ingredients_table::Migration),
            Box::new(m20240301_000002_create_recipes_table::Migration),
            Box::new(m20240301_000003_create_recipe_ingredients_table::Migration),
            Box::new(m20240301_000004_create_sales_tables::Migration),
            Box::new(m20240301_000005_create_waste_records_table::Migration),
            Box::new(m20240301_000006_create_users_table::Migration),
        ]
    }
}

// Migration implementations

mod m20240301_000001_create_ingredients_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000001_create_ingredients_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Ingredients::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Ingredients::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Ingredients::Name).string().not_null())
                        .col(
                            ColumnDef::new(Ingredients::Quantity)
                                .decimal_len(10, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Ingredients::Unit).string().not_null())
                        .col(
                            ColumnDef::new(Ingredients::UnitPrice)
                                .decimal_len(10, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Ingredients::CreatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_ingredients_name")
                        .table(Ingredients::Table)
                        .col(Ingredients::Name)
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Ingredients::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    pub enum Ingredients {
        Table,
        Id,
        Name,
        Quantity,
        Unit,
        UnitPrice,
        CreatedAt,
    }
}

mod m20240301_000002_create_recipes_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000002_create_recipes_table"
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
                        .col(
                            ColumnDef::new(Recipes::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Recipes::Name).string().not_null())
                        .col(ColumnDef::new(Recipes::Description).text().not_null())
                        .col(
                            ColumnDef::new(Recipes::Portions)
                                .decimal_len(10, 2)
                                .not_null()
                                .default(1),
                        )
                        .col(ColumnDef::new(Recipes::Category).string().not_null())
                        .col(ColumnDef::new(Recipes::CreatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_recipes_category")
                        .table(Recipes::Table)
                        .col(Recipes::Category)
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Recipes::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    pub enum Recipes {
        Table,
        Id,
        Name,
        Description,
        Portions,
        Category,
        CreatedAt,
    }
}

mod m20240301_000003_create_recipe_ingredients_table {

    use sea_orm_migration::prelude::*;

    use super::m20240301_000001_create_ingredients_table::Ingredients;
    use super::m20240301_000002_create_recipes_table::Recipes;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000003_create_recipe_ingredients_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(RecipeIngredients::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(RecipeIngredients::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(RecipeIngredients::RecipeId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(RecipeIngredients::IngredientId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(RecipeIngredients::Quantity)
                                .decimal_len(10, 2)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(RecipeIngredients::UnitPrice)
                                .decimal_len(10, 2)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(RecipeIngredients::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(RecipeIngredients::UpdatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_recipe_ingredients_recipe")
                                .from(RecipeIngredients::Table, RecipeIngredients::RecipeId)
                                .to(Recipes::Table, Recipes::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_recipe_ingredients_ingredient")
                                .from(RecipeIngredients::Table, RecipeIngredients::IngredientId)
                                .to(Ingredients::Table, Ingredients::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            // One association row per (recipe, ingredient) pair
            manager
                .create_index(
                    Index::create()
                        .name("uq_recipe_ingredients_pair")
                        .table(RecipeIngredients::Table)
                        .col(RecipeIngredients::RecipeId)
                        .col(RecipeIngredients::IngredientId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(RecipeIngredients::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    pub enum RecipeIngredients {
        Table,
        Id,
        RecipeId,
        IngredientId,
        Quantity,
        UnitPrice,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240301_000004_create_sales_tables {

    use sea_orm_migration::prelude::*;

    use super::m20240301_000002_create_recipes_table::Recipes;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000004_create_sales_tables"
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
                        .col(
                            ColumnDef::new(Sales::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(Sales::Total)
                                .decimal_len(10, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Sales::Completed)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Sales::SaleDate).timestamp().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_sales_sale_date")
                        .table(Sales::Table)
                        .col(Sales::SaleDate)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(SaleRecipes::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(SaleRecipes::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(SaleRecipes::SaleId).big_integer().not_null())
                        .col(
                            ColumnDef::new(SaleRecipes::RecipeId)
                                .big_integer()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_sale_recipes_sale")
                                .from(SaleRecipes::Table, SaleRecipes::SaleId)
                                .to(Sales::Table, Sales::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_sale_recipes_recipe")
                                .from(SaleRecipes::Table, SaleRecipes::RecipeId)
                                .to(Recipes::Table, Recipes::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("uq_sale_recipes_pair")
                        .table(SaleRecipes::Table)
                        .col(SaleRecipes::SaleId)
                        .col(SaleRecipes::RecipeId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(SaleRecipes::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Sales::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    pub enum Sales {
        Table,
        Id,
        Total,
        Completed,
        SaleDate,
    }

    #[derive(Iden)]
    pub enum SaleRecipes {
        Table,
        Id,
        SaleId,
        RecipeId,
    }
}

mod m20240301_000005_create_waste_records_table {

    use sea_orm_migration::prelude::*;

    use super::m20240301_000001_create_ingredients_table::Ingredients;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000005_create_waste_records_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(WasteRecords::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(WasteRecords::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(WasteRecords::IngredientId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WasteRecords::Quantity)
                                .decimal_len(10, 2)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WasteRecords::RecordedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_waste_records_ingredient")
                                .from(WasteRecords::Table, WasteRecords::IngredientId)
                                .to(Ingredients::Table, Ingredients::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_waste_records_recorded_at")
                        .table(WasteRecords::Table)
                        .col(WasteRecords::RecordedAt)
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(WasteRecords::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    pub enum WasteRecords {
        Table,
        Id,
        IngredientId,
        Quantity,
        RecordedAt,
    }
}

mod m20240301_000006_create_users_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000006_create_users_table"
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
                        .col(
                            ColumnDef::new(Users::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(Users::Username)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Users::Email).string().not_null().unique_key())
                        .col(ColumnDef::new(Users::PasswordHash).string().not_null())
                        .col(ColumnDef::new(Users::CreatedAt).timestamp().not_null())
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

    #[derive(Iden)]
    pub enum Users {
        Table,
        Id,
        Username,
        Email,
        PasswordHash,
        CreatedAt,
    }
}
