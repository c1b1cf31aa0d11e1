//! Cocktail recipes, their costing and serving

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::transactions::{
    ensure_location, record_transaction, NewTransaction, NewTransactionItem,
};
use crate::error::{AppError, AppResult};
use crate::middleware::{permissions, Access, AuthUser};
use shared::{
    pour_cost_percentage, recipe_cost, servings_usage, validate_name, validate_non_negative,
    validate_positive, IngredientCosting, PaginatedResponse, Pagination, StockLine,
    TransactionStatus, TransactionType, UnitType,
};

#[derive(Clone)]
pub struct RecipeService {
    db: PgPool,
}

#[derive(Debug, FromRow)]
struct RecipeRow {
    id: Uuid,
    name: String,
    description: String,
    instructions: String,
    sale_price: Decimal,
    created_by: Option<Uuid>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct IngredientRow {
    id: Uuid,
    recipe_id: Uuid,
    product_id: Uuid,
    product_name: String,
    unit_type: UnitType,
    unit_size: Decimal,
    unit_price: Decimal,
    quantity: Decimal,
    notes: String,
}

impl IngredientRow {
    fn costing(&self) -> IngredientCosting {
        IngredientCosting {
            product_id: self.product_id,
            quantity: self.quantity,
            unit_size: self.unit_size,
            unit_price: self.unit_price,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecipeIngredient {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub unit_type: UnitType,
    pub unit_size: Decimal,
    /// Poured per serving, in the product's unit-size measure
    pub quantity: Decimal,
    pub cost: Decimal,
    pub notes: String,
}

impl From<IngredientRow> for RecipeIngredient {
    fn from(row: IngredientRow) -> Self {
        Self {
            cost: row.costing().cost().round_dp(2),
            id: row.id,
            product_id: row.product_id,
            product_name: row.product_name,
            unit_type: row.unit_type,
            unit_size: row.unit_size,
            quantity: row.quantity,
            notes: row.notes,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Recipe {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub instructions: String,
    pub sale_price: Decimal,
    pub cost: Decimal,
    /// Cost as a percentage of the sale price
    pub pour_cost_percentage: Option<Decimal>,
    pub created_by: Option<Uuid>,
    pub is_active: bool,
    pub ingredients: Vec<RecipeIngredient>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Recipe {
    fn assemble(row: RecipeRow, ingredients: Vec<IngredientRow>) -> Self {
        let costings: Vec<IngredientCosting> =
            ingredients.iter().map(IngredientRow::costing).collect();
        let cost = recipe_cost(&costings);
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            instructions: row.instructions,
            sale_price: row.sale_price,
            cost,
            pour_cost_percentage: pour_cost_percentage(cost, row.sale_price),
            created_by: row.created_by,
            is_active: row.is_active,
            ingredients: ingredients.into_iter().map(RecipeIngredient::from).collect(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct IngredientInput {
    pub product_id: Uuid,
    pub quantity: Decimal,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateRecipeInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub instructions: String,
    #[serde(default)]
    pub sale_price: Decimal,
    pub is_active: Option<bool>,
    #[serde(default)]
    pub ingredients: Vec<IngredientInput>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateRecipeInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub instructions: Option<String>,
    pub sale_price: Option<Decimal>,
    pub is_active: Option<bool>,
    /// Replaces every ingredient when present
    pub ingredients: Option<Vec<IngredientInput>>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ServeRecipeInput {
    pub location_id: Uuid,
    #[serde(default = "one")]
    pub servings: u32,
    #[serde(default)]
    pub notes: String,
}

fn one() -> u32 {
    1
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RecipeFilter {
    pub search: Option<String>,
    /// Recipes using this product
    pub product_id: Option<Uuid>,
    pub is_active: Option<bool>,
    /// Comma-separated field names, `-` prefix for descending
    pub ordering: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

const SELECT_RECIPE: &str = r#"
    SELECT r.id, r.name, r.description, r.instructions, r.sale_price, r.created_by,
           r.is_active, r.created_at, r.updated_at
    FROM recipes r
"#;

const SELECT_INGREDIENT: &str = r#"
    SELECT ri.id, ri.recipe_id, ri.product_id, p.name AS product_name, p.unit_type,
           p.unit_size, p.unit_price, ri.quantity, ri.notes
    FROM recipe_ingredients ri
    JOIN products p ON p.id = ri.product_id
"#;

async fn insert_ingredients(
    conn: &mut PgConnection,
    recipe_id: Uuid,
    ingredients: &[IngredientInput],
) -> AppResult<()> {
    for (idx, ingredient) in ingredients.iter().enumerate() {
        validate_positive(ingredient.quantity)
            .map_err(|m| AppError::validation(format!("ingredients[{}].quantity", idx), m))?;

        sqlx::query(
            r#"
            INSERT INTO recipe_ingredients (recipe_id, product_id, quantity, notes)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(recipe_id)
        .bind(ingredient.product_id)
        .bind(ingredient.quantity)
        .bind(&ingredient.notes)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Accepted `ordering` fields and the expressions they sort by
const RECIPE_ORDERING: &[(&str, &str)] = &[
    ("name", "r.name"),
    ("sale_price", "r.sale_price"),
    ("created_at", "r.created_at"),
    ("updated_at", "r.updated_at"),
];

impl RecipeService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn create_recipe(&self, user: &AuthUser, input: CreateRecipeInput) -> AppResult<Recipe> {
        validate_name(&input.name).map_err(|m| AppError::validation("name", m))?;
        validate_non_negative(input.sale_price)
            .map_err(|m| AppError::validation("sale_price", m))?;

        let mut tx = self.db.begin().await?;

        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO recipes (name, description, instructions, sale_price, created_by, is_active)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(input.name.trim())
        .bind(&input.description)
        .bind(&input.instructions)
        .bind(input.sale_price)
        .bind(user.user_id)
        .bind(input.is_active.unwrap_or(true))
        .fetch_one(&mut *tx)
        .await?;

        insert_ingredients(&mut tx, id, &input.ingredients).await?;

        tx.commit().await?;
        self.get_recipe(id).await
    }

    pub async fn get_recipe(&self, id: Uuid) -> AppResult<Recipe> {
        let row = sqlx::query_as::<_, RecipeRow>(&format!("{SELECT_RECIPE} WHERE r.id = $1"))
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Recipe".to_string()))?;

        let ingredients = self.load_ingredients(id).await?;
        Ok(Recipe::assemble(row, ingredients))
    }

    async fn load_ingredients(&self, recipe_id: Uuid) -> AppResult<Vec<IngredientRow>> {
        let ingredients = sqlx::query_as::<_, IngredientRow>(&format!(
            "{SELECT_INGREDIENT} WHERE ri.recipe_id = $1 ORDER BY ri.created_at, ri.id"
        ))
        .bind(recipe_id)
        .fetch_all(&self.db)
        .await?;
        Ok(ingredients)
    }

    pub async fn list_recipes(&self, filter: RecipeFilter) -> AppResult<PaginatedResponse<Recipe>> {
        let pagination = Pagination::new(filter.page, filter.page_size);
        let order_by = super::order_by(filter.ordering.as_deref(), RECIPE_ORDERING, "r.name")?;
        let search = super::like_pattern(filter.search.as_deref());

        const WHERE: &str = r#"
            WHERE ($1::text IS NULL OR r.name ILIKE $1 OR r.description ILIKE $1)
              AND ($2::uuid IS NULL OR EXISTS (
                    SELECT 1 FROM recipe_ingredients ri
                    WHERE ri.recipe_id = r.id AND ri.product_id = $2))
              AND ($3::bool IS NULL OR r.is_active = $3)
        "#;

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM recipes r {WHERE}"))
            .bind(&search)
            .bind(filter.product_id)
            .bind(filter.is_active)
            .fetch_one(&self.db)
            .await?;

        let rows = sqlx::query_as::<_, RecipeRow>(&format!(
            "{SELECT_RECIPE} {WHERE} {order_by} LIMIT $4 OFFSET $5"
        ))
        .bind(&search)
        .bind(filter.product_id)
        .bind(filter.is_active)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        let ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
        let mut by_recipe: HashMap<Uuid, Vec<IngredientRow>> = HashMap::new();
        for ingredient in sqlx::query_as::<_, IngredientRow>(&format!(
            "{SELECT_INGREDIENT} WHERE ri.recipe_id = ANY($1) ORDER BY ri.created_at, ri.id"
        ))
        .bind(&ids)
        .fetch_all(&self.db)
        .await?
        {
            by_recipe
                .entry(ingredient.recipe_id)
                .or_default()
                .push(ingredient);
        }

        let recipes = rows
            .into_iter()
            .map(|row| {
                let ingredients = by_recipe.remove(&row.id).unwrap_or_default();
                Recipe::assemble(row, ingredients)
            })
            .collect();

        Ok(PaginatedResponse::new(recipes, pagination, total as u64))
    }

    pub async fn update_recipe(
        &self,
        user: &AuthUser,
        id: Uuid,
        input: UpdateRecipeInput,
    ) -> AppResult<Recipe> {
        let existing = self.get_recipe(id).await?;
        permissions::owner_or_staff_or_read_only(user, Access::Update, existing.created_by)?;

        let name = input.name.unwrap_or(existing.name);
        validate_name(&name).map_err(|m| AppError::validation("name", m))?;
        let sale_price = input.sale_price.unwrap_or(existing.sale_price);
        validate_non_negative(sale_price).map_err(|m| AppError::validation("sale_price", m))?;

        let mut tx = self.db.begin().await?;

        sqlx::query(
            r#"
            UPDATE recipes
            SET name = $1, description = $2, instructions = $3, sale_price = $4, is_active = $5
            WHERE id = $6
            "#,
        )
        .bind(name.trim())
        .bind(input.description.unwrap_or(existing.description))
        .bind(input.instructions.unwrap_or(existing.instructions))
        .bind(sale_price)
        .bind(input.is_active.unwrap_or(existing.is_active))
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if let Some(ingredients) = input.ingredients {
            sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            insert_ingredients(&mut tx, id, &ingredients).await?;
        }

        tx.commit().await?;
        self.get_recipe(id).await
    }

    pub async fn delete_recipe(&self, user: &AuthUser, id: Uuid) -> AppResult<()> {
        let existing = self.get_recipe(id).await?;
        permissions::owner_or_staff_or_read_only(user, Access::Write, existing.created_by)?;

        sqlx::query("DELETE FROM recipes WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    /// Record a completed usage transaction for the ingredients poured
    ///
    /// Returns the id of the usage transaction.
    pub async fn serve_recipe(
        &self,
        user: &AuthUser,
        id: Uuid,
        input: ServeRecipeInput,
    ) -> AppResult<Uuid> {
        if input.servings == 0 {
            return Err(AppError::validation("servings", "Servings must be at least 1"));
        }

        let recipe = self.get_recipe(id).await?;
        let ingredients = self.load_ingredients(id).await?;

        let costings: Vec<IngredientCosting> =
            ingredients.iter().map(IngredientRow::costing).collect();
        let prices: HashMap<Uuid, Decimal> = ingredients
            .iter()
            .map(|i| (i.product_id, i.unit_price))
            .collect();

        let items: Vec<NewTransactionItem> = servings_usage(&costings, input.servings)
            .into_iter()
            .map(|(product_id, quantity)| NewTransactionItem {
                line: StockLine::new(product_id, input.location_id, -quantity),
                unit_price: prices.get(&product_id).copied().unwrap_or_default(),
                notes: String::new(),
            })
            .collect();

        if items.is_empty() {
            return Err(AppError::validation(
                "ingredients",
                "Recipe has no ingredients to serve",
            ));
        }

        let mut tx = self.db.begin().await?;
        ensure_location(&mut tx, input.location_id, "location_id").await?;
        let transaction_id = record_transaction(
            &mut tx,
            NewTransaction {
                transaction_type: TransactionType::Usage,
                status: TransactionStatus::Completed,
                transaction_date: Utc::now().date_naive(),
                reference: format!("RECIPE-{}", recipe.id.simple()),
                notes: if input.notes.is_empty() {
                    format!("{} x {}", input.servings, recipe.name)
                } else {
                    input.notes
                },
                performed_by: Some(user.user_id),
                items,
            },
        )
        .await?;
        tx.commit().await?;

        tracing::info!(
            recipe_id = %id,
            servings = input.servings,
            location_id = %input.location_id,
            "Recipe served"
        );
        Ok(transaction_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn ingredient(quantity: Decimal, unit_size: Decimal, unit_price: Decimal) -> IngredientRow {
        IngredientRow {
            id: Uuid::new_v4(),
            recipe_id: Uuid::nil(),
            product_id: Uuid::new_v4(),
            product_name: "Gin".to_string(),
            unit_type: UnitType::Bottle,
            unit_size,
            unit_price,
            quantity,
            notes: String::new(),
        }
    }

    #[test]
    fn test_recipe_costing() {
        let row = RecipeRow {
            id: Uuid::new_v4(),
            name: "Negroni".to_string(),
            description: String::new(),
            instructions: String::new(),
            sale_price: dec!(12.00),
            created_by: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let recipe = Recipe::assemble(
            row,
            vec![
                ingredient(dec!(30), dec!(750), dec!(30.00)),
                ingredient(dec!(30), dec!(1000), dec!(28.00)),
                ingredient(dec!(30), dec!(750), dec!(22.50)),
            ],
        );
        // 1.20 + 0.84 + 0.90
        assert_eq!(recipe.cost, dec!(2.94));
        assert_eq!(recipe.pour_cost_percentage, Some(dec!(24.50)));
        assert_eq!(recipe.ingredients[0].cost, dec!(1.20));
    }
}
