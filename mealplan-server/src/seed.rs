//! Sample data and the default account
//!
//! `seed_database` replaces all content with the demo catalog; the server
//! calls `ensure_default_admin` at startup so a fresh install can log in.

use mealplan_common::password::hash_password;
use mealplan_common::Result;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::db::users;

pub const DEFAULT_USERNAME: &str = "admin";
pub const DEFAULT_PASSWORD: &str = "admin123";

/// Demo categories: (name, color)
const SEED_CATEGORIES: [(&str, &str); 4] = [
    ("Breakfast Foods", "#FF6B6B"),
    ("Main Dishes", "#4ECDC4"),
    ("Desserts", "#FFE66D"),
    ("Snacks", "#95E1D3"),
];

struct SeedMeal {
    title: &'static str,
    category: &'static str,
    rating: i64,
    recipe: &'static str,
}

const SEED_MEALS: [SeedMeal; 8] = [
    SeedMeal {
        title: "Classic Pancakes",
        category: "Breakfast Foods",
        rating: 5,
        recipe: "Mix flour, eggs, milk, and sugar. Cook on a griddle until golden brown on both sides. Serve with maple syrup and fresh berries.",
    },
    SeedMeal {
        title: "Scrambled Eggs",
        category: "Breakfast Foods",
        rating: 4,
        recipe: "Whisk eggs with a splash of milk. Cook in a buttered pan over medium heat, stirring gently until fluffy and cooked through.",
    },
    SeedMeal {
        title: "Grilled Chicken",
        category: "Main Dishes",
        rating: 5,
        recipe: "Season chicken breast with herbs and spices. Grill for 6-7 minutes per side until internal temperature reaches 165°F.",
    },
    SeedMeal {
        title: "Spaghetti Carbonara",
        category: "Main Dishes",
        rating: 5,
        recipe: "Cook pasta al dente. Mix with eggs, parmesan, crispy bacon, and pasta water for a creamy sauce. Season with black pepper.",
    },
    SeedMeal {
        title: "Vegetable Stir Fry",
        category: "Main Dishes",
        rating: 4,
        recipe: "Stir fry mixed vegetables in sesame oil with garlic and ginger. Add soy sauce and serve over rice.",
    },
    SeedMeal {
        title: "Chocolate Cake",
        category: "Desserts",
        rating: 5,
        recipe: "Mix dry ingredients, add wet ingredients, bake at 350°F for 30-35 minutes. Frost with chocolate ganache when cooled.",
    },
    SeedMeal {
        title: "Fresh Fruit Salad",
        category: "Desserts",
        rating: 4,
        recipe: "Chop fresh seasonal fruits (strawberries, blueberries, mango, kiwi). Toss with honey and a squeeze of lime juice.",
    },
    SeedMeal {
        title: "Trail Mix",
        category: "Snacks",
        rating: 4,
        recipe: "Mix nuts, dried fruits, dark chocolate chips, and seeds. Store in an airtight container for a quick snack.",
    },
];

/// Counts of what `seed_database` inserted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub users: usize,
    pub categories: usize,
    pub meals: usize,
}

/// Clear every table and insert the demo user, categories and meals
///
/// Runs in one transaction; on failure the previous content is kept.
pub async fn seed_database(pool: &SqlitePool) -> Result<SeedSummary> {
    let password_hash = hash_password(DEFAULT_PASSWORD)?;
    let mut tx = pool.begin().await?;

    for table in ["planned_meals", "weekly_plans", "meals", "categories", "users"] {
        sqlx::query(&format!("DELETE FROM {table}"))
            .execute(&mut *tx)
            .await?;
    }

    sqlx::query("INSERT INTO users (username, password_hash) VALUES (?, ?)")
        .bind(DEFAULT_USERNAME)
        .bind(&password_hash)
        .execute(&mut *tx)
        .await?;

    let mut category_ids = Vec::with_capacity(SEED_CATEGORIES.len());
    for (name, color) in SEED_CATEGORIES {
        let id = sqlx::query("INSERT INTO categories (name, color) VALUES (?, ?)")
            .bind(name)
            .bind(color)
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();
        category_ids.push((name, id));
    }

    for meal in &SEED_MEALS {
        let category_id = category_ids
            .iter()
            .find(|(name, _)| *name == meal.category)
            .map(|(_, id)| *id);
        sqlx::query(
            "INSERT INTO meals (title, category_id, rating, image_url, recipe_text) VALUES (?, ?, ?, NULL, ?)",
        )
        .bind(meal.title)
        .bind(category_id)
        .bind(meal.rating)
        .bind(meal.recipe)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    let summary = SeedSummary {
        users: 1,
        categories: SEED_CATEGORIES.len(),
        meals: SEED_MEALS.len(),
    };
    info!(
        "Seeded database: {} user, {} categories, {} meals",
        summary.users, summary.categories, summary.meals
    );
    Ok(summary)
}

/// Create the default account when the database has no users
///
/// Returns true when the account was created.
pub async fn ensure_default_admin(pool: &SqlitePool) -> Result<bool> {
    if users::count_users(pool).await? > 0 {
        return Ok(false);
    }

    let password = DEFAULT_PASSWORD.to_string();
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| mealplan_common::Error::Internal(format!("Hashing task failed: {e}")))??;
    users::create_user(pool, DEFAULT_USERNAME, &password_hash).await?;

    warn!(
        "No users found; created '{}' with the default password. Change it after logging in.",
        DEFAULT_USERNAME
    );
    Ok(true)
}
