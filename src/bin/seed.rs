use anyhow::Context;
use chrono::Utc;
use ecomm_api::{
    db::{OrmConn, create_pool, orm_from_pool, run_migrations},
    entity::{collections, products, users},
    models::Role,
    utils::password::hash_password,
};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;

    let pool = create_pool(&database_url, 2).await?;
    run_migrations(&pool).await?;
    let orm = orm_from_pool(pool);

    let admin_id = ensure_user(&orm, "Admin", "admin@example.com", "admin1234", Role::Admin).await?;
    let user_id = ensure_user(&orm, "Shopper", "user@example.com", "user12345", Role::User).await?;
    seed_catalogue(&orm).await?;

    println!("Seed completed. Admin ID: {admin_id}, User ID: {user_id}");
    Ok(())
}

async fn ensure_user(
    orm: &OrmConn,
    name: &str,
    email: &str,
    password: &str,
    role: Role,
) -> anyhow::Result<Uuid> {
    let existing = users::Entity::find()
        .filter(users::Column::Email.eq(email))
        .one(orm)
        .await?;

    let user = match existing {
        Some(user) => {
            let mut active: users::ActiveModel = user.into();
            active.role = Set(role.as_str().to_string());
            active.update(orm).await?
        }
        None => {
            let now = Utc::now();
            users::ActiveModel {
                id: Set(Uuid::new_v4()),
                name: Set(name.to_string()),
                email: Set(email.to_string()),
                password_hash: Set(hash_password(password)?),
                role: Set(role.as_str().to_string()),
                forgot_password_token: Set(None),
                forgot_password_expiry: Set(None),
                created_at: Set(now.into()),
                updated_at: Set(now.into()),
            }
            .insert(orm)
            .await?
        }
    };

    println!("Ensured user {email} (role={role})");
    Ok(user.id)
}

async fn ensure_collection(orm: &OrmConn, name: &str) -> anyhow::Result<Uuid> {
    if let Some(found) = collections::Entity::find()
        .filter(collections::Column::Name.eq(name))
        .one(orm)
        .await?
    {
        return Ok(found.id);
    }

    let now = Utc::now();
    let created = collections::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(orm)
    .await?;
    Ok(created.id)
}

async fn seed_catalogue(orm: &OrmConn) -> anyhow::Result<()> {
    let apparel = ensure_collection(orm, "Apparel").await?;
    let accessories = ensure_collection(orm, "Accessories").await?;

    let catalogue = [
        ("Axum Hoodie", "Warm hoodie for Rustaceans", 550000, 50, apparel),
        ("Crab Tee", "Soft cotton tee", 150000, 120, apparel),
        ("Ferris Mug", "Coffee tastes better with Ferris", 120000, 100, accessories),
        ("Sticker Pack", "Decorate your laptop", 50000, 200, accessories),
    ];

    for (name, description, price, stock, collection_id) in catalogue {
        let exists = products::Entity::find()
            .filter(products::Column::Name.eq(name))
            .one(orm)
            .await?
            .is_some();
        if exists {
            continue;
        }

        let now = Utc::now();
        products::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            price: Set(price),
            description: Set(Some(description.to_string())),
            photos: Set(products::Photos::default()),
            stock: Set(stock),
            sold: Set(0),
            collection_id: Set(Some(collection_id)),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(orm)
        .await?;
    }

    println!("Seeded collections and products");
    Ok(())
}
