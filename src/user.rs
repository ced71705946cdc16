use crate::orm::users;
use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::Utc;
use sea_orm::{entity::*, query::*, DatabaseConnection, DbErr, FromQueryResult, PaginatorTrait};

/// A mini struct for holding only what information we need about a client.
#[derive(Clone, Debug, FromQueryResult)]
pub struct ClientUser {
    pub id: i32,
    pub username: String,
}

/// Public-facing author data for profile pages.
#[derive(Clone, Debug, FromQueryResult)]
pub struct UserProfile {
    pub id: i32,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

impl UserProfile {
    /// Full name when one was given, else the username.
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let full = full.trim();
        if full.is_empty() {
            self.username.to_owned()
        } else {
            full.to_owned()
        }
    }
}

/// Fields accepted from the signup form after validation.
pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub password: &'a str,
}

pub async fn get_client_user_by_id(
    db: &DatabaseConnection,
    id: i32,
) -> Result<Option<ClientUser>, DbErr> {
    users::Entity::find_by_id(id)
        .select_only()
        .column(users::Column::Id)
        .column(users::Column::Username)
        .into_model::<ClientUser>()
        .one(db)
        .await
}

pub async fn get_profile_by_name(
    db: &DatabaseConnection,
    username: &str,
) -> Result<Option<UserProfile>, DbErr> {
    users::Entity::find()
        .select_only()
        .column(users::Column::Id)
        .column(users::Column::Username)
        .column(users::Column::FirstName)
        .column(users::Column::LastName)
        .filter(users::Column::Username.eq(username))
        .into_model::<UserProfile>()
        .one(db)
        .await
}

pub async fn username_taken(db: &DatabaseConnection, username: &str) -> Result<bool, DbErr> {
    Ok(users::Entity::find()
        .filter(users::Column::Username.eq(username))
        .count(db)
        .await?
        > 0)
}

pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &SaltString::generate(&mut OsRng))?
        .to_string())
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            log::warn!("verify_password: stored hash is unreadable: {}", e);
            false
        }
    }
}

pub async fn insert_new_user(
    db: &DatabaseConnection,
    new_user: NewUser<'_>,
) -> Result<users::Model, DbErr> {
    let password =
        hash_password(new_user.password).map_err(|e| DbErr::Custom(format!("argon2: {}", e)))?;

    users::ActiveModel {
        username: Set(new_user.username.to_owned()),
        email: Set(new_user.email.to_owned()),
        first_name: Set(new_user.first_name.to_owned()),
        last_name: Set(new_user.last_name.to_owned()),
        password: Set(password),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default() // all other attributes are `NotSet`
    }
    .insert(db)
    .await
}

/// Returns the user when the name exists and the password matches its hash.
pub async fn authenticate(
    db: &DatabaseConnection,
    username: &str,
    password: &str,
) -> Result<Option<ClientUser>, DbErr> {
    let user = users::Entity::find()
        .filter(users::Column::Username.eq(username))
        .one(db)
        .await?;

    Ok(user
        .filter(|user| verify_password(password, &user.password))
        .map(|user| ClientUser {
            id: user.id,
            username: user.username,
        }))
}
