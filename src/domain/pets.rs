//! Pet domain - pets and their translations

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Executor, Postgres};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Pet {
    pub id: i64,
    #[serde(rename = "userId")]
    pub user_id: i64,
    pub name: String,
    #[serde(rename = "petType")]
    pub pet_type: String,
    pub gender: Option<String>,
    #[serde(rename = "profileImage")]
    pub profile_image: Option<String>,
    #[serde(rename = "voiceUrl")]
    pub voice_url: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Translation {
    pub id: i64,
    #[serde(rename = "petId")]
    pub pet_id: i64,
    pub text: String,
    pub label: Option<String>,
    #[serde(rename = "languageCode")]
    pub language_code: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

pub struct NewPet<'a> {
    pub user_id: i64,
    pub name: &'a str,
    pub pet_type: &'a str,
    pub gender: Option<&'a str>,
    pub profile_image: Option<&'a str>,
    pub voice_url: Option<&'a str>,
}

const PET_COLUMNS: &str = "id, user_id, name, pet_type, gender, profile_image, voice_url, created_at";

pub async fn create_pet<'e, E>(executor: E, pet: &NewPet<'_>) -> Result<Pet, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(&format!(
        r#"
        INSERT INTO pets (user_id, name, pet_type, gender, profile_image, voice_url)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {}
        "#,
        PET_COLUMNS
    ))
    .bind(pet.user_id)
    .bind(pet.name)
    .bind(pet.pet_type)
    .bind(pet.gender)
    .bind(pet.profile_image)
    .bind(pet.voice_url)
    .fetch_one(executor)
    .await
}

pub async fn get_pet<'e, E>(executor: E, id: i64) -> Result<Option<Pet>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(&format!("SELECT {} FROM pets WHERE id = $1", PET_COLUMNS))
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// Partial update: None keeps the current column value.
pub async fn update_pet<'e, E>(
    executor: E,
    id: i64,
    name: Option<&str>,
    pet_type: Option<&str>,
    gender: Option<&str>,
    profile_image: Option<&str>,
    voice_url: Option<&str>,
) -> Result<Option<Pet>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(&format!(
        r#"
        UPDATE pets
        SET name = COALESCE($2, name),
            pet_type = COALESCE($3, pet_type),
            gender = COALESCE($4, gender),
            profile_image = COALESCE($5, profile_image),
            voice_url = COALESCE($6, voice_url)
        WHERE id = $1
        RETURNING {}
        "#,
        PET_COLUMNS
    ))
    .bind(id)
    .bind(name)
    .bind(pet_type)
    .bind(gender)
    .bind(profile_image)
    .bind(voice_url)
    .fetch_optional(executor)
    .await
}

/// Delete a pet; translations go with it via ON DELETE CASCADE.
pub async fn delete_pet<'e, E>(executor: E, id: i64) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query("DELETE FROM pets WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn create_translation<'e, E>(
    executor: E,
    pet_id: i64,
    text: &str,
    label: Option<&str>,
    language_code: &str,
) -> Result<Translation, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        INSERT INTO translations (pet_id, text, label, language_code)
        VALUES ($1, $2, $3, $4)
        RETURNING id, pet_id, text, label, language_code, created_at
        "#,
    )
    .bind(pet_id)
    .bind(text)
    .bind(label)
    .bind(language_code)
    .fetch_one(executor)
    .await
}

pub async fn get_translation<'e, E>(
    executor: E,
    id: i64,
) -> Result<Option<Translation>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        "SELECT id, pet_id, text, label, language_code, created_at FROM translations WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub async fn delete_translation<'e, E>(executor: E, id: i64) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query("DELETE FROM translations WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// All translations for a pet, newest first.
pub async fn list_translations<'e, E>(
    executor: E,
    pet_id: i64,
) -> Result<Vec<Translation>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        SELECT id, pet_id, text, label, language_code, created_at
        FROM translations
        WHERE pet_id = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(pet_id)
    .fetch_all(executor)
    .await
}
