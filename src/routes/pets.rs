//! Pet CRUD, translations, and the AI proxy endpoints (/pets/*)

use axum::{
    Json, Router,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::AppState;
use crate::domain::pets::{self, NewPet, Pet, Translation};
use crate::quiz::{self, QuizQuestion};
use crate::services::auth::AuthUser;
use crate::services::error::{LogErr, OrNotFound};
use crate::services::tts;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/pets", post(create_pet))
        .route("/pets/{id}", post(update_pet).get(get_pet).delete(remove_pet))
        .route("/pets/create/translation", post(create_translation))
        .route(
            "/pets/{id}/translation",
            get(get_translation).delete(remove_translation),
        )
        .route("/pets/{id}/translations", get(list_translations))
        .route("/pets/chat", post(chat))
        .route("/pets/generate/suggestion", post(generate_suggestion))
        .route("/pets/analyse/image", post(analyse_image))
        .route("/pets/transcribe/audio", post(transcribe_audio))
        .route("/pets/quiz", get(get_quiz))
}

/// Fields collected from a pet create/update multipart form
#[derive(Default)]
struct PetForm {
    name: Option<String>,
    pet_type: Option<String>,
    gender: Option<String>,
    voice_url: Option<String>,
    profile_image: Option<(String, Vec<u8>, String)>, // (filename, bytes, content type)
}

async fn read_pet_form(mut multipart: Multipart) -> Result<PetForm, StatusCode> {
    let mut form = PetForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .log_status("Multipart read error", StatusCode::BAD_REQUEST)?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "profileImageFile" => {
                let file_name = field.file_name().unwrap_or("profile").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .log_status("Multipart file error", StatusCode::BAD_REQUEST)?;
                form.profile_image = Some((file_name, bytes.to_vec(), content_type));
            }
            "name" => form.name = Some(read_text(field).await?),
            "petType" => form.pet_type = Some(read_text(field).await?),
            "gender" => form.gender = Some(read_text(field).await?),
            "voiceUrl" => form.voice_url = Some(read_text(field).await?),
            _ => {}
        }
    }

    Ok(form)
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String, StatusCode> {
    field
        .text()
        .await
        .log_status("Multipart field error", StatusCode::BAD_REQUEST)
}

/// Upload the profile image when present, returning its public URL
async fn upload_profile_image(
    state: &AppState,
    image: Option<(String, Vec<u8>, String)>,
) -> Result<Option<String>, StatusCode> {
    match image {
        Some((file_name, bytes, content_type)) => {
            let url = state
                .storage
                .upload(&bytes, &content_type, &file_name)
                .await
                .log_500("Profile image upload error")?;
            Ok(Some(url))
        }
        None => Ok(None),
    }
}

/// POST /pets - create a pet (multipart, optional profileImageFile)
async fn create_pet(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    multipart: Multipart,
) -> Result<Json<Pet>, StatusCode> {
    let form = read_pet_form(multipart).await?;
    let name = form.name.ok_or(StatusCode::BAD_REQUEST)?;
    let pet_type = form.pet_type.ok_or(StatusCode::BAD_REQUEST)?;
    let profile_image = upload_profile_image(&state, form.profile_image).await?;

    let pet = pets::create_pet(
        &state.db,
        &NewPet {
            user_id,
            name: &name,
            pet_type: &pet_type,
            gender: form.gender.as_deref(),
            profile_image: profile_image.as_deref(),
            voice_url: form.voice_url.as_deref(),
        },
    )
    .await
    .log_500("Create pet error")?;

    Ok(Json(pet))
}

/// POST /pets/:id - partial update (multipart, optional profileImageFile)
async fn update_pet(
    State(state): State<Arc<AppState>>,
    AuthUser(_user_id): AuthUser,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> Result<Json<Pet>, StatusCode> {
    let form = read_pet_form(multipart).await?;
    let profile_image = upload_profile_image(&state, form.profile_image).await?;

    let pet = pets::update_pet(
        &state.db,
        id,
        form.name.as_deref(),
        form.pet_type.as_deref(),
        form.gender.as_deref(),
        profile_image.as_deref(),
        form.voice_url.as_deref(),
    )
    .await
    .log_500("Update pet error")?
    .or_404()?;

    Ok(Json(pet))
}

#[derive(Serialize)]
struct PetWithTranslations {
    #[serde(flatten)]
    pet: Pet,
    translations: Vec<Translation>,
}

/// GET /pets/:id - pet with its translations
async fn get_pet(
    State(state): State<Arc<AppState>>,
    AuthUser(_user_id): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<PetWithTranslations>, StatusCode> {
    let pet = pets::get_pet(&state.db, id)
        .await
        .log_500("Get pet error")?
        .or_404()?;
    let translations = pets::list_translations(&state.db, id)
        .await
        .log_500("List translations error")?;

    Ok(Json(PetWithTranslations { pet, translations }))
}

/// DELETE /pets/:id
async fn remove_pet(
    State(state): State<Arc<AppState>>,
    AuthUser(_user_id): AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, StatusCode> {
    let deleted = pets::delete_pet(&state.db, id)
        .await
        .log_500("Delete pet error")?;
    if !deleted {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct TranslationRequest {
    #[serde(rename = "petId")]
    pet_id: i64,
    text: String,
    label: Option<String>,
    #[serde(rename = "languageCode")]
    language_code: String,
}

/// POST /pets/create/translation
async fn create_translation(
    State(state): State<Arc<AppState>>,
    AuthUser(_user_id): AuthUser,
    Json(req): Json<TranslationRequest>,
) -> Result<Json<Translation>, StatusCode> {
    let translation = pets::create_translation(
        &state.db,
        req.pet_id,
        &req.text,
        req.label.as_deref(),
        &req.language_code,
    )
    .await
    .log_500("Create translation error")?;

    Ok(Json(translation))
}

/// GET /pets/:id/translation - single translation by id
async fn get_translation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Translation>, StatusCode> {
    let translation = pets::get_translation(&state.db, id)
        .await
        .log_500("Get translation error")?
        .or_404()?;
    Ok(Json(translation))
}

/// DELETE /pets/:id/translation
async fn remove_translation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, StatusCode> {
    let deleted = pets::delete_translation(&state.db, id)
        .await
        .log_500("Delete translation error")?;
    if !deleted {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(StatusCode::NO_CONTENT)
}

/// GET /pets/:id/translations - all translations for a pet, newest first
async fn list_translations(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Translation>>, StatusCode> {
    let translations = pets::list_translations(&state.db, id)
        .await
        .log_500("List translations error")?;
    Ok(Json(translations))
}

#[derive(Deserialize)]
struct ChatRequest {
    text: String,
    #[serde(rename = "isPetExpert")]
    is_pet_expert: Option<bool>,
}

#[derive(Serialize)]
struct MessageResponse {
    message: String,
}

/// POST /pets/chat - free-form chat with the pet expert persona
async fn chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<MessageResponse>, StatusCode> {
    let message = state
        .ai
        .chat(&req.text, req.is_pet_expert.unwrap_or(false))
        .await
        .log_500("Chat error")?;

    Ok(Json(MessageResponse { message }))
}

#[derive(Deserialize)]
struct SuggestionRequest {
    text: String,
    #[serde(rename = "languageCode")]
    language_code: String,
}

#[derive(Serialize)]
struct SuggestionResponse {
    text: String,
    speech: String,
}

/// POST /pets/generate/suggestion - refine text, synthesize speech,
/// upload the MP3 and return its public URL alongside the text.
async fn generate_suggestion(
    State(state): State<Arc<AppState>>,
    AuthUser(_user_id): AuthUser,
    Json(req): Json<SuggestionRequest>,
) -> Result<Json<SuggestionResponse>, StatusCode> {
    let refined = state
        .ai
        .refine_text(&req.text, &req.language_code)
        .await
        .log_500("Refine text error")?;

    let audio = tts::synthesize(&state.http, &refined, &req.language_code)
        .await
        .log_500("TTS error")?;

    let speech = state
        .storage
        .upload(&audio, "audio/mpeg", "suggestion.mp3")
        .await
        .log_500("Speech upload error")?;

    Ok(Json(SuggestionResponse {
        text: refined,
        speech,
    }))
}

/// POST /pets/analyse/image - vision chat over an uploaded image
async fn analyse_image(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<MessageResponse>, StatusCode> {
    let mut prompt: Option<String> = None;
    let mut image: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .log_status("Multipart read error", StatusCode::BAD_REQUEST)?
    {
        match field.name().unwrap_or_default() {
            "imageFile" => {
                let file_name = field.file_name().unwrap_or("image.png").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .log_status("Multipart file error", StatusCode::BAD_REQUEST)?;
                image = Some((file_name, bytes.to_vec()));
            }
            "text" => prompt = Some(read_text(field).await?),
            _ => {}
        }
    }

    let (file_name, bytes) = image.ok_or(StatusCode::BAD_REQUEST)?;
    let data_url = image_data_url(&file_name, &bytes);

    let message = state
        .ai
        .analyse_image(&data_url, prompt.as_deref())
        .await
        .log_500("Analyse image error")?;

    Ok(Json(MessageResponse { message }))
}

/// Inline an uploaded image as a base64 data URL for the vision endpoint
fn image_data_url(file_name: &str, bytes: &[u8]) -> String {
    let extension = file_name.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("png");
    format!(
        "data:image/{};base64,{}",
        extension,
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

#[derive(Serialize)]
struct TranscriptionResponse {
    transcribed_text: String,
}

/// POST /pets/transcribe/audio - whisper transcription of an uploaded file
async fn transcribe_audio(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<TranscriptionResponse>, StatusCode> {
    let mut audio: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .log_status("Multipart read error", StatusCode::BAD_REQUEST)?
    {
        if field.name() == Some("audioFile") {
            let file_name = field.file_name().unwrap_or("audio.m4a").to_string();
            let bytes = field
                .bytes()
                .await
                .log_status("Multipart file error", StatusCode::BAD_REQUEST)?;
            audio = Some((file_name, bytes.to_vec()));
        }
    }

    let (file_name, bytes) = audio.ok_or(StatusCode::BAD_REQUEST)?;
    let transcribed_text = state
        .ai
        .transcribe(&file_name, bytes)
        .await
        .log_500("Transcription error")?;

    Ok(Json(TranscriptionResponse { transcribed_text }))
}

#[derive(Deserialize)]
struct QuizParams {
    #[serde(rename = "petType")]
    pet_type: String,
}

/// GET /pets/quiz?petType=cat|dog - random quiz draw
async fn get_quiz(Query(params): Query<QuizParams>) -> Result<Json<Vec<QuizQuestion>>, StatusCode> {
    let pet_type = quiz::PetType::parse(&params.pet_type).ok_or(StatusCode::BAD_REQUEST)?;
    Ok(Json(quiz::draw(pet_type)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_data_url_uses_extension() {
        let url = image_data_url("photo.jpeg", &[1, 2, 3]);
        assert!(url.starts_with("data:image/jpeg;base64,"));
    }

    #[test]
    fn test_image_data_url_defaults_extension() {
        let url = image_data_url("noext", &[1]);
        assert!(url.starts_with("data:image/png;base64,"));
    }
}
