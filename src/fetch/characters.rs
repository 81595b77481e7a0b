use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::models::{CharacterRecord, Role};

use super::CharacterSource;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiCharacter {
    name: Option<String>,
    house: Option<String>,
    species: Option<String>,
    patronus: Option<String>,
    gender: Option<String>,
    #[serde(default)]
    hogwarts_student: Option<bool>,
    #[serde(default)]
    hogwarts_staff: Option<bool>,
    year_of_birth: Option<i64>,
    #[serde(rename = "alternate_names", default)]
    alternate_names: Option<Vec<String>>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl ApiCharacter {
    fn into_record(self) -> Option<CharacterRecord> {
        let name = non_empty(self.name)?;
        Some(CharacterRecord {
            name,
            house: non_empty(self.house),
            species: non_empty(self.species),
            role: Role::from_flags(
                self.hogwarts_student.unwrap_or(false),
                self.hogwarts_staff.unwrap_or(false),
            ),
            patronus: non_empty(self.patronus),
            gender: non_empty(self.gender),
            year_of_birth: self.year_of_birth,
            alternate_names: self
                .alternate_names
                .unwrap_or_default()
                .into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        })
    }
}

/// Validates the character catalog, dropping entries without a name.
fn records_from(raw: Vec<ApiCharacter>) -> Vec<CharacterRecord> {
    raw.into_iter().filter_map(ApiCharacter::into_record).collect()
}

pub struct HpApiClient {
    client: Client,
    url: String,
}

impl HpApiClient {
    pub fn new(url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("hp-tube/0.1")
            .build()?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl CharacterSource for HpApiClient {
    async fn fetch_characters(&self) -> Result<Vec<CharacterRecord>> {
        let response = self.client.get(&self.url).send().await?;

        if !response.status().is_success() {
            return Err(AppError::CharacterApi(format!(
                "HTTP {} from {}",
                response.status(),
                self.url
            )));
        }

        let raw: Vec<ApiCharacter> = response.json().await?;
        let characters = records_from(raw);
        tracing::debug!("Fetched {} characters from {}", characters.len(), self.url);
        Ok(characters)
    }
}
