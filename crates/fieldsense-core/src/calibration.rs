use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;

use crate::db::DbPool;
use crate::error::{Result, StoreError};

const UNIQUE_CONFLICT_MESSAGE: &str = "This username and fieldname combination already exists";
const RECORD_NOT_FOUND_MESSAGE: &str = "Record not found";
const EMPTY_TABLE_MESSAGE: &str = "No soil data found";

/// A persisted calibration row: per-device, per-field min/max thresholds
/// for the six soil parameters. `id` and `created_at` are assigned by the
/// store.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CalibrationRecord {
    pub id: i64,
    pub device_id: String,
    pub username: String,
    pub fieldname: String,
    pub ph_level_min: Option<f64>,
    pub ec_min: Option<f64>,
    pub moisture_min: Option<f64>,
    pub nitrogen_min: Option<f64>,
    pub phosphorous_min: Option<f64>,
    pub potassium_min: Option<f64>,
    pub ph_level_max: Option<f64>,
    pub ec_max: Option<f64>,
    pub moisture_max: Option<f64>,
    pub nitrogen_max: Option<f64>,
    pub phosphorous_max: Option<f64>,
    pub potassium_max: Option<f64>,
    pub created_at: NaiveDateTime,
}

/// The full field set a create or update must supply. Threshold fields are
/// optional; an absent or non-numeric value is stored as NULL, while an
/// explicit zero is kept as zero.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CalibrationInput {
    pub device_id: String,
    pub username: String,
    pub fieldname: String,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub ph_level_min: Option<f64>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub ec_min: Option<f64>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub moisture_min: Option<f64>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub nitrogen_min: Option<f64>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub phosphorous_min: Option<f64>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub potassium_min: Option<f64>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub ph_level_max: Option<f64>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub ec_max: Option<f64>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub moisture_max: Option<f64>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub nitrogen_max: Option<f64>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub phosphorous_max: Option<f64>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub potassium_max: Option<f64>,
}

impl CalibrationInput {
    fn validate(&self) -> Result<()> {
        for (value, field) in [
            (&self.device_id, "device_id"),
            (&self.username, "username"),
            (&self.fieldname, "fieldname"),
        ] {
            if value.trim().is_empty() {
                return Err(StoreError::Validation(format!("{field} is required")));
            }
        }
        Ok(())
    }
}

/// Accept a JSON number, a decimal string, or null; anything else (and any
/// string that does not parse as a decimal) collapses to NULL rather than
/// failing the request.
fn lenient_decimal<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
        Other(serde_json::Value),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        None => None,
        Some(Raw::Number(n)) if n.is_finite() => Some(n),
        Some(Raw::Number(_)) => None,
        Some(Raw::Text(s)) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        Some(Raw::Other(_)) => None,
    })
}

pub async fn create_calibration(pool: &DbPool, input: &CalibrationInput) -> Result<CalibrationRecord> {
    input.validate()?;

    let record = sqlx::query_as::<_, CalibrationRecord>(
        r#"
        INSERT INTO soil_data (
            device_id, username, fieldname,
            ph_level_min, ec_min, moisture_min,
            nitrogen_min, phosphorous_min, potassium_min,
            ph_level_max, ec_max, moisture_max,
            nitrogen_max, phosphorous_max, potassium_max
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(&input.device_id)
    .bind(&input.username)
    .bind(&input.fieldname)
    .bind(input.ph_level_min)
    .bind(input.ec_min)
    .bind(input.moisture_min)
    .bind(input.nitrogen_min)
    .bind(input.phosphorous_min)
    .bind(input.potassium_min)
    .bind(input.ph_level_max)
    .bind(input.ec_max)
    .bind(input.moisture_max)
    .bind(input.nitrogen_max)
    .bind(input.phosphorous_max)
    .bind(input.potassium_max)
    .fetch_one(pool)
    .await
    .map_err(|err| StoreError::from_query(err, UNIQUE_CONFLICT_MESSAGE))?;

    tracing::debug!(id = record.id, username = %record.username, "calibration record created");
    Ok(record)
}

/// Every record in insertion order. An empty table is reported as a
/// not-found error; callers that can tolerate emptiness filter over the
/// delete operation's remaining-set instead.
pub async fn list_calibrations(pool: &DbPool) -> Result<Vec<CalibrationRecord>> {
    let records = fetch_all_records(pool).await?;
    if records.is_empty() {
        return Err(StoreError::NotFound(EMPTY_TABLE_MESSAGE.to_string()));
    }
    Ok(records)
}

/// Full-field replace of an existing record. The caller supplies every
/// field, not a delta.
pub async fn update_calibration(
    pool: &DbPool,
    id: i64,
    input: &CalibrationInput,
) -> Result<CalibrationRecord> {
    input.validate()?;
    ensure_record_exists(pool, id).await?;

    let record = sqlx::query_as::<_, CalibrationRecord>(
        r#"
        UPDATE soil_data SET
            device_id = ?,
            username = ?,
            fieldname = ?,
            ph_level_min = ?,
            ec_min = ?,
            moisture_min = ?,
            nitrogen_min = ?,
            phosphorous_min = ?,
            potassium_min = ?,
            ph_level_max = ?,
            ec_max = ?,
            moisture_max = ?,
            nitrogen_max = ?,
            phosphorous_max = ?,
            potassium_max = ?
        WHERE id = ?
        RETURNING *
        "#,
    )
    .bind(&input.device_id)
    .bind(&input.username)
    .bind(&input.fieldname)
    .bind(input.ph_level_min)
    .bind(input.ec_min)
    .bind(input.moisture_min)
    .bind(input.nitrogen_min)
    .bind(input.phosphorous_min)
    .bind(input.potassium_min)
    .bind(input.ph_level_max)
    .bind(input.ec_max)
    .bind(input.moisture_max)
    .bind(input.nitrogen_max)
    .bind(input.phosphorous_max)
    .bind(input.potassium_max)
    .bind(id)
    .fetch_one(pool)
    .await
    .map_err(|err| StoreError::from_query(err, UNIQUE_CONFLICT_MESSAGE))?;

    Ok(record)
}

/// Remove a record and return the remaining full set, so callers can
/// refresh their view without a second round trip. The remaining set may
/// be empty.
pub async fn delete_calibration(pool: &DbPool, id: i64) -> Result<Vec<CalibrationRecord>> {
    ensure_record_exists(pool, id).await?;

    sqlx::query("DELETE FROM soil_data WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    tracing::debug!(id, "calibration record deleted");
    fetch_all_records(pool).await
}

async fn fetch_all_records(pool: &DbPool) -> Result<Vec<CalibrationRecord>> {
    let records = sqlx::query_as::<_, CalibrationRecord>("SELECT * FROM soil_data ORDER BY id")
        .fetch_all(pool)
        .await?;
    Ok(records)
}

async fn ensure_record_exists(pool: &DbPool, id: i64) -> Result<()> {
    let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM soil_data WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    match existing {
        Some(_) => Ok(()),
        None => Err(StoreError::NotFound(RECORD_NOT_FOUND_MESSAGE.to_string())),
    }
}
