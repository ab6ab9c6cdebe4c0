//! Settings database access
//!
//! Key/value settings read into `EngineSettings`. Missing or NULL keys are
//! written back with the built-in defaults.

use crate::config::{EngineSettings, UnlockProvider};
use crate::error::{Error, Result};
use sqlx::{Pool, Sqlite};
use std::str::FromStr;
use tracing::{info, warn};

/// Generic setting getter
pub async fn get_setting<T: FromStr>(db: &Pool<Sqlite>, key: &str) -> Result<Option<T>> {
    let value: Option<Option<String>> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(db)
        .await?;

    match value.flatten() {
        Some(s) => match s.parse::<T>() {
            Ok(parsed) => Ok(Some(parsed)),
            Err(_) => Err(Error::Config(format!(
                "Failed to parse setting '{}' value: {}",
                key, s
            ))),
        },
        None => Ok(None),
    }
}

/// Generic setting setter (insert or update)
pub async fn set_setting<T: ToString>(db: &Pool<Sqlite>, key: &str, value: T) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO settings (key, value)
        VALUES (?, ?)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value
        "#,
    )
    .bind(key)
    .bind(value.to_string())
    .execute(db)
    .await?;

    Ok(())
}

/// Read a setting, writing `default` back when it is missing or unparsable
async fn setting_or_default<T>(db: &Pool<Sqlite>, key: &str, default: T) -> Result<T>
where
    T: FromStr + ToString + Clone,
{
    match get_setting::<T>(db, key).await {
        Ok(Some(value)) => Ok(value),
        Ok(None) => {
            set_setting(db, key, default.clone()).await?;
            info!("Initialized setting '{}' with default value: {}", key, default.to_string());
            Ok(default)
        }
        Err(Error::Config(msg)) => {
            warn!("{} (resetting to default)", msg);
            set_setting(db, key, default.clone()).await?;
            Ok(default)
        }
        Err(e) => Err(e),
    }
}

fn providers_to_string(providers: &[UnlockProvider]) -> String {
    providers
        .iter()
        .map(UnlockProvider::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

fn parse_providers(value: &str) -> Option<Vec<UnlockProvider>> {
    value
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.parse::<UnlockProvider>().ok())
        .collect()
}

/// Load all engine settings
pub async fn load_engine_settings(db: &Pool<Sqlite>) -> Result<EngineSettings> {
    let d = EngineSettings::default();

    let providers_default = providers_to_string(&d.unlock_providers);
    let providers_raw = setting_or_default(db, "unlock_providers", providers_default).await?;
    let unlock_providers = match parse_providers(&providers_raw) {
        Some(list) => list,
        None => {
            warn!("Invalid unlock_providers '{}' (using defaults)", providers_raw);
            d.unlock_providers.clone()
        }
    };

    Ok(EngineSettings {
        fade_enabled: setting_or_default(db, "fade_enabled", d.fade_enabled).await?,
        fade_time_ms: setting_or_default(db, "fade_time_ms", d.fade_time_ms).await?,
        allow_trial_playback: setting_or_default(db, "allow_trial_playback", d.allow_trial_playback).await?,
        unlock_enabled: setting_or_default(db, "unlock_enabled", d.unlock_enabled).await?,
        unlock_providers,
        song_level: setting_or_default(db, "song_level", d.song_level.clone()).await?,
        karaoke_lyrics: setting_or_default(db, "karaoke_lyrics", d.karaoke_lyrics).await?,
        taskbar_progress: setting_or_default(db, "taskbar_progress", d.taskbar_progress).await?,
        high_quality_cover: setting_or_default(db, "high_quality_cover", d.high_quality_cover).await?,
        tick_interval_ms: setting_or_default(db, "tick_interval_ms", d.tick_interval_ms).await?,
        max_retries: setting_or_default(db, "max_retries", d.max_retries).await?,
        restore_guard_secs: setting_or_default(db, "restore_guard_secs", d.restore_guard_secs).await?,
        volume: setting_or_default(db, "volume", d.volume).await?.clamp(0.0, 1.0),
        rate: setting_or_default(db, "rate", d.rate).await?,
        volume_step: setting_or_default(db, "volume_step", d.volume_step).await?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init::init_schema;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup_test_db() -> Pool<Sqlite> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        init_schema(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn test_get_set_setting() {
        let db = setup_test_db().await;
        assert_eq!(get_setting::<u64>(&db, "fade_time_ms").await.unwrap(), None);
        set_setting(&db, "fade_time_ms", 900u64).await.unwrap();
        assert_eq!(get_setting::<u64>(&db, "fade_time_ms").await.unwrap(), Some(900));
        set_setting(&db, "fade_time_ms", 100u64).await.unwrap();
        assert_eq!(get_setting::<u64>(&db, "fade_time_ms").await.unwrap(), Some(100));
    }

    #[tokio::test]
    async fn test_unparsable_setting_is_config_error() {
        let db = setup_test_db().await;
        set_setting(&db, "max_retries", "many").await.unwrap();
        assert!(matches!(
            get_setting::<u32>(&db, "max_retries").await,
            Err(Error::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_load_writes_back_defaults() {
        let db = setup_test_db().await;
        let settings = load_engine_settings(&db).await.unwrap();
        assert_eq!(settings, EngineSettings::default());

        let stored: Option<String> = get_setting(&db, "unlock_providers").await.unwrap();
        assert_eq!(stored.as_deref(), Some("netease,kuwo"));
    }

    #[tokio::test]
    async fn test_load_respects_stored_values() {
        let db = setup_test_db().await;
        set_setting(&db, "fade_enabled", false).await.unwrap();
        set_setting(&db, "unlock_providers", "kuwo").await.unwrap();
        set_setting(&db, "volume", 3.0f32).await.unwrap();
        set_setting(&db, "max_retries", "bogus").await.unwrap();

        let settings = load_engine_settings(&db).await.unwrap();
        assert!(!settings.fade_enabled);
        assert_eq!(settings.unlock_providers, vec![UnlockProvider::Kuwo]);
        assert_eq!(settings.volume, 1.0);
        assert_eq!(settings.max_retries, 5);
    }
}
