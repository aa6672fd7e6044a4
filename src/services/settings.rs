//! Settings service: option lists, toggles and the reference generator

use std::time::Duration;

use crate::{
    config::InventoryConfig,
    error::{AppError, AppResult},
    models::{
        session::Session,
        settings::{ConfigurableOption, InventorySettings, OptionInput, OptionList, UpdateOption, UpdateSettings},
    },
    repository::Repository,
};

use super::events::{ChangeFeed, InventoryEvent};

#[derive(Clone)]
pub struct SettingsService {
    repository: Repository,
    feed: ChangeFeed,
    max_attempts: u32,
}

impl SettingsService {
    pub fn new(repository: Repository, feed: ChangeFeed, config: &InventoryConfig) -> Self {
        Self {
            repository,
            feed,
            max_attempts: config.reference_max_attempts.max(1),
        }
    }

    /// Database connectivity, for the readiness check
    pub async fn ping(&self) -> AppResult<()> {
        self.repository.ping().await
    }

    /// Get current settings, creating the defaults on first access
    pub async fn get_settings(&self) -> AppResult<InventorySettings> {
        self.repository.settings.get().await
    }

    /// Allocate the next equipment reference.
    ///
    /// Serialization failures and deadlocks are retried a bounded number of
    /// times; past that the caller gets `Contention` and must not create the
    /// equipment. A counter value consumed by a failed insert is never reused.
    pub async fn next_reference(&self) -> AppResult<String> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.repository.settings.allocate_reference().await {
                Ok((reference, _)) => {
                    tracing::info!("Allocated reference {}", reference);
                    return Ok(reference);
                }
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    tracing::warn!(
                        "Reference allocation attempt {}/{} failed: {}",
                        attempt,
                        self.max_attempts,
                        e
                    );
                    tokio::time::sleep(Duration::from_millis(10 * u64::from(attempt))).await;
                }
                Err(e) if e.is_retryable() => {
                    return Err(AppError::Contention(format!(
                        "Could not allocate a reference after {} attempts",
                        attempt
                    )));
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Read-modify-write of the settings row under its lock
    async fn modify<T>(
        &self,
        session: &Session,
        change: impl FnOnce(&mut InventorySettings) -> AppResult<T>,
    ) -> AppResult<(InventorySettings, T)> {
        let mut tx = self.repository.begin().await?;
        let mut settings = self.repository.settings.lock(&mut *tx).await?;
        let output = change(&mut settings)?;
        let saved = self
            .repository
            .settings
            .save(&mut *tx, &settings, session.user_id())
            .await?;
        tx.commit().await?;
        self.feed.publish(InventoryEvent::SettingsChanged);
        Ok((saved, output))
    }

    /// Update toggles, prefix and counter
    pub async fn update_settings(&self, update: UpdateSettings, session: &Session) -> AppResult<InventorySettings> {
        let (settings, _) = self
            .modify(session, |settings| {
                let (prefix, counter) =
                    update.apply(&settings.reference_prefix, settings.reference_counter, &mut settings.data)?;
                settings.reference_prefix = prefix;
                settings.reference_counter = counter;
                Ok(())
            })
            .await?;
        tracing::info!("Settings updated by {}", session.user_id());
        Ok(settings)
    }

    /// Replace a whole option list
    pub async fn replace_options(
        &self,
        list: OptionList,
        options: Vec<OptionInput>,
        session: &Session,
    ) -> AppResult<Vec<ConfigurableOption>> {
        let (settings, _) = self
            .modify(session, |settings| settings.data.replace_options(list, options))
            .await?;
        Ok(settings.data.options(list).clone())
    }

    pub async fn add_option(
        &self,
        list: OptionList,
        option: OptionInput,
        session: &Session,
    ) -> AppResult<ConfigurableOption> {
        let (_, option) = self
            .modify(session, |settings| settings.data.add_option(list, option))
            .await?;
        tracing::info!("Added {} option '{}'", list.as_str(), option.name);
        Ok(option)
    }

    pub async fn update_option(
        &self,
        list: OptionList,
        id: &str,
        patch: UpdateOption,
        session: &Session,
    ) -> AppResult<ConfigurableOption> {
        let (_, option) = self
            .modify(session, |settings| settings.data.update_option(list, id, patch))
            .await?;
        Ok(option)
    }

    /// Soft delete of an option
    pub async fn deactivate_option(
        &self,
        list: OptionList,
        id: &str,
        session: &Session,
    ) -> AppResult<ConfigurableOption> {
        let (_, option) = self
            .modify(session, |settings| settings.data.deactivate_option(list, id))
            .await?;
        tracing::info!("Deactivated {} option '{}'", list.as_str(), option.name);
        Ok(option)
    }
}
