//! Extension de pmoconfig pour la file karaoké

use crate::priority::FairnessKey;
use crate::scheduler::SchedulerOptions;
use std::path::PathBuf;

/// Trait d'extension pour pmoconfig::Config
pub trait KaraokeConfigExt {
    /// Chemin de la base SQLite de la file
    fn queue_db_path(&self) -> anyhow::Result<PathBuf>;

    /// Options du scheduler lues depuis la section `queue`
    fn scheduler_options(&self) -> anyhow::Result<SchedulerOptions>;
}

impl KaraokeConfigExt for pmoconfig::Config {
    fn queue_db_path(&self) -> anyhow::Result<PathBuf> {
        let queue_dir = self.get_managed_dir(&["queue", "directory"], "queue")?;
        Ok(queue_dir.join("queue.db"))
    }

    fn scheduler_options(&self) -> anyhow::Result<SchedulerOptions> {
        let raw_key = self.get_queue_fairness_key()?;
        let fairness_key = raw_key.parse::<FairnessKey>().unwrap_or_else(|e| {
            tracing::warn!("{}, counting requests by singer name", e);
            FairnessKey::RequesterName
        });

        let mut default_regression = self.get_queue_regression_default()?;
        if default_regression < 0.0 {
            tracing::warn!(
                value = default_regression,
                "Negative regression default, using {}",
                crate::DEFAULT_REGRESSION
            );
            default_regression = crate::DEFAULT_REGRESSION;
        }

        Ok(SchedulerOptions {
            fairness_key,
            default_regression,
        })
    }
}
