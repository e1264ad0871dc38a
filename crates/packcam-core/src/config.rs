//! Configuration module
//!
//! This module provides configuration structures for the capture-and-delivery pipeline:
//! debounce and settle timing, worker pool sizing, delivery endpoints and the local
//! fallback store. Values come from `PACKCAM_*` environment variables (a `.env` file is
//! loaded first) and fall back to the constants in [`crate::constants`].

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{
    DEFAULT_HTTP_TIMEOUT_SECS, MAX_UPLOAD_CONCURRENCY, RESCAN_SUPPRESSION_MS, SETTLE_DELAY_MS,
    STABILIZATION_WINDOW_MS, WORKER_IDLE_POLL_MS,
};
use crate::models::ReferenceUrlTemplate;

/// Scan debounce and capture timing
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaptureConfig {
    pub stabilization_window: Duration,
    pub rescan_suppression: Duration,
    pub settle_delay: Duration,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            stabilization_window: Duration::from_millis(STABILIZATION_WINDOW_MS),
            rescan_suppression: Duration::from_millis(RESCAN_SUPPRESSION_MS),
            settle_delay: Duration::from_millis(SETTLE_DELAY_MS),
        }
    }
}

/// Upload worker pool sizing
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkerConfig {
    pub max_concurrency: usize,
    /// Wake-up interval used when no enqueue or completion notification arrives.
    pub idle_poll_interval: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrency: MAX_UPLOAD_CONCURRENCY,
            idle_poll_interval: Duration::from_millis(WORKER_IDLE_POLL_MS),
        }
    }
}

/// Upload and notification collaborator settings
#[derive(Clone, Debug)]
pub struct DeliveryConfig {
    pub upload_endpoint: Option<String>,
    pub notify_endpoint: Option<String>,
    pub api_key: Option<String>,
    pub reference_url_template: ReferenceUrlTemplate,
    pub http_timeout_secs: u64,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            upload_endpoint: None,
            notify_endpoint: None,
            api_key: None,
            reference_url_template: ReferenceUrlTemplate::default(),
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
        }
    }
}

/// Local fallback store settings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FallbackConfig {
    /// Take a best-effort local copy of every finished clip.
    pub local_copy_enabled: bool,
    /// Folder offered when the operator is asked to choose one. `None` means the
    /// operator declines the prompt.
    pub folder: Option<PathBuf>,
    /// Where one-shot downloads land.
    pub download_dir: PathBuf,
    /// File backing the remembered folder handle.
    pub handle_store_path: PathBuf,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            local_copy_enabled: true,
            folder: None,
            download_dir: PathBuf::from("downloads"),
            handle_store_path: PathBuf::from(".packcam/handles.json"),
        }
    }
}

/// Complete pipeline configuration
#[derive(Clone, Debug, Default)]
pub struct PipelineConfig {
    pub environment: String,
    pub capture: CaptureConfig,
    pub worker: WorkerConfig,
    pub delivery: DeliveryConfig,
    pub fallback: FallbackConfig,
}

impl PipelineConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("PACKCAM_ENV")
            .or_else(|_| env::var("ENVIRONMENT"))
            .unwrap_or_else(|_| "development".to_string());

        let capture = CaptureConfig {
            stabilization_window: Duration::from_millis(
                env::var("PACKCAM_STABILIZATION_WINDOW_MS")
                    .unwrap_or_else(|_| STABILIZATION_WINDOW_MS.to_string())
                    .parse()
                    .unwrap_or(STABILIZATION_WINDOW_MS),
            ),
            rescan_suppression: Duration::from_millis(
                env::var("PACKCAM_RESCAN_SUPPRESSION_MS")
                    .unwrap_or_else(|_| RESCAN_SUPPRESSION_MS.to_string())
                    .parse()
                    .unwrap_or(RESCAN_SUPPRESSION_MS),
            ),
            settle_delay: Duration::from_millis(
                env::var("PACKCAM_SETTLE_DELAY_MS")
                    .unwrap_or_else(|_| SETTLE_DELAY_MS.to_string())
                    .parse()
                    .unwrap_or(SETTLE_DELAY_MS),
            ),
        };

        let worker = WorkerConfig {
            max_concurrency: env::var("PACKCAM_UPLOAD_CONCURRENCY")
                .unwrap_or_else(|_| MAX_UPLOAD_CONCURRENCY.to_string())
                .parse()
                .unwrap_or(MAX_UPLOAD_CONCURRENCY),
            idle_poll_interval: Duration::from_millis(
                env::var("PACKCAM_WORKER_POLL_MS")
                    .unwrap_or_else(|_| WORKER_IDLE_POLL_MS.to_string())
                    .parse()
                    .unwrap_or(WORKER_IDLE_POLL_MS),
            ),
        };

        let reference_url_template = match env::var("PACKCAM_REFERENCE_URL_TEMPLATE") {
            Ok(template) => ReferenceUrlTemplate::new(template)?,
            Err(_) => ReferenceUrlTemplate::default(),
        };

        let delivery = DeliveryConfig {
            upload_endpoint: env::var("PACKCAM_UPLOAD_URL").ok(),
            notify_endpoint: env::var("PACKCAM_NOTIFY_URL").ok(),
            api_key: env::var("PACKCAM_API_KEY").ok(),
            reference_url_template,
            http_timeout_secs: env::var("PACKCAM_HTTP_TIMEOUT_SECS")
                .unwrap_or_else(|_| DEFAULT_HTTP_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS),
        };

        let defaults = FallbackConfig::default();
        let fallback = FallbackConfig {
            local_copy_enabled: env::var("PACKCAM_LOCAL_COPY")
                .map(|v| v.parse().unwrap_or(true))
                .unwrap_or(true),
            folder: env::var("PACKCAM_FALLBACK_DIR").ok().map(PathBuf::from),
            download_dir: env::var("PACKCAM_DOWNLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.download_dir),
            handle_store_path: env::var("PACKCAM_HANDLE_STORE")
                .map(PathBuf::from)
                .unwrap_or(defaults.handle_store_path),
        };

        Ok(Self {
            environment,
            capture,
            worker,
            delivery,
            fallback,
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.capture.stabilization_window.is_zero() {
            return Err(anyhow::anyhow!(
                "PACKCAM_STABILIZATION_WINDOW_MS must be greater than zero"
            ));
        }

        if self.worker.max_concurrency == 0 {
            return Err(anyhow::anyhow!(
                "PACKCAM_UPLOAD_CONCURRENCY must be at least 1"
            ));
        }

        if self.worker.idle_poll_interval.is_zero() {
            return Err(anyhow::anyhow!("PACKCAM_WORKER_POLL_MS must be greater than zero"));
        }

        if self.delivery.upload_endpoint.is_none() {
            return Err(anyhow::anyhow!("PACKCAM_UPLOAD_URL must be set"));
        }

        if self.delivery.notify_endpoint.is_none() {
            return Err(anyhow::anyhow!("PACKCAM_NOTIFY_URL must be set"));
        }

        Ok(())
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> PipelineConfig {
        PipelineConfig {
            delivery: DeliveryConfig {
                upload_endpoint: Some("http://localhost:8080/upload-url".into()),
                notify_endpoint: Some("http://localhost:8080/notify".into()),
                ..DeliveryConfig::default()
            },
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn defaults_match_fixed_pipeline_constants() {
        let config = PipelineConfig::default();
        assert_eq!(config.capture.stabilization_window, Duration::from_millis(2000));
        assert_eq!(config.capture.rescan_suppression, Duration::from_millis(2000));
        assert_eq!(config.capture.settle_delay, Duration::from_millis(500));
        assert_eq!(config.worker.max_concurrency, 2);
        assert!(config.fallback.local_copy_enabled);
    }

    #[test]
    fn validate_accepts_configured_endpoints() {
        assert!(configured().validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_concurrency() {
        let mut config = configured();
        config.worker.max_concurrency = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_requires_endpoints() {
        let mut config = configured();
        config.delivery.notify_endpoint = None;
        assert!(config.validate().is_err());
    }

    #[test]
    fn production_detection() {
        let mut config = configured();
        assert!(!config.is_production());
        config.environment = "PROD".into();
        assert!(config.is_production());
    }
}
