//! Offload execution backends.
//!
//! A backend maps a host scalar into its execution domain for the duration of a
//! region and copies the region's final value back to the host on exit.

use crate::core::errors::{Result, TeamError};
use crate::counter::SharedCounter;
use async_trait::async_trait;
use tracing::debug;

#[async_trait]
pub trait OffloadBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Run `region` against a device-side copy of `host`, then write the copy back.
    ///
    /// The host value is only updated when the region completes successfully.
    async fn map_tofrom<T, F>(&self, host: &mut i64, region: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&SharedCounter) -> Result<T> + Send + 'static;
}

/// Backend executing regions on the host's blocking thread pool
#[derive(Debug, Default, Clone)]
pub struct HostBackend;

impl HostBackend {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl OffloadBackend for HostBackend {
    fn name(&self) -> &str {
        "host"
    }

    async fn map_tofrom<T, F>(&self, host: &mut i64, region: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&SharedCounter) -> Result<T> + Send + 'static,
    {
        let entry = *host;
        debug!("Mapping scalar into region, entry value {}", entry);

        let joined = tokio::task::spawn_blocking(move || {
            let device = SharedCounter::new(entry);
            let output = region(&device)?;
            Ok::<_, TeamError>((output, device.into_inner()))
        })
        .await;

        let (output, exit) = match joined {
            Ok(result) => result?,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => return Err(e.into()),
        };

        debug!("Region exited, copying back value {}", exit);
        *host = exit;
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_map_tofrom_copies_back() {
        let backend = HostBackend::new();
        let mut host = 5;
        let seen = backend
            .map_tofrom(&mut host, |device| {
                let entry = device.get();
                device.increment();
                device.increment();
                Ok(entry)
            })
            .await
            .unwrap();
        assert_eq!(seen, 5);
        assert_eq!(host, 7);
        assert_eq!(backend.name(), "host");
    }

    #[tokio::test]
    async fn test_failed_region_leaves_host_untouched() {
        let backend = HostBackend::new();
        let mut host = 3;
        let result: Result<()> = backend
            .map_tofrom(&mut host, |device| {
                device.increment();
                Err(TeamError::validation("region rejected"))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(host, 3);
    }

    #[tokio::test]
    #[should_panic(expected = "region panicked")]
    async fn test_region_panic_is_not_masked() {
        let backend = HostBackend::new();
        let mut host = 0;
        let _: Result<()> = backend
            .map_tofrom(&mut host, |_| panic!("region panicked"))
            .await;
    }
}
