//! Owner of the live transport list

use super::diagnostics;
use super::error::{LoggerError, Result};
use super::log_entry::LogEntry;
use super::log_level::Rank;
use super::transport::{Transport, TransportSettings};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::task::JoinSet;

struct Registration {
    transport: Arc<dyn Transport>,
    ready: bool,
}

fn same_transport(a: &Arc<dyn Transport>, b: &Arc<dyn Transport>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

/// Fans entries out to every registered transport
///
/// Emission iterates a snapshot of the list, so a transport removed while an
/// entry is in flight is never touched after its `destroy()` returns from the
/// list's point of view; the transport itself ignores late emits.
#[derive(Default)]
pub struct TransportManager {
    registrations: RwLock<Vec<Registration>>,
}

impl TransportManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recently added transports come first
    pub fn add(&self, transport: Arc<dyn Transport>, ready: bool) {
        self.registrations
            .write()
            .insert(0, Registration { transport, ready });
    }

    /// Destroy and unregister; returns false if it was not registered
    pub fn remove(&self, transport: &Arc<dyn Transport>) -> bool {
        let found = self
            .snapshot()
            .into_iter()
            .find(|t| same_transport(t, transport));
        match found {
            Some(t) => {
                t.destroy();
                self.registrations
                    .write()
                    .retain(|r| !same_transport(&r.transport, &t));
                true
            }
            None => false,
        }
    }

    /// Remove every transport with the given name
    pub fn remove_named(&self, name: &str) -> bool {
        let matching: Vec<_> = self
            .snapshot()
            .into_iter()
            .filter(|t| t.name() == name)
            .collect();
        for t in &matching {
            self.remove(t);
        }
        !matching.is_empty()
    }

    pub fn snapshot(&self) -> Vec<Arc<dyn Transport>> {
        self.registrations
            .read()
            .iter()
            .map(|r| Arc::clone(&r.transport))
            .collect()
    }

    pub fn emit(&self, entry: &LogEntry) {
        for transport in self.snapshot() {
            transport.emit(entry);
        }
    }

    /// True if at least one transport would act on `rank`
    pub fn meets_any_threshold(&self, rank: Rank) -> bool {
        self.registrations
            .read()
            .iter()
            .any(|r| r.transport.accepts(rank))
    }

    /// True when no registered transport is waiting for setup
    pub fn all_ready(&self) -> bool {
        self.registrations.read().iter().all(|r| r.ready)
    }

    pub fn mark_ready(&self, transport: &Arc<dyn Transport>) {
        for r in self.registrations.write().iter_mut() {
            if same_transport(&r.transport, transport) {
                r.ready = true;
            }
        }
    }

    pub fn configure_all(&self, settings: &TransportSettings) -> Result<()> {
        for transport in self.snapshot() {
            transport.configure(settings)?;
        }
        Ok(())
    }

    /// Set up every transport that is not ready yet, concurrently
    ///
    /// Successful transports are marked ready. Failed ones are returned with
    /// their error; the caller decides what to do with them.
    pub async fn setup_pending(&self) -> Vec<(Arc<dyn Transport>, LoggerError)> {
        let pending: Vec<_> = self
            .registrations
            .read()
            .iter()
            .filter(|r| !r.ready)
            .map(|r| Arc::clone(&r.transport))
            .collect();

        let mut tasks = JoinSet::new();
        for transport in &pending {
            let transport = Arc::clone(transport);
            tasks.spawn(async move {
                let result = transport.setup().await;
                (transport, result)
            });
        }

        let mut failures = Vec::new();
        let mut settled = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((transport, Ok(()))) => {
                    self.mark_ready(&transport);
                    settled.push(transport);
                }
                Ok((transport, Err(e))) => {
                    let err = match e {
                        e @ LoggerError::TransportSetup { .. } => e,
                        other => LoggerError::setup(transport.name(), other.to_string()),
                    };
                    settled.push(Arc::clone(&transport));
                    failures.push((transport, err));
                }
                Err(join_err) => {
                    diagnostics::report_error("TransportManager", format!("setup task failed: {}", join_err));
                }
            }
        }

        // A setup task that panicked never reported back
        for transport in pending {
            if !settled.iter().any(|t| same_transport(t, &transport)) {
                let err = LoggerError::setup(transport.name(), "setup task panicked");
                failures.push((transport, err));
            }
        }
        failures
    }

    /// Stop every transport concurrently and wait for all of them
    ///
    /// No completion order is assumed. Returns the first error observed.
    pub async fn stop_all(&self) -> Result<()> {
        let mut tasks = JoinSet::new();
        for transport in self.snapshot() {
            tasks.spawn(async move {
                let result = transport.stop().await;
                (transport.name().to_string(), result)
            });
        }

        let mut first_error = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(()))) => {}
                Ok((name, Err(e))) => {
                    diagnostics::report_error("TransportManager", format!("transport '{}' failed to stop: {}", name, e));
                    first_error.get_or_insert(e);
                }
                Err(join_err) => {
                    first_error.get_or_insert(LoggerError::other(format!("stop task failed: {}", join_err)));
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    pub async fn flush_all(&self) -> Result<()> {
        for transport in self.snapshot() {
            transport.flush().await?;
        }
        Ok(())
    }

    pub fn names(&self) -> Vec<String> {
        self.registrations
            .read()
            .iter()
            .map(|r| r.transport.name().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.registrations.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{TransportCore, TransportOptions};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Probe {
        core: TransportCore,
        emitted: AtomicUsize,
        fail_setup: bool,
    }

    impl Probe {
        fn new(name: &str, threshold: Option<&str>) -> Arc<Self> {
            Arc::new(Self {
                core: TransportCore::new(
                    name,
                    TransportOptions {
                        threshold: threshold.map(Into::into),
                        show: None,
                    },
                ),
                emitted: AtomicUsize::new(0),
                fail_setup: false,
            })
        }
    }

    #[async_trait]
    impl Transport for Probe {
        fn core(&self) -> &TransportCore {
            &self.core
        }

        async fn setup(&self) -> Result<()> {
            if self.fail_setup {
                Err(LoggerError::other("no route to host"))
            } else {
                Ok(())
            }
        }

        fn emit(&self, entry: &LogEntry) {
            if self.accepts(entry.rank) {
                self.emitted.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    #[test]
    fn test_add_inserts_most_recent_first() {
        let manager = TransportManager::new();
        manager.add(Probe::new("first", None), true);
        manager.add(Probe::new("second", None), true);
        assert_eq!(manager.names(), vec!["second", "first"]);
    }

    #[test]
    fn test_emit_reaches_every_transport_and_each_filters() {
        let manager = TransportManager::new();
        let quiet = Probe::new("quiet", Some("error"));
        let chatty = Probe::new("chatty", Some("trace"));
        manager.add(quiet.clone(), true);
        manager.add(chatty.clone(), true);

        manager.emit(&LogEntry::new("debug", 4, "x"));
        manager.emit(&LogEntry::new("error", 0, "y"));

        assert_eq!(quiet.emitted.load(Ordering::Relaxed), 1);
        assert_eq!(chatty.emitted.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_meets_any_threshold() {
        let manager = TransportManager::new();
        assert!(!manager.meets_any_threshold(0));
        manager.add(Probe::new("warn-only", Some("warn")), true);
        assert!(manager.meets_any_threshold(1));
        assert!(!manager.meets_any_threshold(2));
        manager.add(Probe::new("debug", Some("debug")), true);
        assert!(manager.meets_any_threshold(4));
    }

    #[test]
    fn test_remove_destroys_and_unregisters() {
        let manager = TransportManager::new();
        let probe = Probe::new("probe", None);
        let as_dyn: Arc<dyn Transport> = probe.clone();
        manager.add(as_dyn.clone(), true);

        let in_flight = manager.snapshot();
        assert!(manager.remove(&as_dyn));
        assert!(manager.is_empty());
        assert!(!manager.remove(&as_dyn));

        // A snapshot taken before removal must not deliver to the destroyed transport
        for t in in_flight {
            t.emit(&LogEntry::new("error", 0, "late"));
        }
        assert_eq!(probe.emitted.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_setup_pending_marks_ready_and_reports_failures() {
        let manager = TransportManager::new();
        let ok: Arc<dyn Transport> = Probe::new("ok", None);
        let broken: Arc<dyn Transport> = Arc::new(Probe {
            core: TransportCore::new("broken", TransportOptions::default()),
            emitted: AtomicUsize::new(0),
            fail_setup: true,
        });
        manager.add(ok.clone(), false);
        manager.add(broken.clone(), false);
        assert!(!manager.all_ready());

        let failures = manager.setup_pending().await;
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0.name(), "broken");
        assert!(matches!(failures[0].1, LoggerError::TransportSetup { .. }));
        assert!(!manager.all_ready());
        manager.remove(&broken);
        assert!(manager.all_ready());
        assert_eq!(manager.names(), vec!["ok"]);
    }
}
