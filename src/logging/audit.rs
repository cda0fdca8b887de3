//! Audit trail for `$everything` requests
//!
//! Every request produces audit events for its lifecycle and for any
//! classified failure. Patient identifiers are never written in plain text:
//! events carry the identifier hashed with the audit pepper, and no hash at
//! all when no pepper is configured. A failing sink is logged and skipped so
//! auditing can never fail a request.

use crate::config::{AuditConfig, GatewayConfig, SecretString};
use crate::core::access::hash_identifier;
use crate::domain::{CallerIdentity, ErrorKind, PatientIdentifier};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_appender::non_blocking::{NonBlocking, NonBlockingBuilder, WorkerGuard};

/// Tracing target of audit events
pub const AUDIT_TARGET: &str = "fhirgate::audit";

/// What happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Requested,
    AccessGranted,
    Completed,
    Failed,
}

/// Audit log entry
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub timestamp: DateTime<Utc>,
    pub request_id: String,
    pub action: AuditAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consumer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organisation_code: Option<String>,
    /// Peppered SHA-256 hash of the patient identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl AuditEvent {
    pub fn new(
        request_id: impl Into<String>,
        action: AuditAction,
        patient: Option<&PatientIdentifier>,
        caller: Option<&CallerIdentity>,
        pepper: Option<&SecretString>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            request_id: request_id.into(),
            action,
            consumer_id: caller.map(|c| c.consumer_id.clone()),
            organisation_code: caller.and_then(|c| c.organisation_code.clone()),
            patient_hash: patient
                .zip(pepper)
                .map(|(p, pepper)| hash_identifier(p.as_str(), pepper.expose_secret().as_ref())),
            error_kind: None,
            detail: None,
        }
    }

    pub fn with_error(mut self, kind: ErrorKind) -> Self {
        self.error_kind = Some(kind);
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Destination for audit events
pub trait AuditSink: Send + Sync {
    fn record(&self, event: &AuditEvent) -> Result<()>;
}

/// Writes audit events as structured tracing events
#[derive(Debug, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: &AuditEvent) -> Result<()> {
        let error_kind = event.error_kind.map(|k| k.to_string()).unwrap_or_default();
        let patient_hash = event.patient_hash.as_deref().unwrap_or("");
        tracing::info!(
            target: AUDIT_TARGET,
            request_id = %event.request_id,
            action = ?event.action,
            consumer_id = event.consumer_id.as_deref().unwrap_or(""),
            organisation_code = event.organisation_code.as_deref().unwrap_or(""),
            patient_hash,
            error_kind = %error_kind,
            detail = event.detail.as_deref().unwrap_or(""),
            "audit"
        );
        Ok(())
    }
}

/// Appends audit events to a JSON lines file
///
/// Lines are handed to a background writer so recording never blocks the
/// runtime on file I/O. The writer is lossless; pending lines are flushed
/// when the sink is dropped.
pub struct JsonlAuditSink {
    log_path: PathBuf,
    writer: NonBlocking,
    _guard: WorkerGuard,
}

impl JsonlAuditSink {
    /// Open `log_path` for appending, creating the parent directory if needed
    pub fn new(log_path: impl Into<PathBuf>) -> Result<Self> {
        let log_path = log_path.into();
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create audit log directory: {}", parent.display())
            })?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .with_context(|| format!("Failed to open audit log: {}", log_path.display()))?;

        let (writer, guard) = NonBlockingBuilder::default()
            .lossy(false)
            .finish(file);

        Ok(Self {
            log_path,
            writer,
            _guard: guard,
        })
    }

    pub fn path(&self) -> &Path {
        &self.log_path
    }
}

impl AuditSink for JsonlAuditSink {
    fn record(&self, event: &AuditEvent) -> Result<()> {
        let mut json_line =
            serde_json::to_string(event).context("Failed to serialize audit event")?;
        json_line.push('\n');

        let mut writer = self.writer.clone();
        writer
            .write_all(json_line.as_bytes())
            .with_context(|| format!("Failed to write audit log: {}", self.log_path.display()))
    }
}

impl std::fmt::Debug for JsonlAuditSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonlAuditSink")
            .field("log_path", &self.log_path)
            .finish()
    }
}

/// Builds the configured audit sinks
///
/// The tracing sink is always present; the file sink is added when
/// `audit.file_enabled` is set.
pub fn create_audit_sinks(config: &AuditConfig) -> Result<Vec<Arc<dyn AuditSink>>> {
    let mut sinks: Vec<Arc<dyn AuditSink>> = vec![Arc::new(TracingAuditSink)];
    if config.file_enabled {
        sinks.push(Arc::new(JsonlAuditSink::new(&config.path)?));
    }
    Ok(sinks)
}

/// The sinks of a gateway together with the pepper its events hash
/// patient identifiers with
#[derive(Clone, Default)]
pub struct AuditTrail {
    sinks: Vec<Arc<dyn AuditSink>>,
    pepper: Option<SecretString>,
}

impl AuditTrail {
    pub fn new(sinks: Vec<Arc<dyn AuditSink>>) -> Self {
        Self {
            sinks,
            pepper: None,
        }
    }

    pub fn with_pepper(mut self, pepper: SecretString) -> Self {
        self.pepper = Some(pepper);
        self
    }

    /// Sinks from `[audit]`, peppered with [`GatewayConfig::audit_pepper`]
    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        let trail = Self::new(create_audit_sinks(&config.audit)?);
        Ok(match config.audit_pepper() {
            Some(pepper) => trail.with_pepper(pepper.clone()),
            None => trail,
        })
    }

    /// An event hashed with this trail's pepper
    pub fn event(
        &self,
        request_id: impl Into<String>,
        action: AuditAction,
        patient: Option<&PatientIdentifier>,
        caller: Option<&CallerIdentity>,
    ) -> AuditEvent {
        AuditEvent::new(request_id, action, patient, caller, self.pepper.as_ref())
    }

    pub fn record(&self, event: &AuditEvent) {
        record_audit(&self.sinks, event);
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }
}

impl std::fmt::Debug for AuditTrail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditTrail")
            .field("sinks", &self.sinks.len())
            .field("peppered", &self.pepper.is_some())
            .finish()
    }
}

/// Records `event` on every sink, logging and swallowing sink failures
pub fn record_audit(sinks: &[Arc<dyn AuditSink>], event: &AuditEvent) {
    for sink in sinks {
        if let Err(e) = sink.record(event) {
            tracing::warn!(
                request_id = %event.request_id,
                error = %e,
                "Failed to record audit event"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::secret_string;
    use sha2::{Digest, Sha256};
    use std::sync::Mutex;
    use tempfile::tempdir;

    const PATIENT: &str = "9434765919";

    struct FailingSink;

    impl AuditSink for FailingSink {
        fn record(&self, _event: &AuditEvent) -> Result<()> {
            anyhow::bail!("disk full")
        }
    }

    #[derive(Default)]
    struct CapturingSink(Mutex<Vec<AuditEvent>>);

    impl AuditSink for CapturingSink {
        fn record(&self, event: &AuditEvent) -> Result<()> {
            self.0.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    fn pepper() -> SecretString {
        secret_string("audit-pepper".to_string())
    }

    fn event(action: AuditAction) -> AuditEvent {
        AuditEvent::new(
            "req-1",
            action,
            Some(&PatientIdentifier::new(PATIENT).unwrap()),
            Some(&CallerIdentity::new("consumer-1").with_organisation("RAL")),
            Some(&pepper()),
        )
    }

    #[test]
    fn test_patient_hash_is_peppered() {
        let hash = event(AuditAction::Requested).patient_hash.unwrap();
        let bare = format!("{:x}", Sha256::digest(PATIENT.as_bytes()));

        assert_ne!(hash, bare);
        assert_eq!(hash, hash_identifier(PATIENT, "audit-pepper"));
    }

    #[test]
    fn test_nearby_identifiers_do_not_reveal_patient_without_pepper() {
        let hash = event(AuditAction::Requested).patient_hash.unwrap();
        let base: u64 = PATIENT.parse().unwrap();

        let recovered = (base - 50..base + 50)
            .map(|n| n.to_string())
            .find(|candidate| format!("{:x}", Sha256::digest(candidate.as_bytes())) == hash);
        assert_eq!(recovered, None);
    }

    #[test]
    fn test_no_pepper_omits_patient_hash() {
        let event = AuditEvent::new(
            "req-1",
            AuditAction::Requested,
            Some(&PatientIdentifier::new(PATIENT).unwrap()),
            None,
            None,
        );
        assert!(event.patient_hash.is_none());
        assert!(!serde_json::to_string(&event).unwrap().contains("patient_hash"));
    }

    #[test]
    fn test_trail_hashes_with_its_pepper() {
        let capture = Arc::new(CapturingSink::default());
        let sink: Arc<dyn AuditSink> = capture.clone();
        let trail = AuditTrail::new(vec![sink]).with_pepper(pepper());
        let patient = PatientIdentifier::new(PATIENT).unwrap();

        trail.record(&trail.event("req-2", AuditAction::Completed, Some(&patient), None));

        let events = capture.0.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0].patient_hash.as_deref(),
            Some(hash_identifier(PATIENT, "audit-pepper").as_str())
        );
    }

    #[test]
    fn test_jsonl_sink_never_writes_identifier() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("audit").join("audit.jsonl");
        let sink = JsonlAuditSink::new(&log_path).unwrap();
        assert_eq!(sink.path(), log_path.as_path());

        sink.record(&event(AuditAction::Requested)).unwrap();
        sink.record(
            &event(AuditAction::Failed)
                .with_error(ErrorKind::Forbidden)
                .with_detail("no grant"),
        )
        .unwrap();
        // Dropping the sink flushes the background writer
        drop(sink);

        let content = std::fs::read_to_string(&log_path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(!content.contains(PATIENT));

        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["action"], "failed");
        assert_eq!(second["error_kind"], "Forbidden");
        assert_eq!(second["consumer_id"], "consumer-1");
    }

    #[test]
    fn test_jsonl_sink_appends_across_instances() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("audit.jsonl");

        for action in [AuditAction::Requested, AuditAction::Completed] {
            let sink = JsonlAuditSink::new(&log_path).unwrap();
            sink.record(&event(action)).unwrap();
        }

        let content = std::fs::read_to_string(&log_path).unwrap();
        assert_eq!(content.lines().count(), 2);
    }

    #[test]
    fn test_record_audit_swallows_failures() {
        let sinks: Vec<Arc<dyn AuditSink>> = vec![Arc::new(FailingSink), Arc::new(TracingAuditSink)];
        record_audit(&sinks, &event(AuditAction::Completed));
    }

    #[test]
    fn test_create_audit_sinks() {
        let dir = tempdir().unwrap();
        let config = AuditConfig {
            file_enabled: true,
            path: dir.path().join("audit.jsonl").to_string_lossy().to_string(),
            pepper: None,
        };
        assert_eq!(create_audit_sinks(&config).unwrap().len(), 2);
        assert_eq!(create_audit_sinks(&AuditConfig::default()).unwrap().len(), 1);
    }
}
