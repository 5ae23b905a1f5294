use crate::config::EngineConfig;
use crate::observer::{EventLevel, PackObserver, TracingObserver};
use crate::CoreError;
use packfix_archive::{
    entry_matches, paths_equal_ignore_case, rewrite_archive, scan_archive, ArchiveSource,
    ManifestEntry, ManifestText, RewritePlan, RewriteSummary, ScanReport,
};
use packfix_schema::{
    synthesize_manifest, PackInfo, PackManifest, RandomUuids, RepairNote, UuidSource,
    ValidationResult, MANIFEST_FILE_NAME,
};
use std::fs::File;
use std::io::{BufWriter, Read, Seek, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tracing::{debug, info};

type AbortHook = Arc<dyn Fn() -> bool + Send + Sync>;

/// Validate, repair and extract resource packs.
///
/// Holds configuration and an observer only; every call is a fresh pass over
/// its source.
pub struct Engine {
    config: EngineConfig,
    observer: Arc<dyn PackObserver>,
    abort: Option<AbortHook>,
}

/// What a repair produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairReport {
    pub manifest: PackManifest,
    pub notes: Vec<RepairNote>,
    pub summary: RewriteSummary,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepairOutcome {
    /// The pack was already valid; nothing was written.
    Unchanged,
    Repaired(RepairReport),
}

/// Result of `Engine::load`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedPack {
    pub info: PackInfo,
    /// Repaired archive persisted in the output directory, if a repair was needed.
    pub repaired_path: Option<PathBuf>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            observer: Arc::new(TracingObserver),
            abort: None,
        }
    }

    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn PackObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Install a hook polled between entries while rewriting; returning true
    /// aborts the repair with a cancellation error.
    #[must_use]
    pub fn with_abort_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.abort = Some(Arc::new(hook));
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Locate the manifest and pack icon in one pass over `source`.
    pub fn scan(&self, source: &dyn ArchiveSource) -> Result<ScanReport, CoreError> {
        debug!("scanning {}", source.describe());
        self.scan_reader(source.open()?)
    }

    /// Scan `source` and validate the manifest it contains.
    ///
    /// Only stream failures are errors; schema problems end up in the result.
    pub fn validate(&self, source: &dyn ArchiveSource) -> Result<ValidationResult, CoreError> {
        let report = self.scan(source)?;
        Ok(self.judge(report))
    }

    /// Rewrite `source` into `dest` with a synthesized manifest, unless
    /// `validation` says the pack is already valid.
    pub fn repair_into(
        &self,
        source: &dyn ArchiveSource,
        validation: &ValidationResult,
        dest: &mut dyn Write,
    ) -> Result<RepairOutcome, CoreError> {
        self.repair_into_with(source, validation, dest, &mut RandomUuids)
    }

    /// Like [`Engine::repair_into`], drawing fresh identifiers from `uuids`.
    pub fn repair_into_with(
        &self,
        source: &dyn ArchiveSource,
        validation: &ValidationResult,
        dest: &mut dyn Write,
        uuids: &mut dyn UuidSource,
    ) -> Result<RepairOutcome, CoreError> {
        if validation.is_valid {
            debug!("{} is valid, nothing to repair", source.describe());
            return Ok(RepairOutcome::Unchanged);
        }

        let synthesis = synthesize_manifest(
            validation.manifest.as_ref(),
            &self.config.repair_defaults(),
            uuids,
        );
        for note in &synthesis.notes {
            self.observer.repair_note(note);
        }
        let replacement = synthesis.manifest.to_pretty_json()?;

        // Any surviving manifest would shadow the appended root one on re-scan.
        let recorded = validation.manifest_path.as_deref();
        let drop_entry = |name: &str| {
            recorded.is_some_and(|path| paths_equal_ignore_case(name, path))
                || entry_matches(name, MANIFEST_FILE_NAME)
        };
        let abort = self.abort.as_deref().map(|hook| hook as &dyn Fn() -> bool);
        let plan = RewritePlan {
            drop_entry: &drop_entry,
            replacement_name: MANIFEST_FILE_NAME,
            replacement: replacement.as_bytes(),
            abort,
        };

        let (_, summary) = rewrite_archive(source.open()?, dest, &plan)?;
        info!(
            "repaired {}: {} entries kept, {} replaced",
            source.describe(),
            summary.copied,
            summary.dropped.len()
        );
        Ok(RepairOutcome::Repaired(RepairReport {
            manifest: synthesis.manifest,
            notes: synthesis.notes,
            summary,
        }))
    }

    /// Repair into the file at `dest`.
    ///
    /// The archive is written to a temp file next to `dest` and renamed into
    /// place only once complete; on any failure `dest` is left untouched.
    pub fn repair_to_file(
        &self,
        source: &dyn ArchiveSource,
        validation: &ValidationResult,
        dest: &Path,
    ) -> Result<RepairOutcome, CoreError> {
        if validation.is_valid {
            return Ok(RepairOutcome::Unchanged);
        }
        let dir = match dest.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;

        let mut tmp = NamedTempFile::new_in(&dir)?;
        let outcome = {
            let mut out = BufWriter::new(tmp.as_file_mut());
            let outcome = self.repair_into(source, validation, &mut out)?;
            out.flush()?;
            outcome
        };
        tmp.as_file().sync_all()?;
        tmp.persist(dest).map_err(|e| CoreError::Io(e.error))?;
        debug!("wrote repaired archive to {}", dest.display());
        Ok(outcome)
    }

    /// Pack info for `source`, repairing in a scratch file if needed.
    ///
    /// Every failure is reported to the observer and collapsed to `None`.
    pub fn extract(&self, source: &dyn ArchiveSource) -> Option<PackInfo> {
        match self.try_extract(source) {
            Ok(info) => Some(info),
            Err(e) => {
                self.observer.failure(&e);
                None
            }
        }
    }

    pub fn try_extract(&self, source: &dyn ArchiveSource) -> Result<PackInfo, CoreError> {
        let validation = self.validate(source)?;
        if let Some(info) = PackInfo::from_validation(&validation) {
            return Ok(info);
        }

        let mut scratch = tempfile::tempfile()?;
        {
            let mut out = BufWriter::new(&mut scratch);
            self.repair_into(source, &validation, &mut out)?;
            out.flush()?;
        }
        scratch.rewind()?;
        self.project_repaired(&scratch)
    }

    /// Like [`Engine::try_extract`], but a repaired archive is kept as
    /// `fixed_<unix-millis>.mcpack` in the configured output directory.
    pub fn load(&self, source: &dyn ArchiveSource) -> Result<LoadedPack, CoreError> {
        let validation = self.validate(source)?;
        if let Some(info) = PackInfo::from_validation(&validation) {
            return Ok(LoadedPack {
                info,
                repaired_path: None,
            });
        }

        let dest = self.config.resolved_output_dir().join(format!(
            "fixed_{}.mcpack",
            chrono::Utc::now().timestamp_millis()
        ));
        self.repair_to_file(source, &validation, &dest)?;

        match self.project_repaired(&File::open(&dest)?) {
            Ok(info) => Ok(LoadedPack {
                info,
                repaired_path: Some(dest),
            }),
            Err(e) => {
                let _ = std::fs::remove_file(&dest);
                Err(e)
            }
        }
    }

    /// Re-validate a freshly repaired archive and project it.
    fn project_repaired(&self, repaired: &File) -> Result<PackInfo, CoreError> {
        let validation = self.judge(self.scan_reader(repaired)?);
        match PackInfo::from_validation(&validation) {
            Some(info) => Ok(info.fixed()),
            None => Err(CoreError::Unrepairable {
                issues: validation.issues,
            }),
        }
    }

    fn scan_reader<R: Read>(&self, reader: R) -> Result<ScanReport, CoreError> {
        let report = scan_archive(reader, &self.config.scan_options())?;
        for path in &report.shadowed_manifests {
            self.observer.event(
                EventLevel::Warn,
                &format!("ignoring additional manifest '{path}'"),
            );
        }
        Ok(report)
    }

    /// Turn a scan into a validation result, reporting what was found.
    fn judge(&self, report: ScanReport) -> ValidationResult {
        if !report.has_pack_icon {
            self.observer
                .event(EventLevel::Warn, "pack has no pack_icon.png");
        }
        let result = validation_from_scan(report);
        for issue in &result.issues {
            self.observer.issue(issue);
        }
        result
    }
}

/// Validate the manifest text carried by a scan report.
pub fn validation_from_scan(report: ScanReport) -> ValidationResult {
    let has_icon = report.has_pack_icon;
    match report.manifest {
        None => ValidationResult::not_found(has_icon),
        Some(ManifestEntry {
            path,
            text: ManifestText::Utf8(text),
        }) => ValidationResult::from_text(path, &text, has_icon),
        Some(ManifestEntry { path, text }) => {
            let reason = text.unreadable_reason().unwrap_or_default();
            ValidationResult::unreadable(path, reason, has_icon)
        }
    }
}
