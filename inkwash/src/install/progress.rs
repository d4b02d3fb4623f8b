//! Installation steps and progress reporting.

use std::fmt;
use std::time::Duration;

use parking_lot::Mutex;

/// Number of steps in an installation.
pub const TOTAL_STEPS: usize = 8;

/// Share of overall progress taken by the download sub-phase.
pub(crate) const DOWNLOAD_START: f64 = 0.30;
pub(crate) const DOWNLOAD_END: f64 = 0.45;

/// The eight linear steps of an installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstallStep {
    Validate,
    CreateDirectories,
    AcquireBinary,
    CloneDefaultResources,
    WriteMetadata,
    GenerateServerConfig,
    GenerateLaunchScript,
    RegisterInServerRegistry,
}

impl InstallStep {
    /// All steps in execution order.
    pub const ALL: [InstallStep; TOTAL_STEPS] = [
        Self::Validate,
        Self::CreateDirectories,
        Self::AcquireBinary,
        Self::CloneDefaultResources,
        Self::WriteMetadata,
        Self::GenerateServerConfig,
        Self::GenerateLaunchScript,
        Self::RegisterInServerRegistry,
    ];

    /// Human-readable step name.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Validate => "Validating configuration",
            Self::CreateDirectories => "Creating directories",
            Self::AcquireBinary => "Installing FXServer build",
            Self::CloneDefaultResources => "Cloning default resources",
            Self::WriteMetadata => "Creating server metadata",
            Self::GenerateServerConfig => "Generating server.cfg",
            Self::GenerateLaunchScript => "Creating launch script",
            Self::RegisterInServerRegistry => "Registering server",
        }
    }

    /// Zero-based position, which is also the number of steps completed
    /// when this one starts.
    pub fn index(&self) -> usize {
        match self {
            Self::Validate => 0,
            Self::CreateDirectories => 1,
            Self::AcquireBinary => 2,
            Self::CloneDefaultResources => 3,
            Self::WriteMetadata => 4,
            Self::GenerateServerConfig => 5,
            Self::GenerateLaunchScript => 6,
            Self::RegisterInServerRegistry => 7,
        }
    }

    /// Overall progress reported when this step starts.
    ///
    /// `RegisterInServerRegistry` starts at the previous anchor; its 1.0 is
    /// reported only once the server is registered.
    pub fn anchor(&self) -> f64 {
        match self {
            Self::Validate => 0.0,
            Self::CreateDirectories => 0.14,
            Self::AcquireBinary => 0.28,
            Self::CloneDefaultResources => 0.57,
            Self::WriteMetadata => 0.625,
            Self::GenerateServerConfig => 0.75,
            Self::GenerateLaunchScript => 0.875,
            Self::RegisterInServerRegistry => 1.0,
        }
    }
}

impl fmt::Display for InstallStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Snapshot delivered to the installation progress callback.
#[derive(Debug, Clone, PartialEq)]
pub struct InstallProgress {
    pub step: InstallStep,
    /// What is happening right now, e.g. "Downloading FXServer".
    pub message: String,
    /// Overall progress in `[0, 1]`, never decreasing within one install.
    pub progress: f64,
    /// MB/s, only during the download sub-phase.
    pub download_speed: f64,
    pub download_eta: Option<Duration>,
    pub current_file: Option<String>,
    pub total_steps: usize,
    pub completed_steps: usize,
}

impl InstallProgress {
    pub fn new(step: InstallStep, message: impl Into<String>, progress: f64) -> Self {
        Self {
            step,
            message: message.into(),
            progress,
            download_speed: 0.0,
            download_eta: None,
            current_file: None,
            total_steps: TOTAL_STEPS,
            completed_steps: step.index(),
        }
    }

    /// Progress at the start of `step`.
    pub fn at_step(step: InstallStep) -> Self {
        Self::new(step, step.label(), step.anchor())
    }
}

/// Callback invoked with installation progress.
pub type InstallProgressFn<'a> = &'a (dyn Fn(&InstallProgress) + Sync);

/// Forwards snapshots to the callback, clamping progress so it never goes back.
pub(crate) struct ProgressTracker<'a> {
    last: Mutex<f64>,
    callback: InstallProgressFn<'a>,
}

impl<'a> ProgressTracker<'a> {
    pub(crate) fn new(callback: InstallProgressFn<'a>) -> Self {
        Self {
            last: Mutex::new(0.0),
            callback,
        }
    }

    pub(crate) fn report(&self, mut progress: InstallProgress) {
        let mut last = self.last.lock();
        let value = if progress.progress.is_finite() {
            progress.progress.clamp(0.0, 1.0)
        } else {
            *last
        };
        progress.progress = value.max(*last);
        *last = progress.progress;
        (self.callback)(&progress);
    }

    pub(crate) fn step(&self, step: InstallStep) {
        self.report(InstallProgress::at_step(step));
    }
}

/// Map a download fraction onto the download sub-range.
pub(crate) fn download_progress(fraction: Option<f64>) -> f64 {
    let fraction = fraction.unwrap_or(0.0).clamp(0.0, 1.0);
    DOWNLOAD_START + fraction * (DOWNLOAD_END - DOWNLOAD_START)
}
