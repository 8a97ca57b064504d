/// Run, step and entity status definitions for tracking pipeline progress
///
/// Every enum here has a stable database string so the storage layer and the
/// report output agree on spelling.
use serde::Serialize;
use std::fmt;

/// Aggregate status of one pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Entities are still being worked on
    Processing,
    /// Every entity finished successfully
    Completed,
    /// Some, but not all, entities failed
    Partial,
    /// Every entity failed
    Failed,
}

impl RunStatus {
    /// Returns true once the run can no longer change
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Processing)
    }

    /// Computes the terminal status from the failed/total entity ratio
    ///
    /// Returns the status together with the error summary stored on the run.
    pub fn from_outcomes(total: usize, failed: usize) -> (Self, Option<String>) {
        let status = if failed == total {
            Self::Failed
        } else if failed > 0 {
            Self::Partial
        } else {
            Self::Completed
        };

        let summary = (failed > 0).then(|| format!("{}/{} companies failed", failed, total));
        (status, summary)
    }

    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Partial => "partial",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "processing" => Some(Self::Processing),
            "completed" => Some(Self::Completed),
            "partial" => Some(Self::Partial),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// The pipeline step an entity is currently in
///
/// Variants are declared in execution order; the derived `Ord` is what keeps
/// step transitions monotonic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStep {
    Pending,
    Searching,
    CrawlingLeadership,
    CrawlingAssets,
    ExtractingLeadership,
    ExtractingAssets,
    Storing,
    Complete,
    Failed,
}

impl PipelineStep {
    /// Returns true if this step ends the entity's processing
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }

    /// Returns true if moving from `self` to `next` keeps the step order monotonic
    ///
    /// Re-entering the same step is allowed; leaving a terminal step is not.
    pub fn can_advance_to(&self, next: PipelineStep) -> bool {
        !self.is_terminal() && next >= *self
    }

    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Searching => "searching",
            Self::CrawlingLeadership => "crawling_leadership",
            Self::CrawlingAssets => "crawling_assets",
            Self::ExtractingLeadership => "extracting_leadership",
            Self::ExtractingAssets => "extracting_assets",
            Self::Storing => "storing",
            Self::Complete => "complete",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "searching" => Some(Self::Searching),
            "crawling_leadership" => Some(Self::CrawlingLeadership),
            "crawling_assets" => Some(Self::CrawlingAssets),
            "extracting_leadership" => Some(Self::ExtractingLeadership),
            "extracting_assets" => Some(Self::ExtractingAssets),
            "storing" => Some(Self::Storing),
            "complete" => Some(Self::Complete),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Returns all steps in execution order
    pub fn all_steps() -> Vec<Self> {
        vec![
            Self::Pending,
            Self::Searching,
            Self::CrawlingLeadership,
            Self::CrawlingAssets,
            Self::ExtractingLeadership,
            Self::ExtractingAssets,
            Self::Storing,
            Self::Complete,
            Self::Failed,
        ]
    }
}

/// Coarse status of one entity within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityState {
    Pending,
    Processing,
    Complete,
    Failed,
}

impl EntityState {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Complete => "complete",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "processing" => Some(Self::Processing),
            "complete" => Some(Self::Complete),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

impl fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

impl fmt::Display for EntityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
