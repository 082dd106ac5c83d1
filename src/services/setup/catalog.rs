//! Fixed catalog of setup steps and their per-run status values.

use serde::{Deserialize, Serialize};

/// Identifier of one stage of the setup sequence, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepId {
    Check,
    Migrations,
    Admin,
    Data,
    Functions,
    Complete,
}

/// Number of steps in the catalog
pub const STEP_COUNT: usize = 6;

impl StepId {
    pub const ALL: [StepId; STEP_COUNT] = [
        StepId::Check,
        StepId::Migrations,
        StepId::Admin,
        StepId::Data,
        StepId::Functions,
        StepId::Complete,
    ];

    /// Position of the step in the sequence; used to index status arrays
    pub const fn index(self) -> usize {
        match self {
            StepId::Check => 0,
            StepId::Migrations => 1,
            StepId::Admin => 2,
            StepId::Data => 3,
            StepId::Functions => 4,
            StepId::Complete => 5,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            StepId::Check => "check",
            StepId::Migrations => "migrations",
            StepId::Admin => "admin",
            StepId::Data => "data",
            StepId::Functions => "functions",
            StepId::Complete => "complete",
        }
    }

    /// The remote bootstrap call backing this step, if any
    pub const fn remote(self) -> Option<RemoteStep> {
        match self {
            StepId::Migrations => Some(RemoteStep::Migrations),
            StepId::Admin => Some(RemoteStep::Admin),
            StepId::Data => Some(RemoteStep::Data),
            StepId::Check | StepId::Functions | StepId::Complete => None,
        }
    }

    /// Catalog entry for this step
    pub fn info(self) -> &'static SetupStep {
        &SETUP_STEPS[self.index()]
    }
}

impl std::fmt::Display for StepId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Display metadata for a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SetupStep {
    pub id: StepId,
    pub name: &'static str,
    pub description: &'static str,
}

pub const SETUP_STEPS: [SetupStep; STEP_COUNT] = [
    SetupStep {
        id: StepId::Check,
        name: "Checking Database",
        description: "Verifying database connection...",
    },
    SetupStep {
        id: StepId::Migrations,
        name: "Running Migrations",
        description: "Setting up database schema...",
    },
    SetupStep {
        id: StepId::Admin,
        name: "Creating Admin",
        description: "Setting up default admin account...",
    },
    SetupStep {
        id: StepId::Data,
        name: "Seeding Data",
        description: "Creating initial data...",
    },
    SetupStep {
        id: StepId::Functions,
        name: "Deploying Functions",
        description: "Setting up Edge Functions...",
    },
    SetupStep {
        id: StepId::Complete,
        name: "Complete",
        description: "Setup finished successfully!",
    },
];

/// Status of a single step within one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Running,
    Success,
    Error,
}

/// Steps the `setup-database` function accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteStep {
    Migrations,
    Admin,
    Data,
}

impl RemoteStep {
    pub const fn as_str(self) -> &'static str {
        match self {
            RemoteStep::Migrations => "migrations",
            RemoteStep::Admin => "admin",
            RemoteStep::Data => "data",
        }
    }

    /// Message shown when the function fails without a usable error body
    pub const fn failure_message(self) -> &'static str {
        match self {
            RemoteStep::Migrations => "Failed to run migrations",
            RemoteStep::Admin => "Failed to create admin",
            RemoteStep::Data => "Failed to seed data",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "migrations" => Some(RemoteStep::Migrations),
            "admin" => Some(RemoteStep::Admin),
            "data" => Some(RemoteStep::Data),
            _ => None,
        }
    }
}

impl std::fmt::Display for RemoteStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
