use serde::{Deserialize, Serialize};
use std::fmt;

/// Export flows offered by the back office
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExportKind {
    /// Order recap
    Orders,
    /// Payment recap
    Payments,
    /// Billing (tagihan) recap
    Bills,
    /// Provider transactions by year
    Providers,
}

impl ExportKind {
    pub const ALL: [ExportKind; 4] = [
        ExportKind::Orders,
        ExportKind::Payments,
        ExportKind::Bills,
        ExportKind::Providers,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ExportKind::Orders => "orders",
            ExportKind::Payments => "payments",
            ExportKind::Bills => "bills",
            ExportKind::Providers => "providers",
        }
    }

    pub fn default_start_path(self) -> String {
        format!("{}/export", self.as_str())
    }

    /// Status path template; `{job_id}` is substituted per request
    pub fn default_status_path(self) -> String {
        format!("{}/export/{{job_id}}", self.as_str())
    }
}

impl fmt::Display for ExportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
