//! The 11 fixed configuration domains tracked per target.
//!
//! Every run snapshots each domain in the order of [`ConfigDomain::ALL`];
//! the order is part of the output contract (changed domains are listed
//! in this order) and must not be reordered.

/// One facet of instance/database configuration tracked for drift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigDomain {
    /// Instance registry variables.
    RegistryVariables,
    /// Database manager configuration.
    DbmConfig,
    /// Per-database configuration.
    DbConfig,
    /// Bufferpool catalog.
    Bufferpools,
    /// Tablespace catalog.
    Tablespaces,
    /// Schema catalog.
    Schemas,
    /// Table catalog.
    Tables,
    /// Automatic runstats maintenance policy.
    RunstatsPolicy,
    /// Automatic reorg maintenance policy.
    ReorgPolicy,
    /// Automatic backup maintenance policy.
    BackupPolicy,
    /// Maintenance window policy.
    MaintenanceWindow,
}

impl ConfigDomain {
    /// Fixed processing and reporting order.
    pub const ALL: [ConfigDomain; 11] = [
        ConfigDomain::RegistryVariables,
        ConfigDomain::DbmConfig,
        ConfigDomain::DbConfig,
        ConfigDomain::Bufferpools,
        ConfigDomain::Tablespaces,
        ConfigDomain::Schemas,
        ConfigDomain::Tables,
        ConfigDomain::RunstatsPolicy,
        ConfigDomain::ReorgPolicy,
        ConfigDomain::BackupPolicy,
        ConfigDomain::MaintenanceWindow,
    ];

    /// Stable identifier, used for history file names and log fields.
    pub fn id(&self) -> &'static str {
        match self {
            ConfigDomain::RegistryVariables => "registry",
            ConfigDomain::DbmConfig => "dbm_cfg",
            ConfigDomain::DbConfig => "db_cfg",
            ConfigDomain::Bufferpools => "bufferpools",
            ConfigDomain::Tablespaces => "tablespaces",
            ConfigDomain::Schemas => "schemas",
            ConfigDomain::Tables => "tables",
            ConfigDomain::RunstatsPolicy => "auto_runstats",
            ConfigDomain::ReorgPolicy => "auto_reorg",
            ConfigDomain::BackupPolicy => "auto_backup",
            ConfigDomain::MaintenanceWindow => "maintenance_window",
        }
    }

    /// Human-readable name used in summaries.
    pub fn display_name(&self) -> &'static str {
        match self {
            ConfigDomain::RegistryVariables => "registry variables",
            ConfigDomain::DbmConfig => "database manager configuration",
            ConfigDomain::DbConfig => "database configuration",
            ConfigDomain::Bufferpools => "bufferpools",
            ConfigDomain::Tablespaces => "tablespaces",
            ConfigDomain::Schemas => "schemas",
            ConfigDomain::Tables => "tables",
            ConfigDomain::RunstatsPolicy => "automatic runstats policy",
            ConfigDomain::ReorgPolicy => "automatic reorg policy",
            ConfigDomain::BackupPolicy => "automatic backup policy",
            ConfigDomain::MaintenanceWindow => "maintenance window policy",
        }
    }

    /// History file name, unique within a target's store directory.
    pub fn history_file(&self) -> String {
        format!("{}.hist", self.id())
    }

    /// The four policy domains are produced asynchronously by the monitored
    /// system into a shared drop directory and fetched via freshness polling.
    pub fn is_policy(&self) -> bool {
        self.policy_file().is_some()
    }

    /// File name the monitored system writes for a policy domain, if any.
    pub fn policy_file(&self) -> Option<&'static str> {
        match self {
            ConfigDomain::RunstatsPolicy => Some("auto_runstats_policy.xml"),
            ConfigDomain::ReorgPolicy => Some("auto_reorg_policy.xml"),
            ConfigDomain::BackupPolicy => Some("auto_backup_policy.xml"),
            ConfigDomain::MaintenanceWindow => Some("maintenance_window_policy.xml"),
            _ => None,
        }
    }

    /// Policy kind name passed to the monitored system when requesting a
    /// policy export, if this is a policy domain.
    pub fn policy_kind(&self) -> Option<&'static str> {
        match self {
            ConfigDomain::RunstatsPolicy => Some("AUTO_RUNSTATS"),
            ConfigDomain::ReorgPolicy => Some("AUTO_REORG"),
            ConfigDomain::BackupPolicy => Some("AUTO_BACKUP"),
            ConfigDomain::MaintenanceWindow => Some("MAINTENANCE_WINDOW"),
            _ => None,
        }
    }
}

impl std::fmt::Display for ConfigDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}
