use clap::{Parser, ValueEnum};
use ipnet::IpNet;
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;
use std::path::PathBuf;
use tinylink_shortener::ListPolicy;

pub const LISTEN_ADDR_ENV: &str = "TINYLINK_LISTEN_ADDR";
pub const BASE_URL_ENV: &str = "TINYLINK_BASE_URL";
pub const STORAGE_BACKEND_ENV: &str = "TINYLINK_STORAGE_BACKEND";
pub const FILE_STORAGE_PATH_ENV: &str = "TINYLINK_FILE_STORAGE_PATH";
pub const MYSQL_DSN_ENV: &str = "TINYLINK_MYSQL_DSN";
pub const REQUEST_TIMEOUT_ENV: &str = "TINYLINK_REQUEST_TIMEOUT_MS";
pub const BATCH_WORKERS_ENV: &str = "TINYLINK_BATCH_WORKERS";
pub const LIST_DELETED_ENV: &str = "TINYLINK_LIST_DELETED";
pub const RESOLVE_CACHE_CAPACITY_ENV: &str = "TINYLINK_RESOLVE_CACHE_CAPACITY";
pub const TRUSTED_SUBNET_ENV: &str = "TINYLINK_TRUSTED_SUBNET";
pub const LOG_LEVEL_ENV: &str = "TINYLINK_LOG_LEVEL";
pub const LOG_JSON_ENV: &str = "TINYLINK_LOG_JSON";

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_FILE_STORAGE_PATH: &str = "/tmp/short-url-db.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackendArg {
    #[value(name = "in-memory")]
    InMemory,
    #[value(name = "file")]
    File,
    #[value(name = "mysql")]
    Mysql,
}

impl Display for StorageBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackendArg::InMemory => write!(f, "in-memory"),
            StorageBackendArg::File => write!(f, "file"),
            StorageBackendArg::Mysql => write!(f, "mysql"),
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "tinylink-gateway")]
pub struct CLI {
    #[arg(long, env = LISTEN_ADDR_ENV, default_value = DEFAULT_LISTEN_ADDR)]
    pub listen_addr: SocketAddr,

    /// Prefix used to render full short links.
    #[arg(long, env = BASE_URL_ENV, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    #[arg(
        long,
        env = STORAGE_BACKEND_ENV,
        value_enum,
        default_value_t = StorageBackendArg::InMemory
    )]
    pub storage: StorageBackendArg,

    #[arg(long, env = FILE_STORAGE_PATH_ENV, default_value = DEFAULT_FILE_STORAGE_PATH)]
    pub file_storage_path: PathBuf,

    #[arg(long, env = MYSQL_DSN_ENV, required_if_eq("storage", "mysql"))]
    pub mysql_dsn: Option<String>,

    /// Deadline of a create or bulk create request, in milliseconds.
    #[arg(long, env = REQUEST_TIMEOUT_ENV, default_value_t = 10_000)]
    pub request_timeout_ms: u64,

    #[arg(long, env = BATCH_WORKERS_ENV, default_value_t = 5)]
    pub batch_workers: usize,

    /// Whether owner listings include deleted mappings.
    #[arg(
        long,
        env = LIST_DELETED_ENV,
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    pub list_deleted: bool,

    /// Entries in the resolve cache; 0 disables it.
    #[arg(long, env = RESOLVE_CACHE_CAPACITY_ENV, default_value_t = 10_000)]
    pub resolve_cache_capacity: u64,

    /// CIDR allowed to read the internal endpoints; unset keeps them closed.
    #[arg(long, env = TRUSTED_SUBNET_ENV)]
    pub trusted_subnet: Option<IpNet>,

    #[arg(long, env = LOG_LEVEL_ENV, default_value = "info")]
    pub log_level: String,

    #[arg(long, env = LOG_JSON_ENV, default_value_t = false)]
    pub log_json: bool,
}

impl CLI {
    pub fn list_policy(&self) -> ListPolicy {
        if self.list_deleted {
            ListPolicy::IncludeDeleted
        } else {
            ListPolicy::ExcludeDeleted
        }
    }
}
