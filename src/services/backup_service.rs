//! Whole-database backup and restore through the PostgreSQL client tools.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use chrono::{DateTime, Local};
use futures::stream::{self, Stream};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::config::{AdminConfig, AppConfig, DatabaseConfig};

const CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("Invalid database target: {0}")]
    Target(String),

    #[error("Failed to start {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Restore failed: {detail}")]
    RestoreFailed { detail: String },
}

/// Connection parameters handed to `pg_dump`/`pg_restore`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PgTarget {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl PgTarget {
    /// Components from `DATABASE_URL` when set, falling back to the
    /// individual settings for anything the URL leaves out.
    pub fn from_config(config: &DatabaseConfig) -> Result<Self, BackupError> {
        let Some(raw) = &config.url else {
            return Ok(Self {
                host: config.host.clone(),
                port: config.port,
                user: config.user.clone(),
                password: config.password.clone(),
                database: config.name.clone(),
            });
        };

        let url = url::Url::parse(raw).map_err(|e| BackupError::Target(e.to_string()))?;
        let database = url.path().trim_start_matches('/');

        Ok(Self {
            host: url.host_str().unwrap_or(&config.host).to_string(),
            port: url.port().unwrap_or(config.port),
            user: if url.username().is_empty() {
                config.user.clone()
            } else {
                url.username().to_string()
            },
            password: url
                .password()
                .map(str::to_string)
                .unwrap_or_else(|| config.password.clone()),
            database: if database.is_empty() {
                config.name.clone()
            } else {
                database.to_string()
            },
        })
    }
}

#[derive(Debug, Clone)]
pub struct RestoreOutcome {
    pub source_name: String,
    pub output: String,
}

#[derive(Clone)]
pub struct BackupService {
    database: DatabaseConfig,
    admin: AdminConfig,
    temp_dir: PathBuf,
}

impl BackupService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            database: config.database.clone(),
            admin: config.admin.clone(),
            temp_dir: std::env::temp_dir(),
        }
    }

    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = dir.into();
        self
    }

    /// `magnifimind_backup_YYYY-MM-DD_HHMMSS.dump`
    pub fn backup_filename(now: DateTime<Local>) -> String {
        format!("magnifimind_backup_{}.dump", now.format("%Y-%m-%d_%H%M%S"))
    }

    /// `pg_dump -h -p -U -d -Fc` with the password in the child environment
    pub fn dump_command(&self) -> Result<Command, BackupError> {
        let target = PgTarget::from_config(&self.database)?;
        let mut cmd = Command::new(&self.admin.pg_dump_path);
        cmd.args(["-h", &target.host])
            .args(["-p", &target.port.to_string()])
            .args(["-U", &target.user])
            .args(["-d", &target.database])
            .arg("-Fc")
            .env("PGPASSWORD", &target.password);
        Ok(cmd)
    }

    /// Destructive restore: existing objects are dropped before recreation
    pub fn restore_command(&self, archive: &Path) -> Result<Command, BackupError> {
        let target = PgTarget::from_config(&self.database)?;
        let mut cmd = Command::new(&self.admin.pg_restore_path);
        cmd.args(["--clean", "--if-exists", "--no-owner", "--no-acl"])
            .args(["-h", &target.host])
            .args(["-p", &target.port.to_string()])
            .args(["-U", &target.user])
            .args(["-d", &target.database])
            .arg(archive)
            .env("PGPASSWORD", &target.password);
        Ok(cmd)
    }

    /// Spawn `pg_dump` and stream its stdout. Spawn failures are returned;
    /// anything that goes wrong after the first chunk can only be logged.
    pub fn stream_dump(
        &self,
    ) -> Result<impl Stream<Item = io::Result<Vec<u8>>> + Send + 'static, BackupError> {
        let mut child = self
            .dump_command()?
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| BackupError::Spawn {
                tool: self.admin.pg_dump_path.clone(),
                source,
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BackupError::Io(io::Error::new(io::ErrorKind::BrokenPipe, "pg_dump stdout unavailable")))?;
        // stderr must be read concurrently or a chatty pg_dump blocks on a full pipe
        if let Some(stderr) = child.stderr.take() {
            drain_stderr(stderr);
        }

        tracing::info!("Started database backup");
        Ok(stream::unfold(Some((child, stdout)), read_chunk))
    }

    /// Stage `archive` in a uniquely named temp file and run `pg_restore`
    /// against it. The temp file is removed whatever the outcome.
    pub async fn restore(&self, archive: &[u8], source_name: &str) -> Result<RestoreOutcome, BackupError> {
        let staged = self.temp_dir.join(format!("restore_{}.dump", Uuid::new_v4()));
        tokio::fs::write(&staged, archive).await?;
        tracing::info!("Restoring database from {} ({} bytes)", source_name, archive.len());

        let result = self.run_restore(&staged).await;

        if let Err(e) = tokio::fs::remove_file(&staged).await {
            tracing::warn!("Failed to remove {}: {}", staged.display(), e);
        }

        let output = result?;
        tracing::info!("Database restored from {}", source_name);
        Ok(RestoreOutcome {
            source_name: source_name.to_string(),
            output,
        })
    }

    async fn run_restore(&self, staged: &Path) -> Result<String, BackupError> {
        let output = self
            .restore_command(staged)?
            .output()
            .await
            .map_err(|source| BackupError::Spawn {
                tool: self.admin.pg_restore_path.clone(),
                source,
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if !output.status.success() {
            tracing::error!("pg_restore exited with {}: {}", output.status, stderr);
            return Err(BackupError::RestoreFailed { detail: stderr });
        }
        Ok(stderr)
    }
}

async fn read_chunk(
    state: Option<(Child, ChildStdout)>,
) -> Option<(io::Result<Vec<u8>>, Option<(Child, ChildStdout)>)> {
    let (mut child, mut stdout) = state?;
    let mut buf = vec![0u8; CHUNK_SIZE];

    match stdout.read(&mut buf).await {
        Ok(0) => {
            drop(stdout);
            finish_dump(child).await;
            None
        }
        Ok(n) => {
            buf.truncate(n);
            Some((Ok(buf), Some((child, stdout))))
        }
        Err(e) => {
            tracing::error!("Error streaming backup: {}", e);
            if let Err(kill_err) = child.kill().await {
                tracing::warn!("Failed to stop pg_dump: {}", kill_err);
            }
            Some((Err(e), None))
        }
    }
}

/// Log pg_dump diagnostics line by line; resolves to the number of lines read
fn drain_stderr(stderr: ChildStderr) -> JoinHandle<usize> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        let mut count = 0;
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    count += 1;
                    tracing::warn!("pg_dump: {}", line);
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!("Failed to read pg_dump stderr: {}", e);
                    break;
                }
            }
        }
        count
    })
}

async fn finish_dump(mut child: Child) {
    match child.wait().await {
        Ok(status) if status.success() => tracing::info!("Database backup completed"),
        Ok(status) => tracing::error!("Backup error: pg_dump exited with {}", status),
        Err(e) => tracing::error!("Backup error: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use futures::StreamExt;
    use std::ffi::OsStr;

    fn config() -> AppConfig {
        AppConfig::from_lookup(|key| match key {
            "DB_HOST" => Some("db.internal".to_string()),
            "DB_PORT" => Some("5433".to_string()),
            "DB_USER" => Some("crm".to_string()),
            "DB_PASSWORD" => Some("s3cret".to_string()),
            "DB_NAME" => Some("crm_prod".to_string()),
            _ => None,
        })
    }

    fn args(cmd: &Command) -> Vec<String> {
        cmd.as_std()
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    fn env_value<'a>(cmd: &'a Command, key: &str) -> Option<&'a OsStr> {
        cmd.as_std()
            .get_envs()
            .find(|(k, _)| *k == OsStr::new(key))
            .and_then(|(_, v)| v)
    }

    #[test]
    fn filename_uses_timestamp() {
        let at = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 2).unwrap();
        assert_eq!(BackupService::backup_filename(at), "magnifimind_backup_2024-03-09_070502.dump");
    }

    #[test]
    fn dump_command_targets_configured_database() {
        let service = BackupService::new(&config());
        let cmd = service.dump_command().unwrap();

        assert_eq!(cmd.as_std().get_program(), OsStr::new("pg_dump"));
        assert_eq!(
            args(&cmd),
            vec!["-h", "db.internal", "-p", "5433", "-U", "crm", "-d", "crm_prod", "-Fc"]
        );
        assert_eq!(env_value(&cmd, "PGPASSWORD"), Some(OsStr::new("s3cret")));
    }

    #[test]
    fn restore_command_cleans_and_skips_ownership() {
        let service = BackupService::new(&config());
        let cmd = service.restore_command(Path::new("/tmp/upload.dump")).unwrap();

        assert_eq!(cmd.as_std().get_program(), OsStr::new("pg_restore"));
        assert_eq!(
            args(&cmd),
            vec![
                "--clean", "--if-exists", "--no-owner", "--no-acl", "-h", "db.internal", "-p", "5433",
                "-U", "crm", "-d", "crm_prod", "/tmp/upload.dump",
            ]
        );
    }

    #[test]
    fn target_prefers_database_url() {
        let mut database = config().database;
        database.url = Some("postgres://app:pw@10.0.0.5:6543/crm_url?sslmode=require".to_string());
        let target = PgTarget::from_config(&database).unwrap();

        assert_eq!(
            target,
            PgTarget {
                host: "10.0.0.5".to_string(),
                port: 6543,
                user: "app".to_string(),
                password: "pw".to_string(),
                database: "crm_url".to_string(),
            }
        );
    }

    #[test]
    fn target_fills_gaps_from_components() {
        let mut database = config().database;
        database.url = Some("postgres://10.0.0.5".to_string());
        let target = PgTarget::from_config(&database).unwrap();

        assert_eq!(target.port, 5433);
        assert_eq!(target.user, "crm");
        assert_eq!(target.database, "crm_prod");
    }

    #[test]
    fn custom_tool_paths_are_used() {
        let mut config = config();
        config.admin.pg_dump_path = "/opt/pg/bin/pg_dump".to_string();
        config.admin.pg_restore_path = "/opt/pg/bin/pg_restore".to_string();
        let service = BackupService::new(&config);

        assert_eq!(service.dump_command().unwrap().as_std().get_program(), OsStr::new("/opt/pg/bin/pg_dump"));
        assert_eq!(
            service.restore_command(Path::new("x")).unwrap().as_std().get_program(),
            OsStr::new("/opt/pg/bin/pg_restore")
        );
    }

    #[tokio::test]
    async fn missing_dump_tool_fails_before_streaming() {
        let mut config = config();
        config.admin.pg_dump_path = format!("/nonexistent/{}/pg_dump", Uuid::new_v4());
        let service = BackupService::new(&config);

        assert!(matches!(service.stream_dump(), Err(BackupError::Spawn { .. })));
    }

    #[tokio::test]
    async fn failed_restore_removes_staged_file() {
        let dir = std::env::temp_dir().join(format!("crm-restore-test-{}", Uuid::new_v4()));
        tokio::fs::create_dir_all(&dir).await.unwrap();

        let mut config = config();
        config.admin.pg_restore_path = format!("/nonexistent/{}/pg_restore", Uuid::new_v4());
        let service = BackupService::new(&config).with_temp_dir(&dir);

        let err = service.restore(b"PGDMP", "upload.dump").await.unwrap_err();
        assert!(matches!(err, BackupError::Spawn { .. }));

        let mut entries = tokio::fs::read_dir(&dir).await.unwrap();
        assert!(entries.next_entry().await.unwrap().is_none());
        tokio::fs::remove_dir(&dir).await.unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn dump_stream_yields_tool_output() {
        // `echo` stands in for pg_dump and prints the arguments it was given
        let mut config = config();
        config.admin.pg_dump_path = "echo".to_string();
        let service = BackupService::new(&config);

        let chunks: Vec<Vec<u8>> = service
            .stream_dump()
            .unwrap()
            .map(|chunk| chunk.unwrap())
            .collect()
            .await;
        let output = String::from_utf8(chunks.concat()).unwrap();
        assert_eq!(output.trim_end(), "-h db.internal -p 5433 -U crm -d crm_prod -Fc");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn noisy_stderr_does_not_stall_the_dump() {
        use std::os::unix::fs::PermissionsExt;

        // Far more diagnostics than a pipe buffer holds, written before any stdout
        let script = std::env::temp_dir().join(format!("fake-pg-dump-{}.sh", Uuid::new_v4()));
        std::fs::write(&script, "#!/bin/sh\nyes 'pg_dump: warning' | head -n 20000 >&2\necho archive\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let mut config = config();
        config.admin.pg_dump_path = script.to_string_lossy().into_owned();
        let service = BackupService::new(&config);

        let chunks: Vec<Vec<u8>> = tokio::time::timeout(
            std::time::Duration::from_secs(20),
            service.stream_dump().unwrap().map(|chunk| chunk.unwrap()).collect::<Vec<Vec<u8>>>(),
        )
        .await
        .expect("dump stalled on stderr");
        std::fs::remove_file(&script).unwrap();

        assert_eq!(String::from_utf8(chunks.concat()).unwrap(), "archive\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stderr_drain_reads_every_line() {
        let mut child = Command::new("sh")
            .args(["-c", "printf 'one\\ntwo\\nthree\\n' >&2"])
            .stderr(Stdio::piped())
            .spawn()
            .unwrap();
        let lines = drain_stderr(child.stderr.take().unwrap()).await.unwrap();
        child.wait().await.unwrap();
        assert_eq!(lines, 3);
    }
}
