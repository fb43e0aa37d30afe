use anyhow::{Context, Result, bail};
use clap::Parser;
use std::{env, path::PathBuf};

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub storage_dir: String,
    pub database_url: String,
    pub bucket_name: String,
    pub folder_name: String,
    pub table_name: String,
    pub public_url: String,
    pub signing_key: Option<String>,
    pub logo_path: PathBuf,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Styled QR-code generator with signed download links")]
pub struct Args {
    /// Host to bind to (overrides QR_STORE_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides QR_STORE_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory where generated images are stored (overrides QR_STORE_STORAGE_DIR)
    #[arg(long)]
    pub storage_dir: Option<String>,

    /// Database URL for the metadata table (overrides QR_STORE_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Bucket receiving generated images (overrides QR_STORE_BUCKET_NAME)
    #[arg(long)]
    pub bucket_name: Option<String>,

    /// Folder inside the bucket (overrides QR_STORE_FOLDER_NAME)
    #[arg(long)]
    pub folder_name: Option<String>,

    /// Metadata table name (overrides QR_STORE_TABLE_NAME)
    #[arg(long)]
    pub table_name: Option<String>,

    /// Base URL used in download links (overrides QR_STORE_PUBLIC_URL)
    #[arg(long)]
    pub public_url: Option<String>,

    /// Key for signing download links (overrides QR_STORE_SIGNING_KEY)
    #[arg(long)]
    pub signing_key: Option<String>,

    /// Logo embedded at the center of every code (overrides QR_STORE_LOGO_PATH)
    #[arg(long)]
    pub logo_path: Option<PathBuf>,

    /// Create the metadata table and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        Self::from_sources(Args::parse(), |name| env::var(name))
    }

    /// Merge parsed args over a variable lookup. CLI values win.
    ///
    /// Fails when the bucket, folder or table name is missing from both.
    pub fn from_sources<F>(args: Args, lookup: F) -> Result<(Self, bool)>
    where
        F: Fn(&str) -> Result<String, env::VarError>,
    {
        let var = |name: &str| -> Result<Option<String>> {
            match lookup(name) {
                Ok(value) => Ok(Some(value)),
                Err(env::VarError::NotPresent) => Ok(None),
                Err(err) => Err(err).with_context(|| format!("reading {}", name)),
            }
        };
        let required = |arg: Option<String>, name: &str, flag: &str| -> Result<String> {
            match arg.or(var(name)?) {
                Some(value) if !value.trim().is_empty() => Ok(value),
                _ => bail!("missing required setting {} (or --{})", name, flag),
            }
        };

        // --- Environment fallback ---
        let env_host = var("QR_STORE_HOST")?.unwrap_or_else(|| "0.0.0.0".into());
        let env_port = match var("QR_STORE_PORT")? {
            Some(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing QR_STORE_PORT value `{}`", value))?,
            None => 3000,
        };
        let env_storage = var("QR_STORE_STORAGE_DIR")?.unwrap_or_else(|| "./data/objects".into());
        let env_db = var("QR_STORE_DATABASE_URL")?
            .unwrap_or_else(|| "sqlite://./data/meta/qr_store.db".into());
        let env_logo = var("QR_STORE_LOGO_PATH")?.unwrap_or_else(|| "resources/logo.png".into());

        let bucket_name = required(args.bucket_name, "QR_STORE_BUCKET_NAME", "bucket-name")?;
        let folder_name = required(args.folder_name, "QR_STORE_FOLDER_NAME", "folder-name")?;
        let table_name = required(args.table_name, "QR_STORE_TABLE_NAME", "table-name")?;

        // --- Merge ---
        let host = args.host.unwrap_or(env_host);
        let port = args.port.unwrap_or(env_port);
        let public_url = match args.public_url.or(var("QR_STORE_PUBLIC_URL")?) {
            Some(url) => url,
            None => format!("http://{}:{}", host, port),
        };

        let cfg = Self {
            storage_dir: args.storage_dir.unwrap_or(env_storage),
            database_url: args.database_url.unwrap_or(env_db),
            bucket_name,
            folder_name,
            table_name,
            public_url,
            signing_key: args.signing_key.or(var("QR_STORE_SIGNING_KEY")?),
            logo_path: args.logo_path.unwrap_or_else(|| PathBuf::from(env_logo)),
            host,
            port,
        };

        Ok((cfg, args.migrate))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Result<String, env::VarError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned().ok_or(env::VarError::NotPresent)
    }

    const REQUIRED: [(&str, &str); 3] = [
        ("QR_STORE_BUCKET_NAME", "qr-bucket"),
        ("QR_STORE_FOLDER_NAME", "qr-codes"),
        ("QR_STORE_TABLE_NAME", "qr_codes"),
    ];

    #[test]
    fn defaults_with_required_env() {
        let (cfg, migrate) = AppConfig::from_sources(Args::default(), lookup(&REQUIRED)).unwrap();
        assert!(!migrate);
        assert_eq!(cfg.addr(), "0.0.0.0:3000");
        assert_eq!(cfg.bucket_name, "qr-bucket");
        assert_eq!(cfg.folder_name, "qr-codes");
        assert_eq!(cfg.table_name, "qr_codes");
        assert_eq!(cfg.public_url, "http://0.0.0.0:3000");
        assert_eq!(cfg.logo_path, PathBuf::from("resources/logo.png"));
        assert!(cfg.signing_key.is_none());
    }

    #[test]
    fn each_required_setting_is_enforced() {
        for missing in ["QR_STORE_BUCKET_NAME", "QR_STORE_FOLDER_NAME", "QR_STORE_TABLE_NAME"] {
            let vars: Vec<_> = REQUIRED.into_iter().filter(|(k, _)| *k != missing).collect();
            let err = AppConfig::from_sources(Args::default(), lookup(&vars)).unwrap_err();
            assert!(err.to_string().contains(missing), "{err}");
        }
    }

    #[test]
    fn cli_overrides_env() {
        let args = Args::parse_from([
            "qr-store",
            "--port",
            "8080",
            "--bucket-name",
            "cli-bucket",
            "--public-url",
            "https://qr.example.com",
            "--migrate",
        ]);
        let mut vars = REQUIRED.to_vec();
        vars.push(("QR_STORE_PORT", "9000"));
        let (cfg, migrate) = AppConfig::from_sources(args, lookup(&vars)).unwrap();
        assert!(migrate);
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.bucket_name, "cli-bucket");
        assert_eq!(cfg.public_url, "https://qr.example.com");
    }

    #[test]
    fn bad_port_is_an_error() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("QR_STORE_PORT", "not-a-port"));
        assert!(AppConfig::from_sources(Args::default(), lookup(&vars)).is_err());
    }
}
