//! TLS material for the HTTPS listener.

use std::io;
use std::path::PathBuf;

use axum_server::tls_rustls::RustlsConfig;

/// Certificate and key files for the TCP listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

impl TlsPaths {
    /// Read the PEM pair. A missing file is reported by role before parsing.
    pub async fn load(&self) -> io::Result<RustlsConfig> {
        for (role, path) in [("certificate", &self.cert), ("private key", &self.key)] {
            if !tokio::fs::try_exists(path).await? {
                return Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("{role} file not found: {}", path.display()),
                ));
            }
        }
        RustlsConfig::from_pem_file(&self.cert, &self.key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[tokio::test]
    async fn missing_files_are_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let paths = TlsPaths {
            cert: dir.path().join("cert.crt"),
            key: dir.path().join("cert.key"),
        };

        let err = paths.load().await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert!(err.to_string().contains("certificate"));

        std::fs::write(&paths.cert, "not a cert").unwrap();
        let err = paths.load().await.unwrap_err();
        assert!(err.to_string().contains("private key"));
    }

    #[tokio::test]
    async fn loads_pem_pair() {
        let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures");
        let paths = TlsPaths {
            cert: fixtures.join("localhost.crt"),
            key: fixtures.join("localhost.key"),
        };
        assert!(paths.load().await.is_ok());
    }
}
