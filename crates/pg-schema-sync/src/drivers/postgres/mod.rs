//! Live PostgreSQL metadata adapter.
//!
//! Connection pooling and TLS setup live here; the catalog queries that
//! turn `pg_catalog`/`information_schema` rows into descriptors live in
//! [`reader`].

mod reader;

pub use reader::PostgresSource;

use std::sync::Arc;

use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use rustls::ClientConfig;
use tokio_postgres::Config as PgConfig;
use tokio_postgres_rustls::MakeRustlsConnect;
use tracing::{info, warn};

use crate::config::EndpointConfig;
use crate::error::{Result, SyncError};

/// Build a connection pool for one endpoint and verify it with a smoke test.
pub(crate) async fn build_pool(config: &EndpointConfig, max_conns: usize) -> Result<Pool> {
    let mut pg_config = PgConfig::new();
    pg_config.host(&config.host);
    pg_config.port(config.port);
    pg_config.dbname(&config.database);
    pg_config.user(&config.user);
    pg_config.password(&config.password);

    let mgr_config = ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    };

    let pool = match config.ssl_mode.to_lowercase().as_str() {
        "disable" => {
            warn!("PostgreSQL TLS is disabled. Credentials will be transmitted in plaintext.");
            let mgr = Manager::from_config(pg_config, tokio_postgres::NoTls, mgr_config);
            Pool::builder(mgr)
                .max_size(max_conns)
                .build()
                .map_err(|e| SyncError::pool(e, "creating connection pool"))?
        }
        other => {
            let tls_config = build_tls_config(other)?;
            let tls_connector = MakeRustlsConnect::new(tls_config);
            let mgr = Manager::from_config(pg_config, tls_connector, mgr_config);
            Pool::builder(mgr)
                .max_size(max_conns)
                .build()
                .map_err(|e| SyncError::pool(e, "creating connection pool"))?
        }
    };

    // Smoke test before any phase runs.
    let client = pool
        .get()
        .await
        .map_err(|e| SyncError::pool(e, format!("testing connection to {}", config.label())))?;
    client.simple_query("SELECT 1").await?;

    info!("Connected to {}", config.label());
    Ok(pool)
}

/// Build TLS configuration for the requested ssl_mode.
fn build_tls_config(ssl_mode: &str) -> Result<ClientConfig> {
    let mut root_store = rustls::RootCertStore::empty();
    root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let config = match ssl_mode {
        "require" => {
            warn!("ssl_mode=require: TLS enabled but server certificate is not verified.");
            ClientConfig::builder()
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(NoVerifier))
                .with_no_client_auth()
        }
        "verify-ca" | "verify-full" => {
            info!("ssl_mode={}: certificate verification enabled", ssl_mode);
            ClientConfig::builder()
                .with_root_certificates(root_store)
                .with_no_client_auth()
        }
        other => {
            return Err(SyncError::Config(format!(
                "Invalid ssl_mode '{}'. Valid options: disable, require, verify-ca, verify-full",
                other
            )));
        }
    };

    Ok(config)
}

/// Certificate verifier that accepts any certificate (ssl_mode=require).
#[derive(Debug)]
struct NoVerifier;

impl rustls::client::danger::ServerCertVerifier for NoVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &rustls::pki_types::CertificateDer<'_>,
        _intermediates: &[rustls::pki_types::CertificateDer<'_>],
        _server_name: &rustls::pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> std::result::Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        vec![
            rustls::SignatureScheme::RSA_PKCS1_SHA256,
            rustls::SignatureScheme::RSA_PKCS1_SHA384,
            rustls::SignatureScheme::RSA_PKCS1_SHA512,
            rustls::SignatureScheme::ECDSA_NISTP256_SHA256,
            rustls::SignatureScheme::ECDSA_NISTP384_SHA384,
            rustls::SignatureScheme::ECDSA_NISTP521_SHA512,
            rustls::SignatureScheme::RSA_PSS_SHA256,
            rustls::SignatureScheme::RSA_PSS_SHA384,
            rustls::SignatureScheme::RSA_PSS_SHA512,
            rustls::SignatureScheme::ED25519,
        ]
    }
}
