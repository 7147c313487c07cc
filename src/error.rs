use thiserror::Error;

/// Failures while bringing the service up. Request-time failures are answered
/// through `ReqContext`, which knows the deployment environment.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Template error: {0}")]
    Template(#[from] tera::Error),

    #[error("Invalid address: {0}")]
    Address(#[from] std::net::AddrParseError),

    #[error("Metrics exporter error: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_addr(value: &str) -> Result<std::net::SocketAddr> {
        Ok(value.parse()?)
    }

    #[test]
    fn test_address_error_converts() {
        let err = parse_addr("not an address").unwrap_err();
        assert!(matches!(err, AppError::Address(_)));
        assert!(err.to_string().starts_with("Invalid address"));
        assert!(parse_addr("127.0.0.1:3000").is_ok());
    }

    #[test]
    fn test_template_error_converts() {
        let err: AppError = tera::Tera::one_off("{{ unclosed", &tera::Context::new(), false)
            .unwrap_err()
            .into();
        assert!(err.to_string().starts_with("Template error"));
    }
}
