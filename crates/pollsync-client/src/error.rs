use thiserror::Error;

/// Construction-time failures. Request failures use `pollsync_core::TransportError`.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid url {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("unsupported url scheme {0}")]
    UnsupportedScheme(String),
    #[error("failed to build http client: {0}")]
    Build(String),
}

pub(crate) fn parse_url(raw: &str, schemes: &[&str]) -> Result<url::Url, ClientError> {
    let url = url::Url::parse(raw).map_err(|source| ClientError::InvalidUrl {
        url: raw.to_string(),
        source,
    })?;
    if !schemes.contains(&url.scheme()) {
        return Err(ClientError::UnsupportedScheme(url.scheme().to_string()));
    }
    Ok(url)
}
