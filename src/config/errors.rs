#[derive(thiserror::Error, Debug)]
pub(crate) enum ConfigError {
    #[error("You need to specify Amazon ElasticSearch endpoint. Please run with '-h' for a list of available arguments.")]
    MissingEndpoint,
    #[error("Failed parsing endpoint: {endpoint} ({reason})")]
    UnparsableEndpoint { endpoint: String, reason: String },
    #[error("Empty host information in submitted endpoint ({0})")]
    EmptyHost(String),
    #[error("Submitted endpoint is not a valid Amazon ElasticSearch Endpoint: {0}")]
    NotAnAwsEndpoint(String),
    #[error("Credential refresh interval must be a non-negative number of seconds, got {0}")]
    InvalidRefreshInterval(f64),
    #[error("Couldn't read config file {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Couldn't parse config file: {0}")]
    ParseFile(#[from] toml::de::Error),
}
