use reqwest::Url;

use super::ConfigError;

// <name>.<region>.<service>.amazonaws.<tld>
const AWS_ENDPOINT_LABEL_COUNT: usize = 5;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Endpoint {
    pub(crate) scheme: String,
    /// host[:port] of the upstream domain.
    pub(crate) authority: String,
    pub(crate) region: String,
    pub(crate) service: String,
}

impl Endpoint {
    pub(crate) fn resolve(endpoint: &str) -> Result<Self, ConfigError> {
        // A scheme-relative endpoint has an empty scheme, which means https.
        let absolute = match endpoint.starts_with("//") {
            true => format!("https:{endpoint}"),
            false => endpoint.to_string(),
        };
        let url = Url::parse(&absolute).map_err(|reason| ConfigError::UnparsableEndpoint {
            endpoint: endpoint.to_string(),
            reason: reason.to_string(),
        })?;

        let scheme = match url.scheme() {
            "http" | "https" => url.scheme().to_string(),
            _ => "https".to_string(),
        };

        // Unknown schemes can parse without a host.
        let host = match url.host_str() {
            Some(host) if !host.is_empty() => host,
            _ => return Err(ConfigError::EmptyHost(endpoint.to_string())),
        };
        let authority = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };

        let labels = host.split('.').collect::<Vec<_>>();
        if labels.len() != AWS_ENDPOINT_LABEL_COUNT {
            return Err(ConfigError::NotAnAwsEndpoint(endpoint.to_string()));
        }

        Ok(Endpoint {
            scheme,
            authority,
            region: labels[1].to_string(),
            service: labels[2].to_string(),
        })
    }

    pub(crate) fn is_https(&self) -> bool {
        self.scheme == "https"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn resolve_region_and_service_from_authority() -> Result<()> {
        let endpoint = Endpoint::resolve("https://foo.eu-west-1.es.amazonaws.com")?;

        assert_eq!(
            endpoint,
            Endpoint {
                scheme: "https".to_string(),
                authority: "foo.eu-west-1.es.amazonaws.com".to_string(),
                region: "eu-west-1".to_string(),
                service: "es".to_string(),
            }
        );
        Ok(())
    }

    #[test]
    fn keep_http_scheme_and_explicit_port() -> Result<()> {
        let endpoint = Endpoint::resolve("http://search-logs.us-east-2.aoss.amazonaws.com:8443/")?;

        assert_eq!(endpoint.scheme, "http");
        assert!(!endpoint.is_https());
        assert_eq!(endpoint.authority, "search-logs.us-east-2.aoss.amazonaws.com:8443");
        assert_eq!(endpoint.region, "us-east-2");
        assert_eq!(endpoint.service, "aoss");
        Ok(())
    }

    #[test]
    fn unknown_schemes_default_to_https() -> Result<()> {
        for raw in [
            "ftp://foo.eu-west-1.es.amazonaws.com",
            "es://foo.eu-west-1.es.amazonaws.com",
            "HTTPS://foo.eu-west-1.es.amazonaws.com",
            "//foo.eu-west-1.es.amazonaws.com",
        ] {
            let endpoint = Endpoint::resolve(raw)?;
            assert_eq!(endpoint.scheme, "https", "{raw}");
            assert_eq!(endpoint.authority, "foo.eu-west-1.es.amazonaws.com", "{raw}");
        }
        Ok(())
    }

    #[test]
    fn error_on_wrong_label_count() {
        for raw in [
            "https://bad.endpoint.com",
            "https://es.amazonaws.com",
            "https://a.foo.eu-west-1.es.amazonaws.com",
            "https://127.0.0.1:9200",
        ] {
            assert!(
                matches!(Endpoint::resolve(raw), Err(ConfigError::NotAnAwsEndpoint(_))),
                "{raw}"
            );
        }
    }

    #[test]
    fn error_on_missing_host() {
        // Without a scheme the host lands in the path.
        assert!(matches!(
            Endpoint::resolve("localhost:9200"),
            Err(ConfigError::EmptyHost(_))
        ));
    }

    #[test]
    fn error_on_unparsable_endpoint() {
        assert!(matches!(
            Endpoint::resolve("foo.eu-west-1.es.amazonaws.com"),
            Err(ConfigError::UnparsableEndpoint { .. })
        ));
        assert!(matches!(
            Endpoint::resolve(""),
            Err(ConfigError::UnparsableEndpoint { .. })
        ));
    }
}
