//! HTTP boundary.
//!
//! Every remote call goes through `Transport`. The default implementation is
//! a blocking reqwest client; tests plug in fakes.

use crate::error::{AdapterError, Result};

/// Header asking the query service to authorize external data sources on
/// behalf of the caller.
pub const DATA_SOURCE_AUTH_HEADER: (&str, &str) = ("X-DataSource-Auth", "true");

/// Status and body of a completed request.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// One blocking request per call. No retries, no timeout beyond the client's.
pub trait Transport {
    fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<HttpResponse>;

    /// Form-encoded POST, used for token exchange only.
    fn post_form(&self, url: &str, _form: &[(&str, &str)]) -> Result<HttpResponse> {
        Err(AdapterError::NotSupported(format!("POST {url}")))
    }
}

#[cfg(feature = "http")]
pub use client::HttpTransport;

#[cfg(feature = "http")]
mod client {
    use super::{HttpResponse, Transport};
    use crate::auth::{Credentials, ServiceAccountTokenSource, TokenSource};
    use crate::error::{AdapterError, Result};

    /// Blocking reqwest transport, anonymous or bearer-authorized.
    pub struct HttpTransport {
        client: reqwest::blocking::Client,
        token_source: Option<Box<dyn TokenSource>>,
    }

    impl HttpTransport {
        pub fn anonymous() -> Result<Self> {
            Ok(Self {
                client: build_client()?,
                token_source: None,
            })
        }

        pub fn authorized(token_source: Box<dyn TokenSource>) -> Result<Self> {
            Ok(Self {
                client: build_client()?,
                token_source: Some(token_source),
            })
        }

        /// Anonymous when `credentials` is `None`.
        pub fn from_credentials(credentials: Option<Credentials>) -> Result<Self> {
            match credentials {
                Some(creds) => Self::authorized(Box::new(ServiceAccountTokenSource::new(creds)?)),
                None => Self::anonymous(),
            }
        }
    }

    fn build_client() -> Result<reqwest::blocking::Client> {
        reqwest::blocking::Client::builder()
            .build()
            .map_err(|e| AdapterError::Http(e.to_string()))
    }

    impl Transport for HttpTransport {
        fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<HttpResponse> {
            let mut req = self.client.get(url);
            for (k, v) in headers {
                req = req.header(*k, *v);
            }
            if let Some(source) = &self.token_source {
                req = req.bearer_auth(source.token()?);
            }

            read(req.send().map_err(|e| AdapterError::Http(e.to_string()))?)
        }

        fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<HttpResponse> {
            let resp = self
                .client
                .post(url)
                .form(form)
                .send()
                .map_err(|e| AdapterError::Http(e.to_string()))?;
            read(resp)
        }
    }

    fn read(resp: reqwest::blocking::Response) -> Result<HttpResponse> {
        let status = resp.status().as_u16();
        // Decodes with the declared charset, UTF-8 when none is given.
        let body = resp.text().map_err(|e| AdapterError::Http(e.to_string()))?;
        Ok(HttpResponse { status, body })
    }
}
