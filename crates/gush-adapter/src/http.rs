use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use gush_core::error::GushError;
use gush_core::models::AdapterKind;

const USER_AGENT: &str = concat!("gush/", env!("CARGO_PKG_VERSION"));

/// Thin JSON client shared by the REST adapters.
pub struct RestClient {
    client: reqwest::Client,
    api_url: url::Url,
    adapter: AdapterKind,
    basic_auth: Option<(String, String)>,
}

impl RestClient {
    /// Build a client that sends `headers` with every request.
    pub fn new(
        adapter: AdapterKind,
        api_url: url::Url,
        mut headers: HeaderMap,
    ) -> Result<Self, GushError> {
        headers.insert(header::USER_AGENT, HeaderValue::from_static(USER_AGENT));
        headers
            .entry(header::ACCEPT)
            .or_insert(HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| GushError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_url,
            adapter,
            basic_auth: None,
        })
    }

    /// Authenticate every request with HTTP basic auth.
    pub fn with_basic_auth(mut self, username: &str, password: &str) -> Self {
        self.basic_auth = Some((username.to_string(), password.to_string()));
        self
    }

    /// `Authorization`-style header value, rejecting secrets that are not valid header text.
    pub fn header_value(adapter: AdapterKind, value: &str) -> Result<HeaderValue, GushError> {
        let mut value = HeaderValue::from_str(value).map_err(|_| GushError::CredentialError {
            message: format!("{adapter} token contains invalid characters"),
        })?;
        value.set_sensitive(true);
        Ok(value)
    }

    pub fn url(&self, path: &str) -> String {
        let base = self.api_url.as_str().trim_end_matches('/');
        format!("{base}{path}")
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        tracing::debug!(adapter = %self.adapter, "{method} {url}");
        let builder = self.client.request(method, url);
        match &self.basic_auth {
            Some((user, password)) => builder.basic_auth(user, Some(password)),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, GushError> {
        let resp = builder.send().await.map_err(|e| GushError::ApiError {
            status: 0,
            message: e.to_string(),
        })?;
        self.check(resp).await
    }

    /// Map non-success responses onto [`GushError`].
    async fn check(&self, resp: Response) -> Result<Response, GushError> {
        let status = resp.status().as_u16();
        if resp.status().is_success() {
            return Ok(resp);
        }

        let quota_exhausted = resp
            .headers()
            .get("x-ratelimit-remaining")
            .is_some_and(|v| v.as_bytes() == b"0");
        let path = resp.url().path().to_string();
        let body = resp.text().await.unwrap_or_default();

        Err(match status {
            401 => GushError::AuthFailed {
                adapter: self.adapter.to_string(),
                message: error_message(&body),
            },
            403 if quota_exhausted => GushError::RateLimited {
                adapter: self.adapter.to_string(),
            },
            429 => GushError::RateLimited {
                adapter: self.adapter.to_string(),
            },
            404 => GushError::NotFound { what: path },
            _ => GushError::ApiError {
                status,
                message: error_message(&body),
            },
        })
    }

    async fn json<T: DeserializeOwned>(resp: Response) -> Result<T, GushError> {
        resp.json().await.map_err(|e| GushError::ApiError {
            status: 0,
            message: format!("JSON parse error: {e}"),
        })
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, GushError> {
        self.get_url(&self.url(path)).await
    }

    /// GET an absolute URL (pagination links).
    pub async fn get_url<T: DeserializeOwned>(&self, url: &str) -> Result<T, GushError> {
        let resp = self.send(self.request(Method::GET, url)).await?;
        Self::json(resp).await
    }

    pub async fn get_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, GushError> {
        let builder = self.request(Method::GET, &self.url(path)).query(query);
        let resp = self.send(builder).await?;
        Self::json(resp).await
    }

    /// Send a JSON body and decode the JSON response.
    pub async fn send_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<T, GushError> {
        let builder = self.request(method, &self.url(path)).json(body);
        let resp = self.send(builder).await?;
        Self::json(resp).await
    }

    /// Send a request whose response body is irrelevant (204s, deletes).
    pub async fn send_empty<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<(), GushError> {
        let mut builder = self.request(method, &self.url(path));
        if let Some(body) = body {
            builder = builder.json(body);
        }
        self.send(builder).await?;
        Ok(())
    }

    pub async fn delete(&self, path: &str) -> Result<(), GushError> {
        self.send_empty::<()>(Method::DELETE, path, None).await
    }

    /// Follow `page`/`per_page` pagination until a short page comes back.
    pub async fn paginated_get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        per_page: u32,
    ) -> Result<Vec<T>, GushError> {
        let mut all = Vec::new();
        let mut page = 1u32;

        loop {
            let mut q: Vec<(&str, String)> = query.to_vec();
            q.push(("per_page", per_page.to_string()));
            q.push(("page", page.to_string()));

            let items: Vec<T> = self.get_query(path, &q).await?;
            let count = items.len();
            all.extend(items);

            if count < per_page as usize {
                break;
            }
            page += 1;
        }

        Ok(all)
    }

    /// Follow Bitbucket-style `{ values, next }` pagination.
    pub async fn paginated_values<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, GushError> {
        let mut all = Vec::new();
        let mut page: Paged<T> = self.get_query(path, query).await?;
        loop {
            all.extend(page.values);
            match page.next {
                Some(next) => page = self.get_url(&next).await?,
                None => break,
            }
        }
        Ok(all)
    }
}

#[derive(Deserialize)]
struct Paged<T> {
    values: Vec<T>,
    #[serde(default)]
    next: Option<String>,
}

/// Pull a human-readable message out of an error body, falling back to the raw text.
fn error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        #[serde(default)]
        message: Option<serde_json::Value>,
        #[serde(default)]
        error: Option<serde_json::Value>,
        #[serde(default, rename = "errorMessages")]
        error_messages: Vec<String>,
    }

    fn text(v: &serde_json::Value) -> String {
        match v {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Object(map) => map
                .get("message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| v.to_string()),
            other => other.to_string(),
        }
    }

    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed
            .message
            .as_ref()
            .or(parsed.error.as_ref())
            .map(text)
            .or_else(|| parsed.error_messages.first().cloned())
            .unwrap_or_else(|| body.to_string()),
        Err(_) => body.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_shapes() {
        assert_eq!(error_message(r#"{"message":"Bad credentials"}"#), "Bad credentials");
        assert_eq!(
            error_message(r#"{"type":"error","error":{"message":"Repository not found"}}"#),
            "Repository not found"
        );
        assert_eq!(
            error_message(r#"{"errorMessages":["Issue does not exist"],"errors":{}}"#),
            "Issue does not exist"
        );
        assert_eq!(error_message("<html>502</html>\n"), "<html>502</html>");
    }
}
