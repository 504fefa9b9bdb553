use super::client::HttpClient;
use async_trait::async_trait;

/// An [`HttpClient`] wrapper that appends an API key as a URL query
/// parameter, the scheme the VBB endpoint uses (`?apikey=<key>`).
pub struct ApiKeyParam<C> {
    pub inner: C,
    pub param_name: String,
    pub key: String,
}

impl<C> ApiKeyParam<C> {
    pub fn new(inner: C, param_name: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            inner,
            param_name: param_name.into(),
            key: key.into(),
        }
    }

    fn decorate(&self, req: &mut reqwest::Request) {
        req.url_mut()
            .query_pairs_mut()
            .append_pair(&self.param_name, &self.key);
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for ApiKeyParam<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        self.decorate(&mut req);
        self.inner.execute(req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::BasicClient;

    #[test]
    fn test_api_key_appended_as_query_param() {
        let client = ApiKeyParam::new(BasicClient::new(), "apikey", "sekrit");
        let mut req = reqwest::Request::new(
            reqwest::Method::GET,
            "https://api.vbb.de/gtfs-rt/v1/feed".parse().unwrap(),
        );

        client.decorate(&mut req);
        assert_eq!(
            req.url().as_str(),
            "https://api.vbb.de/gtfs-rt/v1/feed?apikey=sekrit"
        );
    }

    #[test]
    fn test_existing_query_params_survive() {
        let client = ApiKeyParam::new(BasicClient::new(), "apikey", "sekrit");
        let mut req = reqwest::Request::new(
            reqwest::Method::GET,
            "https://api.vbb.de/gtfs-rt/v1/feed?format=pb".parse().unwrap(),
        );

        client.decorate(&mut req);
        let url = req.url().as_str();
        assert!(url.contains("format=pb"), "url was {url}");
        assert!(url.contains("apikey=sekrit"), "url was {url}");
    }
}
